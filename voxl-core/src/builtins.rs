//! Built-in functions visible at the VOXL language level.
//!
//! Each builtin maps onto one block family in the emitted graph; the
//! emitter decides the concrete block from the argument wire types. The
//! binder checks calls against this table instead of hard-coding names.

use crate::types::Type;

/// Kind tag used by the emitter to pick a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    /// `vec(x, y, z)` — make-vector block.
    MakeVector,
    /// `rot(x, y, z)` — make-rotation block.
    MakeRotation,
    /// `random(min, max)` — random-number block.
    Random,
    /// `inspect(value)` — on-screen value display. Generic over its
    /// operand; the binder accepts any wire-typed argument and the
    /// emitter picks the block for that wire type.
    Inspect,
    /// `win()` — end the game as won.
    Win,
    /// `lose()` — end the game as lost.
    Lose,
}

/// Metadata about a single builtin.
#[derive(Debug, PartialEq, Eq)]
pub struct BuiltinDef {
    pub name: &'static str,
    /// Declared parameter types. For [`BuiltinKind::Inspect`] this is the
    /// arity only; the element type is checked specially.
    pub params: &'static [Type],
    pub return_type: Type,
    pub kind: BuiltinKind,
}

/// The complete list of builtins known to the core.
pub const BUILTINS: &[BuiltinDef] = &[
    BuiltinDef {
        name: "vec",
        params: &[Type::Number, Type::Number, Type::Number],
        return_type: Type::Vector,
        kind: BuiltinKind::MakeVector,
    },
    BuiltinDef {
        name: "rot",
        params: &[Type::Number, Type::Number, Type::Number],
        return_type: Type::Rotation,
        kind: BuiltinKind::MakeRotation,
    },
    BuiltinDef {
        name: "random",
        params: &[Type::Number, Type::Number],
        return_type: Type::Number,
        kind: BuiltinKind::Random,
    },
    BuiltinDef {
        name: "inspect",
        params: &[Type::Number],
        return_type: Type::Void,
        kind: BuiltinKind::Inspect,
    },
    BuiltinDef {
        name: "win",
        params: &[],
        return_type: Type::Void,
        kind: BuiltinKind::Win,
    },
    BuiltinDef {
        name: "lose",
        params: &[],
        return_type: Type::Void,
        kind: BuiltinKind::Lose,
    },
];

/// Look up a builtin by its source-level name. Linear search; the table
/// is small.
pub fn find_builtin(name: &str) -> Option<&'static BuiltinDef> {
    BUILTINS.iter().find(|b| b.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_known_builtins() {
        let vec = find_builtin("vec").expect("vec is a builtin");
        assert_eq!(vec.kind, BuiltinKind::MakeVector);
        assert_eq!(vec.params.len(), 3);
        assert_eq!(vec.return_type, Type::Vector);
    }

    #[test]
    fn unknown_names_are_not_builtins() {
        assert!(find_builtin("summon_dragon").is_none());
    }
}
