//! Variable and function symbols.
//!
//! Symbols are created during binding and immutable afterwards, except for
//! one-time initialization tracking and lazy constant folding. The derived
//! [`VariableSymbol::result_name`] is the string identity a variable keeps
//! when it becomes a wire or variable-block setting in emitted output.

use core::fmt;
use std::cell::{Cell, OnceCell};

use crate::types::{ConstantValue, Type};

/// Hard cap on the identity part of a result name. Longer names are a
/// user error reported by the binder.
pub const MAX_RESULT_NAME_LEN: usize = 16;

/// Small set of variable modifiers.
///
/// Stored as a bitset but constructed through [`Modifiers::with`] /
/// [`Modifiers::validate`] so the `GLOBAL`/`SAVED` exclusion is checked
/// where the set is built, not asserted later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const READONLY: Modifiers = Modifiers(1 << 0);
    pub const CONSTANT: Modifiers = Modifiers(1 << 1);
    pub const GLOBAL: Modifiers = Modifiers(1 << 2);
    pub const SAVED: Modifiers = Modifiers(1 << 3);
    pub const INLINE: Modifiers = Modifiers(1 << 4);

    pub const fn empty() -> Modifiers {
        Modifiers(0)
    }

    pub const fn with(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }

    pub const fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    /// Checks mutual-exclusion rules. `GLOBAL` and `SAVED` both claim the
    /// variable's storage sigil, so a set holding both is invalid.
    pub fn validate(self) -> Result<Modifiers, ModifierConflict> {
        if self.contains(Modifiers::GLOBAL) && self.contains(Modifiers::SAVED) {
            return Err(ModifierConflict {
                first: "global",
                second: "saved",
            });
        }
        Ok(self)
    }
}

/// A pair of modifiers that cannot be combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifierConflict {
    pub first: &'static str,
    pub second: &'static str,
}

impl fmt::Display for ModifierConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' cannot be combined with '{}'", self.first, self.second)
    }
}

/// What kind of variable a symbol stands for. Kinds only change how the
/// identity string and constant folding behave; they add no new runtime
/// behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// Declared in source.
    User,
    /// Discard target (`_`); has an empty identity and absorbs writes.
    Null,
}

/// A declared variable or the discard target.
#[derive(Debug)]
pub struct VariableSymbol {
    pub name: String,
    pub kind: VariableKind,
    pub modifiers: Modifiers,
    pub ty: Type,
    initialized: Cell<bool>,
    constant_value: OnceCell<ConstantValue>,
}

impl VariableSymbol {
    pub fn new(name: impl Into<String>, kind: VariableKind, modifiers: Modifiers, ty: Type) -> VariableSymbol {
        VariableSymbol {
            name: name.into(),
            kind,
            modifiers,
            ty,
            initialized: Cell::new(false),
            constant_value: OnceCell::new(),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.modifiers.contains(Modifiers::READONLY)
            || self.modifiers.contains(Modifiers::CONSTANT)
    }

    pub fn is_constant(&self) -> bool {
        self.modifiers.contains(Modifiers::CONSTANT)
    }

    pub fn is_inline(&self) -> bool {
        self.modifiers.contains(Modifiers::INLINE)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    /// One-way transition; marking twice is fine, unmarking impossible.
    pub fn mark_initialized(&self) {
        self.initialized.set(true);
    }

    pub fn constant_value(&self) -> Option<ConstantValue> {
        self.constant_value.get().copied()
    }

    /// Lazily record the folded constant. The first value wins; a second
    /// differing value would mean the binder folded the same symbol twice,
    /// which is a compiler bug.
    pub fn set_constant_value(&self, value: ConstantValue) {
        let stored = self.constant_value.get_or_init(|| value);
        assert!(
            *stored == value,
            "constant value for '{}' folded twice with different results",
            self.name
        );
    }

    /// The wire/variable identity used in emitted output: a storage sigil
    /// (`!` saved, `$` global) prepended to the identity string. `Null`
    /// variables have no identity at all.
    pub fn result_name(&self) -> String {
        if matches!(self.kind, VariableKind::Null) {
            return String::new();
        }
        let sigil = if self.modifiers.contains(Modifiers::SAVED) {
            "!"
        } else if self.modifiers.contains(Modifiers::GLOBAL) {
            "$"
        } else {
            ""
        };
        let mut identity = self.name.as_str();
        if identity.len() > MAX_RESULT_NAME_LEN {
            identity = &identity[..MAX_RESULT_NAME_LEN];
        }
        format!("{sigil}{identity}")
    }
}

impl PartialEq for VariableSymbol {
    fn eq(&self, other: &VariableSymbol) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.modifiers == other.modifiers
            && self.ty == other.ty
    }
}

impl Eq for VariableSymbol {}

/// The function a body belongs to. Scripts compile as one implicit void
/// `main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSymbol {
    pub name: String,
    pub return_type: Type,
}

impl FunctionSymbol {
    pub fn script_main() -> FunctionSymbol {
        FunctionSymbol {
            name: "main".to_string(),
            return_type: Type::Void,
        }
    }
}

/// Jump target introduced by binding and lowering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelSymbol {
    pub name: String,
}

impl LabelSymbol {
    pub fn new(name: impl Into<String>) -> LabelSymbol {
        LabelSymbol { name: name.into() }
    }
}

impl fmt::Display for LabelSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_global_saved_combination() {
        let conflict = Modifiers::GLOBAL
            .with(Modifiers::SAVED)
            .validate()
            .unwrap_err();
        assert_eq!(conflict.first, "global");
        assert_eq!(conflict.second, "saved");
    }

    #[test]
    fn accepts_other_combinations() {
        assert!(Modifiers::GLOBAL.with(Modifiers::INLINE).validate().is_ok());
        assert!(Modifiers::SAVED.with(Modifiers::READONLY).validate().is_ok());
        assert!(Modifiers::empty().validate().is_ok());
    }

    #[test]
    fn result_name_carries_storage_sigil() {
        let saved = VariableSymbol::new("hiscore", VariableKind::User, Modifiers::SAVED, Type::Number);
        assert_eq!(saved.result_name(), "!hiscore");

        let global = VariableSymbol::new("score", VariableKind::User, Modifiers::GLOBAL, Type::Number);
        assert_eq!(global.result_name(), "$score");

        let local = VariableSymbol::new("x", VariableKind::User, Modifiers::empty(), Type::Number);
        assert_eq!(local.result_name(), "x");
    }

    #[test]
    fn result_name_caps_identity_length() {
        let long = VariableSymbol::new(
            "a_very_long_variable_name_indeed",
            VariableKind::User,
            Modifiers::GLOBAL,
            Type::Number,
        );
        let name = long.result_name();
        assert_eq!(name.len(), 1 + MAX_RESULT_NAME_LEN);
        assert!(name.starts_with('$'));
    }

    #[test]
    fn null_variable_has_no_identity() {
        let null = VariableSymbol::new("_", VariableKind::Null, Modifiers::empty(), Type::Number);
        assert_eq!(null.result_name(), "");
    }

    #[test]
    fn constant_value_is_set_once() {
        let sym = VariableSymbol::new("c", VariableKind::User, Modifiers::CONSTANT, Type::Number);
        assert_eq!(sym.constant_value(), None);
        sym.set_constant_value(ConstantValue::Number(4.0));
        sym.set_constant_value(ConstantValue::Number(4.0));
        assert_eq!(sym.constant_value(), Some(ConstantValue::Number(4.0)));
    }

    #[test]
    fn initialization_is_one_way() {
        let sym = VariableSymbol::new("v", VariableKind::User, Modifiers::empty(), Type::Bool);
        assert!(!sym.is_initialized());
        sym.mark_initialized();
        assert!(sym.is_initialized());
    }
}
