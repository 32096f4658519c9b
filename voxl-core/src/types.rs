//! Type system for the VOXL language.
//!
//! Two closed enums: [`Type`] is what the binder assigns to expressions,
//! [`WireType`] is the data kind a terminal carries in the emitted block
//! graph. Every value type maps onto exactly one wire type; `Void` and
//! `Error` have none.

use core::fmt;

/// Types of values and expressions in VOXL source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Number,
    Bool,
    Vector,
    Rotation,
    Object,
    /// Statements and calls with no value.
    Void,
    /// Produced by expressions that already failed to bind; suppresses
    /// cascading diagnostics.
    Error,
}

impl Type {
    /// The wire kind a value of this type travels on, if any.
    pub fn wire_type(self) -> Option<WireType> {
        match self {
            Type::Number => Some(WireType::Number),
            Type::Bool => Some(WireType::Bool),
            Type::Vector => Some(WireType::Vector),
            Type::Rotation => Some(WireType::Rotation),
            Type::Object => Some(WireType::Object),
            Type::Void | Type::Error => None,
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, Type::Error)
    }

    /// Source-level keyword for this type, used in messages.
    pub fn name(self) -> &'static str {
        match self {
            Type::Number => "number",
            Type::Bool => "bool",
            Type::Vector => "vec",
            Type::Rotation => "rot",
            Type::Object => "obj",
            Type::Void => "void",
            Type::Error => "?",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Data kind carried by one terminal in the emitted graph.
///
/// `Exec` is the control wire that sequences statement blocks; the rest
/// carry values and are used to pick compatible passthrough and decompose
/// blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Exec,
    Number,
    Bool,
    Vector,
    Rotation,
    Object,
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WireType::Exec => "exec",
            WireType::Number => "number",
            WireType::Bool => "bool",
            WireType::Vector => "vec",
            WireType::Rotation => "rot",
            WireType::Object => "obj",
        };
        f.write_str(name)
    }
}

/// A compile-time constant, produced by literal expressions and folded
/// through constant variables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstantValue {
    Number(f32),
    Bool(bool),
    Vector([f32; 3]),
    Rotation([f32; 3]),
}

impl ConstantValue {
    pub fn ty(&self) -> Type {
        match self {
            ConstantValue::Number(_) => Type::Number,
            ConstantValue::Bool(_) => Type::Bool,
            ConstantValue::Vector(_) => Type::Vector,
            ConstantValue::Rotation(_) => Type::Rotation,
        }
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Number(n) => write!(f, "{n}"),
            ConstantValue::Bool(b) => write!(f, "{b}"),
            ConstantValue::Vector([x, y, z]) => write!(f, "({x}, {y}, {z})"),
            ConstantValue::Rotation([x, y, z]) => write!(f, "rot({x}, {y}, {z})"),
        }
    }
}
