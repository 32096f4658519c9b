//! Block catalog: the reusable descriptors the emitter places.
//!
//! A [`BlockDef`] is a static descriptor (footprint, terminal slots); a
//! [`Block`] is one placed instance. The catalog is a const table in the
//! same spirit as the builtin table: the emitter picks defs from here
//! instead of hard-coding names and terminal indices.

use core::fmt;
use std::ops::Add;

use crate::types::WireType;

/// Integer position or extent in block space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Vector3I {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Vector3I {
    pub const ZERO: Vector3I = Vector3I::new(0, 0, 0);

    pub const fn new(x: i32, y: i32, z: i32) -> Vector3I {
        Vector3I { x, y, z }
    }
}

impl Add for Vector3I {
    type Output = Vector3I;

    fn add(self, other: Vector3I) -> Vector3I {
        Vector3I::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl fmt::Display for Vector3I {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    In,
    Out,
}

/// One connection slot on a block descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalDef {
    pub name: &'static str,
    pub wire: WireType,
    pub kind: TerminalKind,
}

const fn t_in(name: &'static str, wire: WireType) -> TerminalDef {
    TerminalDef {
        name,
        wire,
        kind: TerminalKind::In,
    }
}

const fn t_out(name: &'static str, wire: WireType) -> TerminalDef {
    TerminalDef {
        name,
        wire,
        kind: TerminalKind::Out,
    }
}

/// Reusable block descriptor. `id` is the stable identifier written into
/// serialized output; `size` is the 3D footprint in block units.
#[derive(Debug, PartialEq, Eq)]
pub struct BlockDef {
    pub name: &'static str,
    pub id: u16,
    pub size: Vector3I,
    pub terminals: &'static [TerminalDef],
}

impl BlockDef {
    /// Index of a named terminal. The emitter only asks for terminals the
    /// catalog declares, so a miss is a compiler bug.
    pub fn terminal(&self, name: &str) -> usize {
        self.terminals
            .iter()
            .position(|t| t.name == name)
            .unwrap_or_else(|| panic!("block '{}' has no terminal '{name}'", self.name))
    }

    /// First input terminal carrying `wire`, if any.
    pub fn input_of(&self, wire: WireType) -> Option<usize> {
        self.terminals
            .iter()
            .position(|t| t.kind == TerminalKind::In && t.wire == wire)
    }

    /// First output terminal carrying `wire`, if any.
    pub fn output_of(&self, wire: WireType) -> Option<usize> {
        self.terminals
            .iter()
            .position(|t| t.kind == TerminalKind::Out && t.wire == wire)
    }
}

/// Handle to one placed block, an index into the builder's block list.
pub type BlockId = usize;

/// One placed instance of a descriptor. The position stays at the origin
/// until the placer finalizes layout.
#[derive(Debug)]
pub struct Block {
    pub id: BlockId,
    pub def: &'static BlockDef,
    pub position: Vector3I,
}

const EXEC_SIZE: Vector3I = Vector3I::new(2, 1, 2);
const VALUE_SIZE: Vector3I = Vector3I::new(2, 1, 1);

use WireType::{Bool, Exec, Number, Rotation, Vector};

// Exec blocks.

/// Entry point: fires its `after` wire once when the program starts.
pub static PLAY_SENSOR: BlockDef = BlockDef {
    name: "play_sensor",
    id: 1,
    size: EXEC_SIZE,
    terminals: &[t_out("after", Exec)],
};

pub static IF: BlockDef = BlockDef {
    name: "if",
    id: 2,
    size: EXEC_SIZE,
    terminals: &[
        t_in("before", Exec),
        t_in("condition", Bool),
        t_out("on_true", Exec),
        t_out("on_false", Exec),
        t_out("after", Exec),
    ],
};

pub static WIN: BlockDef = BlockDef {
    name: "win",
    id: 3,
    size: EXEC_SIZE,
    terminals: &[t_in("before", Exec), t_out("after", Exec)],
};

pub static LOSE: BlockDef = BlockDef {
    name: "lose",
    id: 4,
    size: EXEC_SIZE,
    terminals: &[t_in("before", Exec), t_out("after", Exec)],
};

macro_rules! set_variable_def {
    ($ident:ident, $name:literal, $id:literal, $wire:expr) => {
        pub static $ident: BlockDef = BlockDef {
            name: $name,
            id: $id,
            size: EXEC_SIZE,
            terminals: &[t_in("before", Exec), t_in("value", $wire), t_out("after", Exec)],
        };
    };
}

set_variable_def!(SET_NUMBER_VARIABLE, "set_number_variable", 5, Number);
set_variable_def!(SET_BOOL_VARIABLE, "set_bool_variable", 6, Bool);
set_variable_def!(SET_VECTOR_VARIABLE, "set_vector_variable", 7, Vector);
set_variable_def!(SET_ROTATION_VARIABLE, "set_rotation_variable", 8, Rotation);
set_variable_def!(
    SET_OBJECT_VARIABLE,
    "set_object_variable",
    9,
    WireType::Object
);

macro_rules! inspect_def {
    ($ident:ident, $name:literal, $id:literal, $wire:expr) => {
        pub static $ident: BlockDef = BlockDef {
            name: $name,
            id: $id,
            size: EXEC_SIZE,
            terminals: &[t_in("before", Exec), t_in("value", $wire), t_out("after", Exec)],
        };
    };
}

inspect_def!(INSPECT_NUMBER, "inspect_number", 10, Number);
inspect_def!(INSPECT_BOOL, "inspect_bool", 11, Bool);
inspect_def!(INSPECT_VECTOR, "inspect_vector", 12, Vector);
inspect_def!(INSPECT_ROTATION, "inspect_rotation", 13, Rotation);
inspect_def!(INSPECT_OBJECT, "inspect_object", 14, WireType::Object);

// Value blocks. Each carries its literal as a setting value.

macro_rules! value_def {
    ($ident:ident, $name:literal, $id:literal, $wire:expr) => {
        pub static $ident: BlockDef = BlockDef {
            name: $name,
            id: $id,
            size: VALUE_SIZE,
            terminals: &[t_out("value", $wire)],
        };
    };
}

value_def!(NUMBER_VALUE, "number_value", 20, Number);
value_def!(BOOL_VALUE, "bool_value", 21, Bool);
value_def!(VECTOR_VALUE, "vector_value", 22, Vector);
value_def!(ROTATION_VALUE, "rotation_value", 23, Rotation);

macro_rules! get_variable_def {
    ($ident:ident, $name:literal, $id:literal, $wire:expr) => {
        pub static $ident: BlockDef = BlockDef {
            name: $name,
            id: $id,
            size: VALUE_SIZE,
            terminals: &[t_out("value", $wire)],
        };
    };
}

get_variable_def!(GET_NUMBER_VARIABLE, "get_number_variable", 24, Number);
get_variable_def!(GET_BOOL_VARIABLE, "get_bool_variable", 25, Bool);
get_variable_def!(GET_VECTOR_VARIABLE, "get_vector_variable", 26, Vector);
get_variable_def!(GET_ROTATION_VARIABLE, "get_rotation_variable", 27, Rotation);
get_variable_def!(
    GET_OBJECT_VARIABLE,
    "get_object_variable",
    28,
    WireType::Object
);

// Operation blocks.

macro_rules! binary_def {
    ($ident:ident, $name:literal, $id:literal, $a:expr, $b:expr, $out:expr) => {
        pub static $ident: BlockDef = BlockDef {
            name: $name,
            id: $id,
            size: VALUE_SIZE,
            terminals: &[t_in("a", $a), t_in("b", $b), t_out("value", $out)],
        };
    };
}

binary_def!(ADD_NUMBERS, "add_numbers", 30, Number, Number, Number);
binary_def!(SUBTRACT_NUMBERS, "subtract_numbers", 31, Number, Number, Number);
binary_def!(MULTIPLY_NUMBERS, "multiply_numbers", 32, Number, Number, Number);
binary_def!(DIVIDE_NUMBERS, "divide_numbers", 33, Number, Number, Number);
binary_def!(MODULO_NUMBERS, "modulo_numbers", 34, Number, Number, Number);
binary_def!(LESS_THAN, "less_than", 35, Number, Number, Bool);
binary_def!(LESS_OR_EQUAL, "less_or_equal", 36, Number, Number, Bool);
binary_def!(GREATER_THAN, "greater_than", 37, Number, Number, Bool);
binary_def!(GREATER_OR_EQUAL, "greater_or_equal", 38, Number, Number, Bool);
binary_def!(EQUAL_NUMBERS, "equal_numbers", 39, Number, Number, Bool);
binary_def!(NOT_EQUAL_NUMBERS, "not_equal_numbers", 40, Number, Number, Bool);
binary_def!(AND, "and", 41, Bool, Bool, Bool);
binary_def!(OR, "or", 42, Bool, Bool, Bool);
binary_def!(EQUAL_BOOLS, "equal_bools", 43, Bool, Bool, Bool);
binary_def!(NOT_EQUAL_BOOLS, "not_equal_bools", 44, Bool, Bool, Bool);
binary_def!(ADD_VECTORS, "add_vectors", 45, Vector, Vector, Vector);
binary_def!(SUBTRACT_VECTORS, "subtract_vectors", 46, Vector, Vector, Vector);
binary_def!(SCALE_VECTOR, "scale_vector", 47, Vector, Number, Vector);
binary_def!(EQUAL_VECTORS, "equal_vectors", 48, Vector, Vector, Bool);
binary_def!(NOT_EQUAL_VECTORS, "not_equal_vectors", 49, Vector, Vector, Bool);
binary_def!(RANDOM, "random", 50, Number, Number, Number);

macro_rules! unary_def {
    ($ident:ident, $name:literal, $id:literal, $in:expr, $out:expr) => {
        pub static $ident: BlockDef = BlockDef {
            name: $name,
            id: $id,
            size: VALUE_SIZE,
            terminals: &[t_in("value", $in), t_out("result", $out)],
        };
    };
}

unary_def!(NEGATE_NUMBER, "negate_number", 51, Number, Number);
unary_def!(NEGATE_VECTOR, "negate_vector", 52, Vector, Vector);
unary_def!(NOT, "not", 53, Bool, Bool);

pub static MAKE_VECTOR: BlockDef = BlockDef {
    name: "make_vector",
    id: 54,
    size: VALUE_SIZE,
    terminals: &[
        t_in("x", Number),
        t_in("y", Number),
        t_in("z", Number),
        t_out("value", Vector),
    ],
};

pub static MAKE_ROTATION: BlockDef = BlockDef {
    name: "make_rotation",
    id: 55,
    size: VALUE_SIZE,
    terminals: &[
        t_in("x", Number),
        t_in("y", Number),
        t_in("z", Number),
        t_out("value", Rotation),
    ],
};

pub static BREAK_VECTOR: BlockDef = BlockDef {
    name: "break_vector",
    id: 56,
    size: VALUE_SIZE,
    terminals: &[
        t_in("value", Vector),
        t_out("x", Number),
        t_out("y", Number),
        t_out("z", Number),
    ],
};

pub static BREAK_ROTATION: BlockDef = BlockDef {
    name: "break_rotation",
    id: 57,
    size: VALUE_SIZE,
    terminals: &[
        t_in("value", Rotation),
        t_out("x", Number),
        t_out("y", Number),
        t_out("z", Number),
    ],
};

// Passthrough blocks: one input wired straight to one output, used to
// reset a terminal's fan-out count. The platform has no passthrough for
// object wires.

unary_def!(PASS_NUMBER, "pass_number", 60, Number, Number);
unary_def!(PASS_BOOL, "pass_bool", 61, Bool, Bool);
unary_def!(PASS_VECTOR, "pass_vector", 62, Vector, Vector);
unary_def!(PASS_ROTATION, "pass_rotation", 63, Rotation, Rotation);

/// Passthrough def for a wire type, when the platform has one.
pub fn passthrough_for(wire: WireType) -> Option<&'static BlockDef> {
    match wire {
        WireType::Number => Some(&PASS_NUMBER),
        WireType::Bool => Some(&PASS_BOOL),
        WireType::Vector => Some(&PASS_VECTOR),
        WireType::Rotation => Some(&PASS_ROTATION),
        WireType::Exec | WireType::Object => None,
    }
}

/// Decompose def for a wire type (vectors and rotations only).
pub fn break_block_for(wire: WireType) -> Option<&'static BlockDef> {
    match wire {
        WireType::Vector => Some(&BREAK_VECTOR),
        WireType::Rotation => Some(&BREAK_ROTATION),
        _ => None,
    }
}

/// Set-variable def for a wire type.
pub fn set_variable_for(wire: WireType) -> &'static BlockDef {
    match wire {
        WireType::Number => &SET_NUMBER_VARIABLE,
        WireType::Bool => &SET_BOOL_VARIABLE,
        WireType::Vector => &SET_VECTOR_VARIABLE,
        WireType::Rotation => &SET_ROTATION_VARIABLE,
        WireType::Object => &SET_OBJECT_VARIABLE,
        WireType::Exec => unreachable!("no variable carries an exec wire"),
    }
}

/// Get-variable def for a wire type.
pub fn get_variable_for(wire: WireType) -> &'static BlockDef {
    match wire {
        WireType::Number => &GET_NUMBER_VARIABLE,
        WireType::Bool => &GET_BOOL_VARIABLE,
        WireType::Vector => &GET_VECTOR_VARIABLE,
        WireType::Rotation => &GET_ROTATION_VARIABLE,
        WireType::Object => &GET_OBJECT_VARIABLE,
        WireType::Exec => unreachable!("no variable carries an exec wire"),
    }
}

/// Inspect def for a wire type.
pub fn inspect_for(wire: WireType) -> &'static BlockDef {
    match wire {
        WireType::Number => &INSPECT_NUMBER,
        WireType::Bool => &INSPECT_BOOL,
        WireType::Vector => &INSPECT_VECTOR,
        WireType::Rotation => &INSPECT_ROTATION,
        WireType::Object => &INSPECT_OBJECT,
        WireType::Exec => unreachable!("inspect takes a value wire"),
    }
}

/// Literal value def for a wire type (no object literals exist).
pub fn value_for(wire: WireType) -> &'static BlockDef {
    match wire {
        WireType::Number => &NUMBER_VALUE,
        WireType::Bool => &BOOL_VALUE,
        WireType::Vector => &VECTOR_VALUE,
        WireType::Rotation => &ROTATION_VALUE,
        WireType::Exec | WireType::Object => {
            unreachable!("no literal block for {wire} wires")
        }
    }
}
