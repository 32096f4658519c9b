//! Core compiler pipeline for the VOXL block-scripting language.
//!
//! The pipeline is roughly:
//!
//!   source .voxl
//!     -> lexer      (trivia-preserving tokens)
//!     -> parser     (surface AST)
//!     -> binder     (typed bound tree)
//!     -> lower      (flat label/goto list, dead code removed)
//!     -> emit       (placed blocks, wired terminals)
//!
//! Higher-level tools (CLI, editors, etc.) should depend on this crate
//! rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod source;
pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod parser;
pub mod ast;

// ---------------------------------------------------------------------
// Semantic layers: types, symbols, binding, lowering
// ---------------------------------------------------------------------

pub mod types;
pub mod symbol;
pub mod builtins;
pub mod bound;
pub mod binder;
pub mod control_flow;
pub mod lower;

// ---------------------------------------------------------------------
// Back-end: block catalog, placement, wiring, emission
// ---------------------------------------------------------------------

pub mod blocks;
pub mod terminal;
pub mod placer;
pub mod builder;
pub mod wiring;
pub mod output;
pub mod emit;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{Compilation, CompileOptions, compile, compile_game_file, compile_script};
pub use error::CoreError;
pub use output::{BuildArtifact, BuildTarget};
pub use placer::PlacerKind;
