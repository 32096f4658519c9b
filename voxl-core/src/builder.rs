//! CodeBuilder: ordered emission log over a placer.
//!
//! The emitter records every action here as a command: place a block,
//! set a block's setting value, connect two terminals. The builder is
//! format-agnostic; [`crate::output`] turns the finished log into a
//! concrete target artifact.

use crate::blocks::{Block, BlockDef, BlockId, Vector3I};
use crate::output::{BuildArtifact, BuildTarget, encode_artifact};
use crate::placer::{CodePlacer, PlacerKind};
use crate::terminal::WireEnd;

/// A literal or name stored on a placed block.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Number(f32),
    Bool(bool),
    Vector([f32; 3]),
    Rotation([f32; 3]),
    /// Variable identity (result name) on get/set-variable blocks.
    Name(String),
}

/// One entry in the emission log.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Place(BlockId),
    SetSetting { block: BlockId, value: SettingValue },
    Connect { from: WireEnd, to: WireEnd },
}

pub struct CodeBuilder {
    placer: CodePlacer,
    commands: Vec<Command>,
}

impl CodeBuilder {
    pub fn new(kind: PlacerKind, origin: Vector3I) -> CodeBuilder {
        CodeBuilder {
            placer: CodePlacer::new(kind, origin),
            commands: Vec::new(),
        }
    }

    pub fn enter_statement_block(&mut self) {
        self.placer.enter_statement_block();
    }

    pub fn exit_statement_block(&mut self) {
        self.placer.exit_statement_block();
    }

    pub fn enter_expression_block(&mut self) {
        self.placer.enter_expression_block();
    }

    pub fn exit_expression_block(&mut self) {
        self.placer.exit_expression_block();
    }

    pub fn set_highlight(&mut self, highlight: bool) {
        self.placer.set_highlight(highlight);
    }

    pub fn place_block(&mut self, def: &'static BlockDef) -> BlockId {
        let id = self.placer.place_block(def);
        self.commands.push(Command::Place(id));
        id
    }

    pub fn set_setting(&mut self, block: BlockId, value: SettingValue) {
        self.commands.push(Command::SetSetting { block, value });
    }

    pub fn connect(&mut self, from: WireEnd, to: WireEnd) {
        self.commands.push(Command::Connect { from, to });
    }

    /// Finalizes layout and serializes the log for the target format.
    pub fn build(self, target: BuildTarget) -> BuildArtifact {
        let (blocks, highlighted) = self.placer.finish();
        encode_artifact(target, &blocks, &highlighted, &self.commands)
    }

    /// The finished blocks and log without target encoding, for tests
    /// and in-process consumers.
    pub fn into_parts(self) -> (Vec<Block>, Vec<Command>) {
        let (blocks, _) = self.placer.finish();
        (blocks, self.commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{NUMBER_VALUE, SET_NUMBER_VARIABLE};

    #[test]
    fn log_preserves_emission_order() {
        let mut builder = CodeBuilder::new(PlacerKind::Ground, Vector3I::ZERO);
        builder.enter_statement_block();
        builder.enter_expression_block();
        let value = builder.place_block(&NUMBER_VALUE);
        builder.set_setting(value, SettingValue::Number(4.0));
        builder.exit_expression_block();
        let set = builder.place_block(&SET_NUMBER_VARIABLE);
        builder.set_setting(set, SettingValue::Name("x".to_string()));
        builder.connect(
            WireEnd::new(value, NUMBER_VALUE.terminal("value")),
            WireEnd::new(set, SET_NUMBER_VARIABLE.terminal("value")),
        );
        builder.exit_statement_block();

        let (blocks, commands) = builder.into_parts();
        assert_eq!(blocks.len(), 2);
        assert!(matches!(commands[0], Command::Place(id) if id == value));
        assert!(matches!(
            commands[1],
            Command::SetSetting { block, value: SettingValue::Number(v) }
                if block == value && v == 4.0
        ));
        assert!(matches!(commands.last(), Some(Command::Connect { .. })));
    }
}
