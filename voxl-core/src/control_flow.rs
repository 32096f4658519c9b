//! Control-flow graph over flat (lowered) statement lists.
//!
//! After lowering, a body is a linear list where the only control flow is
//! `Label`, `Goto`, `ConditionalGoto` and `Return`. The graph splits the
//! list into basic blocks, connects them, and answers reachability, which
//! drives dead-code removal and unreachable-code warnings.

use std::collections::{HashMap, VecDeque};

use crate::bound::{BoundStatement, BoundStatementKind};
use crate::symbol::LabelSymbol;
use crate::types::ConstantValue;

/// One basic block: a run of statements with a single entry and exit.
/// Statements are stored as indices into the original flat list.
#[derive(Debug)]
struct BasicBlock {
    statements: Vec<usize>,
    successors: Vec<usize>,
}

/// Control-flow graph of a flat statement list.
#[derive(Debug)]
pub struct ControlFlowGraph {
    blocks: Vec<BasicBlock>,
}

impl ControlFlowGraph {
    /// Builds the graph. Panics on structured statements (`If`, `While`,
    /// nested `Block`), which the lowerer must have desugared already.
    pub fn build(statements: &[BoundStatement]) -> ControlFlowGraph {
        let mut blocks: Vec<BasicBlock> = Vec::new();
        let mut current = BasicBlock {
            statements: Vec::new(),
            successors: Vec::new(),
        };
        // Maps a label to the block that starts with it.
        let mut label_blocks: HashMap<LabelSymbol, usize> = HashMap::new();
        // Edges recorded as (from_block, target_label), resolved after all
        // blocks exist.
        let mut pending_jumps: Vec<(usize, LabelSymbol)> = Vec::new();
        // Block index -> falls through to the next block.
        let mut falls_through: Vec<bool> = Vec::new();

        let mut finish =
            |blocks: &mut Vec<BasicBlock>, current: &mut BasicBlock, fall: bool, ft: &mut Vec<bool>| {
                if current.statements.is_empty() {
                    return;
                }
                blocks.push(std::mem::replace(
                    current,
                    BasicBlock {
                        statements: Vec::new(),
                        successors: Vec::new(),
                    },
                ));
                ft.push(fall);
            };

        for (index, statement) in statements.iter().enumerate() {
            match &statement.kind {
                BoundStatementKind::Label(label) => {
                    finish(&mut blocks, &mut current, true, &mut falls_through);
                    label_blocks.insert(label.clone(), blocks.len());
                    current.statements.push(index);
                }
                BoundStatementKind::Goto(label) => {
                    current.statements.push(index);
                    pending_jumps.push((blocks.len(), label.clone()));
                    finish(&mut blocks, &mut current, false, &mut falls_through);
                }
                BoundStatementKind::ConditionalGoto {
                    label,
                    condition,
                    jump_if,
                } => {
                    current.statements.push(index);
                    // A constant condition makes one of the two edges dead.
                    let constant = match condition.constant_value() {
                        Some(ConstantValue::Bool(value)) => Some(value),
                        _ => None,
                    };
                    let (takes_jump, falls) = match constant {
                        Some(value) => (value == *jump_if, value != *jump_if),
                        None => (true, true),
                    };
                    if takes_jump {
                        pending_jumps.push((blocks.len(), label.clone()));
                    }
                    finish(&mut blocks, &mut current, falls, &mut falls_through);
                }
                BoundStatementKind::Return => {
                    current.statements.push(index);
                    finish(&mut blocks, &mut current, false, &mut falls_through);
                }
                BoundStatementKind::VariableDeclaration { .. }
                | BoundStatementKind::Assignment { .. }
                | BoundStatementKind::CompoundAssignment { .. }
                | BoundStatementKind::Expression(_)
                | BoundStatementKind::Nop => {
                    current.statements.push(index);
                }
                BoundStatementKind::Block(_)
                | BoundStatementKind::If { .. }
                | BoundStatementKind::While { .. } => {
                    unreachable!("structured statement in flat list")
                }
            }
        }
        finish(&mut blocks, &mut current, false, &mut falls_through);

        for (block_index, fall) in falls_through.iter().enumerate() {
            if *fall && block_index + 1 < blocks.len() {
                blocks[block_index].successors.push(block_index + 1);
            }
        }
        for (from, label) in pending_jumps {
            // Jumps to a label past the end of the list (the implicit end
            // label) simply have no edge.
            if let Some(&target) = label_blocks.get(&label) {
                if target < blocks.len() {
                    blocks[from].successors.push(target);
                }
            }
        }

        ControlFlowGraph { blocks }
    }

    /// Per-statement reachability from the entry, indexed like the input
    /// list. An empty list yields an empty vector.
    pub fn reachable(&self, statement_count: usize) -> Vec<bool> {
        let mut reachable_blocks = vec![false; self.blocks.len()];
        let mut queue = VecDeque::new();
        if !self.blocks.is_empty() {
            reachable_blocks[0] = true;
            queue.push_back(0);
        }
        while let Some(block) = queue.pop_front() {
            for &successor in &self.blocks[block].successors {
                if !reachable_blocks[successor] {
                    reachable_blocks[successor] = true;
                    queue.push_back(successor);
                }
            }
        }

        let mut reachable = vec![false; statement_count];
        for (block, block_reachable) in self.blocks.iter().zip(&reachable_blocks) {
            if *block_reachable {
                for &index in &block.statements {
                    reachable[index] = true;
                }
            }
        }
        reachable
    }
}
