//! Terminal stores: the wiring surface of one emitted construct.
//!
//! Every construct the emitter produces, whether it placed a real block
//! or not, exposes one optional input and zero or more outputs through a
//! [`TerminalStore`]. Composite stores let a whole statement sequence or
//! a jump act like a single construct when wired into its surroundings.

use crate::blocks::BlockId;

/// One end of a wire: a terminal slot on a placed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WireEnd {
    pub block: BlockId,
    pub terminal: usize,
}

impl WireEnd {
    pub fn new(block: BlockId, terminal: usize) -> WireEnd {
        WireEnd { block, terminal }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalStore {
    /// One placed block's exec input and exec outputs.
    Block {
        input: Option<WireEnd>,
        outputs: Vec<WireEnd>,
    },
    /// No wiring surface at all (labels).
    Nop,
    /// A placed conditional block. `after` is the output used for normal
    /// sequential wiring; `on_true` fires only when the condition holds
    /// and is consumed by the construct that placed the block.
    Conditional {
        input: WireEnd,
        after: WireEnd,
        on_true: WireEnd,
    },
    /// A statement sequence acting as one construct: input comes from
    /// `first`, outputs from `last`.
    Multi {
        first: Box<TerminalStore>,
        last: Box<TerminalStore>,
    },
    /// An early exit (return, goto): exposes no outputs, so nothing
    /// chains after it. The input is absent when the exit needs no block
    /// of its own.
    Rollback { input: Option<WireEnd> },
}

impl TerminalStore {
    pub fn block(input: Option<WireEnd>, outputs: Vec<WireEnd>) -> TerminalStore {
        TerminalStore::Block { input, outputs }
    }

    pub fn multi(first: TerminalStore, last: TerminalStore) -> TerminalStore {
        TerminalStore::Multi {
            first: Box::new(first),
            last: Box::new(last),
        }
    }

    /// The single input terminal, when the construct has one.
    pub fn input(&self) -> Option<WireEnd> {
        match self {
            TerminalStore::Block { input, .. } => *input,
            TerminalStore::Nop => None,
            TerminalStore::Conditional { input, .. } => Some(*input),
            TerminalStore::Multi { first, .. } => first.input(),
            TerminalStore::Rollback { input } => *input,
        }
    }

    /// Output terminals usable for sequential continuation. A rollback
    /// deliberately exposes none; a conditional exposes only `after`.
    pub fn outputs(&self) -> Vec<WireEnd> {
        match self {
            TerminalStore::Block { outputs, .. } => outputs.clone(),
            TerminalStore::Nop => Vec::new(),
            TerminalStore::Conditional { after, .. } => vec![*after],
            TerminalStore::Multi { last, .. } => last.outputs(),
            TerminalStore::Rollback { .. } => Vec::new(),
        }
    }

    /// Whether the construct can be wired into at all.
    pub fn has_surface(&self) -> bool {
        !matches!(self, TerminalStore::Nop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end(block: BlockId, terminal: usize) -> WireEnd {
        WireEnd::new(block, terminal)
    }

    #[test]
    fn block_store_exposes_its_ends() {
        let store = TerminalStore::block(Some(end(0, 0)), vec![end(0, 2)]);
        assert_eq!(store.input(), Some(end(0, 0)));
        assert_eq!(store.outputs(), vec![end(0, 2)]);
    }

    #[test]
    fn nop_has_no_surface() {
        assert_eq!(TerminalStore::Nop.input(), None);
        assert!(TerminalStore::Nop.outputs().is_empty());
        assert!(!TerminalStore::Nop.has_surface());
    }

    #[test]
    fn conditional_hides_on_true_from_sequential_wiring() {
        let store = TerminalStore::Conditional {
            input: end(3, 0),
            after: end(3, 4),
            on_true: end(3, 2),
        };
        assert_eq!(store.input(), Some(end(3, 0)));
        assert_eq!(store.outputs(), vec![end(3, 4)]);
    }

    #[test]
    fn multi_delegates_to_first_and_last() {
        let first = TerminalStore::block(Some(end(0, 0)), vec![end(0, 1)]);
        let last = TerminalStore::block(Some(end(5, 0)), vec![end(5, 1)]);
        let store = TerminalStore::multi(first, last);
        assert_eq!(store.input(), Some(end(0, 0)));
        assert_eq!(store.outputs(), vec![end(5, 1)]);
    }

    #[test]
    fn rollback_consumes_without_continuing() {
        let store = TerminalStore::Rollback {
            input: Some(end(7, 0)),
        };
        assert_eq!(store.input(), Some(end(7, 0)));
        assert!(store.outputs().is_empty());

        let blockless = TerminalStore::Rollback { input: None };
        assert_eq!(blockless.input(), None);
        assert!(blockless.outputs().is_empty());
        assert!(blockless.has_surface());
    }
}
