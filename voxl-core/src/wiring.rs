//! Wiring utilities: sequential chaining and fan-out management.
//!
//! The platform caps how many inputs one output terminal may feed
//! ([`MAX_WIRE_SPLITS`]). [`InlineVarManager`] works around the cap by
//! inserting passthrough blocks; [`BreakBlockCache`] reuses a decompose
//! block across component reads until an axis runs out of splits.

use std::collections::HashMap;

use crate::blocks::{BlockDef, break_block_for, passthrough_for, BlockId};
use crate::bound::Axis;
use crate::builder::CodeBuilder;
use crate::diagnostic::DiagnosticBag;
use crate::span::TextSpan;
use crate::terminal::{TerminalStore, WireEnd};
use crate::types::WireType;

/// Maximum fan-out of one output terminal.
pub const MAX_WIRE_SPLITS: usize = 4;

/// Chains emitted stores for one linear control flow: each pushed
/// store's input is wired to the previous store's outputs, and the whole
/// chain reads as a single store.
#[derive(Default)]
pub struct EmitConnector {
    first: Option<TerminalStore>,
    last: Option<TerminalStore>,
}

impl EmitConnector {
    pub fn new() -> EmitConnector {
        EmitConnector::default()
    }

    pub fn push(&mut self, builder: &mut CodeBuilder, store: TerminalStore) {
        if !store.has_surface() {
            return;
        }
        if let (Some(previous), Some(input)) = (&self.last, store.input()) {
            for output in previous.outputs() {
                builder.connect(output, input);
            }
        }
        if self.first.is_none() {
            self.first = Some(store.clone());
        }
        self.last = Some(store);
    }

    /// Outputs the next pushed store would be wired from. Used when flow
    /// diverts (goto) and the outputs must connect somewhere else.
    pub fn current_outputs(&self) -> Vec<WireEnd> {
        self.last.as_ref().map(TerminalStore::outputs).unwrap_or_default()
    }

    /// The whole chain as one store: the first store's input, the last
    /// store's outputs. An empty chain has no surface.
    pub fn into_store(self) -> TerminalStore {
        match (self.first, self.last) {
            (None, _) => TerminalStore::Nop,
            (Some(first), Some(last)) if first == last => first,
            (Some(first), Some(last)) => TerminalStore::multi(first, last),
            (Some(_), None) => unreachable!("connector recorded a first store but no last"),
        }
    }
}

/// Per value the source terminal reads are currently served from, and
/// how many splits that terminal has left. The source is absent when the
/// defining emission failed; reads then resolve to nothing without
/// piling further diagnostics on the one already reported.
struct InlineSource {
    source: Option<WireEnd>,
    wire: WireType,
    reads: usize,
}

/// Serves reads of inline variables while honoring [`MAX_WIRE_SPLITS`].
///
/// Direct reads stop one short of the limit; the limit-th read inserts a
/// passthrough block (spending the producer's final split on it) and all
/// later reads come from the passthrough, whose own budget is tracked
/// the same way.
#[derive(Default)]
pub struct InlineVarManager {
    sources: HashMap<String, InlineSource>,
}

impl InlineVarManager {
    pub fn new() -> InlineVarManager {
        InlineVarManager::default()
    }

    /// Registers (or re-registers, on reassignment) the producing
    /// terminal for an inline variable.
    pub fn define(&mut self, name: &str, wire: WireType, source: WireEnd) {
        self.sources.insert(
            name.to_string(),
            InlineSource {
                source: Some(source),
                wire,
                reads: 0,
            },
        );
    }

    /// Registers an inline variable whose initializer failed to emit.
    /// The error is already in the bag; every read of the name resolves
    /// to `None` quietly.
    pub fn poison(&mut self, name: &str, wire: WireType) {
        self.sources.insert(
            name.to_string(),
            InlineSource {
                source: None,
                wire,
                reads: 0,
            },
        );
    }

    /// Resolves one read. Returns `None` after reporting when the limit
    /// is exceeded and the wire type has no passthrough block, and
    /// `None` without reporting for a poisoned definition. Reading a
    /// name that was never defined at all is a compiler bug.
    pub fn read(
        &mut self,
        builder: &mut CodeBuilder,
        diagnostics: &mut DiagnosticBag,
        name: &str,
        span: TextSpan,
    ) -> Option<WireEnd> {
        let entry = self
            .sources
            .get_mut(name)
            .unwrap_or_else(|| panic!("inline variable '{name}' read before definition"));
        let source = entry.source?;

        if entry.reads + 1 < MAX_WIRE_SPLITS {
            entry.reads += 1;
            return Some(source);
        }

        let Some(def) = passthrough_for(entry.wire) else {
            diagnostics.report_wire_split_limit(span, name, entry.wire, MAX_WIRE_SPLITS);
            return None;
        };
        let block = builder.place_block(def);
        let input = WireEnd::new(block, def.input_of(entry.wire).expect("passthrough input"));
        let output = WireEnd::new(block, def.output_of(entry.wire).expect("passthrough output"));
        builder.connect(source, input);
        entry.source = Some(output);
        entry.reads = 1;
        Some(output)
    }
}

/// Explicit cache validity, so invalidation is a visible transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Valid,
    Invalid,
}

/// Reuses one break-vector / break-rotation block across component
/// reads. Each axis output has its own split budget; exhausting any axis
/// invalidates the whole cache, as does supplying a new source block.
pub struct BreakBlockCache {
    state: CacheState,
    block: BlockId,
    def: &'static BlockDef,
    axis_reads: [usize; 3],
}

impl BreakBlockCache {
    /// Starts invalid; the first component read forces a supply.
    pub fn new(wire: WireType) -> BreakBlockCache {
        let def = break_block_for(wire)
            .unwrap_or_else(|| panic!("no decompose block for {wire} wires"));
        BreakBlockCache {
            state: CacheState::Invalid,
            block: 0,
            def,
            axis_reads: [0; 3],
        }
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    /// Replaces the cached block and resets every axis budget.
    pub fn supply(&mut self, block: BlockId) {
        self.state = CacheState::Valid;
        self.block = block;
        self.axis_reads = [0; 3];
    }

    pub fn def(&self) -> &'static BlockDef {
        self.def
    }

    /// One component read. `None` means the cache is (now) invalid and
    /// the caller must place a fresh decompose block and supply it.
    pub fn read(&mut self, axis: Axis) -> Option<WireEnd> {
        if self.state == CacheState::Invalid {
            return None;
        }
        let count = &mut self.axis_reads[axis.index()];
        if *count >= MAX_WIRE_SPLITS {
            self.state = CacheState::Invalid;
            return None;
        }
        *count += 1;
        Some(WireEnd::new(self.block, self.def.terminal(axis.name())))
    }
}
