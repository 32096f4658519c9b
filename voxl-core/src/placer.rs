//! Spatial layout engine.
//!
//! The placer assigns every placed block a 3D position. It is a state
//! machine over two scope kinds, statement and expression, nested as a
//! stack: an expression scope needs an open statement scope, and can
//! never contain one. Misusing the stack is a compiler bug and panics.
//!
//! Two algorithms: the ground placer lays scopes out as layers fanning
//! left (expressions) and right (statements) of the main statement
//! column, packing parallel scopes into Y tracks; the tower placer
//! ignores nesting and stacks blocks into fixed-height columns.

use std::collections::BTreeMap;

use crate::blocks::{Block, BlockDef, BlockId, Vector3I};

/// X distance between adjacent layers. Wider than any block footprint so
/// layers can never collide.
pub const BLOCK_X_OFFSET: i32 = 3;

/// Z a child statement scope must keep from its parent scope's start.
const CHILD_STATEMENT_OFFSET: i32 = 2;

/// Column height limit for the tower placer.
const MAX_TOWER_HEIGHT: i32 = 8;

/// Pitch between tower columns, in X and Z.
const TOWER_PITCH: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacerKind {
    Ground,
    Tower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Statement,
    Expression,
}

pub struct CodePlacer {
    origin: Vector3I,
    blocks: Vec<Block>,
    highlighted: Vec<BlockId>,
    highlight: bool,
    strategy: Strategy,
}

enum Strategy {
    Ground(GroundState),
    Tower(TowerState),
}

impl CodePlacer {
    pub fn new(kind: PlacerKind, origin: Vector3I) -> CodePlacer {
        let strategy = match kind {
            PlacerKind::Ground => Strategy::Ground(GroundState::default()),
            PlacerKind::Tower => Strategy::Tower(TowerState::default()),
        };
        CodePlacer {
            origin,
            blocks: Vec::new(),
            highlighted: Vec::new(),
            highlight: false,
            strategy,
        }
    }

    pub fn enter_statement_block(&mut self) {
        match &mut self.strategy {
            Strategy::Ground(state) => state.enter(ScopeKind::Statement),
            Strategy::Tower(state) => state.enter(ScopeKind::Statement),
        }
    }

    pub fn exit_statement_block(&mut self) {
        let origin = self.origin;
        match &mut self.strategy {
            Strategy::Ground(state) => state.exit(ScopeKind::Statement, &mut self.blocks, origin),
            Strategy::Tower(state) => state.exit(ScopeKind::Statement, &mut self.blocks, origin),
        }
    }

    pub fn enter_expression_block(&mut self) {
        match &mut self.strategy {
            Strategy::Ground(state) => state.enter(ScopeKind::Expression),
            Strategy::Tower(state) => state.enter(ScopeKind::Expression),
        }
    }

    pub fn exit_expression_block(&mut self) {
        let origin = self.origin;
        match &mut self.strategy {
            Strategy::Ground(state) => state.exit(ScopeKind::Expression, &mut self.blocks, origin),
            Strategy::Tower(state) => state.exit(ScopeKind::Expression, &mut self.blocks, origin),
        }
    }

    /// While highlighting, placed blocks skip layout accounting entirely
    /// and keep position `(0, 0, 0)`.
    pub fn set_highlight(&mut self, highlight: bool) {
        self.highlight = highlight;
    }

    pub fn place_block(&mut self, def: &'static BlockDef) -> BlockId {
        let id = self.blocks.len();
        self.blocks.push(Block {
            id,
            def,
            position: Vector3I::ZERO,
        });
        if self.highlight {
            self.highlighted.push(id);
            return id;
        }
        match &mut self.strategy {
            Strategy::Ground(state) => state.place(def, id),
            Strategy::Tower(state) => state.place(def, id),
        }
        id
    }

    /// Consumes the placer after all scopes are closed, yielding the
    /// positioned blocks and the highlighted-block list.
    pub fn finish(self) -> (Vec<Block>, Vec<BlockId>) {
        let open = match &self.strategy {
            Strategy::Ground(state) => state.stack.len(),
            Strategy::Tower(state) => state.stack.len(),
        };
        assert!(open == 0, "placer finished with {open} unclosed scopes");
        (self.blocks, self.highlighted)
    }
}

// --- ground placer ---------------------------------------------------

/// One scope in the layout tree. Parent links are arena indices.
struct LayoutNode {
    parent: Option<usize>,
    kind: ScopeKind,
    /// Signed layer offset: statements extend right (+1), expressions
    /// left (-1) of their parent.
    layer_pos: i32,
    start_z: i32,
    current_z: i32,
    height: i32,
    /// `(block, z)` recorded at placement time; X and Y come later.
    blocks: Vec<(BlockId, i32)>,
    children: Vec<usize>,
}

#[derive(Default)]
struct GroundState {
    nodes: Vec<LayoutNode>,
    stack: Vec<usize>,
    /// Z cursor where the next top-level statement scope starts.
    next_z: i32,
}

impl GroundState {
    fn enter(&mut self, kind: ScopeKind) {
        let parent = self.stack.last().copied();
        match (kind, parent) {
            (ScopeKind::Expression, None) => {
                panic!("expression scope entered with no statement scope open")
            }
            (ScopeKind::Statement, Some(p)) if self.nodes[p].kind == ScopeKind::Expression => {
                panic!("statement scope entered inside an expression scope")
            }
            _ => {}
        }
        let (layer_pos, start_z) = match parent {
            None => (0, self.next_z),
            Some(p) => {
                let delta = match kind {
                    ScopeKind::Statement => 1,
                    ScopeKind::Expression => -1,
                };
                (self.nodes[p].layer_pos + delta, self.nodes[p].current_z)
            }
        };
        let index = self.nodes.len();
        self.nodes.push(LayoutNode {
            parent,
            kind,
            layer_pos,
            start_z,
            current_z: start_z,
            height: 0,
            blocks: Vec::new(),
            children: Vec::new(),
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(index);
        }
        self.stack.push(index);
    }

    fn exit(&mut self, kind: ScopeKind, blocks: &mut [Block], origin: Vector3I) {
        let top = self
            .stack
            .pop()
            .unwrap_or_else(|| panic!("scope exited with no scope open"));
        assert!(
            self.nodes[top].kind == kind,
            "scope kind mismatch on exit: expected {:?}, found {:?}",
            self.nodes[top].kind,
            kind
        );
        if self.stack.is_empty() {
            self.finalize(top, blocks, origin);
            self.nodes.clear();
        }
    }

    fn place(&mut self, def: &'static BlockDef, id: BlockId) {
        let top = *self
            .stack
            .last()
            .unwrap_or_else(|| panic!("block placed with no scope open"));
        let node = &mut self.nodes[top];
        node.blocks.push((id, node.current_z));
        node.current_z += def.size.z;
        node.height = node.height.max(def.size.y);
    }

    /// Lays out the whole closed subtree in one pass. Positions go into a
    /// side table first and are applied at the end, so no node is read
    /// while another is being written.
    fn finalize(&mut self, root: usize, blocks: &mut [Block], origin: Vector3I) {
        // Pass 1: Z shifts. A child statement scope starting too close to
        // its parent's start is pushed forward by the deficit, subtree
        // included.
        let mut z_shift = vec![0i32; self.nodes.len()];
        let mut order = Vec::new();
        let mut pending = vec![root];
        while let Some(index) = pending.pop() {
            order.push(index);
            let node = &self.nodes[index];
            if let Some(parent) = node.parent {
                z_shift[index] = z_shift[parent];
                if node.kind == ScopeKind::Statement
                    && self.nodes[parent].kind == ScopeKind::Statement
                {
                    let required = self.nodes[parent].start_z
                        + z_shift[parent]
                        + CHILD_STATEMENT_OFFSET;
                    let actual = node.start_z + z_shift[parent];
                    if actual < required {
                        z_shift[index] += required - actual;
                    }
                }
            }
            pending.extend(node.children.iter().copied());
        }

        // Pass 2: group by layer and pack each layer's scopes into
        // parallel Y tracks so Z-overlapping scopes never collide.
        let mut layers: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for &index in &order {
            if !self.nodes[index].blocks.is_empty() {
                layers.entry(self.nodes[index].layer_pos).or_default().push(index);
            }
        }

        let mut positions: Vec<(BlockId, Vector3I)> = Vec::new();
        let mut max_end = self.next_z;
        for (&layer_pos, members) in &layers {
            let mut sorted = members.clone();
            sorted.sort_by_key(|&index| {
                std::cmp::Reverse(self.nodes[index].start_z + z_shift[index])
            });

            // Greedy interval packing: reuse the first track whose
            // frontier already cleared the candidate's extent, else open
            // a new one.
            struct Track {
                frontier: i32,
                height: i32,
                members: Vec<usize>,
            }
            let mut tracks: Vec<Track> = Vec::new();
            for index in sorted {
                let start = self.nodes[index].start_z + z_shift[index];
                let end = self.nodes[index].current_z + z_shift[index];
                max_end = max_end.max(end);
                match tracks.iter_mut().find(|track| end <= track.frontier) {
                    Some(track) => {
                        track.frontier = start;
                        track.height = track.height.max(self.nodes[index].height);
                        track.members.push(index);
                    }
                    None => tracks.push(Track {
                        frontier: start,
                        height: self.nodes[index].height,
                        members: vec![index],
                    }),
                }
            }

            let mut track_y = 0;
            for track in &tracks {
                for &index in &track.members {
                    for &(block, z) in &self.nodes[index].blocks {
                        positions.push((
                            block,
                            Vector3I::new(
                                origin.x + BLOCK_X_OFFSET * layer_pos,
                                origin.y + track_y,
                                origin.z + z + z_shift[index],
                            ),
                        ));
                    }
                }
                track_y += track.height;
            }
        }

        for (block, position) in positions {
            blocks[block].position = position;
        }
        // Leave a one-unit gap before the next top-level scope.
        self.next_z = max_end + 1;
    }
}

// --- tower placer -----------------------------------------------------

#[derive(Default)]
struct TowerState {
    stack: Vec<ScopeKind>,
    /// Blocks of the current top-level scope, in placement order.
    scope_blocks: Vec<BlockId>,
    base_z: i32,
}

impl TowerState {
    fn enter(&mut self, kind: ScopeKind) {
        match (kind, self.stack.last()) {
            (ScopeKind::Expression, None) => {
                panic!("expression scope entered with no statement scope open")
            }
            (ScopeKind::Statement, Some(ScopeKind::Expression)) => {
                panic!("statement scope entered inside an expression scope")
            }
            _ => {}
        }
        self.stack.push(kind);
    }

    fn exit(&mut self, kind: ScopeKind, blocks: &mut [Block], origin: Vector3I) {
        let top = self
            .stack
            .pop()
            .unwrap_or_else(|| panic!("scope exited with no scope open"));
        assert!(
            top == kind,
            "scope kind mismatch on exit: expected {top:?}, found {kind:?}"
        );
        if self.stack.is_empty() {
            self.finalize(blocks, origin);
        }
    }

    fn place(&mut self, _def: &'static BlockDef, id: BlockId) {
        assert!(!self.stack.is_empty(), "block placed with no scope open");
        self.scope_blocks.push(id);
    }

    /// Stacks the scope's blocks into columns capped at
    /// [`MAX_TOWER_HEIGHT`], then tiles the columns into a near-square
    /// grid `ceil(sqrt(columns))` wide.
    fn finalize(&mut self, blocks: &mut [Block], origin: Vector3I) {
        let mut columns: Vec<Vec<BlockId>> = Vec::new();
        let mut column_height = 0;
        for &id in &self.scope_blocks {
            let height = blocks[id].def.size.y;
            if columns.is_empty() || column_height + height > MAX_TOWER_HEIGHT {
                columns.push(Vec::new());
                column_height = 0;
            }
            columns.last_mut().expect("column exists").push(id);
            column_height += height;
        }
        self.scope_blocks.clear();
        if columns.is_empty() {
            return;
        }

        let width = (columns.len() as f64).sqrt().ceil() as usize;
        let rows = columns.len().div_ceil(width);
        for (column_index, column) in columns.iter().enumerate() {
            let x = origin.x + (column_index % width) as i32 * TOWER_PITCH;
            let z = origin.z + self.base_z + (column_index / width) as i32 * TOWER_PITCH;
            let mut y = origin.y;
            for &id in column {
                blocks[id].position = Vector3I::new(x, y, z);
                y += blocks[id].def.size.y;
            }
        }
        self.base_z += rows as i32 * TOWER_PITCH;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{ADD_NUMBERS, IF, NUMBER_VALUE, SET_NUMBER_VARIABLE, WIN};

    fn footprints_disjoint(blocks: &[Block]) -> bool {
        for (i, a) in blocks.iter().enumerate() {
            for b in &blocks[i + 1..] {
                let overlap = |a0: i32, alen: i32, b0: i32, blen: i32| {
                    a0 < b0 + blen && a0 + alen > b0
                };
                if overlap(a.position.x, a.def.size.x, b.position.x, b.def.size.x)
                    && overlap(a.position.y, a.def.size.y, b.position.y, b.def.size.y)
                    && overlap(a.position.z, a.def.size.z, b.position.z, b.def.size.z)
                {
                    return false;
                }
            }
        }
        true
    }

    #[test]
    fn ground_layout_keeps_footprints_disjoint() {
        let mut placer = CodePlacer::new(PlacerKind::Ground, Vector3I::ZERO);
        placer.enter_statement_block();
        for _ in 0..3 {
            placer.enter_expression_block();
            placer.place_block(&NUMBER_VALUE);
            placer.place_block(&ADD_NUMBERS);
            placer.exit_expression_block();
            placer.place_block(&SET_NUMBER_VARIABLE);
        }
        placer.place_block(&IF);
        placer.enter_statement_block();
        placer.place_block(&WIN);
        placer.exit_statement_block();
        placer.exit_statement_block();
        let (blocks, _) = placer.finish();
        assert!(footprints_disjoint(&blocks), "blocks overlap: {blocks:?}");
    }

    #[test]
    fn expression_blocks_sit_left_of_their_statement() {
        let mut placer = CodePlacer::new(PlacerKind::Ground, Vector3I::ZERO);
        placer.enter_statement_block();
        placer.enter_expression_block();
        let value = placer.place_block(&NUMBER_VALUE);
        placer.exit_expression_block();
        let set = placer.place_block(&SET_NUMBER_VARIABLE);
        placer.exit_statement_block();
        let (blocks, _) = placer.finish();
        assert_eq!(blocks[set].position.x, 0);
        assert_eq!(blocks[value].position.x, -BLOCK_X_OFFSET);
    }

    #[test]
    fn child_statement_layer_extends_right() {
        let mut placer = CodePlacer::new(PlacerKind::Ground, Vector3I::ZERO);
        placer.enter_statement_block();
        placer.place_block(&IF);
        placer.enter_statement_block();
        let body = placer.place_block(&WIN);
        placer.exit_statement_block();
        placer.exit_statement_block();
        let (blocks, _) = placer.finish();
        assert_eq!(blocks[body].position.x, BLOCK_X_OFFSET);
    }

    #[test]
    fn successive_top_level_scopes_advance_in_z() {
        let mut placer = CodePlacer::new(PlacerKind::Ground, Vector3I::ZERO);
        placer.enter_statement_block();
        let first = placer.place_block(&WIN);
        placer.exit_statement_block();
        placer.enter_statement_block();
        let second = placer.place_block(&WIN);
        placer.exit_statement_block();
        let (blocks, _) = placer.finish();
        assert!(blocks[second].position.z >= blocks[first].position.z + WIN.size.z);
    }

    #[test]
    fn parallel_expression_scopes_pack_into_tracks() {
        let mut placer = CodePlacer::new(PlacerKind::Ground, Vector3I::ZERO);
        placer.enter_statement_block();
        // Two expression scopes with overlapping Z extents must land on
        // different Y tracks.
        placer.enter_expression_block();
        let a = placer.place_block(&NUMBER_VALUE);
        placer.exit_expression_block();
        placer.enter_expression_block();
        let b = placer.place_block(&NUMBER_VALUE);
        placer.exit_expression_block();
        placer.place_block(&SET_NUMBER_VARIABLE);
        placer.exit_statement_block();
        let (blocks, _) = placer.finish();
        assert_eq!(blocks[a].position.x, blocks[b].position.x);
        assert_ne!(blocks[a].position.y, blocks[b].position.y);
        assert!(footprints_disjoint(&blocks));
    }

    #[test]
    fn origin_offsets_every_position() {
        let origin = Vector3I::new(10, 2, 20);
        let mut placer = CodePlacer::new(PlacerKind::Ground, origin);
        placer.enter_statement_block();
        let id = placer.place_block(&WIN);
        placer.exit_statement_block();
        let (blocks, _) = placer.finish();
        assert_eq!(blocks[id].position, origin);
    }

    #[test]
    fn highlighted_blocks_skip_layout() {
        let mut placer = CodePlacer::new(PlacerKind::Ground, Vector3I::new(5, 5, 5));
        placer.enter_statement_block();
        placer.set_highlight(true);
        let marked = placer.place_block(&WIN);
        placer.set_highlight(false);
        let normal = placer.place_block(&WIN);
        placer.exit_statement_block();
        let (blocks, highlighted) = placer.finish();
        assert_eq!(highlighted, vec![marked]);
        assert_eq!(blocks[marked].position, Vector3I::ZERO);
        assert_ne!(blocks[normal].position, Vector3I::ZERO);
    }

    #[test]
    #[should_panic(expected = "no statement scope open")]
    fn expression_scope_requires_statement_scope() {
        let mut placer = CodePlacer::new(PlacerKind::Ground, Vector3I::ZERO);
        placer.enter_expression_block();
    }

    #[test]
    #[should_panic(expected = "inside an expression scope")]
    fn statement_scope_cannot_nest_in_expression_scope() {
        let mut placer = CodePlacer::new(PlacerKind::Ground, Vector3I::ZERO);
        placer.enter_statement_block();
        placer.enter_expression_block();
        placer.enter_statement_block();
    }

    #[test]
    #[should_panic(expected = "scope kind mismatch")]
    fn exit_must_match_innermost_scope_kind() {
        let mut placer = CodePlacer::new(PlacerKind::Ground, Vector3I::ZERO);
        placer.enter_statement_block();
        placer.enter_expression_block();
        placer.exit_statement_block();
    }

    #[test]
    #[should_panic(expected = "no scope open")]
    fn placing_outside_any_scope_panics() {
        let mut placer = CodePlacer::new(PlacerKind::Ground, Vector3I::ZERO);
        placer.place_block(&WIN);
    }

    #[test]
    fn tower_tiles_columns_once_height_is_exceeded() {
        let mut placer = CodePlacer::new(PlacerKind::Tower, Vector3I::ZERO);
        placer.enter_statement_block();
        let ids: Vec<BlockId> = (0..20).map(|_| placer.place_block(&WIN)).collect();
        placer.exit_statement_block();
        let (blocks, _) = placer.finish();
        assert!(footprints_disjoint(&blocks));
        let distinct_columns: std::collections::BTreeSet<(i32, i32)> = ids
            .iter()
            .map(|&id| (blocks[id].position.x, blocks[id].position.z))
            .collect();
        assert!(distinct_columns.len() > 1, "expected more than one column");
    }

    #[test]
    fn tower_respects_scope_discipline_too() {
        let mut placer = CodePlacer::new(PlacerKind::Tower, Vector3I::ZERO);
        placer.enter_statement_block();
        placer.enter_expression_block();
        placer.place_block(&NUMBER_VALUE);
        placer.exit_expression_block();
        placer.exit_statement_block();
        let (blocks, _) = placer.finish();
        assert_eq!(blocks.len(), 1);
    }
}
