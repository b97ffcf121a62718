// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Backward reaching-definition queries over the control flow graph
//!
//! The queries read the definition markers attached to writers. A write that
//! carries no marker makes the answer unknown (`None`), and callers treat an
//! unknown answer as "do not transform".

use crate::dataflow::access::StatementAccesses;
use crate::dataflow::cfg::{BlockId, ControlFlowGraph, StatementPosition};
use crate::ir::{DefId, NodeId, Tree, VarId};
use std::collections::{BTreeSet, HashSet};

/// Definitions of one variable reaching a program point
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReachingSet {
    pub definitions: BTreeSet<DefId>,
    /// The value held on method entry reaches the point along some path
    pub from_entry: bool,
}

impl ReachingSet {
    fn single(def: DefId) -> Self {
        Self {
            definitions: BTreeSet::from([def]),
            from_entry: false,
        }
    }
}

/// Graph statement owning `node`: the nearest ancestor present in the graph
pub fn statement_of(tree: &Tree, cfg: &ControlFlowGraph, node: NodeId) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(id) = current {
        if cfg.contains(id) {
            return Some(id);
        }
        current = tree.parent(id);
    }
    None
}

/// Definition made by the last write of `variable` in `stmt`.
///
/// `Some(None)` means the statement does not write the variable; `None` means
/// it does but the write carries no definition marker.
fn last_definition(tree: &Tree, stmt: NodeId, variable: VarId) -> Option<Option<DefId>> {
    match StatementAccesses::collect(tree, stmt).last_write(variable) {
        Some(write) => tree.definition_of(write.writer).map(Some),
        None => Some(None),
    }
}

/// Definitions of `variable` reaching the point just before the statement at `position`
pub fn reaching_definitions_before(tree: &Tree, cfg: &ControlFlowGraph, variable: VarId, position: StatementPosition) -> Option<ReachingSet> {
    let (block, offset) = position;
    for &stmt in cfg.block(block).statements[..offset].iter().rev() {
        if let Some(def) = last_definition(tree, stmt, variable)? {
            return Some(ReachingSet::single(def));
        }
    }
    reaching_definitions_at_entry(tree, cfg, variable, block)
}

/// Definitions of `variable` reaching the start of `block`
pub fn reaching_definitions_at_entry(tree: &Tree, cfg: &ControlFlowGraph, variable: VarId, block: BlockId) -> Option<ReachingSet> {
    let mut result = ReachingSet::default();
    let mut visited = HashSet::new();
    let mut worklist: Vec<BlockId> = cfg.block(block).predecessors.iter().copied().collect();

    while let Some(current) = worklist.pop() {
        if !visited.insert(current) {
            continue;
        }
        match last_definition_in_block(tree, cfg, current, variable)? {
            Some(def) => {
                result.definitions.insert(def);
            }
            None if current == cfg.entry_block => result.from_entry = true,
            None => worklist.extend(cfg.block(current).predecessors.iter().copied()),
        }
    }
    Some(result)
}

fn last_definition_in_block(tree: &Tree, cfg: &ControlFlowGraph, block: BlockId, variable: VarId) -> Option<Option<DefId>> {
    for &stmt in cfg.block(block).statements.iter().rev() {
        if let Some(def) = last_definition(tree, stmt, variable)? {
            return Some(Some(def));
        }
    }
    Some(None)
}

/// Check whether any statement of `block` in `range` writes `variable`
pub fn writes_in_range(tree: &Tree, cfg: &ControlFlowGraph, variable: VarId, block: BlockId, range: std::ops::Range<usize>) -> bool {
    cfg.block(block).statements[range].iter().any(|&stmt| StatementAccesses::collect(tree, stmt).writes(variable))
}
