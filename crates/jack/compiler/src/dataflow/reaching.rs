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

//! Reaching definitions analysis
//!
//! Computes def-use facts for one method from its control flow graph and
//! attaches them to the tree as definition and use-defs markers. Upstream
//! front ends normally supply these facts; the analysis lets the optimizer
//! run on trees built without them.

use crate::dataflow::access::StatementAccesses;
use crate::dataflow::cfg::{BlockId, ControlFlowGraph};
use crate::ir::{AssignOperator, DefId, NodeId, NodeKind, Tree, VarId};
use std::collections::{BTreeSet, HashMap};
use tracing::trace;

/// Counts of facts attached by one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataflowSummary {
    pub definitions: usize,
    pub uses: usize,
}

/// Reaching definitions analyzer
pub struct ReachingDefinitions<'a> {
    cfg: &'a ControlFlowGraph,
    /// Statement accesses in block order
    accesses: Vec<Vec<StatementAccesses>>,
    entry_definitions: BTreeSet<DefId>,
    reaching_in: HashMap<BlockId, BTreeSet<DefId>>,
    reaching_out: HashMap<BlockId, BTreeSet<DefId>>,
}

impl<'a> ReachingDefinitions<'a> {
    /// Create a new analyzer over `cfg`
    pub fn new(cfg: &'a ControlFlowGraph) -> Self {
        Self {
            cfg,
            accesses: Vec::new(),
            entry_definitions: BTreeSet::new(),
            reaching_in: HashMap::new(),
            reaching_out: HashMap::new(),
        }
    }

    /// Analyze the method and attach fresh def-use facts to `tree`
    pub fn analyze(mut self, tree: &mut Tree) -> DataflowSummary {
        self.collect_accesses(tree);
        self.release_previous_facts(tree);
        let definitions = self.collect_definitions(tree);
        self.compute_reaching_definitions(tree);
        let uses = self.build_def_use_chains(tree);
        let unreachable = self.cfg.unreachable_blocks().len();
        trace!(method = %self.cfg.method, definitions, uses, unreachable, "computed reaching definitions");
        DataflowSummary { definitions, uses }
    }

    fn collect_accesses(&mut self, tree: &Tree) {
        self.accesses = self
            .cfg
            .blocks()
            .iter()
            .map(|block| block.statements.iter().map(|&stmt| StatementAccesses::collect(tree, stmt)).collect())
            .collect();
    }

    /// Retire facts left by an earlier run or by the front end
    fn release_previous_facts(&self, tree: &mut Tree) {
        for accesses in self.accesses.iter().flatten() {
            for read in &accesses.reads {
                tree.release_use(read.node);
            }
            for write in &accesses.writes {
                if let Some(def) = tree.definition_of(write.writer) {
                    tree.kill_definition(def);
                }
            }
        }
        let method = self.cfg.method;
        let stale: Vec<DefId> = tree
            .definitions()
            .filter(|(_, marker)| marker.entry && marker.live && marker.definition == method)
            .map(|(def, _)| def)
            .collect();
        for def in stale {
            tree.kill_definition(def);
        }
    }

    /// Create one definition per write plus entry definitions for parameters and `this`
    fn collect_definitions(&mut self, tree: &mut Tree) -> usize {
        let mut count = 0;
        for accesses in self.accesses.iter().flatten() {
            for write in &accesses.writes {
                let value = simple_value(tree, write.writer);
                tree.add_definition(write.writer, write.variable, value);
                count += 1;
            }
        }
        let method = self.cfg.method;
        let incoming: Vec<VarId> = match tree.kind(method) {
            NodeKind::Method { params, this_var, .. } => this_var.iter().chain(params.iter()).copied().collect(),
            _ => Vec::new(),
        };
        for variable in incoming {
            self.entry_definitions.insert(tree.add_entry_definition(method, variable));
            count += 1;
        }
        count
    }

    /// Compute reaching definitions using dataflow analysis
    fn compute_reaching_definitions(&mut self, tree: &Tree) {
        for block in self.cfg.blocks() {
            self.reaching_in.insert(block.id, BTreeSet::new());
            self.reaching_out.insert(block.id, BTreeSet::new());
        }
        self.reaching_out.insert(self.cfg.entry_block, self.entry_definitions.clone());

        let mut changed = true;
        while changed {
            changed = false;

            for block in self.cfg.blocks() {
                // Definitions in dead code reach nothing.
                if block.id == self.cfg.entry_block || !block.reachable {
                    continue;
                }
                let mut new_reaching_in = BTreeSet::new();
                for pred in &block.predecessors {
                    if let Some(pred_out) = self.reaching_out.get(pred) {
                        new_reaching_in.extend(pred_out.iter().copied());
                    }
                }

                let mut new_reaching_out = new_reaching_in.clone();
                for accesses in &self.accesses[block.id] {
                    transfer(tree, accesses, &mut new_reaching_out);
                }

                if self.reaching_in.get(&block.id) != Some(&new_reaching_in) {
                    self.reaching_in.insert(block.id, new_reaching_in);
                    changed = true;
                }
                if self.reaching_out.get(&block.id) != Some(&new_reaching_out) {
                    self.reaching_out.insert(block.id, new_reaching_out);
                    changed = true;
                }
            }
        }
    }

    /// Link every read to the definitions of its variable live at that point
    fn build_def_use_chains(&self, tree: &mut Tree) -> usize {
        let mut links = 0;
        for block in self.cfg.blocks() {
            let mut live = self.reaching_in.get(&block.id).cloned().unwrap_or_default();
            for accesses in &self.accesses[block.id] {
                for read in &accesses.reads {
                    let reaching: Vec<DefId> = live.iter().copied().filter(|def| tree.definition(*def).variable == read.variable).collect();
                    tree.markers_mut(read.node).use_defs.get_or_insert_with(Default::default);
                    for def in reaching {
                        tree.link_use(def, read.node);
                        links += 1;
                    }
                }
                transfer(tree, accesses, &mut live);
            }
        }
        links
    }
}

/// Kill earlier definitions of each written variable and generate the new ones
fn transfer(tree: &Tree, accesses: &StatementAccesses, live: &mut BTreeSet<DefId>) {
    for write in &accesses.writes {
        live.retain(|def| tree.definition(*def).variable != write.variable);
        if let Some(def) = tree.definition_of(write.writer) {
            live.insert(def);
        }
    }
}

/// Right-hand side of a plain assignment when it is a literal or a variable reference
fn simple_value(tree: &Tree, writer: NodeId) -> Option<NodeId> {
    match tree.kind(writer) {
        NodeKind::Assign {
            op: AssignOperator::Assign,
            rhs,
            ..
        } if tree.literal(*rhs).is_some() || tree.referenced_variable(*rhs).is_some() => Some(*rhs),
        _ => None,
    }
}

/// Build the graph of `method` and attach reaching definitions to it
pub fn compute_dataflow(tree: &mut Tree, method: NodeId) -> ControlFlowGraph {
    let cfg = ControlFlowGraph::from_method(tree, method);
    ReachingDefinitions::new(&cfg).analyze(tree);
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::cfg::CfgBuilder;
    use crate::ir::{BinaryOperator, JType, Modifiers};
    use jack_common::Registry;
    use std::sync::Arc;

    fn setup() -> (Tree, NodeId) {
        let mut tree = Tree::new(Arc::new(Registry::new()));
        let class = tree.class("Demo", Modifiers::PUBLIC);
        let method = tree.method(class, "run", JType::INT, Modifiers::PUBLIC);
        (tree, method)
    }

    #[test]
    fn test_straight_line_single_definition() {
        let (mut tree, method) = setup();
        let t = tree.local(method, "t", JType::INT);
        let five = tree.int(5);
        let def_stmt = tree.assign_stmt(t, five);
        let t_ref = tree.var_ref(t);
        let ret = tree.return_stmt(Some(t_ref));
        let body = tree.body(method).unwrap();
        tree.append(body, def_stmt).unwrap();
        tree.append(body, ret).unwrap();

        compute_dataflow(&mut tree, method);
        let assign = tree.children(def_stmt)[0];
        let def = tree.definition_of(assign).unwrap();
        assert_eq!(tree.definition(def).value, Some(five));
        assert_eq!(tree.use_defs(t_ref), Some(&BTreeSet::from([def])));
        tree.check_def_use_symmetry().unwrap();
    }

    #[test]
    fn test_loop_merges_definitions() {
        let (mut tree, method) = setup();
        let i = tree.local(method, "i", JType::INT);
        let zero = tree.int(0);
        let init = tree.assign_stmt(i, zero);
        let i_cond = tree.var_ref(i);
        let ten = tree.int(10);
        let cond = tree.binary(BinaryOperator::Lt, i_cond, ten);
        let i_rhs = tree.var_ref(i);
        let one = tree.int(1);
        let next = tree.binary(BinaryOperator::Add, i_rhs, one);
        let step = tree.assign_stmt(i, next);
        let loop_stmt = tree.while_stmt(cond, step);
        let body = tree.body(method).unwrap();
        tree.append(body, init).unwrap();
        tree.append(body, loop_stmt).unwrap();

        compute_dataflow(&mut tree, method);
        let init_def = tree.definition_of(tree.children(init)[0]).unwrap();
        let step_def = tree.definition_of(tree.children(step)[0]).unwrap();
        assert_eq!(tree.use_defs(i_cond), Some(&BTreeSet::from([init_def, step_def])));
        assert_eq!(tree.definition(step_def).value, None);
        tree.check_def_use_symmetry().unwrap();
    }

    #[test]
    fn test_parameters_get_entry_definitions() {
        let (mut tree, method) = setup();
        let x = tree.parameter(method, "x", JType::INT);
        let x_ref = tree.var_ref(x);
        let ret = tree.return_stmt(Some(x_ref));
        let body = tree.body(method).unwrap();
        tree.append(body, ret).unwrap();

        compute_dataflow(&mut tree, method);
        let defs = tree.use_defs(x_ref).unwrap();
        assert_eq!(defs.len(), 1);
        let def = *defs.iter().next().unwrap();
        assert!(tree.definition(def).entry);
        assert_eq!(tree.definition(def).definition, method);
    }

    #[test]
    fn test_dead_block_definitions_do_not_reach() {
        let (mut tree, method) = setup();
        let t = tree.local(method, "t", JType::INT);
        let one = tree.int(1);
        let live_stmt = tree.assign_stmt(t, one);
        let two = tree.int(2);
        let dead_stmt = tree.assign_stmt(t, two);
        let t_ref = tree.var_ref(t);
        let ret = tree.return_stmt(Some(t_ref));

        // entry -> live -> join <- dead, with nothing flowing into dead
        let mut builder = CfgBuilder::new(method);
        let live = builder.add_block(vec![live_stmt]);
        let dead = builder.add_block(vec![dead_stmt]);
        let join = builder.add_block(vec![ret]);
        builder.add_edge(CfgBuilder::ENTRY, live);
        builder.add_edge(live, join);
        builder.add_edge(dead, join);
        builder.add_edge(join, CfgBuilder::EXIT);
        let cfg = builder.build();
        assert_eq!(cfg.unreachable_blocks(), vec![dead]);

        ReachingDefinitions::new(&cfg).analyze(&mut tree);
        let live_def = tree.definition_of(tree.children(live_stmt)[0]).unwrap();
        assert_eq!(tree.use_defs(t_ref), Some(&BTreeSet::from([live_def])));
        tree.check_def_use_symmetry().unwrap();
    }

    #[test]
    fn test_rerun_replaces_previous_facts() {
        let (mut tree, method) = setup();
        let t = tree.local(method, "t", JType::INT);
        let five = tree.int(5);
        let def_stmt = tree.assign_stmt(t, five);
        let t_ref = tree.var_ref(t);
        let ret = tree.return_stmt(Some(t_ref));
        let body = tree.body(method).unwrap();
        tree.append(body, def_stmt).unwrap();
        tree.append(body, ret).unwrap();

        compute_dataflow(&mut tree, method);
        let first = tree.definition_of(tree.children(def_stmt)[0]).unwrap();
        compute_dataflow(&mut tree, method);
        let second = tree.definition_of(tree.children(def_stmt)[0]).unwrap();
        assert_ne!(first, second);
        assert!(!tree.definition(first).live);
        assert_eq!(tree.use_defs(t_ref), Some(&BTreeSet::from([second])));
        tree.check_def_use_symmetry().unwrap();
    }
}
