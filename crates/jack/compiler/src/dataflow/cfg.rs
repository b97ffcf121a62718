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

//! Control flow graph of a method
//!
//! Blocks hold the method's leaf statements (expression statements, returns,
//! throws) in execution order. A branching statement is the last entry of the
//! block that evaluates its condition, so every expression of the method is
//! owned by exactly one statement in the graph. Two synthetic empty blocks
//! mark method entry and exit.

use crate::ir::{NodeId, NodeKind, NodeTag, Tree};
use crate::mutation::Edit;
use jack_common::Symbol;
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Block identifier
pub type BlockId = usize;

/// Position of a statement: block and index within the block
pub type StatementPosition = (BlockId, usize);

/// Basic block in the control flow graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// Block identifier
    pub id: BlockId,
    /// Statements in execution order
    pub statements: Vec<NodeId>,
    /// Predecessor blocks
    pub predecessors: BTreeSet<BlockId>,
    /// Successor blocks
    pub successors: BTreeSet<BlockId>,
    /// Whether this block is reachable from the entry
    pub reachable: bool,
}

impl BasicBlock {
    fn new(id: BlockId) -> Self {
        Self {
            id,
            statements: Vec::new(),
            predecessors: BTreeSet::new(),
            successors: BTreeSet::new(),
            reachable: false,
        }
    }
}

/// Control Flow Graph representation
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    blocks: Vec<BasicBlock>,
    /// Synthetic empty entry block
    pub entry_block: BlockId,
    /// Synthetic empty exit block
    pub exit_block: BlockId,
    /// Method the graph describes
    pub method: NodeId,
    index: HashMap<NodeId, StatementPosition>,
}

impl ControlFlowGraph {
    /// Build the graph of a method from its structured body
    pub fn from_method(tree: &Tree, method: NodeId) -> Self {
        CfgBuilder::from_method(tree, method)
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id]
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Every statement of the graph, block by block
    pub fn statements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.blocks.iter().flat_map(|block| block.statements.iter().copied())
    }

    pub fn contains(&self, stmt: NodeId) -> bool {
        self.index.contains_key(&stmt)
    }

    pub fn position_of(&self, stmt: NodeId) -> Option<StatementPosition> {
        self.index.get(&stmt).copied()
    }

    pub fn block_of(&self, stmt: NodeId) -> Option<BlockId> {
        self.position_of(stmt).map(|(block, _)| block)
    }

    /// Mark reachable blocks starting from entry
    fn mark_reachable_blocks(&mut self) {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();

        queue.push_back(self.entry_block);
        visited.insert(self.entry_block);

        while let Some(block_id) = queue.pop_front() {
            let block = &mut self.blocks[block_id];
            block.reachable = true;

            for &successor_id in &block.successors {
                if visited.insert(successor_id) {
                    queue.push_back(successor_id);
                }
            }
        }
    }

    /// Get unreachable blocks
    pub fn unreachable_blocks(&self) -> Vec<BlockId> {
        self.blocks.iter().filter(|block| !block.reachable).map(|block| block.id).collect()
    }

    fn reindex_block(&mut self, block_id: BlockId) {
        for (offset, &stmt) in self.blocks[block_id].statements.iter().enumerate() {
            self.index.insert(stmt, (block_id, offset));
        }
    }

    /// Drop a statement from its block
    pub fn remove_statement(&mut self, stmt: NodeId) -> bool {
        let Some((block_id, offset)) = self.index.remove(&stmt) else {
            return false;
        };
        self.blocks[block_id].statements.remove(offset);
        self.reindex_block(block_id);
        true
    }

    /// Put `new` in the place of `old`
    pub fn replace_statement(&mut self, old: NodeId, new: NodeId) -> bool {
        let Some((block_id, offset)) = self.index.remove(&old) else {
            return false;
        };
        self.blocks[block_id].statements[offset] = new;
        self.index.insert(new, (block_id, offset));
        true
    }

    /// Insert `new` next to `existing` in the same block
    pub fn insert_statement(&mut self, existing: NodeId, new: NodeId, after: bool) -> bool {
        let Some((block_id, offset)) = self.position_of(existing) else {
            return false;
        };
        let offset = if after { offset + 1 } else { offset };
        self.blocks[block_id].statements.insert(offset, new);
        self.reindex_block(block_id);
        true
    }

    /// Apply the statement-level effect of committed edits
    pub fn sync_edits(&mut self, tree: &Tree, edits: &[Edit]) {
        for edit in edits {
            match *edit {
                Edit::Remove { existing } => self.forget_subtree(tree, existing),
                Edit::Replace { existing, new } => {
                    if tree.tag(new) == NodeTag::Nop || !tree.tag(new).is_statement() {
                        self.forget_subtree(tree, existing);
                    } else if !self.replace_statement(existing, new) {
                        self.forget_subtree(tree, existing);
                    }
                }
                Edit::InsertBefore { existing, new } if tree.tag(new).is_statement() => {
                    self.insert_statement(existing, new, false);
                }
                Edit::InsertAfter { existing, new } if tree.tag(new).is_statement() => {
                    self.insert_statement(existing, new, true);
                }
                Edit::InsertBefore { .. } | Edit::InsertAfter { .. } => {}
            }
        }
    }

    /// Drop every graph statement in a detached subtree
    fn forget_subtree(&mut self, tree: &Tree, root: NodeId) {
        if !tree.tag(root).is_statement() {
            return;
        }
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            self.remove_statement(node);
            stack.extend(tree.children(node).into_iter().filter(|child| tree.tag(*child).is_statement()));
        }
    }
}

/// Break or continue destination of an enclosing statement
#[derive(Debug, Clone, Copy)]
struct JumpTarget {
    label: Option<Symbol>,
    break_to: BlockId,
    continue_to: Option<BlockId>,
    /// Target of an unlabeled `break` (loops and switches)
    unlabeled: bool,
}

/// Incremental construction of a [`ControlFlowGraph`]
#[derive(Debug)]
pub struct CfgBuilder {
    blocks: Vec<BasicBlock>,
    method: NodeId,
    current: Option<BlockId>,
    targets: Vec<JumpTarget>,
    pending_label: Option<Symbol>,
}

impl CfgBuilder {
    pub const ENTRY: BlockId = 0;
    pub const EXIT: BlockId = 1;

    /// Start a graph holding only the entry and exit blocks
    pub fn new(method: NodeId) -> Self {
        Self {
            blocks: vec![BasicBlock::new(Self::ENTRY), BasicBlock::new(Self::EXIT)],
            method,
            current: None,
            targets: Vec::new(),
            pending_label: None,
        }
    }

    /// Add a block holding `statements`
    pub fn add_block(&mut self, statements: Vec<NodeId>) -> BlockId {
        let id = self.blocks.len();
        let mut block = BasicBlock::new(id);
        block.statements = statements;
        self.blocks.push(block);
        id
    }

    pub fn add_edge(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from].successors.insert(to);
        self.blocks[to].predecessors.insert(from);
    }

    pub fn build(self) -> ControlFlowGraph {
        let mut cfg = ControlFlowGraph {
            blocks: self.blocks,
            entry_block: Self::ENTRY,
            exit_block: Self::EXIT,
            method: self.method,
            index: HashMap::new(),
        };
        for block_id in 0..cfg.blocks.len() {
            cfg.reindex_block(block_id);
        }
        cfg.mark_reachable_blocks();
        cfg
    }

    /// Graph of a single straight-line block
    pub fn linear(method: NodeId, statements: Vec<NodeId>) -> ControlFlowGraph {
        let mut builder = Self::new(method);
        let block = builder.add_block(statements);
        builder.add_edge(Self::ENTRY, block);
        builder.add_edge(block, Self::EXIT);
        builder.build()
    }

    /// Graph of a method built from its structured statements
    pub fn from_method(tree: &Tree, method: NodeId) -> ControlFlowGraph {
        let mut builder = Self::new(method);
        let first = builder.add_block(Vec::new());
        builder.add_edge(Self::ENTRY, first);
        builder.current = Some(first);
        if let Some(body) = tree.body(method) {
            builder.statement(tree, body);
        }
        builder.jump(Self::EXIT);
        builder.build()
    }

    fn start_block(&mut self) -> BlockId {
        let block = self.add_block(Vec::new());
        if let Some(current) = self.current {
            self.add_edge(current, block);
        }
        self.current = Some(block);
        block
    }

    /// Append a statement, opening an unreachable block after a jump
    fn emit(&mut self, stmt: NodeId) -> BlockId {
        let block = match self.current {
            Some(block) => block,
            None => {
                let block = self.add_block(Vec::new());
                self.current = Some(block);
                block
            }
        };
        self.blocks[block].statements.push(stmt);
        block
    }

    fn jump(&mut self, to: BlockId) {
        if let Some(current) = self.current.take() {
            self.add_edge(current, to);
        }
    }

    fn statement(&mut self, tree: &Tree, stmt: NodeId) {
        match tree.kind(stmt) {
            NodeKind::Block { statements } => {
                for &inner in statements {
                    self.statement(tree, inner);
                }
            }
            NodeKind::ExpressionStatement { .. } => {
                self.emit(stmt);
            }
            NodeKind::Return { .. } | NodeKind::Throw { .. } => {
                self.emit(stmt);
                self.jump(Self::EXIT);
            }
            NodeKind::If {
                then_stmt, else_stmt, ..
            } => {
                let condition = self.emit(stmt);
                let join = self.add_block(Vec::new());

                self.current = Some(condition);
                self.start_block();
                self.statement(tree, *then_stmt);
                self.jump(join);

                self.current = Some(condition);
                match else_stmt {
                    Some(else_stmt) => {
                        self.start_block();
                        self.statement(tree, *else_stmt);
                        self.jump(join);
                    }
                    None => self.jump(join),
                }
                self.current = Some(join);
            }
            NodeKind::While { body, .. } => {
                let label = self.pending_label.take();
                let header = self.start_block();
                self.emit(stmt);
                let after = self.add_block(Vec::new());
                self.add_edge(header, after);
                self.loop_body(tree, *body, label, header, after);
                self.jump(header);
                self.current = Some(after);
            }
            NodeKind::DoWhile { body, .. } => {
                let label = self.pending_label.take();
                let entry = self.start_block();
                let condition = self.add_block(Vec::new());
                let after = self.add_block(Vec::new());
                self.targets.push(JumpTarget {
                    label,
                    break_to: after,
                    continue_to: Some(condition),
                    unlabeled: true,
                });
                self.statement(tree, *body);
                self.targets.pop();
                self.jump(condition);
                self.blocks[condition].statements.push(stmt);
                self.add_edge(condition, entry);
                self.add_edge(condition, after);
                self.current = Some(after);
            }
            NodeKind::For {
                initializers,
                condition,
                increments,
                body,
            } => {
                let label = self.pending_label.take();
                for &init in initializers {
                    self.statement(tree, init);
                }
                let header = self.start_block();
                if condition.is_some() {
                    self.emit(stmt);
                }
                let after = self.add_block(Vec::new());
                if condition.is_some() {
                    self.add_edge(header, after);
                }
                let step = self.add_block(Vec::new());
                self.targets.push(JumpTarget {
                    label,
                    break_to: after,
                    continue_to: Some(step),
                    unlabeled: true,
                });
                self.start_block();
                self.statement(tree, *body);
                self.targets.pop();
                self.jump(step);
                self.current = Some(step);
                for &increment in increments {
                    self.statement(tree, increment);
                }
                self.jump(header);
                self.current = Some(after);
            }
            NodeKind::Labeled { label, body } => {
                if matches!(tree.tag(*body), NodeTag::While | NodeTag::DoWhile | NodeTag::For) {
                    self.pending_label = Some(*label);
                    self.statement(tree, *body);
                } else {
                    let after = self.add_block(Vec::new());
                    self.targets.push(JumpTarget {
                        label: Some(*label),
                        break_to: after,
                        continue_to: None,
                        unlabeled: false,
                    });
                    self.statement(tree, *body);
                    self.targets.pop();
                    self.jump(after);
                    self.current = Some(after);
                }
            }
            NodeKind::Break { label } => {
                if let Some(target) = self.find_target(*label, false) {
                    self.jump(target.break_to);
                }
                self.current = None;
            }
            NodeKind::Continue { label } => {
                if let Some(to) = self.find_target(*label, true).and_then(|target| target.continue_to) {
                    self.jump(to);
                }
                self.current = None;
            }
            NodeKind::Switch { body, .. } => {
                let selector = self.emit(stmt);
                let after = self.add_block(Vec::new());
                self.targets.push(JumpTarget {
                    label: None,
                    break_to: after,
                    continue_to: None,
                    unlabeled: true,
                });
                self.current = None;
                let mut has_default = false;
                let statements = match tree.kind(*body) {
                    NodeKind::Block { statements } => statements.clone(),
                    _ => Vec::new(),
                };
                for inner in statements {
                    if let NodeKind::Case { value } = tree.kind(inner) {
                        has_default |= value.is_none();
                        let case = self.start_block();
                        self.add_edge(selector, case);
                    } else {
                        self.statement(tree, inner);
                    }
                }
                if !has_default {
                    self.add_edge(selector, after);
                }
                self.targets.pop();
                self.jump(after);
                self.current = Some(after);
            }
            NodeKind::Try { body, catches, finally } => {
                let first_block = self.blocks.len();
                let entry = self.start_block();
                self.statement(tree, *body);
                let last_block = self.blocks.len();
                let join = self.add_block(Vec::new());
                self.jump(join);

                // Any statement of the protected region may transfer to a handler.
                for &catch in catches {
                    let handler = self.add_block(Vec::new());
                    self.add_edge(entry, handler);
                    for block in first_block..last_block {
                        self.add_edge(block, handler);
                    }
                    self.current = Some(handler);
                    if let NodeKind::Catch { body, .. } = tree.kind(catch) {
                        self.statement(tree, *body);
                    }
                    self.jump(join);
                }
                self.current = Some(join);
                if let Some(finally) = finally {
                    self.statement(tree, *finally);
                }
            }
            NodeKind::Synchronized { body, .. } => {
                self.emit(stmt);
                self.statement(tree, *body);
            }
            _ => {}
        }
    }

    fn loop_body(&mut self, tree: &Tree, body: NodeId, label: Option<Symbol>, header: BlockId, after: BlockId) {
        self.targets.push(JumpTarget {
            label,
            break_to: after,
            continue_to: Some(header),
            unlabeled: true,
        });
        self.current = Some(header);
        self.start_block();
        self.statement(tree, body);
        self.targets.pop();
    }

    fn find_target(&self, label: Option<Symbol>, is_continue: bool) -> Option<JumpTarget> {
        self.targets
            .iter()
            .rev()
            .find(|target| match label {
                Some(label) => target.label == Some(label),
                None if is_continue => target.continue_to.is_some(),
                None => target.unlabeled,
            })
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOperator, JType, Modifiers};
    use jack_common::Registry;
    use std::sync::Arc;

    #[test]
    fn test_linear_graph() {
        let mut tree = Tree::new(Arc::new(Registry::new()));
        let class = tree.class("Demo", Modifiers::PUBLIC);
        let method = tree.method(class, "run", JType::VOID, Modifiers::STATIC);
        let a = tree.nop();
        let b = tree.nop();
        let cfg = CfgBuilder::linear(method, vec![a, b]);

        assert_eq!(cfg.position_of(b), Some((2, 1)));
        assert!(cfg.unreachable_blocks().is_empty());
    }

    #[test]
    fn test_if_else_diamond() {
        let mut tree = Tree::new(Arc::new(Registry::new()));
        let class = tree.class("Demo", Modifiers::PUBLIC);
        let method = tree.method(class, "run", JType::INT, Modifiers::STATIC);
        let x = tree.parameter(method, "x", JType::INT);
        let t = tree.local(method, "t", JType::INT);

        let x_ref = tree.var_ref(x);
        let zero = tree.int(0);
        let cond = tree.binary(BinaryOperator::Gt, x_ref, zero);
        let one = tree.int(1);
        let then_stmt = tree.assign_stmt(t, one);
        let two = tree.int(2);
        let else_stmt = tree.assign_stmt(t, two);
        let branch = tree.if_stmt(cond, then_stmt, Some(else_stmt));
        let t_ref = tree.var_ref(t);
        let ret = tree.return_stmt(Some(t_ref));
        let body = tree.body(method).unwrap();
        tree.append(body, branch).unwrap();
        tree.append(body, ret).unwrap();

        let cfg = ControlFlowGraph::from_method(&tree, method);
        let branch_block = cfg.block_of(branch).unwrap();
        let then_block = cfg.block_of(then_stmt).unwrap();
        let else_block = cfg.block_of(else_stmt).unwrap();
        let join = cfg.block_of(ret).unwrap();

        assert_eq!(cfg.block(branch_block).successors, BTreeSet::from([then_block, else_block]));
        assert_eq!(cfg.block(join).predecessors, BTreeSet::from([then_block, else_block]));
        assert!(cfg.block(join).successors.contains(&cfg.exit_block));
    }

    #[test]
    fn test_while_loop_back_edge() {
        let mut tree = Tree::new(Arc::new(Registry::new()));
        let class = tree.class("Demo", Modifiers::PUBLIC);
        let method = tree.method(class, "run", JType::VOID, Modifiers::STATIC);
        let cond = tree.boolean(true);
        let inner = tree.call(None, "Demo", "tick", Vec::new(), JType::VOID);
        let inner = tree.expr_stmt(inner);
        let brk = tree.break_stmt();
        let loop_body = tree.block(vec![inner, brk]);
        let looping = tree.while_stmt(cond, loop_body);
        let body = tree.body(method).unwrap();
        tree.append(body, looping).unwrap();

        let cfg = ControlFlowGraph::from_method(&tree, method);
        let header = cfg.block_of(looping).unwrap();
        let inner_block = cfg.block_of(inner).unwrap();
        assert!(cfg.block(header).successors.contains(&inner_block));
        // The break leaves the loop without a back edge from the body.
        assert!(!cfg.block(inner_block).successors.contains(&header));
    }

    #[test]
    fn test_sync_edits_tracks_statements() {
        let mut tree = Tree::new(Arc::new(Registry::new()));
        let class = tree.class("Demo", Modifiers::PUBLIC);
        let method = tree.method(class, "run", JType::VOID, Modifiers::STATIC);
        let a = tree.nop();
        let b = tree.return_stmt(None);
        let c = tree.return_stmt(None);
        let d = tree.return_stmt(None);
        let mut cfg = CfgBuilder::linear(method, vec![a, b]);

        cfg.sync_edits(&tree, &[Edit::InsertAfter { existing: a, new: c }, Edit::Remove { existing: a }, Edit::Replace { existing: b, new: d }]);
        assert_eq!(cfg.block(2).statements, vec![c, d]);
        assert_eq!(cfg.position_of(d), Some((2, 1)));
        assert!(!cfg.contains(a));
        assert!(!cfg.contains(b));
    }
}
