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

//! Transactional structural edits
//!
//! A pass queues [`Edit`]s on a [`Transaction`] bound to one method and applies
//! them with [`Transaction::commit`]. An edit always targets the parent of its
//! `existing` node. Commits are atomic: when any edit fails, every change made
//! by the transaction is rolled back before the error is returned.

mod slots;

use crate::ir::{IrError, IrResult, NodeId, NodeKind, NodeTag, Tree};
use slots::{SlotEdit, SlotOp};
use std::fmt;
use tracing::trace;

/// Kind of structural edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    Remove,
    Replace,
    InsertBefore,
    InsertAfter,
}

impl EditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remove => "remove",
            Self::Replace => "replace",
            Self::InsertBefore => "insert-before",
            Self::InsertAfter => "insert-after",
        }
    }
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structural edit, applied to the parent of `existing`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Remove { existing: NodeId },
    Replace { existing: NodeId, new: NodeId },
    InsertBefore { existing: NodeId, new: NodeId },
    InsertAfter { existing: NodeId, new: NodeId },
}

impl Edit {
    pub fn kind(&self) -> EditKind {
        match self {
            Edit::Remove { .. } => EditKind::Remove,
            Edit::Replace { .. } => EditKind::Replace,
            Edit::InsertBefore { .. } => EditKind::InsertBefore,
            Edit::InsertAfter { .. } => EditKind::InsertAfter,
        }
    }

    pub fn existing(&self) -> NodeId {
        match *self {
            Edit::Remove { existing } | Edit::Replace { existing, .. } | Edit::InsertBefore { existing, .. } | Edit::InsertAfter { existing, .. } => existing,
        }
    }

    /// Node attached by the edit
    pub fn new_node(&self) -> Option<NodeId> {
        match *self {
            Edit::Remove { .. } => None,
            Edit::Replace { new, .. } | Edit::InsertBefore { new, .. } | Edit::InsertAfter { new, .. } => Some(new),
        }
    }

    /// Node detached by the edit
    pub fn detached(&self) -> Option<NodeId> {
        match *self {
            Edit::Remove { existing } | Edit::Replace { existing, .. } => Some(existing),
            Edit::InsertBefore { .. } | Edit::InsertAfter { .. } => None,
        }
    }

    fn slot_op(&self) -> SlotOp {
        match *self {
            Edit::Remove { .. } => SlotOp::Remove,
            Edit::Replace { new, .. } => SlotOp::Replace(new),
            Edit::InsertBefore { new, .. } => SlotOp::InsertBefore(new),
            Edit::InsertAfter { new, .. } => SlotOp::InsertAfter(new),
        }
    }
}

/// Undo record of a commit in progress
enum JournalEntry {
    Kind { node: NodeId, previous: NodeKind },
    Parent { node: NodeId, previous: Option<NodeId> },
}

/// Edits of one method, applied together
#[derive(Debug, Clone)]
pub struct Transaction {
    method: NodeId,
    edits: Vec<Edit>,
}

impl Transaction {
    pub fn new(method: NodeId) -> Self {
        Self { method, edits: Vec::new() }
    }

    pub fn method(&self) -> NodeId {
        self.method
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn remove(&mut self, existing: NodeId) -> &mut Self {
        self.edits.push(Edit::Remove { existing });
        self
    }

    pub fn replace(&mut self, existing: NodeId, new: NodeId) -> &mut Self {
        self.edits.push(Edit::Replace { existing, new });
        self
    }

    pub fn insert_before(&mut self, existing: NodeId, new: NodeId) -> &mut Self {
        self.edits.push(Edit::InsertBefore { existing, new });
        self
    }

    pub fn insert_after(&mut self, existing: NodeId, new: NodeId) -> &mut Self {
        self.edits.push(Edit::InsertAfter { existing, new });
        self
    }

    /// Delete a statement: removed from a list parent, otherwise replaced by a `Nop`
    pub fn delete_statement(&mut self, tree: &mut Tree, stmt: NodeId) -> &mut Self {
        let in_list = tree.parent(stmt).is_some_and(|parent| slots::in_list(tree.kind(parent), stmt));
        if in_list {
            self.remove(stmt)
        } else {
            let source = tree.source(stmt).clone();
            let nop = tree.add(NodeKind::Nop, source);
            self.replace(stmt, nop)
        }
    }

    /// Apply every queued edit in order.
    ///
    /// On success, parent links of attached subtrees are fixed up, their slot
    /// validity is checked, and dataflow markers of subtrees left detached are
    /// released. Returns the applied edits.
    pub fn commit(self, tree: &mut Tree) -> IrResult<Vec<Edit>> {
        let mut journal = Vec::new();
        for edit in &self.edits {
            if let Err(error) = apply(tree, edit, &mut journal) {
                trace!(method = %self.method, edits = self.edits.len(), %error, "rolling back transaction");
                rollback(tree, journal);
                return Err(error);
            }
        }

        for edit in &self.edits {
            if let Some(detached) = edit.detached() {
                // A detached node may have been re-attached by a later edit.
                if tree.parent(detached).is_none() {
                    release_detached(tree, detached);
                }
            }
        }
        Ok(self.edits)
    }
}

fn apply(tree: &mut Tree, edit: &Edit, journal: &mut Vec<JournalEntry>) -> IrResult<()> {
    let existing = edit.existing();
    tree.try_node(existing)?;
    if let Some(new) = edit.new_node() {
        tree.try_node(new)?;
    }
    let Some(parent) = tree.parent(existing) else {
        return Err(IrError::DetachedNode {
            node: existing,
            kind: tree.tag(existing),
            location: tree.source(existing).clone(),
        });
    };

    let previous = tree.kind(parent).clone();
    match slots::edit(tree.kind_mut(parent), existing, edit.slot_op()) {
        SlotEdit::Applied => journal.push(JournalEntry::Kind { node: parent, previous }),
        SlotEdit::Unsupported | SlotEdit::NotFound => {
            return Err(IrError::UnsupportedOperation {
                operation: edit.kind(),
                parent: tree.tag(parent),
                existing: tree.tag(existing),
                new: edit.new_node().map(|new| tree.tag(new)),
                location: tree.source(parent).clone(),
            });
        }
    }

    if let Some(detached) = edit.detached() {
        journal.push(JournalEntry::Parent {
            node: detached,
            previous: tree.parent(detached),
        });
        tree.set_parent(detached, None);
    }

    if let Some(new) = edit.new_node() {
        for (node, previous) in tree.fix_parents(new, Some(parent)) {
            journal.push(JournalEntry::Parent { node, previous });
        }
        let parent_tag = tree.tag(parent);
        if !tree.tag(new).check_validity(Some(parent_tag)) {
            return Err(tree.invalid_parent(new, parent_tag));
        }
    }
    Ok(())
}

fn rollback(tree: &mut Tree, journal: Vec<JournalEntry>) {
    for entry in journal.into_iter().rev() {
        match entry {
            JournalEntry::Kind { node, previous } => *tree.kind_mut(node) = previous,
            JournalEntry::Parent { node, previous } => {
                if let Some(current) = tree.parent(node) {
                    tree.mark_stale_links(current);
                }
                tree.set_parent(node, previous);
            }
        }
    }
}

/// Release markers of a detached subtree, keeping def-use symmetry.
///
/// Only nodes still parented inside the subtree are walked; children that were
/// moved into a new parent keep their markers.
fn release_detached(tree: &mut Tree, root: NodeId) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if tree.markers(node).use_defs.is_some() {
            tree.release_use(node);
        }
        if let Some(def) = tree.markers(node).definition {
            tree.kill_definition(def);
        }
        for child in tree.children(node) {
            if tree.parent(child) == Some(node) {
                stack.push(child);
            }
        }
    }
}

/// Check whether `node` may be deleted as a statement by [`Transaction::delete_statement`]
pub fn is_deletable_statement(tree: &Tree, node: NodeId) -> bool {
    tree.tag(node).is_statement() && tree.tag(node) != NodeTag::Case && tree.parent(node).is_some()
}
