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

//! Dataflow facts attached to IR nodes
//!
//! A [`DefinitionMarker`] lives in the tree's definition table and is referenced
//! from the writing node by [`DefId`]. Use sites carry a [`UseDefsMarker`] with
//! the definitions that may reach them. The two directions are kept symmetric:
//! a use is in `definition.uses` exactly when the definition is in the use's
//! `definitions`.

use crate::ir::node::NodeId;
use crate::ir::variable::VarId;
use std::collections::BTreeSet;
use std::fmt;

/// Handle of a definition in the tree's definition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefId(pub(crate) u32);

impl DefId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// One definition of a variable
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionMarker {
    /// Writer node (assignment, increment or decrement)
    pub definition: NodeId,
    pub variable: VarId,
    /// Right-hand side when it is a literal or a bare variable reference
    pub value: Option<NodeId>,
    /// Variable references this definition reaches
    pub uses: BTreeSet<NodeId>,
    /// Cleared once the writer has been deleted
    pub live: bool,
    /// Value a parameter or `this` holds on method entry; `definition` is the method
    pub entry: bool,
}

impl DefinitionMarker {
    pub fn new(definition: NodeId, variable: VarId, value: Option<NodeId>) -> Self {
        Self {
            definition,
            variable,
            value,
            uses: BTreeSet::new(),
            live: true,
            entry: false,
        }
    }

    /// Definition of a parameter or `this` on entry to `method`
    pub fn at_entry(method: NodeId, variable: VarId) -> Self {
        Self {
            entry: true,
            ..Self::new(method, variable, None)
        }
    }

    pub fn is_unused(&self) -> bool {
        self.uses.is_empty()
    }
}

/// Definitions reaching a use site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UseDefsMarker {
    pub definitions: BTreeSet<DefId>,
}

impl UseDefsMarker {
    /// The only reaching definition, if there is exactly one
    pub fn single(&self) -> Option<DefId> {
        let mut iter = self.definitions.iter();
        match (iter.next(), iter.next()) {
            (Some(def), None) => Some(*def),
            _ => None,
        }
    }
}

/// Flags attached to methods by upstream passes and the optimizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    /// Every statement holds at most one definition with simple operands
    ThreeAddressForm,
    /// The optimizer pipeline has run on the method
    Simplified,
}

/// All markers of a node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerSet {
    pub definition: Option<DefId>,
    pub use_defs: Option<UseDefsMarker>,
    pub tags: BTreeSet<Tag>,
}

impl MarkerSet {
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn is_empty(&self) -> bool {
        self.definition.is_none() && self.use_defs.is_none() && self.tags.is_empty()
    }
}
