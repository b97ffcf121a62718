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

//! Editing of def-use facts
//!
//! Every operation updates both directions of a def-use edge so the symmetry
//! between [`DefinitionMarker::uses`](crate::ir::DefinitionMarker::uses) and
//! [`UseDefsMarker::definitions`](crate::ir::UseDefsMarker::definitions) holds
//! after each call.

use crate::ir::{DefId, DefinitionMarker, IrError, IrResult, NodeId, Tree, UseDefsMarker, VarId};
use std::collections::BTreeSet;

impl Tree {
    /// Record that `writer` defines `variable`; `value` is its simple right-hand side
    pub fn add_definition(&mut self, writer: NodeId, variable: VarId, value: Option<NodeId>) -> DefId {
        let id = DefId(self.definitions.len() as u32);
        self.definitions.push(DefinitionMarker::new(writer, variable, value));
        self.markers_mut(writer).definition = Some(id);
        id
    }

    /// Record the value `variable` holds when `method` is entered
    pub fn add_entry_definition(&mut self, method: NodeId, variable: VarId) -> DefId {
        let id = DefId(self.definitions.len() as u32);
        self.definitions.push(DefinitionMarker::at_entry(method, variable));
        id
    }

    /// Definition recorded on a writer node
    pub fn definition_of(&self, writer: NodeId) -> Option<DefId> {
        self.markers(writer).definition
    }

    /// Definitions reaching a use site, if facts were attached to it
    pub fn use_defs(&self, use_site: NodeId) -> Option<&BTreeSet<DefId>> {
        self.markers(use_site).use_defs.as_ref().map(|marker| &marker.definitions)
    }

    pub fn uses_of(&self, def: DefId) -> &BTreeSet<NodeId> {
        &self.definition(def).uses
    }

    /// Add the edge `def -> use_site`
    pub fn link_use(&mut self, def: DefId, use_site: NodeId) {
        self.definitions[def.index()].uses.insert(use_site);
        self.markers_mut(use_site).use_defs.get_or_insert_with(UseDefsMarker::default).definitions.insert(def);
    }

    /// Drop the edge `def -> use_site`
    pub fn unlink_use(&mut self, def: DefId, use_site: NodeId) {
        self.definitions[def.index()].uses.remove(&use_site);
        if let Some(marker) = self.markers_mut(use_site).use_defs.as_mut() {
            marker.definitions.remove(&def);
        }
    }

    /// Detach a use site from every definition reaching it
    pub fn release_use(&mut self, use_site: NodeId) {
        let Some(marker) = self.markers_mut(use_site).use_defs.take() else {
            return;
        };
        for def in marker.definitions {
            self.definitions[def.index()].uses.remove(&use_site);
        }
    }

    /// Retire a definition whose writer is being deleted
    pub fn kill_definition(&mut self, def: DefId) {
        let marker = &mut self.definitions[def.index()];
        let uses = std::mem::take(&mut marker.uses);
        let writer = marker.definition;
        marker.live = false;
        for use_site in uses {
            if let Some(use_defs) = self.markers_mut(use_site).use_defs.as_mut() {
                use_defs.definitions.remove(&def);
            }
        }
        if self.markers(writer).definition == Some(def) {
            self.markers_mut(writer).definition = None;
        }
    }

    /// Make `def` define `variable` instead of its current variable
    pub fn retarget_definition(&mut self, def: DefId, variable: VarId) {
        self.definitions[def.index()].variable = variable;
    }

    pub fn set_definition_value(&mut self, def: DefId, value: Option<NodeId>) {
        self.definitions[def.index()].value = value;
    }

    /// Verify `use ∈ def.uses ⇔ def ∈ use.definitions` over the whole tree
    pub fn check_def_use_symmetry(&self) -> IrResult<()> {
        for (def, marker) in self.definitions() {
            for &use_site in &marker.uses {
                if !self.use_defs(use_site).is_some_and(|defs| defs.contains(&def)) {
                    return Err(IrError::AsymmetricMarkers { definition: def, use_site });
                }
            }
        }
        for index in 0..self.len() {
            let use_site = NodeId(index as u32);
            for &def in self.use_defs(use_site).into_iter().flatten() {
                if !self.definition(def).uses.contains(&use_site) {
                    return Err(IrError::AsymmetricMarkers { definition: def, use_site });
                }
            }
        }
        Ok(())
    }
}
