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

//! Errors raised by tree validation, mutation and lazy loading

use crate::ir::marker::DefId;
use crate::ir::node::{NodeId, NodeTag};
use crate::mutation::EditKind;
use jack_common::SourceInfo;
use thiserror::Error;

/// Fatal IR errors; each aborts the method or type being processed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrError {
    // Mutation protocol
    #[error("Unsupported {operation} on {parent} at {location}: existing {existing}, new {}", .new.map(NodeTag::name).unwrap_or("none"))]
    UnsupportedOperation {
        operation: EditKind,
        parent: NodeTag,
        existing: NodeTag,
        new: Option<NodeTag>,
        location: SourceInfo,
    },

    #[error("{kind} {node} is not attached to a parent at {location}")]
    DetachedNode { node: NodeId, kind: NodeTag, location: SourceInfo },

    // Tree shape
    #[error("{kind} {node} cannot be a child of {parent} at {location}")]
    InvalidParent {
        node: NodeId,
        kind: NodeTag,
        parent: NodeTag,
        location: SourceInfo,
    },

    #[error("{kind} {node} is held by {expected} but records parent {found:?} at {location}")]
    ParentMismatch {
        node: NodeId,
        kind: NodeTag,
        expected: NodeId,
        found: Option<NodeId>,
        location: SourceInfo,
    },

    #[error("{kind} {node} is missing its {slot} at {location}")]
    MissingChild {
        node: NodeId,
        kind: NodeTag,
        slot: &'static str,
        location: SourceInfo,
    },

    // Dataflow facts
    #[error("Definition {definition} and use {use_site} are not linked in both directions")]
    AsymmetricMarkers { definition: DefId, use_site: NodeId },

    // Lazy loading
    #[error("Loading members of {class} failed: {reason}")]
    LoadFailed { class: String, reason: String },

    #[error("Node {node} does not belong to this tree")]
    UnknownNode { node: NodeId },
}

impl IrError {
    /// Create a missing child error
    pub fn missing_child(node: NodeId, kind: NodeTag, slot: &'static str, location: SourceInfo) -> Self {
        Self::MissingChild { node, kind, slot, location }
    }

    /// Create a load failure
    pub fn load_failed(class: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            class: class.into(),
            reason: reason.into(),
        }
    }

    /// Source location of the offending node, when the error has one
    pub fn location(&self) -> Option<&SourceInfo> {
        match self {
            Self::UnsupportedOperation { location, .. }
            | Self::DetachedNode { location, .. }
            | Self::InvalidParent { location, .. }
            | Self::ParentMismatch { location, .. }
            | Self::MissingChild { location, .. } => Some(location),
            Self::AsymmetricMarkers { .. } | Self::LoadFailed { .. } | Self::UnknownNode { .. } => None,
        }
    }

    /// Check if a pass broke the mutation contract (as opposed to a malformed input tree)
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::UnsupportedOperation { .. } | Self::DetachedNode { .. } | Self::AsymmetricMarkers { .. })
    }
}

/// Result type alias for IR operations
pub type IrResult<T> = Result<T, IrError>;
