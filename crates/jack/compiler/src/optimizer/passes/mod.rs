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

//! Optimization passes over the typed IR

pub mod constant_refiner;
pub mod def_use_simplifier;
pub mod expression_simplifier;
pub mod not_simplifier;
pub mod unused_definition_remover;
pub mod use_def_simplifier;

pub use constant_refiner::ConstantRefiner;
pub use def_use_simplifier::DefUseSimplifier;
pub use expression_simplifier::ExpressionSimplifier;
pub use not_simplifier::{MIN_OPERATOR_SAVINGS, NotSimplifier};
pub use unused_definition_remover::UnusedDefinitionRemover;
pub use use_def_simplifier::UseDefSimplifier;

use crate::ir::{AssignOperator, NodeId, NodeKind, Tree};

/// Operand and right-hand side of a plain `lhs = rhs` assignment
pub(crate) fn plain_assignment(tree: &Tree, writer: NodeId) -> Option<(NodeId, NodeId)> {
    match tree.kind(writer) {
        NodeKind::Assign {
            op: AssignOperator::Assign,
            lhs,
            rhs,
        } => Some((*lhs, *rhs)),
        _ => None,
    }
}

/// Expression statement consisting of exactly `writer`
pub(crate) fn assignment_statement(tree: &Tree, writer: NodeId) -> Option<NodeId> {
    let parent = tree.parent(writer)?;
    match tree.kind(parent) {
        NodeKind::ExpressionStatement { expr } if *expr == writer => Some(parent),
        _ => None,
    }
}

/// Record `rhs` as the value of the definition it was just moved into.
///
/// Only literals and bare variable references are recorded as values.
pub(crate) fn refresh_definition_value(tree: &mut Tree, rhs: NodeId) {
    let Some(writer) = tree.parent(rhs) else {
        return;
    };
    if plain_assignment(tree, writer).map(|(_, value)| value) != Some(rhs) {
        return;
    }
    if tree.literal(rhs).is_none() && tree.referenced_variable(rhs).is_none() {
        return;
    }
    if let Some(def) = tree.definition_of(writer) {
        tree.set_definition_value(def, Some(rhs));
    }
}

/// The variable reference is the target of an assignment, increment or decrement
pub(crate) fn is_write_target(tree: &Tree, reference: NodeId) -> bool {
    let Some(parent) = tree.parent(reference) else {
        return false;
    };
    match tree.kind(parent) {
        NodeKind::Assign { lhs, .. } => *lhs == reference,
        NodeKind::Prefix { op, operand, .. } => op.is_increment() && *operand == reference,
        NodeKind::Postfix { .. } => true,
        _ => false,
    }
}
