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

//! Child slot editing for every node kind
//!
//! Fixed slots support replace, and remove when the slot is optional. Lists
//! support every operation by identity lookup.

use crate::ir::{NodeId, NodeKind};

/// Edit applied to the slot holding `existing`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotOp {
    Remove,
    Replace(NodeId),
    InsertBefore(NodeId),
    InsertAfter(NodeId),
}

/// Outcome of looking for a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotEdit {
    /// `existing` was found and the edit applied
    Applied,
    /// `existing` was found but its slot does not support the edit
    Unsupported,
    /// `existing` is not a child
    NotFound,
}

impl SlotEdit {
    fn or_else(self, next: impl FnOnce() -> SlotEdit) -> SlotEdit {
        match self {
            SlotEdit::NotFound => next(),
            found => found,
        }
    }
}

fn fixed(slot: &mut NodeId, existing: NodeId, op: SlotOp) -> SlotEdit {
    if *slot != existing {
        return SlotEdit::NotFound;
    }
    match op {
        SlotOp::Replace(new) => {
            *slot = new;
            SlotEdit::Applied
        }
        _ => SlotEdit::Unsupported,
    }
}

fn optional(slot: &mut Option<NodeId>, existing: NodeId, op: SlotOp) -> SlotEdit {
    if *slot != Some(existing) {
        return SlotEdit::NotFound;
    }
    match op {
        SlotOp::Replace(new) => {
            *slot = Some(new);
            SlotEdit::Applied
        }
        SlotOp::Remove => {
            *slot = None;
            SlotEdit::Applied
        }
        _ => SlotEdit::Unsupported,
    }
}

fn list(slots: &mut Vec<NodeId>, existing: NodeId, op: SlotOp) -> SlotEdit {
    let Some(index) = slots.iter().position(|&slot| slot == existing) else {
        return SlotEdit::NotFound;
    };
    match op {
        SlotOp::Replace(new) => slots[index] = new,
        SlotOp::Remove => {
            slots.remove(index);
        }
        SlotOp::InsertBefore(new) => slots.insert(index, new),
        SlotOp::InsertAfter(new) => slots.insert(index + 1, new),
    }
    SlotEdit::Applied
}

/// Apply `op` to the slot of `kind` that holds `existing`
pub(crate) fn edit(kind: &mut NodeKind, existing: NodeId, op: SlotOp) -> SlotEdit {
    match kind {
        NodeKind::Program { classes } => list(classes, existing, op),
        NodeKind::Class { fields, methods, .. } => list(fields, existing, op).or_else(|| list(methods, existing, op)),
        NodeKind::Field { initial_value, .. } => optional(initial_value, existing, op),
        NodeKind::Method { body, .. } => match op {
            // A method body can be swapped but never dropped.
            SlotOp::Remove if *body == Some(existing) => SlotEdit::Unsupported,
            _ => optional(body, existing, op),
        },
        NodeKind::Block { statements } => list(statements, existing, op),
        NodeKind::ExpressionStatement { expr } | NodeKind::Throw { expr } => fixed(expr, existing, op),
        NodeKind::If {
            condition,
            then_stmt,
            else_stmt,
        } => fixed(condition, existing, op)
            .or_else(|| fixed(then_stmt, existing, op))
            .or_else(|| optional(else_stmt, existing, op)),
        NodeKind::While { condition, body } | NodeKind::DoWhile { body, condition } => {
            fixed(condition, existing, op).or_else(|| fixed(body, existing, op))
        }
        NodeKind::For {
            initializers,
            condition,
            increments,
            body,
        } => list(initializers, existing, op)
            .or_else(|| optional(condition, existing, op))
            .or_else(|| list(increments, existing, op))
            .or_else(|| fixed(body, existing, op)),
        NodeKind::Return { expr } => optional(expr, existing, op),
        NodeKind::Labeled { body, .. } | NodeKind::Catch { body, .. } => fixed(body, existing, op),
        NodeKind::Switch { selector, body } => fixed(selector, existing, op).or_else(|| fixed(body, existing, op)),
        NodeKind::Case { value } => match op {
            // Turning a case into `default:` is not a slot edit.
            SlotOp::Remove if *value == Some(existing) => SlotEdit::Unsupported,
            _ => optional(value, existing, op),
        },
        NodeKind::Try { body, catches, finally } => fixed(body, existing, op)
            .or_else(|| list(catches, existing, op))
            .or_else(|| optional(finally, existing, op)),
        NodeKind::Synchronized { lock, body } => fixed(lock, existing, op).or_else(|| fixed(body, existing, op)),
        NodeKind::Binary { lhs, rhs, .. } | NodeKind::Assign { lhs, rhs, .. } => fixed(lhs, existing, op).or_else(|| fixed(rhs, existing, op)),
        NodeKind::Prefix { operand, .. } | NodeKind::Postfix { operand, .. } => fixed(operand, existing, op),
        NodeKind::Cast { expr, .. } | NodeKind::InstanceOf { expr, .. } => fixed(expr, existing, op),
        NodeKind::Conditional {
            condition,
            then_expr,
            else_expr,
            ..
        } => fixed(condition, existing, op)
            .or_else(|| fixed(then_expr, existing, op))
            .or_else(|| fixed(else_expr, existing, op)),
        NodeKind::MethodCall { receiver, args, .. } => match op {
            SlotOp::Remove if *receiver == Some(existing) => SlotEdit::Unsupported,
            _ => optional(receiver, existing, op).or_else(|| list(args, existing, op)),
        },
        NodeKind::NewInstance { args, .. } => list(args, existing, op),
        NodeKind::NewArray { dims, initializers, .. } => list(dims, existing, op).or_else(|| list(initializers, existing, op)),
        NodeKind::ArrayRef { array, index, .. } => fixed(array, existing, op).or_else(|| fixed(index, existing, op)),
        NodeKind::ArrayLength { array } => fixed(array, existing, op),
        NodeKind::FieldRef { receiver, .. } => match op {
            SlotOp::Remove if *receiver == Some(existing) => SlotEdit::Unsupported,
            _ => optional(receiver, existing, op),
        },
        NodeKind::MultiExpression { exprs } => list(exprs, existing, op),
        NodeKind::Break { .. }
        | NodeKind::Continue { .. }
        | NodeKind::Nop
        | NodeKind::Literal(_)
        | NodeKind::LocalRef(_)
        | NodeKind::ParameterRef(_)
        | NodeKind::ThisRef(_)
        | NodeKind::ExceptionRuntimeValue { .. } => SlotEdit::NotFound,
    }
}

/// Check whether `existing` sits in a variable-arity list of `kind`
pub(crate) fn in_list(kind: &NodeKind, existing: NodeId) -> bool {
    let lists: Vec<&Vec<NodeId>> = match kind {
        NodeKind::Program { classes } => vec![classes],
        NodeKind::Class { fields, methods, .. } => vec![fields, methods],
        NodeKind::Block { statements } => vec![statements],
        NodeKind::For { initializers, increments, .. } => vec![initializers, increments],
        NodeKind::Try { catches, .. } => vec![catches],
        NodeKind::MethodCall { args, .. } | NodeKind::NewInstance { args, .. } => vec![args],
        NodeKind::NewArray { dims, initializers, .. } => vec![dims, initializers],
        NodeKind::MultiExpression { exprs } => vec![exprs],
        _ => Vec::new(),
    };
    lists.iter().any(|list| list.contains(&existing))
}
