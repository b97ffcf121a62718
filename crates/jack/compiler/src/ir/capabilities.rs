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

//! Per-kind capability queries
//!
//! Each query matches explicitly on the node kind; subtree queries combine the
//! answer for the node with the answers for its children.

use crate::ir::literal::LiteralValue;
use crate::ir::node::{NodeId, NodeKind};
use crate::ir::operator::{BinaryOperator, PrefixOperator};
use crate::ir::tree::Tree;
use std::collections::BTreeSet;

/// Observable effects an expression may have when evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SideEffect {
    /// Write to a local, parameter or `this`
    LocalWrite,
    /// Write to a field or array element
    HeapWrite,
    /// Invocation of unknown code
    Call,
    /// Object or array allocation
    Allocation,
    /// Evaluation may raise an exception
    Exception,
}

impl Tree {
    /// Effects of evaluating `id` itself, children excluded
    pub fn own_side_effects(&self, id: NodeId) -> BTreeSet<SideEffect> {
        let mut effects = BTreeSet::new();
        match self.kind(id) {
            NodeKind::Assign { lhs, .. } => {
                if self.tag(*lhs).is_variable_ref() {
                    effects.insert(SideEffect::LocalWrite);
                } else {
                    effects.insert(SideEffect::HeapWrite);
                }
                if matches!(self.kind(*lhs), NodeKind::ArrayRef { .. }) {
                    // ArrayStoreException
                    effects.insert(SideEffect::Exception);
                }
            }
            NodeKind::Prefix { op, operand, .. } if op.is_increment() => {
                effects.insert(self.write_effect(*operand));
            }
            NodeKind::Postfix { operand, .. } => {
                effects.insert(self.write_effect(*operand));
            }
            NodeKind::Binary { op, rhs, ty, .. } if op.is_division() && ty.is_integral() => {
                if !self.literal(*rhs).is_some_and(|value| value.is_value() && !value.is_integral_zero()) {
                    effects.insert(SideEffect::Exception);
                }
            }
            NodeKind::Cast { ty, .. } if ty.is_reference() => {
                effects.insert(SideEffect::Exception);
            }
            NodeKind::MethodCall { .. } => {
                effects.insert(SideEffect::Call);
                effects.insert(SideEffect::Exception);
            }
            NodeKind::NewInstance { .. } => {
                effects.insert(SideEffect::Allocation);
                effects.insert(SideEffect::Call);
                effects.insert(SideEffect::Exception);
            }
            NodeKind::NewArray { .. } => {
                effects.insert(SideEffect::Allocation);
                effects.insert(SideEffect::Exception);
            }
            NodeKind::ArrayRef { .. } | NodeKind::ArrayLength { .. } => {
                effects.insert(SideEffect::Exception);
            }
            NodeKind::FieldRef { receiver: Some(_), .. } => {
                effects.insert(SideEffect::Exception);
            }
            NodeKind::Throw { .. } => {
                effects.insert(SideEffect::Exception);
            }
            _ => {}
        }
        effects
    }

    fn write_effect(&self, target: NodeId) -> SideEffect {
        if self.tag(target).is_variable_ref() {
            SideEffect::LocalWrite
        } else {
            SideEffect::HeapWrite
        }
    }

    /// Effects of evaluating the whole subtree rooted at `id`
    pub fn side_effects(&self, id: NodeId) -> BTreeSet<SideEffect> {
        let mut effects = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            effects.extend(self.own_side_effects(node));
            stack.extend(self.children(node));
        }
        effects
    }

    /// Evaluating the subtree may raise an exception
    pub fn can_throw(&self, id: NodeId) -> bool {
        self.side_effects(id).contains(&SideEffect::Exception)
    }

    /// Evaluating the subtree changes state other than by throwing
    pub fn has_side_effects(&self, id: NodeId) -> bool {
        self.side_effects(id).iter().any(|effect| *effect != SideEffect::Exception)
    }

    /// Evaluation may be dropped or duplicated without observable difference
    pub fn is_pure(&self, id: NodeId) -> bool {
        self.side_effects(id).is_empty()
    }

    /// `id` is the condition slot of a branching statement or a conditional expression
    pub fn is_branch_condition(&self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        match self.kind(parent) {
            NodeKind::If { condition, .. }
            | NodeKind::While { condition, .. }
            | NodeKind::DoWhile { condition, .. }
            | NodeKind::Conditional { condition, .. } => *condition == id,
            NodeKind::For { condition, .. } => *condition == Some(id),
            _ => false,
        }
    }

    /// Operators counted by negation pushdown: `!`, comparisons, `&&`, `||` and
    /// the boolean forms of `&`, `|` and `^`
    pub fn is_boolean_operator(&self, id: NodeId) -> bool {
        match self.kind(id) {
            NodeKind::Prefix { op: PrefixOperator::Not, .. } => true,
            NodeKind::Binary { op, ty, .. } => op.is_comparison() || op.is_conditional() || (op.is_bitwise() && ty.is_boolean()),
            _ => false,
        }
    }

    /// Number of boolean operator nodes in the subtree
    pub fn boolean_operator_count(&self, id: NodeId) -> usize {
        let mut count = 0;
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if self.is_boolean_operator(node) {
                count += 1;
            }
            stack.extend(self.children(node));
        }
        count
    }

    /// Boolean literal value of `id`, if it is one
    pub fn boolean_literal(&self, id: NodeId) -> Option<bool> {
        self.literal(id).and_then(LiteralValue::as_bool)
    }

    /// `==`, `!=` or ordering comparison whose operands are not floating-point
    pub fn is_invertible_comparison(&self, id: NodeId) -> bool {
        match self.kind(id) {
            NodeKind::Binary { op, lhs, rhs, .. } if op.is_comparison() => {
                let floating = |node: NodeId| self.expression_type(node).is_some_and(|ty| ty.is_floating());
                !floating(*lhs) && !floating(*rhs)
            }
            _ => false,
        }
    }

    /// `&&`, `||`, or boolean `&` and `|`
    pub fn is_de_morgan_connective(&self, id: NodeId) -> bool {
        match self.kind(id) {
            NodeKind::Binary { op, ty, .. } => op.is_conditional() || (matches!(op, BinaryOperator::BitAnd | BinaryOperator::BitOr) && ty.is_boolean()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::JType;
    use crate::ir::Modifiers;
    use jack_common::Registry;
    use std::sync::Arc;

    fn tree() -> Tree {
        Tree::new(Arc::new(Registry::new()))
    }

    #[test]
    fn test_integral_division_can_throw() {
        let mut tree = tree();
        let a = tree.int(1);
        let zero = tree.int(0);
        let div = tree.binary(BinaryOperator::Div, a, zero);
        assert!(tree.can_throw(div));
        assert!(!tree.has_side_effects(div));

        let a = tree.int(1);
        let two = tree.int(2);
        let div = tree.binary(BinaryOperator::Div, a, two);
        assert!(!tree.can_throw(div));
        assert!(tree.is_pure(div));
    }

    #[test]
    fn test_calls_are_effectful() {
        let mut tree = tree();
        let call = tree.call(None, "Demo", "readFlag", Vec::new(), JType::BOOLEAN);
        assert!(tree.can_throw(call));
        assert!(tree.has_side_effects(call));
        let t = tree.boolean(true);
        let and = tree.binary(BinaryOperator::And, t, call);
        assert!(!tree.is_pure(and));
    }

    #[test]
    fn test_branch_condition() {
        let mut tree = tree();
        let cond = tree.boolean(true);
        let then_stmt = tree.nop();
        let stmt = tree.if_stmt(cond, then_stmt, None);
        assert!(tree.is_branch_condition(cond));
        assert!(!tree.is_branch_condition(then_stmt));
        assert!(!tree.is_branch_condition(stmt));
    }

    #[test]
    fn test_boolean_operator_count() {
        let mut tree = tree();
        let class = tree.class("Demo", Modifiers::PUBLIC);
        let method = tree.method(class, "run", JType::VOID, Modifiers::STATIC);
        let x = tree.parameter(method, "x", JType::INT);
        let y = tree.parameter(method, "y", JType::INT);
        let f = tree.parameter(method, "f", JType::FLOAT);

        let x_ref = tree.var_ref(x);
        let y_ref = tree.var_ref(y);
        let lt = tree.binary(BinaryOperator::Lt, x_ref, y_ref);
        let not = tree.not(lt);
        assert_eq!(tree.boolean_operator_count(not), 2);
        assert!(tree.is_invertible_comparison(lt));

        let f_ref = tree.var_ref(f);
        let zero = tree.new_literal(LiteralValue::Float(0.0));
        let flt = tree.binary(BinaryOperator::Lt, f_ref, zero);
        assert!(!tree.is_invertible_comparison(flt));

        let a = tree.int(1);
        let b = tree.int(2);
        let bits = tree.binary(BinaryOperator::BitAnd, a, b);
        assert!(!tree.is_boolean_operator(bits));
    }
}
