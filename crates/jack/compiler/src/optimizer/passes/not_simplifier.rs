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

//! Negation pushdown
//!
//! A logical `!` is pushed into its operand when the rewritten form carries
//! fewer boolean operators: double negations cancel, De Morgan's laws flip
//! connectives, and non-floating comparisons are inverted.

use crate::dataflow::ControlFlowGraph;
use crate::ir::{IrError, IrResult, NodeId, NodeKind, PrefixOperator, Tree};
use crate::mutation::Transaction;
use crate::optimizer::config::OptimizationConfig;
use crate::optimizer::framework::{MethodContext, OptimizationPass, OptimizationResult};
use crate::visitor::{Visitor, accept};
use tracing::{debug, trace};

/// Boolean operators a rewrite must save before it is applied
pub const MIN_OPERATOR_SAVINGS: usize = 1;

/// Boolean operator count of `!e`, with the negation pushed as far as it goes
fn negated_cost(tree: &Tree, e: NodeId) -> usize {
    match tree.kind(e) {
        NodeKind::Prefix { op: PrefixOperator::Not, operand, .. } => tree.boolean_operator_count(*operand),
        NodeKind::Binary { lhs, rhs, .. } if tree.is_de_morgan_connective(e) => 1 + negated_cost(tree, *lhs) + negated_cost(tree, *rhs),
        NodeKind::Binary { lhs, rhs, .. } if tree.is_invertible_comparison(e) => 1 + tree.boolean_operator_count(*lhs) + tree.boolean_operator_count(*rhs),
        _ => 1 + tree.boolean_operator_count(e),
    }
}

/// Build `!e` in pushed-down form, moving the operands of `e` into new nodes
fn negate(tree: &mut Tree, e: NodeId) -> NodeId {
    match tree.kind(e).clone() {
        NodeKind::Prefix { op: PrefixOperator::Not, operand, .. } => operand,
        NodeKind::Binary { op, lhs, rhs, ty } if tree.is_de_morgan_connective(e) => match op.de_morgan_dual() {
            Some(dual) => {
                let lhs = negate(tree, lhs);
                let rhs = negate(tree, rhs);
                tree.binary_typed(dual, lhs, rhs, ty)
            }
            None => tree.not(e),
        },
        NodeKind::Binary { op, lhs, rhs, ty } if tree.is_invertible_comparison(e) => match op.inverse_comparison() {
            Some(inverse) => tree.binary_typed(inverse, lhs, rhs, ty),
            None => tree.not(e),
        },
        _ => tree.not(e),
    }
}

struct Pusher<'c> {
    cfg: &'c mut ControlFlowGraph,
    method: NodeId,
    rewrites: usize,
    error: Option<IrError>,
}

impl Pusher<'_> {
    fn push_down(&mut self, tree: &mut Tree, id: NodeId, operand: NodeId) -> IrResult<()> {
        let source = tree.source(id).clone();
        let replacement = negate(tree, operand);
        tree.set_source(replacement, source);

        let mut transaction = Transaction::new(self.method);
        transaction.replace(id, replacement);
        let applied = transaction.commit(tree)?;
        self.cfg.sync_edits(tree, &applied);
        Ok(())
    }
}

impl Visitor for Pusher<'_> {
    fn visit_node(&mut self, _tree: &mut Tree, _id: NodeId) -> bool {
        self.error.is_none()
    }

    fn visit_prefix(&mut self, tree: &mut Tree, id: NodeId) -> bool {
        if self.error.is_some() {
            return false;
        }
        let NodeKind::Prefix { op: PrefixOperator::Not, operand, .. } = *tree.kind(id) else {
            return true;
        };

        let before = tree.boolean_operator_count(id);
        let after = negated_cost(tree, operand);
        if before < after + MIN_OPERATOR_SAVINGS {
            trace!(node = %id, before, after, "negation kept");
            return true;
        }

        match self.push_down(tree, id, operand) {
            Ok(()) => self.rewrites += 1,
            Err(error) => self.error = Some(error),
        }
        false
    }
}

/// Pushes logical negations inward when that reduces the operator count
#[derive(Debug, Default, Clone, Copy)]
pub struct NotSimplifier;

impl NotSimplifier {
    pub const NAME: &'static str = "not-simplifier";

    pub fn new() -> Self {
        Self
    }
}

impl OptimizationPass for NotSimplifier {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Pushes negations into comparisons and connectives"
    }

    fn is_enabled(&self, config: &OptimizationConfig) -> bool {
        config.allows(config.enable_not_simplifier, 1)
    }

    fn optimize(&self, ctx: &mut MethodContext<'_>, _config: &OptimizationConfig) -> IrResult<OptimizationResult> {
        let Some(body) = ctx.tree.body(ctx.method) else {
            return Ok(OptimizationResult::unchanged());
        };
        // A rewritten subtree is not revisited in the same walk; every rewrite
        // lowers the operator count, so the loop ends.
        let mut rewrites = 0;
        loop {
            let mut pusher = Pusher {
                cfg: &mut *ctx.cfg,
                method: ctx.method,
                rewrites: 0,
                error: None,
            };
            accept(&mut *ctx.tree, body, &mut pusher)?;
            if let Some(error) = pusher.error {
                return Err(error);
            }
            if pusher.rewrites == 0 {
                break;
            }
            rewrites += pusher.rewrites;
        }

        ctx.counters.add("not_simplifier.negations_pushed", rewrites as u64);
        debug!(rewrites, "pushed negations");
        Ok(OptimizationResult::from_rewrites(rewrites))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOperator, JType, Modifiers, VarId};
    use crate::optimizer::framework::Counters;
    use jack_common::Registry;
    use std::sync::Arc;

    struct Fixture {
        tree: Tree,
        method: NodeId,
        body: NodeId,
    }

    fn fixture() -> Fixture {
        let mut tree = Tree::new(Arc::new(Registry::new()));
        let class = tree.class("Demo", Modifiers::PUBLIC);
        let method = tree.method(class, "test", JType::BOOLEAN, Modifiers::STATIC);
        let body = tree.body(method).unwrap();
        Fixture { tree, method, body }
    }

    fn run(tree: &mut Tree, method: NodeId) -> (OptimizationResult, Counters) {
        let mut cfg = ControlFlowGraph::from_method(tree, method);
        let counters = Counters::new();
        let result = {
            let mut ctx = MethodContext::new(tree, &mut cfg, method, &counters);
            NotSimplifier.optimize(&mut ctx, &OptimizationConfig::default()).unwrap()
        };
        (result, counters)
    }

    fn returning(tree: &mut Tree, body: NodeId, expr: NodeId) -> NodeId {
        let ret = tree.return_stmt(Some(expr));
        tree.append(body, ret).unwrap();
        ret
    }

    fn returned(tree: &Tree, ret: NodeId) -> NodeId {
        tree.children(ret)[0]
    }

    fn less(tree: &mut Tree, a: VarId, b: VarId) -> NodeId {
        let a = tree.var_ref(a);
        let b = tree.var_ref(b);
        tree.binary(BinaryOperator::Lt, a, b)
    }

    #[test]
    fn test_inverts_integer_comparison() {
        let Fixture { mut tree, method, body } = fixture();
        let x = tree.parameter(method, "x", JType::INT);
        let y = tree.parameter(method, "y", JType::INT);
        let cmp = less(&mut tree, x, y);
        let not = tree.not(cmp);
        let ret = returning(&mut tree, body, not);

        let (result, counters) = run(&mut tree, method);
        assert_eq!(result.rewrites, 1);
        assert_eq!(counters.get("not_simplifier.negations_pushed"), 1);
        let value = returned(&tree, ret);
        assert!(matches!(tree.kind(value), NodeKind::Binary { op: BinaryOperator::Ge, .. }));
        assert_eq!(tree.boolean_operator_count(value), 1);
        tree.validate(tree.root()).unwrap();
    }

    #[test]
    fn test_connective_of_variables_unchanged() {
        let Fixture { mut tree, method, body } = fixture();
        let a = tree.parameter(method, "a", JType::BOOLEAN);
        let b = tree.parameter(method, "b", JType::BOOLEAN);
        let a = tree.var_ref(a);
        let b = tree.var_ref(b);
        let and = tree.binary(BinaryOperator::And, a, b);
        let not = tree.not(and);
        let ret = returning(&mut tree, body, not);

        let (result, _) = run(&mut tree, method);
        assert!(!result.changed);
        assert_eq!(returned(&tree, ret), not);
    }

    #[test]
    fn test_double_negation_cancels() {
        let Fixture { mut tree, method, body } = fixture();
        let flag = tree.parameter(method, "flag", JType::BOOLEAN);
        let flag_ref = tree.var_ref(flag);
        let inner = tree.not(flag_ref);
        let outer = tree.not(inner);
        let ret = returning(&mut tree, body, outer);

        let (result, _) = run(&mut tree, method);
        assert_eq!(result.rewrites, 1);
        assert_eq!(returned(&tree, ret), flag_ref);
        assert_eq!(tree.parent(flag_ref), Some(ret));
    }

    #[test]
    fn test_de_morgan_over_comparisons() {
        let Fixture { mut tree, method, body } = fixture();
        let a = tree.parameter(method, "a", JType::INT);
        let b = tree.parameter(method, "b", JType::INT);
        let first = less(&mut tree, a, b);
        let second = less(&mut tree, b, a);
        let and = tree.binary(BinaryOperator::And, first, second);
        let not = tree.not(and);
        let ret = returning(&mut tree, body, not);

        let (result, _) = run(&mut tree, method);
        assert_eq!(result.rewrites, 1);
        let value = returned(&tree, ret);
        let NodeKind::Binary { op, lhs, rhs, .. } = tree.kind(value).clone() else {
            panic!("expected a binary expression");
        };
        assert_eq!(op, BinaryOperator::Or);
        assert!(matches!(tree.kind(lhs), NodeKind::Binary { op: BinaryOperator::Ge, .. }));
        assert!(matches!(tree.kind(rhs), NodeKind::Binary { op: BinaryOperator::Ge, .. }));
        assert_eq!(tree.boolean_operator_count(value), 3);
        tree.validate(tree.root()).unwrap();
    }

    #[test]
    fn test_floating_comparison_stays_negated() {
        let Fixture { mut tree, method, body } = fixture();
        let f = tree.parameter(method, "f", JType::DOUBLE);
        let g = tree.parameter(method, "g", JType::DOUBLE);
        let cmp = less(&mut tree, f, g);
        let not = tree.not(cmp);
        let ret = returning(&mut tree, body, not);

        let (result, _) = run(&mut tree, method);
        assert!(!result.changed);
        assert_eq!(returned(&tree, ret), not);
    }

    #[test]
    fn test_negation_inside_wrapped_operand_is_pushed() {
        let Fixture { mut tree, method, body } = fixture();
        let a = tree.parameter(method, "a", JType::BOOLEAN);
        let x = tree.parameter(method, "x", JType::INT);
        let y = tree.parameter(method, "y", JType::INT);
        let cmp = less(&mut tree, x, y);
        let inner = tree.not(cmp);
        let a_ref = tree.var_ref(a);
        let xor = tree.binary(BinaryOperator::BitXor, a_ref, inner);
        let b = tree.parameter(method, "b", JType::BOOLEAN);
        let b_ref = tree.var_ref(b);
        let nested = tree.not(b_ref);
        let and = tree.binary(BinaryOperator::And, xor, nested);
        let outer = tree.not(and);
        let ret = returning(&mut tree, body, outer);

        // !((a ^ !(x < y)) && !b) becomes !(a ^ x >= y) || b
        let (result, _) = run(&mut tree, method);
        assert_eq!(result.rewrites, 2);
        let value = returned(&tree, ret);
        assert!(matches!(tree.kind(value), NodeKind::Binary { op: BinaryOperator::Or, .. }));
        assert_eq!(tree.boolean_operator_count(value), 4);

        let (again, _) = run(&mut tree, method);
        assert!(!again.changed);
    }
}
