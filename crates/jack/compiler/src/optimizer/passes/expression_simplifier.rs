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

//! Constant folding of expressions
//!
//! A post-order rewrite: each expression is simplified after its operands, and
//! every rewrite is committed immediately so the enclosing expression sees the
//! folded operand.

use crate::dataflow::ControlFlowGraph;
use crate::ir::literal::{fold_binary, fold_prefix};
use crate::ir::{BinaryOperator, IrError, IrResult, JType, LiteralValue, NodeId, NodeKind, PrimitiveType, Tree};
use crate::mutation::Transaction;
use crate::optimizer::config::OptimizationConfig;
use crate::optimizer::framework::{MethodContext, OptimizationPass, OptimizationResult};
use crate::optimizer::passes::refresh_definition_value;
use crate::visitor::{Visitor, accept};
use tracing::debug;

/// What an expression simplifies to
#[derive(Debug, Clone, Copy, PartialEq)]
enum Simplified {
    Literal(LiteralValue),
    /// One of the expression's operands, moved up
    Operand(NodeId),
    /// Logical negation of an operand
    Negated(NodeId),
    /// An operand widened or narrowed to the type of the replaced expression
    Converted(NodeId, PrimitiveType),
}

/// Simplification of `id`, if any applies
fn simplify(tree: &Tree, id: NodeId, fold_instanceof_null: bool) -> Option<Simplified> {
    match tree.kind(id) {
        NodeKind::Binary { op, lhs, rhs, .. } => simplify_binary(tree, id, *op, *lhs, *rhs),
        NodeKind::Prefix { op, operand, .. } if !op.is_increment() => {
            let value = tree.literal(*operand)?;
            fold_prefix(*op, value).map(Simplified::Literal)
        }
        NodeKind::Cast { ty: JType::Primitive(target), expr } => {
            let value = tree.literal(*expr)?;
            value.coerce(*target).map(Simplified::Literal)
        }
        NodeKind::Conditional {
            condition,
            then_expr,
            else_expr,
            ty,
        } => {
            let live = if tree.boolean_literal(*condition)? { *then_expr } else { *else_expr };
            live_branch(tree, live, ty)
        }
        NodeKind::InstanceOf { expr, .. } if fold_instanceof_null && is_null_value(tree, *expr) => Some(Simplified::Literal(LiteralValue::Boolean(false))),
        _ => None,
    }
}

/// The live branch of a conditional, converted to the conditional's type
fn live_branch(tree: &Tree, live: NodeId, ty: &JType) -> Option<Simplified> {
    let JType::Primitive(target) = ty else {
        return Some(Simplified::Operand(live));
    };
    if tree.expression_type(live).as_ref() == Some(ty) {
        return Some(Simplified::Operand(live));
    }
    match tree.literal(live) {
        Some(value) => value.coerce(*target).map(Simplified::Literal),
        None => Some(Simplified::Converted(live, *target)),
    }
}

/// `null` or a cast of `null`
fn is_null_value(tree: &Tree, id: NodeId) -> bool {
    match tree.kind(id) {
        NodeKind::Literal(LiteralValue::Null) => true,
        NodeKind::Cast { expr, .. } => matches!(tree.kind(*expr), NodeKind::Literal(LiteralValue::Null)),
        _ => false,
    }
}

fn simplify_binary(tree: &Tree, id: NodeId, op: BinaryOperator, lhs: NodeId, rhs: NodeId) -> Option<Simplified> {
    match (tree.literal(lhs), tree.literal(rhs)) {
        (Some(a), Some(b)) => fold_binary(op, a, b).map(Simplified::Literal),
        (Some(_), None) => simplify_boolean_identity(tree, id, op, tree.boolean_literal(lhs)?, rhs, true),
        (None, Some(_)) => simplify_boolean_identity(tree, id, op, tree.boolean_literal(rhs)?, lhs, false),
        (None, None) => None,
    }
}

/// Truth-table reduction of a boolean operator with one literal operand.
///
/// `other` may only be dropped when it is pure, except under a short-circuit
/// operator whose literal is evaluated first. Introducing a negation is
/// limited to branch conditions.
fn simplify_boolean_identity(tree: &Tree, id: NodeId, op: BinaryOperator, literal: bool, other: NodeId, literal_first: bool) -> Option<Simplified> {
    if !tree.expression_type(other).is_some_and(|ty| ty.is_boolean()) {
        return None;
    }
    let constant = |value: bool| {
        let skipped = literal_first && op.is_conditional();
        (skipped || tree.is_pure(other)).then_some(Simplified::Literal(LiteralValue::Boolean(value)))
    };
    let negated = || tree.is_branch_condition(id).then_some(Simplified::Negated(other));

    match (op, literal) {
        (BinaryOperator::And | BinaryOperator::BitAnd, true) => Some(Simplified::Operand(other)),
        (BinaryOperator::And | BinaryOperator::BitAnd, false) => constant(false),
        (BinaryOperator::Or | BinaryOperator::BitOr, false) => Some(Simplified::Operand(other)),
        (BinaryOperator::Or | BinaryOperator::BitOr, true) => constant(true),
        (BinaryOperator::BitXor, false) | (BinaryOperator::Eq, true) | (BinaryOperator::Ne, false) => Some(Simplified::Operand(other)),
        (BinaryOperator::BitXor, true) | (BinaryOperator::Eq, false) | (BinaryOperator::Ne, true) => negated(),
        _ => None,
    }
}

/// Post-order folding visitor; the first commit error stops the walk
struct Folder<'c> {
    cfg: &'c mut ControlFlowGraph,
    method: NodeId,
    fold_instanceof_null: bool,
    rewrites: usize,
    error: Option<IrError>,
}

impl Folder<'_> {
    fn apply(&mut self, tree: &mut Tree, id: NodeId, simplified: Simplified) -> IrResult<()> {
        let source = tree.source(id).clone();
        let replacement = match simplified {
            Simplified::Literal(value) => tree.add(NodeKind::Literal(value), source),
            Simplified::Operand(operand) => operand,
            Simplified::Negated(operand) => {
                let not = tree.not(operand);
                tree.set_source(not, source);
                not
            }
            Simplified::Converted(operand, target) => {
                let cast = tree.primitive_cast(target, operand);
                tree.set_source(cast, source);
                cast
            }
        };
        let mut transaction = Transaction::new(self.method);
        transaction.replace(id, replacement);
        let applied = transaction.commit(tree)?;
        self.cfg.sync_edits(tree, &applied);
        refresh_definition_value(tree, replacement);
        Ok(())
    }
}

impl Visitor for Folder<'_> {
    fn visit_node(&mut self, _tree: &mut Tree, _id: NodeId) -> bool {
        self.error.is_none()
    }

    fn end_visit_expression(&mut self, tree: &mut Tree, id: NodeId) {
        if self.error.is_some() {
            return;
        }
        let Some(simplified) = simplify(tree, id, self.fold_instanceof_null) else {
            return;
        };
        match self.apply(tree, id, simplified) {
            Ok(()) => self.rewrites += 1,
            Err(error) => self.error = Some(error),
        }
    }
}

/// Folds literal operators, boolean identities, literal conditionals and casts
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpressionSimplifier;

impl ExpressionSimplifier {
    pub const NAME: &'static str = "expression-simplifier";

    pub fn new() -> Self {
        Self
    }
}

impl OptimizationPass for ExpressionSimplifier {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Folds constant expressions"
    }

    fn is_enabled(&self, config: &OptimizationConfig) -> bool {
        config.allows(config.enable_expression_simplifier, 1)
    }

    fn optimize(&self, ctx: &mut MethodContext<'_>, config: &OptimizationConfig) -> IrResult<OptimizationResult> {
        let Some(body) = ctx.tree.body(ctx.method) else {
            return Ok(OptimizationResult::unchanged());
        };
        let mut folder = Folder {
            cfg: &mut *ctx.cfg,
            method: ctx.method,
            fold_instanceof_null: config.fold_instanceof_null,
            rewrites: 0,
            error: None,
        };
        accept(&mut *ctx.tree, body, &mut folder)?;
        let rewrites = folder.rewrites;
        if let Some(error) = folder.error {
            return Err(error);
        }

        ctx.counters.add("expression_simplifier.folded", rewrites as u64);
        debug!(rewrites, "folded expressions");
        Ok(OptimizationResult::from_rewrites(rewrites))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Modifiers, PrefixOperator};
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
        let method = tree.method(class, "run", JType::INT, Modifiers::STATIC);
        let body = tree.body(method).unwrap();
        Fixture { tree, method, body }
    }

    fn run_with(tree: &mut Tree, method: NodeId, config: &OptimizationConfig) -> OptimizationResult {
        let mut cfg = ControlFlowGraph::from_method(tree, method);
        let counters = Counters::new();
        let mut ctx = MethodContext::new(tree, &mut cfg, method, &counters);
        ExpressionSimplifier.optimize(&mut ctx, config).unwrap()
    }

    fn run(tree: &mut Tree, method: NodeId) -> OptimizationResult {
        run_with(tree, method, &OptimizationConfig::default())
    }

    /// Return `expr` from the method and hand back the return statement
    fn returning(tree: &mut Tree, body: NodeId, expr: NodeId) -> NodeId {
        let ret = tree.return_stmt(Some(expr));
        tree.append(body, ret).unwrap();
        ret
    }

    fn returned(tree: &Tree, ret: NodeId) -> NodeId {
        tree.children(ret)[0]
    }

    #[test]
    fn test_folds_nested_arithmetic() {
        let Fixture { mut tree, method, body } = fixture();
        let two = tree.int(2);
        let three = tree.int(3);
        let sum = tree.binary(BinaryOperator::Add, two, three);
        let four = tree.int(4);
        let product = tree.binary(BinaryOperator::Mul, sum, four);
        let ret = returning(&mut tree, body, product);

        assert_eq!(run(&mut tree, method).rewrites, 2);
        assert_eq!(tree.literal(returned(&tree, ret)), Some(&LiteralValue::Int(20)));
        tree.validate(tree.root()).unwrap();
    }

    #[test]
    fn test_division_by_zero_stays() {
        let Fixture { mut tree, method, body } = fixture();
        let one = tree.int(1);
        let zero = tree.int(0);
        let quotient = tree.binary(BinaryOperator::Div, one, zero);
        let ret = returning(&mut tree, body, quotient);

        assert!(!run(&mut tree, method).changed);
        assert_eq!(returned(&tree, ret), quotient);
    }

    #[test]
    fn test_true_and_call_keeps_call() {
        let Fixture { mut tree, method, body } = fixture();
        let yes = tree.boolean(true);
        let call = tree.call(None, "Flags", "readFlag", vec![], JType::BOOLEAN);
        let and = tree.binary(BinaryOperator::And, yes, call);
        let ret = returning(&mut tree, body, and);

        assert_eq!(run(&mut tree, method).rewrites, 1);
        assert_eq!(returned(&tree, ret), call);
        assert_eq!(tree.parent(call), Some(ret));
    }

    #[test]
    fn test_impure_operand_is_not_dropped() {
        let Fixture { mut tree, method, body } = fixture();
        let call = tree.call(None, "Flags", "readFlag", vec![], JType::BOOLEAN);
        let no = tree.boolean(false);
        let and = tree.binary(BinaryOperator::And, call, no);
        let ret = returning(&mut tree, body, and);

        assert!(!run(&mut tree, method).changed);
        assert_eq!(returned(&tree, ret), and);
    }

    #[test]
    fn test_short_circuit_drops_unevaluated_operand() {
        let Fixture { mut tree, method, body } = fixture();
        let no = tree.boolean(false);
        let call = tree.call(None, "Flags", "readFlag", vec![], JType::BOOLEAN);
        let and = tree.binary(BinaryOperator::And, no, call);
        let ret = returning(&mut tree, body, and);

        assert_eq!(run(&mut tree, method).rewrites, 1);
        assert_eq!(tree.literal(returned(&tree, ret)), Some(&LiteralValue::Boolean(false)));
    }

    #[test]
    fn test_equals_false_negates_only_in_branch() {
        let Fixture { mut tree, method, body } = fixture();
        let flag = tree.parameter(method, "flag", JType::BOOLEAN);

        let in_branch = tree.var_ref(flag);
        let no = tree.boolean(false);
        let cond = tree.binary(BinaryOperator::Eq, in_branch, no);
        let nop = tree.nop();
        let branch = tree.if_stmt(cond, nop, None);
        tree.append(body, branch).unwrap();

        let as_value = tree.var_ref(flag);
        let no = tree.boolean(false);
        let value = tree.binary(BinaryOperator::Eq, as_value, no);
        let ret = returning(&mut tree, body, value);

        assert_eq!(run(&mut tree, method).rewrites, 1);
        let new_cond = tree.children(branch)[0];
        assert!(matches!(tree.kind(new_cond), NodeKind::Prefix { op: PrefixOperator::Not, operand, .. } if *operand == in_branch));
        assert_eq!(returned(&tree, ret), value);
    }

    #[test]
    fn test_literal_conditional_and_cast() {
        let Fixture { mut tree, method, body } = fixture();
        let yes = tree.boolean(true);
        let big = tree.int(300);
        let cast = tree.primitive_cast(PrimitiveType::Byte, big);
        let other = tree.int(9);
        let choice = tree.conditional(yes, cast, other);
        let ret = returning(&mut tree, body, choice);

        assert_eq!(run(&mut tree, method).rewrites, 2);
        assert_eq!(tree.literal(returned(&tree, ret)), Some(&LiteralValue::Byte(44)));
    }

    #[test]
    fn test_literal_conditional_keeps_its_type() {
        let Fixture { mut tree, method, body } = fixture();
        let yes = tree.boolean(true);
        let one = tree.int(1);
        let two = tree.new_literal(LiteralValue::Long(2));
        let choice = tree.conditional(yes, one, two);
        assert_eq!(tree.expression_type(choice), Some(JType::LONG));
        let ret = returning(&mut tree, body, choice);

        assert_eq!(run(&mut tree, method).rewrites, 1);
        let folded = returned(&tree, ret);
        assert_eq!(tree.literal(folded), Some(&LiteralValue::Long(1)));
        assert_eq!(tree.expression_type(folded), Some(JType::LONG));
    }

    #[test]
    fn test_literal_conditional_widens_live_operand() {
        let Fixture { mut tree, method, body } = fixture();
        let i = tree.parameter(method, "i", JType::INT);
        let no = tree.boolean(false);
        let two = tree.new_literal(LiteralValue::Long(2));
        let i_ref = tree.var_ref(i);
        let choice = tree.conditional(no, two, i_ref);
        let ret = returning(&mut tree, body, choice);

        assert_eq!(run(&mut tree, method).rewrites, 1);
        let folded = returned(&tree, ret);
        assert!(matches!(tree.kind(folded), NodeKind::Cast { ty, expr } if *ty == JType::LONG && *expr == i_ref));
        assert_eq!(tree.parent(i_ref), Some(folded));
        tree.validate(tree.root()).unwrap();
    }

    #[test]
    fn test_instanceof_null_respects_config() {
        let Fixture { mut tree, method, body } = fixture();
        let null = tree.null();
        let class = tree.intern("java.lang.String");
        let test = tree.instance_of(JType::Class(class), null);
        let ret = returning(&mut tree, body, test);

        assert!(!run(&mut tree, method).changed);
        let config = OptimizationConfig::default().with_fold_instanceof_null(true);
        assert_eq!(run_with(&mut tree, method, &config).rewrites, 1);
        assert_eq!(tree.literal(returned(&tree, ret)), Some(&LiteralValue::Boolean(false)));
    }

    #[test]
    fn test_second_run_is_noop() {
        let Fixture { mut tree, method, body } = fixture();
        let x = tree.parameter(method, "x", JType::INT);
        let x_ref = tree.var_ref(x);
        let one = tree.int(1);
        let two = tree.int(2);
        let sum = tree.binary(BinaryOperator::Add, one, two);
        let total = tree.binary(BinaryOperator::Add, x_ref, sum);
        returning(&mut tree, body, total);

        assert!(run(&mut tree, method).changed);
        assert!(!run(&mut tree, method).changed);
    }
}
