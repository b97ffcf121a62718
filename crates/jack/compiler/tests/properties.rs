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

//! Property tests over generated boolean expressions

use jack_common::Registry;
use jack_compiler::ir::{BinaryOperator, JType, LiteralValue, Modifiers, NodeId, NodeKind, PrefixOperator, Tree, VarId};
use jack_compiler::{CompilationUnit, OptimizationConfig, Optimizer};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum IntExpr {
    Lit(i32),
    Param(usize),
    Add(Box<IntExpr>, Box<IntExpr>),
}

#[derive(Debug, Clone)]
enum BoolExpr {
    Lit(bool),
    Param(usize),
    Not(Box<BoolExpr>),
    Bin(BinaryOperator, Box<BoolExpr>, Box<BoolExpr>),
    Cmp(BinaryOperator, IntExpr, IntExpr),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Value {
    Bool(bool),
    Int(i32),
}

impl Value {
    fn bool(self) -> bool {
        match self {
            Value::Bool(value) => value,
            Value::Int(value) => panic!("expected a boolean, found {}", value),
        }
    }

    fn int(self) -> i32 {
        match self {
            Value::Int(value) => value,
            Value::Bool(value) => panic!("expected an int, found {}", value),
        }
    }
}

fn int_expr() -> impl Strategy<Value = IntExpr> {
    let leaf = prop_oneof![(-3i32..=3).prop_map(IntExpr::Lit), (0usize..2).prop_map(IntExpr::Param)];
    leaf.prop_recursive(2, 6, 2, |inner| (inner.clone(), inner).prop_map(|(a, b)| IntExpr::Add(Box::new(a), Box::new(b))))
}

fn bool_expr() -> impl Strategy<Value = BoolExpr> {
    use BinaryOperator::*;
    let comparison = prop::sample::select(vec![Eq, Ne, Lt, Le, Gt, Ge]);
    let connective = prop::sample::select(vec![And, Or, BitAnd, BitOr, BitXor, Eq, Ne]);
    let leaf = prop_oneof![
        any::<bool>().prop_map(BoolExpr::Lit),
        (0usize..2).prop_map(BoolExpr::Param),
        (comparison, int_expr(), int_expr()).prop_map(|(op, a, b)| BoolExpr::Cmp(op, a, b)),
    ];
    leaf.prop_recursive(4, 24, 2, move |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| BoolExpr::Not(Box::new(e))),
            (connective.clone(), inner.clone(), inner).prop_map(|(op, a, b)| BoolExpr::Bin(op, Box::new(a), Box::new(b))),
        ]
    })
}

struct Params {
    bools: [VarId; 2],
    ints: [VarId; 2],
}

fn build_int(tree: &mut Tree, params: &Params, expr: &IntExpr) -> NodeId {
    match expr {
        IntExpr::Lit(value) => tree.int(*value),
        IntExpr::Param(index) => tree.var_ref(params.ints[*index]),
        IntExpr::Add(a, b) => {
            let a = build_int(tree, params, a);
            let b = build_int(tree, params, b);
            tree.binary(BinaryOperator::Add, a, b)
        }
    }
}

fn build_bool(tree: &mut Tree, params: &Params, expr: &BoolExpr) -> NodeId {
    match expr {
        BoolExpr::Lit(value) => tree.boolean(*value),
        BoolExpr::Param(index) => tree.var_ref(params.bools[*index]),
        BoolExpr::Not(e) => {
            let e = build_bool(tree, params, e);
            tree.not(e)
        }
        BoolExpr::Bin(op, a, b) => {
            let a = build_bool(tree, params, a);
            let b = build_bool(tree, params, b);
            tree.binary(*op, a, b)
        }
        BoolExpr::Cmp(op, a, b) => {
            let a = build_int(tree, params, a);
            let b = build_int(tree, params, b);
            tree.binary(*op, a, b)
        }
    }
}

/// `static boolean test(boolean p0, boolean p1, int i0, int i1) { return expr; }`
fn method_returning(expr: &BoolExpr) -> (Tree, NodeId, Params) {
    let mut tree = Tree::new(Arc::new(Registry::new()));
    let class = tree.class("Props", Modifiers::PUBLIC);
    let method = tree.method(class, "test", JType::BOOLEAN, Modifiers::STATIC);
    let params = Params {
        bools: [tree.parameter(method, "p0", JType::BOOLEAN), tree.parameter(method, "p1", JType::BOOLEAN)],
        ints: [tree.parameter(method, "i0", JType::INT), tree.parameter(method, "i1", JType::INT)],
    };
    let value = build_bool(&mut tree, &params, expr);
    let ret = tree.return_stmt(Some(value));
    let body = tree.body(method).expect("method should have a body");
    tree.append(body, ret).expect("append to a block");
    (tree, ret, params)
}

fn apply(op: BinaryOperator, lhs: Value, rhs: Value) -> Value {
    use BinaryOperator::*;
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => match op {
            Add => Value::Int(a.wrapping_add(b)),
            Eq => Value::Bool(a == b),
            Ne => Value::Bool(a != b),
            Lt => Value::Bool(a < b),
            Le => Value::Bool(a <= b),
            Gt => Value::Bool(a > b),
            Ge => Value::Bool(a >= b),
            other => panic!("unexpected int operator {}", other),
        },
        (Value::Bool(a), Value::Bool(b)) => match op {
            And | BitAnd => Value::Bool(a && b),
            Or | BitOr => Value::Bool(a || b),
            BitXor | Ne => Value::Bool(a != b),
            Eq => Value::Bool(a == b),
            other => panic!("unexpected boolean operator {}", other),
        },
        (a, b) => panic!("mismatched operands {:?} {} {:?}", a, op, b),
    }
}

fn eval_int(expr: &IntExpr, ints: [i32; 2]) -> i32 {
    match expr {
        IntExpr::Lit(value) => *value,
        IntExpr::Param(index) => ints[*index],
        IntExpr::Add(a, b) => eval_int(a, ints).wrapping_add(eval_int(b, ints)),
    }
}

fn eval_expr(expr: &BoolExpr, bools: [bool; 2], ints: [i32; 2]) -> bool {
    match expr {
        BoolExpr::Lit(value) => *value,
        BoolExpr::Param(index) => bools[*index],
        BoolExpr::Not(e) => !eval_expr(e, bools, ints),
        BoolExpr::Bin(op, a, b) => apply(*op, Value::Bool(eval_expr(a, bools, ints)), Value::Bool(eval_expr(b, bools, ints))).bool(),
        BoolExpr::Cmp(op, a, b) => apply(*op, Value::Int(eval_int(a, ints)), Value::Int(eval_int(b, ints))).bool(),
    }
}

fn eval_node(tree: &Tree, node: NodeId, env: &HashMap<VarId, Value>) -> Value {
    match tree.kind(node) {
        NodeKind::Literal(LiteralValue::Boolean(value)) => Value::Bool(*value),
        NodeKind::Literal(LiteralValue::Int(value)) => Value::Int(*value),
        NodeKind::Prefix { op: PrefixOperator::Not, operand, .. } => Value::Bool(!eval_node(tree, *operand, env).bool()),
        NodeKind::Binary { op, lhs, rhs, .. } => apply(*op, eval_node(tree, *lhs, env), eval_node(tree, *rhs, env)),
        _ => {
            let var = tree.referenced_variable(node).unwrap_or_else(|| panic!("cannot evaluate {}", tree.tag(node)));
            env[&var]
        }
    }
}

fn environments() -> Vec<([bool; 2], [i32; 2])> {
    let mut envs = Vec::new();
    for p0 in [false, true] {
        for p1 in [false, true] {
            for i0 in [-2, 0, 3] {
                for i1 in [-2, 0, 3] {
                    envs.push(([p0, p1], [i0, i1]));
                }
            }
        }
    }
    envs
}

fn only_not_simplifier() -> OptimizationConfig {
    OptimizationConfig::default()
        .with_constant_refiner(false)
        .with_use_def_simplifier(false)
        .with_def_use_simplifier(false)
        .with_unused_definition_remover(false)
        .with_expression_simplifier(false)
}

fn only_expression_simplifier() -> OptimizationConfig {
    only_not_simplifier().with_not_simplifier(false).with_expression_simplifier(true)
}

/// Optimize `units` in place, failing the test on any method failure
fn run(optimizer: &mut Optimizer, units: &mut Vec<CompilationUnit>) {
    let failures = optimizer.optimize(units);
    assert!(failures.is_empty(), "unexpected failures: {:?}", failures);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_pipeline_preserves_value(expr in bool_expr()) {
        let (tree, ret, params) = method_returning(&expr);
        let mut units = vec![CompilationUnit::with_computed_dataflow(tree)];
        run(&mut Optimizer::default(), &mut units);
        let tree = &units[0].tree;

        prop_assert!(tree.check_def_use_symmetry().is_ok());
        prop_assert!(tree.validate(tree.root()).is_ok());
        let value = tree.children(ret)[0];
        for (bools, ints) in environments() {
            let env: HashMap<VarId, Value> = [
                (params.bools[0], Value::Bool(bools[0])),
                (params.bools[1], Value::Bool(bools[1])),
                (params.ints[0], Value::Int(ints[0])),
                (params.ints[1], Value::Int(ints[1])),
            ]
            .into_iter()
            .collect();
            prop_assert_eq!(eval_node(tree, value, &env).bool(), eval_expr(&expr, bools, ints));
        }
    }

    #[test]
    fn prop_negation_pushdown_never_grows(expr in bool_expr()) {
        let (tree, ret, _) = method_returning(&BoolExpr::Not(Box::new(expr)));
        let before = tree.boolean_operator_count(tree.children(ret)[0]);
        let mut units = vec![CompilationUnit::with_computed_dataflow(tree)];
        let mut optimizer = Optimizer::new(only_not_simplifier());
        run(&mut optimizer, &mut units);

        let tree = &units[0].tree;
        let after = tree.boolean_operator_count(tree.children(ret)[0]);
        prop_assert!(after <= before);
        if optimizer.counters().get("not_simplifier.negations_pushed") > 0 {
            prop_assert!(after < before);
        }
    }

    #[test]
    fn prop_single_passes_are_idempotent(expr in bool_expr()) {
        for (config, counter) in [
            (only_expression_simplifier(), "expression_simplifier.folded"),
            (only_not_simplifier(), "not_simplifier.negations_pushed"),
        ] {
            let (tree, _, _) = method_returning(&expr);
            let mut units = vec![CompilationUnit::with_computed_dataflow(tree)];
            let mut optimizer = Optimizer::new(config.with_rerun_simplified_methods(true));
            run(&mut optimizer, &mut units);
            optimizer.reset_stats();
            run(&mut optimizer, &mut units);
            prop_assert_eq!(optimizer.counters().get(counter), 0);
        }
    }
}
