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

//! End-to-end scenarios for the optimizer pipeline
//!
//! Each test builds a small method, runs the full default pipeline over it and
//! checks the resulting tree and dataflow facts.

use jack_common::Registry;
use jack_compiler::ir::{BinaryOperator, JType, LiteralValue, Modifiers, NodeId, NodeKind, PrimitiveType, Tag, Tree};
use jack_compiler::{CompilationUnit, OptimizationConfig, Optimizer};
use std::sync::Arc;

struct Method {
    tree: Tree,
    method: NodeId,
    body: NodeId,
}

fn method(return_type: JType) -> Method {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut tree = Tree::new(Arc::new(Registry::new()));
    let class = tree.class("Scenario", Modifiers::PUBLIC);
    let method = tree.method(class, "run", return_type, Modifiers::STATIC);
    let body = tree.body(method).expect("method should have a body");
    Method { tree, method, body }
}

/// Run the default pipeline over every method and hand the tree back
fn optimize(tree: Tree, config: OptimizationConfig) -> (Tree, Optimizer) {
    let mut units = vec![CompilationUnit::with_computed_dataflow(tree)];
    let mut optimizer = Optimizer::new(config);
    let failures = optimizer.optimize(&mut units);
    assert!(failures.is_empty(), "unexpected failures: {:?}", failures);
    let unit = units.pop().expect("one unit");
    unit.tree.check_def_use_symmetry().expect("def-use facts should stay symmetric");
    unit.tree.validate(unit.tree.root()).expect("tree should stay well formed");
    (unit.tree, optimizer)
}

fn returned(tree: &Tree, body: NodeId) -> NodeId {
    let ret = *tree.children(body).last().expect("body should end in a return");
    tree.children(ret)[0]
}

#[test]
fn test_folds_integer_addition() {
    let Method { mut tree, body, .. } = method(JType::INT);
    let two = tree.int(2);
    let three = tree.int(3);
    let sum = tree.binary(BinaryOperator::Add, two, three);
    let ret = tree.return_stmt(Some(sum));
    tree.append(body, ret).unwrap();

    let (tree, optimizer) = optimize(tree, OptimizationConfig::default());
    assert_eq!(tree.literal(returned(&tree, body)), Some(&LiteralValue::Int(5)));
    assert_eq!(optimizer.counters().get("expression_simplifier.folded"), 1);
}

#[test]
fn test_narrowing_cast_wraps() {
    let Method { mut tree, body, .. } = method(JType::BYTE);
    let value = tree.int(130);
    let cast = tree.primitive_cast(PrimitiveType::Byte, value);
    let ret = tree.return_stmt(Some(cast));
    tree.append(body, ret).unwrap();

    let (tree, optimizer) = optimize(tree, OptimizationConfig::default());
    assert_eq!(tree.literal(returned(&tree, body)), Some(&LiteralValue::Byte(-126)));
    assert_eq!(optimizer.counters().get("constant_refiner.casts_folded"), 1);
}

#[test]
fn test_true_and_call_reduces_to_call() {
    let Method { mut tree, body, .. } = method(JType::BOOLEAN);
    let yes = tree.boolean(true);
    let call = tree.call(None, "Flags", "readFlag", vec![], JType::BOOLEAN);
    let and = tree.binary(BinaryOperator::And, yes, call);
    let ret = tree.return_stmt(Some(and));
    tree.append(body, ret).unwrap();

    let (tree, _) = optimize(tree, OptimizationConfig::default());
    assert_eq!(returned(&tree, body), call);
    assert!(matches!(tree.kind(call), NodeKind::MethodCall { .. }));
}

#[test]
fn test_dead_synthetic_is_removed() {
    let Method { mut tree, method, body } = method(JType::INT);
    let x = tree.parameter(method, "x", JType::INT);
    let t = tree.synthetic_local(method, "t", JType::INT);
    let x_read = tree.var_ref(x);
    let one = tree.int(1);
    let sum = tree.binary(BinaryOperator::Add, x_read, one);
    let dead = tree.assign_stmt(t, sum);
    let x_ret = tree.var_ref(x);
    let ret = tree.return_stmt(Some(x_ret));
    tree.append(body, dead).unwrap();
    tree.append(body, ret).unwrap();

    let (tree, optimizer) = optimize(tree, OptimizationConfig::default());
    assert_eq!(tree.children(body), vec![ret]);
    assert_eq!(optimizer.counters().get("unused_definition_remover.removed"), 1);
}

#[test]
fn test_copy_propagation_then_removal() {
    let Method { mut tree, method, body } = method(JType::INT);
    tree.markers_mut(method).tags.insert(Tag::ThreeAddressForm);
    let b = tree.parameter(method, "b", JType::INT);
    let a = tree.synthetic_local(method, "a", JType::INT);
    let b_read = tree.var_ref(b);
    let copy = tree.assign_stmt(a, b_read);
    let a_read = tree.var_ref(a);
    let ret = tree.return_stmt(Some(a_read));
    tree.append(body, copy).unwrap();
    tree.append(body, ret).unwrap();

    let (tree, optimizer) = optimize(tree, OptimizationConfig::default());
    assert_eq!(tree.children(body), vec![ret]);
    assert_eq!(tree.referenced_variable(returned(&tree, body)), Some(b));
    assert_eq!(optimizer.counters().get("use_def_simplifier.copies_propagated"), 1);
    assert_eq!(optimizer.counters().get("unused_definition_remover.removed"), 1);
}

#[test]
fn test_removal_cascades_through_copies() {
    let Method { mut tree, method, body } = method(JType::INT);
    let a = tree.synthetic_local(method, "a", JType::INT);
    let c = tree.synthetic_local(method, "c", JType::INT);
    let x = tree.parameter(method, "x", JType::INT);
    let x_read = tree.var_ref(x);
    let first = tree.assign_stmt(a, x_read);
    let a_read = tree.var_ref(a);
    let second = tree.assign_stmt(c, a_read);
    let zero = tree.int(0);
    let ret = tree.return_stmt(Some(zero));
    for stmt in [first, second, ret] {
        tree.append(body, stmt).unwrap();
    }

    let (tree, optimizer) = optimize(tree, OptimizationConfig::default());
    assert_eq!(tree.children(body), vec![ret]);
    assert_eq!(optimizer.counters().get("unused_definition_remover.removed"), 2);
}

#[test]
fn test_negated_comparison_is_inverted() {
    let Method { mut tree, method, body } = method(JType::BOOLEAN);
    let x = tree.parameter(method, "x", JType::INT);
    let y = tree.parameter(method, "y", JType::INT);
    let x_read = tree.var_ref(x);
    let y_read = tree.var_ref(y);
    let less = tree.binary(BinaryOperator::Lt, x_read, y_read);
    let not = tree.not(less);
    let ret = tree.return_stmt(Some(not));
    tree.append(body, ret).unwrap();

    let (tree, _) = optimize(tree, OptimizationConfig::default());
    let value = returned(&tree, body);
    let NodeKind::Binary { op, lhs, rhs, .. } = tree.kind(value).clone() else {
        panic!("expected a comparison, found {}", tree.tag(value));
    };
    assert_eq!(op, BinaryOperator::Ge);
    assert_eq!((lhs, rhs), (x_read, y_read));
}

#[test]
fn test_rerun_propagates_folded_constant() {
    let Method { mut tree, method, body } = method(JType::INT);
    let t = tree.synthetic_local(method, "t", JType::INT);
    let two = tree.int(2);
    let three = tree.int(3);
    let sum = tree.binary(BinaryOperator::Add, two, three);
    let assign = tree.assign_stmt(t, sum);
    let t_read = tree.var_ref(t);
    let ret = tree.return_stmt(Some(t_read));
    tree.append(body, assign).unwrap();
    tree.append(body, ret).unwrap();

    let config = OptimizationConfig::default().with_rerun_simplified_methods(true);
    let mut units = vec![CompilationUnit::with_computed_dataflow(tree)];
    let mut optimizer = Optimizer::new(config);
    assert!(optimizer.optimize(&mut units).is_empty());
    assert_eq!(units[0].tree.children(body).len(), 2);

    assert!(optimizer.optimize(&mut units).is_empty());
    let tree = &units[0].tree;
    assert_eq!(tree.children(body), vec![ret]);
    assert_eq!(tree.literal(returned(tree, body)), Some(&LiteralValue::Int(5)));
    assert_eq!(optimizer.stats().methods_optimized, 2);
}

#[test]
fn test_simplified_method_is_skipped() {
    let Method { mut tree, body, .. } = method(JType::INT);
    let two = tree.int(2);
    let ret = tree.return_stmt(Some(two));
    tree.append(body, ret).unwrap();

    let mut units = vec![CompilationUnit::with_computed_dataflow(tree)];
    let mut optimizer = Optimizer::default();
    optimizer.optimize(&mut units);
    optimizer.optimize(&mut units);

    let stats = optimizer.stats();
    assert_eq!(stats.methods_optimized, 1);
    assert_eq!(stats.methods_skipped, 1);
}

#[test]
fn test_release_config_runs_units_in_parallel() {
    let units: Vec<CompilationUnit> = (0..8)
        .map(|i| {
            let Method { mut tree, body, .. } = method(JType::INT);
            let lhs = tree.int(i);
            let rhs = tree.int(1);
            let sum = tree.binary(BinaryOperator::Add, lhs, rhs);
            let ret = tree.return_stmt(Some(sum));
            tree.append(body, ret).unwrap();
            CompilationUnit::with_computed_dataflow(tree)
        })
        .collect();
    let mut units = units;

    let mut optimizer = Optimizer::new(OptimizationConfig::release());
    assert!(optimizer.optimize(&mut units).is_empty());
    assert_eq!(optimizer.stats().methods_optimized, 8);
    assert_eq!(optimizer.counters().get("expression_simplifier.folded"), 8);
    for (i, unit) in units.iter().enumerate() {
        let method = unit.methods[0].method;
        let body = unit.tree.body(method).unwrap();
        assert_eq!(unit.tree.literal(returned(&unit.tree, body)), Some(&LiteralValue::Int(i as i32 + 1)));
    }
}
