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

//! Optimization passes over method bodies

pub mod config;
pub mod framework;
pub mod passes;

use crate::optimizer::config::OptimizationConfig;
use crate::optimizer::framework::metrics::OptimizationMetrics as PipelineMetrics;
use crate::optimizer::framework::{CompilationUnit, Counters, MethodFailure, MethodFilter, OptimizationPipeline};
use crate::optimizer::passes as opt_passes;

/// Main optimizer that coordinates all optimization passes
pub struct Optimizer {
    pipeline: OptimizationPipeline,
}

impl Optimizer {
    /// Create an optimizer running every pass `config` enables
    pub fn new(config: OptimizationConfig) -> Self {
        let mut pipeline = OptimizationPipeline::new(config);
        // Register optimization passes in pipeline order
        pipeline.add_pass(opt_passes::ConstantRefiner::new());
        pipeline.add_pass(opt_passes::UseDefSimplifier::new());
        pipeline.add_pass(opt_passes::DefUseSimplifier::new());
        pipeline.add_pass(opt_passes::UnusedDefinitionRemover::new());
        pipeline.add_pass(opt_passes::ExpressionSimplifier::new());
        pipeline.add_pass(opt_passes::NotSimplifier::new());
        Self { pipeline }
    }

    /// Optimize every scheduled method of `units`, returning the methods that failed
    pub fn optimize(&mut self, units: &mut [CompilationUnit]) -> Vec<MethodFailure> {
        self.pipeline.run(units)
    }

    /// Veto methods the host does not want touched
    pub fn set_method_filter(&mut self, filter: MethodFilter) {
        self.pipeline.set_method_filter(filter);
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.pipeline.pass_names()
    }

    pub fn config(&self) -> &OptimizationConfig {
        self.pipeline.config()
    }

    /// Get pipeline-level optimization metrics
    pub fn stats(&self) -> PipelineMetrics {
        self.pipeline.metrics().clone()
    }

    /// Rewrite counters accumulated since the last reset
    pub fn counters(&self) -> &Counters {
        self.pipeline.counters()
    }

    /// Reset all pipeline statistics and counters
    pub fn reset_stats(&mut self) {
        self.pipeline.reset();
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(OptimizationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOperator, JType, LiteralValue, Modifiers, NodeId, Tree};
    use jack_common::Registry;
    use std::sync::Arc;

    /// `static int run() { t = 2 + 3; return t; }` with `t` synthetic; hands back the assignment
    fn unit() -> (CompilationUnit, NodeId) {
        let mut tree = Tree::new(Arc::new(Registry::new()));
        let class = tree.class("Demo", Modifiers::PUBLIC);
        let method = tree.method(class, "run", JType::INT, Modifiers::STATIC);
        let body = tree.body(method).unwrap();
        let t = tree.synthetic_local(method, "t", JType::INT);
        let two = tree.int(2);
        let three = tree.int(3);
        let sum = tree.binary(BinaryOperator::Add, two, three);
        let assign = tree.assign_stmt(t, sum);
        let t_ref = tree.var_ref(t);
        let ret = tree.return_stmt(Some(t_ref));
        tree.append(body, assign).unwrap();
        tree.append(body, ret).unwrap();
        (CompilationUnit::with_computed_dataflow(tree), assign)
    }

    #[test]
    fn test_registers_passes_in_order() {
        let optimizer = Optimizer::default();
        assert_eq!(
            optimizer.pass_names(),
            vec![
                opt_passes::ConstantRefiner::NAME,
                opt_passes::UseDefSimplifier::NAME,
                opt_passes::DefUseSimplifier::NAME,
                opt_passes::UnusedDefinitionRemover::NAME,
                opt_passes::ExpressionSimplifier::NAME,
                opt_passes::NotSimplifier::NAME,
            ]
        );
    }

    #[test]
    fn test_optimize_folds_and_records_stats() {
        let (unit, assign) = unit();
        let mut units = vec![unit];
        let mut optimizer = Optimizer::default();

        assert!(optimizer.optimize(&mut units).is_empty());
        let tree = &units[0].tree;
        let value = tree.children(tree.children(assign)[0])[1];
        assert_eq!(tree.literal(value), Some(&LiteralValue::Int(5)));

        let stats = optimizer.stats();
        assert_eq!(stats.methods_optimized, 1);
        assert!(stats.rewrites_for(opt_passes::ExpressionSimplifier::NAME) >= 1);
        assert!(optimizer.counters().get("expression_simplifier.folded") >= 1);

        optimizer.reset_stats();
        assert_eq!(optimizer.stats().methods_optimized, 0);
        assert_eq!(optimizer.counters().get("expression_simplifier.folded"), 0);
    }

    #[test]
    fn test_level_zero_leaves_tree_alone() {
        let (unit, assign) = unit();
        let mut units = vec![unit];
        let mut optimizer = Optimizer::new(OptimizationConfig::debug());

        assert!(optimizer.optimize(&mut units).is_empty());
        let tree = &units[0].tree;
        let value = tree.children(tree.children(assign)[0])[1];
        assert!(matches!(tree.kind(value), crate::ir::NodeKind::Binary { .. }));
        assert_eq!(optimizer.stats().total_passes, 0);
    }
}
