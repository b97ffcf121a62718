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

//! Pipeline running the registered passes over compilation units

use crate::dataflow::{ControlFlowGraph, compute_dataflow};
use crate::ir::{IrError, Modifiers, NodeId, NodeKind, Tag, Tree};
use crate::optimizer::config::OptimizationConfig;
use crate::optimizer::framework::counters::Counters;
use crate::optimizer::framework::metrics::{OptimizationMetrics, PassMetrics};
use crate::optimizer::framework::pass::{MethodContext, OptimizationPass};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, debug_span, trace, warn};

/// Host veto over method eligibility; returning `false` skips the method
pub type MethodFilter = Arc<dyn Fn(&Tree, NodeId) -> bool + Send + Sync>;

/// A method scheduled for optimization together with its graph
#[derive(Debug, Clone)]
pub struct MethodInput {
    pub method: NodeId,
    pub cfg: ControlFlowGraph,
}

/// One tree and the methods of it to optimize
#[derive(Debug)]
pub struct CompilationUnit {
    pub tree: Tree,
    pub methods: Vec<MethodInput>,
}

impl CompilationUnit {
    pub fn new(tree: Tree) -> Self {
        Self { tree, methods: Vec::new() }
    }

    /// Schedule `method` with a graph supplied by the host
    pub fn add_method(&mut self, method: NodeId, cfg: ControlFlowGraph) {
        self.methods.push(MethodInput { method, cfg });
    }

    /// Schedule every method with a body, building its graph and def-use facts here
    pub fn with_computed_dataflow(mut tree: Tree) -> Self {
        let mut methods = Vec::new();
        for method in tree.methods() {
            if tree.body(method).is_some() {
                let cfg = compute_dataflow(&mut tree, method);
                methods.push(MethodInput { method, cfg });
            }
        }
        Self { tree, methods }
    }
}

/// Optimization of one method failed; the method keeps its last committed state
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{class}.{method}: pass {pass} failed: {error}")]
pub struct MethodFailure {
    pub class: String,
    pub method: String,
    pub pass: &'static str,
    pub error: IrError,
}

/// Trait for collecting pipeline-level metrics
pub trait MetricsCollector {
    /// Record metrics for a completed pass
    fn record_pass(&mut self, metrics: PassMetrics);
    /// Retrieve collected metrics
    fn collect(&self) -> &OptimizationMetrics;
}

/// Metrics collector that records metrics in memory
#[derive(Debug, Default)]
pub struct InMemoryMetricsCollector {
    metrics: OptimizationMetrics,
}

impl InMemoryMetricsCollector {
    /// Create a new collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, metrics: OptimizationMetrics) {
        self.metrics.merge(metrics);
    }
}

impl MetricsCollector for InMemoryMetricsCollector {
    fn record_pass(&mut self, m: PassMetrics) {
        self.metrics.pass_metrics.push(m);
        self.metrics.total_passes += 1;
    }
    fn collect(&self) -> &OptimizationMetrics {
        &self.metrics
    }
}

/// Outcome of optimizing one unit
#[derive(Default)]
struct UnitReport {
    metrics: InMemoryMetricsCollector,
    failures: Vec<MethodFailure>,
}

/// Core optimization pipeline that runs a series of passes
pub struct OptimizationPipeline {
    passes: Vec<Box<dyn OptimizationPass>>,
    metrics: InMemoryMetricsCollector,
    counters: Arc<Counters>,
    filter: Option<MethodFilter>,
    config: OptimizationConfig,
}

impl OptimizationPipeline {
    /// Create a new pipeline with the given config
    pub fn new(config: OptimizationConfig) -> Self {
        Self {
            passes: Vec::new(),
            metrics: InMemoryMetricsCollector::new(),
            counters: Arc::new(Counters::new()),
            filter: None,
            config,
        }
    }

    /// Add an optimization pass to the pipeline
    pub fn add_pass<P>(&mut self, pass: P)
    where
        P: OptimizationPass + 'static,
    {
        self.passes.push(Box::new(pass));
    }

    /// Names of the registered passes in run order
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    pub fn set_method_filter(&mut self, filter: MethodFilter) {
        self.filter = Some(filter);
    }

    pub fn config(&self) -> &OptimizationConfig {
        &self.config
    }

    /// Execute all passes on every scheduled method of `units`
    pub fn run(&mut self, units: &mut [CompilationUnit]) -> Vec<MethodFailure> {
        let strategy = self.config.execution_strategy;
        let this = &*self;
        let reports = strategy.run(units, |unit| this.run_unit(unit));

        let mut failures = Vec::new();
        for report in reports {
            self.metrics.merge(report.metrics.collect().clone());
            failures.extend(report.failures);
        }
        failures
    }

    fn run_unit(&self, unit: &mut CompilationUnit) -> UnitReport {
        let mut report = UnitReport::default();
        let CompilationUnit { tree, methods } = unit;
        for input in methods.iter_mut() {
            if let Some(reason) = self.skip_reason(tree, input.method) {
                trace!(method = %input.method, reason, "skipping method");
                report.metrics.metrics.methods_skipped += 1;
                continue;
            }
            if let Err(failure) = self.run_method(tree, input, &mut report.metrics) {
                report.failures.push(failure);
            }
        }
        report
    }

    /// Why `method` must not be optimized, if anything
    fn skip_reason(&self, tree: &Tree, method: NodeId) -> Option<&'static str> {
        let NodeKind::Method { modifiers, body, .. } = tree.kind(method) else {
            return Some("not a method");
        };
        if modifiers.intersects(Modifiers::NATIVE | Modifiers::ABSTRACT) {
            return Some("native or abstract");
        }
        if body.is_none() {
            return Some("no body");
        }
        let external = tree
            .enclosing_class(method)
            .is_some_and(|class| matches!(tree.kind(class), NodeKind::Class { external: true, .. }));
        if external {
            return Some("external class");
        }
        if tree.markers(method).has_tag(Tag::Simplified) && !self.config.rerun_simplified_methods {
            return Some("already simplified");
        }
        if let Some(filter) = &self.filter {
            if !filter(tree, method) {
                return Some("vetoed by filter");
            }
        }
        None
    }

    fn run_method(&self, tree: &mut Tree, input: &mut MethodInput, metrics: &mut InMemoryMetricsCollector) -> Result<(), MethodFailure> {
        let method = input.method;
        let (class_name, method_name) = qualified_name(tree, method);
        let span = debug_span!("optimize_method", class = %class_name, method = %method_name);
        let _enter = span.enter();

        let mut ctx = MethodContext::new(tree, &mut input.cfg, method, &self.counters);
        for pass in &self.passes {
            if !pass.is_enabled(&self.config) {
                continue;
            }
            if !pass.can_optimize(&ctx, &self.config) {
                trace!(pass = pass.name(), "preconditions not met");
                continue;
            }
            let start = Instant::now();
            match pass.optimize(&mut ctx, &self.config) {
                Ok(result) => {
                    debug!(pass = pass.name(), rewrites = result.rewrites, "pass finished");
                    metrics.metrics.warnings.extend(result.warnings);
                    metrics.record_pass(PassMetrics {
                        pass_name: pass.name().to_string(),
                        duration_us: start.elapsed().as_micros() as u64,
                        changed: result.changed,
                        rewrites: result.rewrites,
                    });
                }
                Err(error) => {
                    warn!(pass = pass.name(), %error, "method optimization failed");
                    return Err(MethodFailure {
                        class: class_name,
                        method: method_name,
                        pass: pass.name(),
                        error,
                    });
                }
            }
        }

        ctx.tree.markers_mut(method).tags.insert(Tag::Simplified);
        metrics.metrics.methods_optimized += 1;
        Ok(())
    }

    /// Retrieve pipeline-level metrics
    pub fn metrics(&self) -> &OptimizationMetrics {
        self.metrics.collect()
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Clear metrics and counters
    pub fn reset(&mut self) {
        self.metrics = InMemoryMetricsCollector::new();
        self.counters.reset();
    }
}

fn qualified_name(tree: &Tree, method: NodeId) -> (String, String) {
    let class = tree
        .enclosing_class(method)
        .and_then(|class| match tree.kind(class) {
            NodeKind::Class { name, .. } => Some(tree.name(*name)),
            _ => None,
        })
        .unwrap_or_default();
    let name = match tree.kind(method) {
        NodeKind::Method { name, .. } => tree.name(*name),
        _ => String::new(),
    };
    (class, name)
}
