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

//! Optimization framework: pass interface, pipeline, scheduling and metrics

pub mod counters;
pub mod metrics;
pub mod pass;
pub mod pipeline;
pub mod scheduler;

pub use counters::Counters;
pub use metrics::{OptimizationMetrics, OptimizationWarning, PassMetrics};
pub use pass::{MethodContext, OptimizationPass, OptimizationResult};
pub use pipeline::{CompilationUnit, InMemoryMetricsCollector, MethodFailure, MethodFilter, MethodInput, MetricsCollector, OptimizationPipeline};
pub use scheduler::ExecutionStrategy;
