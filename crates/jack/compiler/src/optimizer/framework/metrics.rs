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

//! Pipeline metrics types

use serde::Serialize;

/// Metrics for one pass invocation on one method
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassMetrics {
    /// Name of the pass
    pub pass_name: String,
    /// Wall-clock duration in microseconds
    pub duration_us: u64,
    /// Whether the pass changed the method
    pub changed: bool,
    /// Number of rewrites applied
    pub rewrites: usize,
}

/// Warning emitted by a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptimizationWarning {
    /// Pass that emitted the warning
    pub pass_name: String,
    /// Warning message
    pub message: String,
}

/// Global optimization metrics recorded by the pipeline
#[derive(Default, Debug, Clone, Serialize)]
pub struct OptimizationMetrics {
    /// Per-pass metrics summary
    pub pass_metrics: Vec<PassMetrics>,
    /// Total number of passes executed
    pub total_passes: usize,
    /// Methods the pipeline ran on
    pub methods_optimized: usize,
    /// Methods skipped as ineligible
    pub methods_skipped: usize,
    /// Warnings collected from all passes
    pub warnings: Vec<OptimizationWarning>,
}

impl OptimizationMetrics {
    /// Sum of rewrites recorded for `pass_name`
    pub fn rewrites_for(&self, pass_name: &str) -> usize {
        self.pass_metrics.iter().filter(|metrics| metrics.pass_name == pass_name).map(|metrics| metrics.rewrites).sum()
    }

    pub fn total_rewrites(&self) -> usize {
        self.pass_metrics.iter().map(|metrics| metrics.rewrites).sum()
    }

    /// Fold another unit's metrics into these
    pub fn merge(&mut self, other: OptimizationMetrics) {
        self.pass_metrics.extend(other.pass_metrics);
        self.total_passes += other.total_passes;
        self.methods_optimized += other.methods_optimized;
        self.methods_skipped += other.methods_skipped;
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass(name: &str, rewrites: usize) -> PassMetrics {
        PassMetrics {
            pass_name: name.to_string(),
            duration_us: 0,
            changed: rewrites > 0,
            rewrites,
        }
    }

    #[test]
    fn test_merge_and_totals() {
        let mut first = OptimizationMetrics {
            pass_metrics: vec![pass("fold", 2)],
            total_passes: 1,
            methods_optimized: 1,
            ..Default::default()
        };
        let second = OptimizationMetrics {
            pass_metrics: vec![pass("fold", 3), pass("negate", 1)],
            total_passes: 2,
            methods_optimized: 1,
            methods_skipped: 4,
            ..Default::default()
        };
        first.merge(second);
        assert_eq!(first.rewrites_for("fold"), 5);
        assert_eq!(first.total_rewrites(), 6);
        assert_eq!(first.total_passes, 3);
        assert_eq!(first.methods_skipped, 4);
    }

    #[test]
    fn test_serializes_to_json() {
        let metrics = OptimizationMetrics {
            pass_metrics: vec![pass("fold", 1)],
            total_passes: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["total_passes"], 1);
        assert_eq!(json["pass_metrics"][0]["pass_name"], "fold");
    }
}
