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

//! Configuration for the optimizer pipeline

use crate::optimizer::framework::scheduler::ExecutionStrategy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest supported optimization level
pub const MAX_OPTIMIZATION_LEVEL: u8 = 3;

/// Which variables the unused definition remover may delete assignments to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Only compiler-introduced temporaries
    #[default]
    SyntheticOnly,
    /// Any local variable
    AnyVariable,
}

/// Errors produced while loading or validating a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Optimization level must be between 0 and 3, got {level}")]
    InvalidLevel { level: u8 },

    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration for the optimizer pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    /// Optimization level (0-3); 0 disables every pass, dataflow passes need 2
    pub optimization_level: u8,

    /// Whether to substitute single-definition literal values and fold literal casts
    pub enable_constant_refiner: bool,

    /// Whether to propagate copies forward along use-def chains
    pub enable_use_def_simplifier: bool,

    /// Whether to absorb merge-point copies into their incoming definitions
    pub enable_def_use_simplifier: bool,

    /// Whether to delete unused side-effect-free assignments
    pub enable_unused_definition_remover: bool,

    /// Whether to fold literal expressions
    pub enable_expression_simplifier: bool,

    /// Whether to push negations inward when it shrinks the expression
    pub enable_not_simplifier: bool,

    /// Whether `x instanceof null` folds to `false`
    pub fold_instanceof_null: bool,

    /// Variables whose dead assignments may be removed
    pub removal_policy: RemovalPolicy,

    /// Whether methods already tagged as simplified run again
    pub rerun_simplified_methods: bool,

    /// How compilation units are scheduled
    pub execution_strategy: ExecutionStrategy,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            optimization_level: 2,
            enable_constant_refiner: true,
            enable_use_def_simplifier: true,
            enable_def_use_simplifier: true,
            enable_unused_definition_remover: true,
            enable_expression_simplifier: true,
            enable_not_simplifier: true,
            fold_instanceof_null: false,
            removal_policy: RemovalPolicy::SyntheticOnly,
            rerun_simplified_methods: false,
            execution_strategy: ExecutionStrategy::Sequential,
        }
    }
}

impl OptimizationConfig {
    /// Create a debug configuration that leaves the IR untouched
    pub fn debug() -> Self {
        Self {
            optimization_level: 0,
            enable_constant_refiner: false,
            enable_use_def_simplifier: false,
            enable_def_use_simplifier: false,
            enable_unused_definition_remover: false,
            enable_expression_simplifier: false,
            enable_not_simplifier: false,
            ..Default::default()
        }
    }

    /// Create a release configuration with maximum optimizations
    pub fn release() -> Self {
        Self {
            optimization_level: MAX_OPTIMIZATION_LEVEL,
            fold_instanceof_null: true,
            execution_strategy: ExecutionStrategy::Parallel,
            ..Default::default()
        }
    }

    /// Decode a configuration; missing fields take their default values
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.optimization_level > MAX_OPTIMIZATION_LEVEL {
            return Err(ConfigError::InvalidLevel {
                level: self.optimization_level,
            });
        }
        Ok(())
    }

    /// Whether a pass gated by `flag` runs at `min_level` or above
    pub fn allows(&self, flag: bool, min_level: u8) -> bool {
        flag && self.optimization_level > 0 && self.optimization_level >= min_level
    }

    pub fn with_optimization_level(mut self, level: u8) -> Self {
        self.optimization_level = level;
        self
    }

    pub fn with_constant_refiner(mut self, enabled: bool) -> Self {
        self.enable_constant_refiner = enabled;
        self
    }

    pub fn with_use_def_simplifier(mut self, enabled: bool) -> Self {
        self.enable_use_def_simplifier = enabled;
        self
    }

    pub fn with_def_use_simplifier(mut self, enabled: bool) -> Self {
        self.enable_def_use_simplifier = enabled;
        self
    }

    pub fn with_unused_definition_remover(mut self, enabled: bool) -> Self {
        self.enable_unused_definition_remover = enabled;
        self
    }

    pub fn with_expression_simplifier(mut self, enabled: bool) -> Self {
        self.enable_expression_simplifier = enabled;
        self
    }

    pub fn with_not_simplifier(mut self, enabled: bool) -> Self {
        self.enable_not_simplifier = enabled;
        self
    }

    pub fn with_fold_instanceof_null(mut self, enabled: bool) -> Self {
        self.fold_instanceof_null = enabled;
        self
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = policy;
        self
    }

    pub fn with_rerun_simplified_methods(mut self, enabled: bool) -> Self {
        self.rerun_simplified_methods = enabled;
        self
    }

    pub fn with_execution_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.execution_strategy = strategy;
        self
    }
}
