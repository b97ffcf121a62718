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

//! Optimization pass interface

use crate::dataflow::ControlFlowGraph;
use crate::ir::{IrResult, NodeId, Tag, Tree};
use crate::mutation::{Edit, Transaction};
use crate::optimizer::config::OptimizationConfig;
use crate::optimizer::framework::counters::Counters;
use crate::optimizer::framework::metrics::OptimizationWarning;

/// Everything a pass may touch while optimizing one method
pub struct MethodContext<'a> {
    pub tree: &'a mut Tree,
    pub cfg: &'a mut ControlFlowGraph,
    pub method: NodeId,
    pub counters: &'a Counters,
}

impl<'a> MethodContext<'a> {
    pub fn new(tree: &'a mut Tree, cfg: &'a mut ControlFlowGraph, method: NodeId, counters: &'a Counters) -> Self {
        Self { tree, cfg, method, counters }
    }

    /// Start an empty transaction for this method
    pub fn transaction(&self) -> Transaction {
        Transaction::new(self.method)
    }

    /// Commit `transaction` and keep the control flow graph in sync with it
    pub fn commit(&mut self, transaction: Transaction) -> IrResult<Vec<Edit>> {
        let applied = transaction.commit(self.tree)?;
        self.cfg.sync_edits(self.tree, &applied);
        Ok(applied)
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tree.markers(self.method).has_tag(tag)
    }
}

/// Trait representing a single optimization pass
///
/// Passes are stateless between methods so one instance can serve every
/// compilation unit concurrently.
pub trait OptimizationPass: Send + Sync {
    /// Unique name of the pass
    fn name(&self) -> &'static str;
    /// Short description of the pass
    fn description(&self) -> &'static str;

    /// Whether the configuration turns the pass on
    fn is_enabled(&self, config: &OptimizationConfig) -> bool;

    /// Whether the method must carry the three-address form tag
    fn requires_three_address_form(&self) -> bool {
        false
    }

    /// Determine if the pass can run on the given method
    fn can_optimize(&self, ctx: &MethodContext<'_>, _config: &OptimizationConfig) -> bool {
        !self.requires_three_address_form() || ctx.has_tag(Tag::ThreeAddressForm)
    }

    /// Run the pass on one method
    fn optimize(&self, ctx: &mut MethodContext<'_>, config: &OptimizationConfig) -> IrResult<OptimizationResult>;
}

/// Result of running an optimization pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizationResult {
    /// Whether the pass changed the method
    pub changed: bool,
    /// Number of rewrites applied
    pub rewrites: usize,
    /// Warnings emitted during the pass
    pub warnings: Vec<OptimizationWarning>,
}

impl OptimizationResult {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn from_rewrites(rewrites: usize) -> Self {
        Self {
            changed: rewrites > 0,
            rewrites,
            warnings: Vec::new(),
        }
    }
}
