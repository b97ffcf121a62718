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

//! Forward copy propagation along use-def chains
//!
//! A read of `a` whose only reaching definition is `s0: a = b` is rewritten to
//! read `b` directly when `b` provably holds the same value at the read:
//!
//! - in the same block, no statement strictly between `s0` and the read writes `b`;
//! - across blocks, the definitions of `b` reaching `s0` are exactly those
//!   reaching the entry of the reading block, and the reading block writes no
//!   `b` before the read.
//!
//! The copy itself is left in place; [`UnusedDefinitionRemover`] deletes it
//! once it has no uses.
//!
//! [`UnusedDefinitionRemover`]: super::UnusedDefinitionRemover

use crate::dataflow::{ControlFlowGraph, StatementAccesses, reaching_definitions_at_entry, reaching_definitions_before, statement_of, writes_in_range};
use crate::ir::{DefId, IrResult, NodeId, Tree, VarId};
use crate::optimizer::config::OptimizationConfig;
use crate::optimizer::framework::{MethodContext, OptimizationPass, OptimizationResult};
use crate::optimizer::passes::{plain_assignment, refresh_definition_value};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Copy propagation from `a = b` into reads of `a`
#[derive(Debug, Default, Clone, Copy)]
pub struct UseDefSimplifier;

impl UseDefSimplifier {
    pub const NAME: &'static str = "use-def-simplifier";

    pub fn new() -> Self {
        Self
    }
}

/// A read of `a` that may read `source` instead
#[derive(Debug)]
struct Propagation {
    use_site: NodeId,
    source: VarId,
    /// Definitions reaching the read of `source` in the copy
    source_definitions: BTreeSet<DefId>,
}

/// Legality check for replacing the read `use_site` of `variable`
fn propagation(tree: &Tree, cfg: &ControlFlowGraph, use_site: NodeId, variable: VarId) -> Option<Propagation> {
    let def = tree.markers(use_site).use_defs.as_ref()?.single()?;
    let marker = tree.definition(def);
    if !marker.live || marker.entry || marker.variable != variable {
        return None;
    }
    let copy_read = marker.value?;
    let source = tree.referenced_variable(copy_read)?;
    if source == variable || plain_assignment(tree, marker.definition).map(|(_, rhs)| rhs) != Some(copy_read) {
        return None;
    }

    let s0 = statement_of(tree, cfg, marker.definition)?;
    let s1 = statement_of(tree, cfg, use_site)?;
    if s0 == s1 {
        return None;
    }
    let (block0, index0) = cfg.position_of(s0)?;
    let (block1, index1) = cfg.position_of(s1)?;

    if block0 == block1 {
        if index0 >= index1 {
            trace!(use_site = %use_site, "copy follows the read in its block");
            return None;
        }
        if writes_in_range(tree, cfg, source, block0, index0 + 1..index1) {
            trace!(use_site = %use_site, "source redefined between copy and read");
            return None;
        }
    } else {
        let at_copy = reaching_definitions_before(tree, cfg, source, (block0, index0))?;
        let at_block = reaching_definitions_at_entry(tree, cfg, source, block1)?;
        if at_copy != at_block {
            trace!(use_site = %use_site, "different definitions of the source reach the read");
            return None;
        }
        if writes_in_range(tree, cfg, source, block1, 0..index1) {
            trace!(use_site = %use_site, "source redefined before the read");
            return None;
        }
    }

    Some(Propagation {
        use_site,
        source,
        source_definitions: tree.use_defs(copy_read).cloned().unwrap_or_default(),
    })
}

impl OptimizationPass for UseDefSimplifier {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Propagates copies forward into the reads they reach"
    }

    fn is_enabled(&self, config: &OptimizationConfig) -> bool {
        config.allows(config.enable_use_def_simplifier, 2)
    }

    fn requires_three_address_form(&self) -> bool {
        true
    }

    fn optimize(&self, ctx: &mut MethodContext<'_>, _config: &OptimizationConfig) -> IrResult<OptimizationResult> {
        let reads: Vec<(NodeId, VarId)> = ctx
            .cfg
            .statements()
            .flat_map(|stmt| StatementAccesses::collect(ctx.tree, stmt).reads)
            .map(|read| (read.node, read.variable))
            .collect();

        let mut rewrites = 0;
        for (use_site, variable) in reads {
            // Earlier commits may have detached the read
            if ctx.tree.parent(use_site).is_none() {
                continue;
            }
            let Some(propagation) = propagation(ctx.tree, ctx.cfg, use_site, variable) else {
                continue;
            };
            let replacement = ctx.tree.var_ref(propagation.source);
            let source = ctx.tree.source(use_site).clone();
            ctx.tree.set_source(replacement, source);

            let mut transaction = ctx.transaction();
            transaction.replace(propagation.use_site, replacement);
            ctx.commit(transaction)?;

            ctx.tree.markers_mut(replacement).use_defs.get_or_insert_with(Default::default);
            for def in propagation.source_definitions {
                ctx.tree.link_use(def, replacement);
            }
            refresh_definition_value(ctx.tree, replacement);
            rewrites += 1;
        }

        ctx.counters.add("use_def_simplifier.copies_propagated", rewrites as u64);
        debug!(rewrites, "propagated copies");
        Ok(OptimizationResult::from_rewrites(rewrites))
    }
}
