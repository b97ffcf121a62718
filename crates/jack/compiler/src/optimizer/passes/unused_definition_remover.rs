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

//! Cascading removal of dead assignments
//!
//! An assignment whose definition reaches no use is deleted when its
//! right-hand side is pure. Deleting `a = b` drops one use of every definition
//! of `b` reaching it, and definitions left unused by that are removed in turn.

use super::{assignment_statement, plain_assignment};
use crate::dataflow::statement_of;
use crate::ir::{DefId, IrResult, NodeId, NodeTag};
use crate::mutation::is_deletable_statement;
use crate::optimizer::config::{OptimizationConfig, RemovalPolicy};
use crate::optimizer::framework::{MethodContext, OptimizationPass, OptimizationResult};
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, trace};

/// Deletes assignments to variables that are never read afterwards
#[derive(Debug, Default, Clone, Copy)]
pub struct UnusedDefinitionRemover;

impl UnusedDefinitionRemover {
    pub const NAME: &'static str = "unused-definition-remover";

    pub fn new() -> Self {
        Self
    }

    /// Live non-entry definitions written inside this method that have no use
    fn unused_definitions(ctx: &MethodContext<'_>) -> Vec<DefId> {
        ctx.tree
            .definitions()
            .filter(|(_, marker)| marker.live && !marker.entry && marker.is_unused())
            .filter(|(_, marker)| statement_of(ctx.tree, ctx.cfg, marker.definition).is_some())
            .map(|(def, _)| def)
            .collect()
    }

    /// Statement to delete for `def`, if the definition may go
    fn removable_statement(ctx: &MethodContext<'_>, def: DefId, policy: RemovalPolicy) -> Option<NodeId> {
        let tree = &*ctx.tree;
        let marker = tree.definition(def);
        if !marker.live || marker.entry || !marker.is_unused() {
            return None;
        }
        let (lhs, rhs) = plain_assignment(tree, marker.definition)?;
        if tree.referenced_variable(lhs) != Some(marker.variable) {
            return None;
        }
        if tree.tag(rhs) == NodeTag::ExceptionRuntimeValue || !tree.is_pure(rhs) {
            return None;
        }
        if policy == RemovalPolicy::SyntheticOnly && !tree.variable(marker.variable).synthetic {
            return None;
        }
        let stmt = assignment_statement(tree, marker.definition)?;
        (ctx.cfg.contains(stmt) && is_deletable_statement(tree, stmt)).then_some(stmt)
    }
}

impl OptimizationPass for UnusedDefinitionRemover {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Removes dead assignments, cascading through copies"
    }

    fn is_enabled(&self, config: &OptimizationConfig) -> bool {
        config.allows(config.enable_unused_definition_remover, 2)
    }

    fn optimize(&self, ctx: &mut MethodContext<'_>, config: &OptimizationConfig) -> IrResult<OptimizationResult> {
        let mut worklist: VecDeque<DefId> = Self::unused_definitions(ctx).into();
        let mut removed = 0;

        while let Some(def) = worklist.pop_front() {
            let Some(stmt) = Self::removable_statement(ctx, def, config.removal_policy) else {
                continue;
            };
            let writer = ctx.tree.definition(def).definition;
            let feeding: BTreeSet<DefId> = match plain_assignment(ctx.tree, writer) {
                Some((_, rhs)) if ctx.tree.referenced_variable(rhs).is_some() => ctx.tree.use_defs(rhs).cloned().unwrap_or_default(),
                _ => BTreeSet::new(),
            };

            let mut transaction = ctx.transaction();
            transaction.delete_statement(ctx.tree, stmt);
            ctx.commit(transaction)?;
            removed += 1;
            trace!(definition = %def, statement = %stmt, "removed dead assignment");

            worklist.extend(feeding.into_iter().filter(|feeder| {
                let marker = ctx.tree.definition(*feeder);
                marker.live && !marker.entry && marker.is_unused()
            }));
        }

        ctx.counters.add("unused_definition_remover.removed", removed as u64);
        debug!(removed, "removed unused definitions");
        Ok(OptimizationResult::from_rewrites(removed))
    }
}
