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

//! Constant refinement
//!
//! Folds primitive casts of literal operands and substitutes literal values for
//! variable references that have exactly one reaching definition. When every
//! use of a definition was substituted, its assignment statement is deleted as
//! well. Deletion does not cascade here; [`UnusedDefinitionRemover`] does that.
//!
//! [`UnusedDefinitionRemover`]: super::UnusedDefinitionRemover

use crate::ir::{DefId, IrResult, JType, LiteralValue, NodeId, NodeKind, Tree};
use crate::mutation::is_deletable_statement;
use crate::optimizer::config::OptimizationConfig;
use crate::optimizer::framework::{MethodContext, OptimizationPass, OptimizationResult};
use crate::optimizer::passes::{assignment_statement, is_write_target, plain_assignment, refresh_definition_value};
use crate::visitor::{Visitor, accept};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Replacement of one node by a literal
#[derive(Debug, Clone, Copy)]
struct Rewrite {
    /// Node replaced: a cast or a variable reference
    target: NodeId,
    value: LiteralValue,
    /// Literal node to clone when `value` needs no conversion
    clone_of: Option<NodeId>,
    /// Definition whose use is substituted
    substituted: Option<DefId>,
}

#[derive(Default)]
struct CandidateCollector {
    rewrites: Vec<Rewrite>,
}

impl Visitor for CandidateCollector {
    fn visit_cast(&mut self, tree: &mut Tree, id: NodeId) -> bool {
        if let NodeKind::Cast { ty: JType::Primitive(target), expr } = tree.kind(id) {
            if let Some(value) = tree.literal(*expr).and_then(|literal| literal.coerce(*target)) {
                self.rewrites.push(Rewrite {
                    target: id,
                    value,
                    clone_of: None,
                    substituted: None,
                });
                return false;
            }
        }
        true
    }

    fn visit_variable_ref(&mut self, tree: &mut Tree, id: NodeId) -> bool {
        if let Some(rewrite) = substitution(tree, id) {
            self.rewrites.push(rewrite);
        }
        false
    }
}

/// Literal substitution for a variable read, if its only definition is a literal
fn substitution(tree: &Tree, reference: NodeId) -> Option<Rewrite> {
    if is_write_target(tree, reference) {
        return None;
    }
    let variable = tree.referenced_variable(reference)?;
    let Some(def) = tree.markers(reference).use_defs.as_ref()?.single() else {
        trace!(use_site = %reference, "not exactly one reaching definition");
        return None;
    };
    let marker = tree.definition(def);
    if !marker.live || marker.entry || marker.variable != variable {
        return None;
    }
    let value_node = marker.value?;
    let literal = *tree.literal(value_node)?;
    if tree.can_throw(value_node) || plain_assignment(tree, marker.definition).map(|(_, rhs)| rhs) != Some(value_node) {
        return None;
    }

    let mut rewrite = Rewrite {
        target: reference,
        value: literal,
        clone_of: Some(value_node),
        substituted: Some(def),
    };
    // The variable may be wider than its initializer (`long x = 5`)
    if let Some(declared) = tree.variable(variable).ty.as_primitive() {
        if literal.primitive_type() != Some(declared) {
            rewrite.value = literal.coerce(declared)?;
            rewrite.clone_of = None;
        }
    }
    if let Some(parent) = tree.parent(reference) {
        if let NodeKind::Cast { ty: JType::Primitive(target), expr } = tree.kind(parent) {
            if *expr == reference {
                rewrite.value = rewrite.value.coerce(*target)?;
                rewrite.target = parent;
                rewrite.clone_of = None;
            }
        }
    }
    Some(rewrite)
}

/// Folds literal casts and propagates single-definition literals
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstantRefiner;

impl ConstantRefiner {
    pub const NAME: &'static str = "constant-refiner";

    pub fn new() -> Self {
        Self
    }
}

impl OptimizationPass for ConstantRefiner {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Substitutes single-definition literals for variable reads and folds literal casts"
    }

    fn is_enabled(&self, config: &OptimizationConfig) -> bool {
        config.allows(config.enable_constant_refiner, 1)
    }

    fn optimize(&self, ctx: &mut MethodContext<'_>, _config: &OptimizationConfig) -> IrResult<OptimizationResult> {
        let Some(body) = ctx.tree.body(ctx.method) else {
            return Ok(OptimizationResult::unchanged());
        };
        let mut collector = CandidateCollector::default();
        accept(ctx.tree, body, &mut collector)?;
        if collector.rewrites.is_empty() {
            return Ok(OptimizationResult::unchanged());
        }

        let mut transaction = ctx.transaction();
        let mut substituted: BTreeMap<DefId, usize> = BTreeMap::new();
        let (mut casts, mut uses) = (0, 0);
        let mut replacements = Vec::with_capacity(collector.rewrites.len());
        for rewrite in &collector.rewrites {
            let replacement = match rewrite.clone_of {
                Some(literal) => ctx.tree.clone_subtree(literal),
                None => {
                    let source = ctx.tree.source(rewrite.target).clone();
                    ctx.tree.add(NodeKind::Literal(rewrite.value), source)
                }
            };
            transaction.replace(rewrite.target, replacement);
            replacements.push(replacement);
            match rewrite.substituted {
                Some(def) => {
                    *substituted.entry(def).or_default() += 1;
                    uses += 1;
                }
                None => casts += 1,
            }
        }

        let mut removed = 0;
        for (def, count) in substituted {
            let marker = ctx.tree.definition(def);
            let writer = marker.definition;
            if marker.uses.len() != count {
                continue;
            }
            let Some(stmt) = assignment_statement(ctx.tree, writer) else {
                continue;
            };
            if is_deletable_statement(ctx.tree, stmt) {
                transaction.delete_statement(ctx.tree, stmt);
                removed += 1;
            }
        }

        ctx.commit(transaction)?;
        for replacement in replacements {
            refresh_definition_value(ctx.tree, replacement);
        }
        ctx.counters.add("constant_refiner.casts_folded", casts as u64);
        ctx.counters.add("constant_refiner.uses_substituted", uses as u64);
        ctx.counters.add("constant_refiner.definitions_removed", removed as u64);
        debug!(casts, uses, removed, "refined constants");
        Ok(OptimizationResult::from_rewrites(casts + uses + removed))
    }
}
