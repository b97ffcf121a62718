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

//! Backward absorption of merge-point copies along def-use chains
//!
//! Matches a copy `s0: b = a` of a synthetic `a` whose reaching definitions
//! `p1: a = v1`, `p2: a = v2`, ... are each used only by `s0`, and rewrites
//! every `pi` to `b = vi` before deleting `s0`. The rewrite is legal when:
//!
//! 1. every path from method entry to `s0` passes through some `pi`;
//! 2. no path from a `pi` to `s0` reads or writes `b`;
//! 3. each `pi` is used only at `s0`;
//! 4. no read of `b` can be reached from a `pi` without crossing a write of `b`;
//! 5. `a` is written nowhere but at the `pi`.

use crate::dataflow::{BlockId, ControlFlowGraph, StatementAccesses, reaching_definitions_before};
use crate::ir::{DefId, IrResult, NodeId, NodeKind, Tree, VarId};
use crate::optimizer::config::OptimizationConfig;
use crate::optimizer::framework::{MethodContext, OptimizationPass, OptimizationResult};
use crate::optimizer::passes::{assignment_statement, plain_assignment};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, trace};

/// Absorbs `b = a` merge copies into the definitions of `a`
#[derive(Debug, Default, Clone, Copy)]
pub struct DefUseSimplifier;

impl DefUseSimplifier {
    pub const NAME: &'static str = "def-use-simplifier";

    pub fn new() -> Self {
        Self
    }
}

/// One incoming definition `pi: a = vi`
#[derive(Debug, Clone, Copy)]
struct Site {
    def: DefId,
    /// Left-hand side reference to `a`
    target_ref: NodeId,
    stmt: NodeId,
}

#[derive(Debug)]
struct Candidate {
    merge: NodeId,
    merge_def: DefId,
    target: VarId,
    sites: Vec<Site>,
}

/// Backward classification of a whole block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockClass {
    /// Touches neither `b` nor an incoming definition
    Neither,
    /// Reads or writes `b` before (walking backward) any incoming definition
    TouchesTarget,
    /// Reaches an incoming definition first
    DefinesTemp,
    Entry,
}

/// Match the copy pattern at `merge` and check all five conditions
fn candidate(tree: &Tree, cfg: &ControlFlowGraph, merge: NodeId) -> Option<Candidate> {
    let NodeKind::ExpressionStatement { expr } = tree.kind(merge) else {
        return None;
    };
    let (lhs, temp_read) = plain_assignment(tree, *expr)?;
    let target = tree.referenced_variable(lhs)?;
    let temp = tree.referenced_variable(temp_read)?;
    if target == temp || !tree.variable(temp).synthetic {
        return None;
    }
    let merge_def = tree.definition_of(*expr)?;
    let definitions = tree.use_defs(temp_read)?;
    if definitions.is_empty() {
        return None;
    }

    let mut sites = Vec::with_capacity(definitions.len());
    for &def in definitions {
        let marker = tree.definition(def);
        if !marker.live || marker.entry || marker.variable != temp {
            return None;
        }
        if marker.uses.len() != 1 || !marker.uses.contains(&temp_read) {
            trace!(merge = %merge, "incoming definition has other uses");
            return None;
        }
        let (target_ref, _) = plain_assignment(tree, marker.definition)?;
        if tree.referenced_variable(target_ref) != Some(temp) {
            return None;
        }
        let stmt = assignment_statement(tree, marker.definition)?;
        if stmt == merge || !cfg.contains(stmt) {
            return None;
        }
        sites.push(Site { def, target_ref, stmt });
    }

    let writers: HashSet<NodeId> = definitions.iter().map(|def| tree.definition(*def).definition).collect();
    let foreign_write = cfg
        .statements()
        .flat_map(|stmt| StatementAccesses::collect(tree, stmt).writes)
        .any(|write| write.variable == temp && !writers.contains(&write.writer));
    if foreign_write {
        trace!(merge = %merge, "temporary written outside the incoming definitions");
        return None;
    }

    let position = cfg.position_of(merge)?;
    let reaching = reaching_definitions_before(tree, cfg, temp, position)?;
    if reaching.from_entry || reaching.definitions != *definitions {
        trace!(merge = %merge, "some path reaches the copy without an incoming definition");
        return None;
    }

    let site_stmts: HashSet<NodeId> = sites.iter().map(|site| site.stmt).collect();
    if !sites_reach_merge_cleanly(tree, cfg, merge, target, &site_stmts) {
        trace!(merge = %merge, "target touched between an incoming definition and the copy");
        return None;
    }
    if !target_reads_shielded(tree, cfg, target, &site_stmts) {
        trace!(merge = %merge, "a read of the target is reachable from an incoming definition");
        return None;
    }

    Some(Candidate {
        merge,
        merge_def,
        target,
        sites,
    })
}

/// Outcome of scanning statements backward
enum Scan {
    /// Hit an incoming definition
    Stop,
    Fail,
    /// Reached the block start
    Continue,
}

/// Walk backward from `merge`; every path must hit an incoming definition
/// without touching `target`, reaching entry or looping back to `merge`
fn sites_reach_merge_cleanly(tree: &Tree, cfg: &ControlFlowGraph, merge: NodeId, target: VarId, sites: &HashSet<NodeId>) -> bool {
    let scan = |statements: &[NodeId]| {
        for &stmt in statements.iter().rev() {
            if stmt == merge {
                return Scan::Fail;
            }
            if sites.contains(&stmt) {
                return Scan::Stop;
            }
            if StatementAccesses::collect(tree, stmt).touches(target) {
                return Scan::Fail;
            }
        }
        Scan::Continue
    };

    let Some((block, index)) = cfg.position_of(merge) else {
        return false;
    };
    let mut worklist: Vec<BlockId> = match scan(&cfg.block(block).statements[..index]) {
        Scan::Stop => return true,
        Scan::Fail => return false,
        Scan::Continue => cfg.block(block).predecessors.iter().copied().collect(),
    };
    let mut visited = HashSet::new();
    while let Some(current) = worklist.pop() {
        if !visited.insert(current) {
            continue;
        }
        if current == cfg.entry_block {
            return false;
        }
        match scan(&cfg.block(current).statements) {
            Scan::Stop => {}
            Scan::Fail => return false,
            Scan::Continue => worklist.extend(cfg.block(current).predecessors.iter().copied()),
        }
    }
    true
}

/// No read of `target` is reachable backward to an incoming definition
/// without first meeting another access of `target`
fn target_reads_shielded(tree: &Tree, cfg: &ControlFlowGraph, target: VarId, sites: &HashSet<NodeId>) -> bool {
    let classify_statements = |statements: &[NodeId]| {
        for &stmt in statements.iter().rev() {
            if sites.contains(&stmt) {
                return BlockClass::DefinesTemp;
            }
            if StatementAccesses::collect(tree, stmt).touches(target) {
                return BlockClass::TouchesTarget;
            }
        }
        BlockClass::Neither
    };
    let mut classes: HashMap<BlockId, BlockClass> = HashMap::new();

    for block in cfg.blocks() {
        for (index, &stmt) in block.statements.iter().enumerate() {
            if !StatementAccesses::collect(tree, stmt).reads(target) {
                continue;
            }
            let mut worklist: Vec<BlockId> = match classify_statements(&block.statements[..index]) {
                BlockClass::DefinesTemp => return false,
                BlockClass::TouchesTarget | BlockClass::Entry => continue,
                BlockClass::Neither => block.predecessors.iter().copied().collect(),
            };
            let mut visited = HashSet::new();
            while let Some(current) = worklist.pop() {
                if !visited.insert(current) {
                    continue;
                }
                let class = *classes.entry(current).or_insert_with(|| {
                    if current == cfg.entry_block {
                        BlockClass::Entry
                    } else {
                        classify_statements(&cfg.block(current).statements)
                    }
                });
                match class {
                    BlockClass::DefinesTemp => return false,
                    BlockClass::TouchesTarget | BlockClass::Entry => {}
                    BlockClass::Neither => worklist.extend(cfg.block(current).predecessors.iter().copied()),
                }
            }
        }
    }
    true
}

impl OptimizationPass for DefUseSimplifier {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Rewrites incoming definitions of a copied temporary to define the copy target"
    }

    fn is_enabled(&self, config: &OptimizationConfig) -> bool {
        config.allows(config.enable_def_use_simplifier, 2)
    }

    fn requires_three_address_form(&self) -> bool {
        true
    }

    fn optimize(&self, ctx: &mut MethodContext<'_>, _config: &OptimizationConfig) -> IrResult<OptimizationResult> {
        let statements: Vec<NodeId> = ctx.cfg.statements().collect();
        let mut rewrites = 0;
        for merge in statements {
            if !ctx.cfg.contains(merge) {
                continue;
            }
            let Some(candidate) = candidate(ctx.tree, ctx.cfg, merge) else {
                continue;
            };

            let merge_uses: BTreeSet<NodeId> = ctx.tree.uses_of(candidate.merge_def).clone();
            let mut transaction = ctx.transaction();
            for site in &candidate.sites {
                let replacement = ctx.tree.var_ref(candidate.target);
                let source = ctx.tree.source(site.target_ref).clone();
                ctx.tree.set_source(replacement, source);
                transaction.replace(site.target_ref, replacement);
            }
            transaction.delete_statement(ctx.tree, candidate.merge);
            ctx.commit(transaction)?;

            for site in &candidate.sites {
                ctx.tree.retarget_definition(site.def, candidate.target);
                for &use_site in &merge_uses {
                    ctx.tree.link_use(site.def, use_site);
                }
            }
            trace!(merge = %candidate.merge, sites = candidate.sites.len(), "absorbed copy");
            rewrites += 1;
        }

        ctx.counters.add("def_use_simplifier.copies_absorbed", rewrites as u64);
        debug!(rewrites, "absorbed merge copies");
        Ok(OptimizationResult::from_rewrites(rewrites))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::compute_dataflow;
    use crate::ir::{BinaryOperator, JType, Modifiers, Tag};
    use crate::optimizer::framework::Counters;
    use jack_common::Registry;
    use std::sync::Arc;

    struct Fixture {
        tree: Tree,
        method: NodeId,
        body: NodeId,
        x: VarId,
        t: VarId,
        r: VarId,
    }

    fn fixture() -> Fixture {
        let mut tree = Tree::new(Arc::new(Registry::new()));
        let class = tree.class("Demo", Modifiers::PUBLIC);
        let method = tree.method(class, "run", JType::INT, Modifiers::STATIC);
        tree.markers_mut(method).tags.insert(Tag::ThreeAddressForm);
        let x = tree.parameter(method, "x", JType::INT);
        let t = tree.synthetic_local(method, "t", JType::INT);
        let r = tree.local(method, "r", JType::INT);
        let body = tree.body(method).unwrap();
        Fixture { tree, method, body, x, t, r }
    }

    fn run(tree: &mut Tree, method: NodeId) -> OptimizationResult {
        let mut cfg = compute_dataflow(tree, method);
        let counters = Counters::new();
        let mut ctx = MethodContext::new(tree, &mut cfg, method, &counters);
        DefUseSimplifier.optimize(&mut ctx, &OptimizationConfig::default()).unwrap()
    }

    fn assigned_variable(tree: &Tree, stmt: NodeId) -> Option<VarId> {
        let expr = tree.children(stmt)[0];
        tree.referenced_variable(tree.children(expr)[0])
    }

    /// `if (x > 0) t = x + 1; else t = 2; r = t; return r;`
    fn diamond(fixture: &mut Fixture) -> (NodeId, NodeId, NodeId, NodeId) {
        let Fixture { tree, body, x, t, r, .. } = fixture;
        let (x, t, r, body) = (*x, *t, *r, *body);
        let x_cond = tree.var_ref(x);
        let zero = tree.int(0);
        let cond = tree.binary(BinaryOperator::Gt, x_cond, zero);
        let x_read = tree.var_ref(x);
        let one = tree.int(1);
        let sum = tree.binary(BinaryOperator::Add, x_read, one);
        let then_stmt = tree.assign_stmt(t, sum);
        let two = tree.int(2);
        let else_stmt = tree.assign_stmt(t, two);
        let branch = tree.if_stmt(cond, then_stmt, Some(else_stmt));
        let t_read = tree.var_ref(t);
        let merge = tree.assign_stmt(r, t_read);
        let r_read = tree.var_ref(r);
        let ret = tree.return_stmt(Some(r_read));
        tree.append(body, branch).unwrap();
        tree.append(body, merge).unwrap();
        tree.append(body, ret).unwrap();
        (then_stmt, else_stmt, merge, r_read)
    }

    #[test]
    fn test_absorbs_copy_at_merge() {
        let mut fixture = fixture();
        let (then_stmt, else_stmt, merge, r_read) = diamond(&mut fixture);
        let Fixture { mut tree, method, body, r, .. } = fixture;

        let result = run(&mut tree, method);
        assert_eq!(result.rewrites, 1);
        assert_eq!(assigned_variable(&tree, then_stmt), Some(r));
        assert_eq!(assigned_variable(&tree, else_stmt), Some(r));
        assert!(!tree.children(body).contains(&merge));

        let then_def = tree.definition_of(tree.children(then_stmt)[0]).unwrap();
        let else_def = tree.definition_of(tree.children(else_stmt)[0]).unwrap();
        assert_eq!(tree.definition(then_def).variable, r);
        assert_eq!(tree.use_defs(r_read), Some(&BTreeSet::from([then_def, else_def])));
        tree.check_def_use_symmetry().unwrap();
        tree.validate(tree.root()).unwrap();
    }

    #[test]
    fn test_rejects_target_read_on_incoming_path() {
        let mut fixture = fixture();
        let Fixture { tree, body, x, t, r, .. } = &mut fixture;
        let (x, t, r, body) = (*x, *t, *r, *body);
        let x_read = tree.var_ref(x);
        let def_stmt = tree.assign_stmt(t, x_read);
        let r_peek = tree.var_ref(r);
        let call = tree.call(None, "Log", "peek", vec![r_peek], JType::VOID);
        let peek = tree.expr_stmt(call);
        let t_read = tree.var_ref(t);
        let merge = tree.assign_stmt(r, t_read);
        let r_read = tree.var_ref(r);
        let ret = tree.return_stmt(Some(r_read));
        for stmt in [def_stmt, peek, merge, ret] {
            tree.append(body, stmt).unwrap();
        }
        let method = fixture.method;

        assert!(!run(&mut fixture.tree, method).changed);
        assert!(fixture.tree.children(body).contains(&merge));
    }

    #[test]
    fn test_rejects_non_synthetic_temporary() {
        let mut fixture = fixture();
        let Fixture { tree, body, x, r, method, .. } = &mut fixture;
        let (x, r, body, method) = (*x, *r, *body, *method);
        let named = tree.local(method, "named", JType::INT);
        let x_read = tree.var_ref(x);
        let def_stmt = tree.assign_stmt(named, x_read);
        let named_read = tree.var_ref(named);
        let merge = tree.assign_stmt(r, named_read);
        let r_read = tree.var_ref(r);
        let ret = tree.return_stmt(Some(r_read));
        for stmt in [def_stmt, merge, ret] {
            tree.append(body, stmt).unwrap();
        }

        assert!(!run(&mut fixture.tree, method).changed);
    }

    #[test]
    fn test_rejects_temporary_with_second_use() {
        let mut fixture = fixture();
        let Fixture { tree, body, x, t, r, method, .. } = &mut fixture;
        let (x, t, r, body, method) = (*x, *t, *r, *body, *method);
        let x_read = tree.var_ref(x);
        let def_stmt = tree.assign_stmt(t, x_read);
        let t_read = tree.var_ref(t);
        let merge = tree.assign_stmt(r, t_read);
        let t_again = tree.var_ref(t);
        let ret = tree.return_stmt(Some(t_again));
        for stmt in [def_stmt, merge, ret] {
            tree.append(body, stmt).unwrap();
        }

        assert!(!run(&mut fixture.tree, method).changed);
    }

    #[test]
    fn test_rejects_path_without_incoming_definition() {
        // if (x > 0) t = x + 1; r = t; return r;
        let mut fixture = fixture();
        let Fixture { tree, body, x, t, r, method } = &mut fixture;
        let (x, t, r, body, method) = (*x, *t, *r, *body, *method);
        let x_cond = tree.var_ref(x);
        let zero = tree.int(0);
        let cond = tree.binary(BinaryOperator::Gt, x_cond, zero);
        let x_read = tree.var_ref(x);
        let one = tree.int(1);
        let sum = tree.binary(BinaryOperator::Add, x_read, one);
        let then_stmt = tree.assign_stmt(t, sum);
        let branch = tree.if_stmt(cond, then_stmt, None);
        let t_read = tree.var_ref(t);
        let merge = tree.assign_stmt(r, t_read);
        let r_read = tree.var_ref(r);
        let ret = tree.return_stmt(Some(r_read));
        for stmt in [branch, merge, ret] {
            tree.append(body, stmt).unwrap();
        }

        assert!(!run(&mut fixture.tree, method).changed);
        assert!(fixture.tree.children(body).contains(&merge));
        assert_eq!(assigned_variable(&fixture.tree, then_stmt), Some(t));
    }

    #[test]
    fn test_rejects_target_read_reachable_from_incoming_definition() {
        // t = x; if (x > 0) return r; r = t; return r;
        let mut fixture = fixture();
        let Fixture { tree, body, x, t, r, method } = &mut fixture;
        let (x, t, r, body, method) = (*x, *t, *r, *body, *method);
        let x_read = tree.var_ref(x);
        let def_stmt = tree.assign_stmt(t, x_read);
        let x_cond = tree.var_ref(x);
        let zero = tree.int(0);
        let cond = tree.binary(BinaryOperator::Gt, x_cond, zero);
        let r_early = tree.var_ref(r);
        let early = tree.return_stmt(Some(r_early));
        let branch = tree.if_stmt(cond, early, None);
        let t_read = tree.var_ref(t);
        let merge = tree.assign_stmt(r, t_read);
        let r_read = tree.var_ref(r);
        let ret = tree.return_stmt(Some(r_read));
        for stmt in [def_stmt, branch, merge, ret] {
            tree.append(body, stmt).unwrap();
        }

        assert!(!run(&mut fixture.tree, method).changed);
        assert!(fixture.tree.children(body).contains(&merge));
        assert_eq!(assigned_variable(&fixture.tree, def_stmt), Some(t));
    }

    #[test]
    fn test_rejects_temporary_written_elsewhere() {
        // t = x; r = t; t = 2; return r;
        let mut fixture = fixture();
        let Fixture { tree, body, x, t, r, method } = &mut fixture;
        let (x, t, r, body, method) = (*x, *t, *r, *body, *method);
        let x_read = tree.var_ref(x);
        let def_stmt = tree.assign_stmt(t, x_read);
        let t_read = tree.var_ref(t);
        let merge = tree.assign_stmt(r, t_read);
        let two = tree.int(2);
        let rewrite = tree.assign_stmt(t, two);
        let r_read = tree.var_ref(r);
        let ret = tree.return_stmt(Some(r_read));
        for stmt in [def_stmt, merge, rewrite, ret] {
            tree.append(body, stmt).unwrap();
        }

        assert!(!run(&mut fixture.tree, method).changed);
        assert!(fixture.tree.children(body).contains(&merge));
    }
}
