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

//! Variable reads and writes performed by a single statement
//!
//! Only the statement's own expressions are inspected; nested statements (the
//! branches of an `if`, a loop body) belong to their own graph positions.

use crate::ir::{NodeId, NodeKind, Tree, VarId};

/// Read of a variable through a reference node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Read {
    pub node: NodeId,
    pub variable: VarId,
}

/// Write of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Write {
    /// Assignment, increment or decrement node carrying the definition
    pub writer: NodeId,
    /// Reference being written
    pub target: NodeId,
    pub variable: VarId,
}

/// Reads and writes of one statement; all reads happen before the writes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementAccesses {
    pub reads: Vec<Read>,
    pub writes: Vec<Write>,
}

impl StatementAccesses {
    /// Collect the accesses of `stmt`
    pub fn collect(tree: &Tree, stmt: NodeId) -> Self {
        let mut accesses = Self::default();
        let mut stack: Vec<NodeId> = tree.children(stmt).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            if tree.tag(node).is_statement() {
                continue;
            }
            match tree.kind(node) {
                NodeKind::LocalRef(variable) | NodeKind::ParameterRef(variable) | NodeKind::ThisRef(variable) => {
                    accesses.reads.push(Read { node, variable: *variable });
                    continue;
                }
                NodeKind::Assign { op, lhs, rhs } => {
                    if let Some(variable) = tree.referenced_variable(*lhs) {
                        if op.is_compound() {
                            accesses.reads.push(Read { node: *lhs, variable });
                        }
                        accesses.writes.push(Write {
                            writer: node,
                            target: *lhs,
                            variable,
                        });
                        stack.push(*rhs);
                        continue;
                    }
                }
                NodeKind::Prefix { op, operand, .. } if op.is_increment() => {
                    if let Some(variable) = tree.referenced_variable(*operand) {
                        accesses.reads.push(Read { node: *operand, variable });
                        accesses.writes.push(Write {
                            writer: node,
                            target: *operand,
                            variable,
                        });
                        continue;
                    }
                }
                NodeKind::Postfix { operand, .. } => {
                    if let Some(variable) = tree.referenced_variable(*operand) {
                        accesses.reads.push(Read { node: *operand, variable });
                        accesses.writes.push(Write {
                            writer: node,
                            target: *operand,
                            variable,
                        });
                        continue;
                    }
                }
                _ => {}
            }
            stack.extend(tree.children(node).into_iter().rev());
        }
        accesses
    }

    pub fn reads(&self, variable: VarId) -> bool {
        self.reads.iter().any(|read| read.variable == variable)
    }

    pub fn writes(&self, variable: VarId) -> bool {
        self.writes.iter().any(|write| write.variable == variable)
    }

    /// Reads or writes `variable`
    pub fn touches(&self, variable: VarId) -> bool {
        self.reads(variable) || self.writes(variable)
    }

    /// Last write of `variable` in the statement
    pub fn last_write(&self, variable: VarId) -> Option<&Write> {
        self.writes.iter().rev().find(|write| write.variable == variable)
    }
}
