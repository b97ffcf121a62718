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

//! Def-use facts, control flow graphs and reaching-definition queries

pub mod access;
pub mod cfg;
pub mod facts;
pub mod query;
pub mod reaching;

pub use access::{Read, StatementAccesses, Write};
pub use cfg::{BasicBlock, BlockId, CfgBuilder, ControlFlowGraph, StatementPosition};
pub use query::{ReachingSet, reaching_definitions_at_entry, reaching_definitions_before, statement_of, writes_in_range};
pub use reaching::{DataflowSummary, ReachingDefinitions, compute_dataflow};
