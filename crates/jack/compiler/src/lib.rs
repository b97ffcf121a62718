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

//! Typed IR and optimizer core of the Jack Java compiler
//!
//! The [`ir`] module holds the node tree with parent tracking and dataflow
//! markers, [`visitor`] walks it by double dispatch, [`mutation`] edits it
//! through transactions, [`dataflow`] computes reaching definitions over a
//! method's control flow graph, and [`optimizer`] runs the rewriting passes.

pub mod dataflow;
pub mod ir;
pub mod mutation;
pub mod optimizer;
pub mod visitor;

pub use dataflow::{ControlFlowGraph, compute_dataflow};
pub use ir::{IrError, IrResult, NodeId, Tree};
pub use mutation::{Edit, EditKind, Transaction};
pub use optimizer::Optimizer;
pub use optimizer::config::{OptimizationConfig, RemovalPolicy};
pub use optimizer::framework::{CompilationUnit, Counters, MethodFailure};
pub use visitor::{Visitor, accept};
