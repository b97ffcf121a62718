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

//! Typed IR tree of a Java compilation unit

pub mod builder;
pub mod capabilities;
pub mod error;
pub mod literal;
pub mod marker;
pub mod node;
pub mod operator;
pub mod tree;
pub mod types;
pub mod variable;

pub use capabilities::SideEffect;
pub use error::{IrError, IrResult};
pub use literal::{LiteralValue, Numeric};
pub use marker::{DefId, DefinitionMarker, MarkerSet, Tag, UseDefsMarker};
pub use node::{Modifiers, Node, NodeId, NodeKind, NodeTag};
pub use operator::{AssignOperator, BinaryOperator, PostfixOperator, PrefixOperator};
pub use tree::{MemberLoader, Tree};
pub use types::{JType, PrimitiveType};
pub use variable::{VarId, Variable, VariableKind};
