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

//! Storage locations referenced by variable reference nodes

use crate::ir::types::JType;
use jack_common::Symbol;
use std::fmt;

/// Handle of a variable; equality is variable identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    Local,
    Parameter,
    This,
}

/// One storage location of a method
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: Symbol,
    pub ty: JType,
    pub kind: VariableKind,
    /// Introduced by the compiler rather than declared in source
    pub synthetic: bool,
}

impl Variable {
    pub fn local(name: Symbol, ty: JType) -> Self {
        Self {
            name,
            ty,
            kind: VariableKind::Local,
            synthetic: false,
        }
    }

    pub fn synthetic(name: Symbol, ty: JType) -> Self {
        Self {
            synthetic: true,
            ..Self::local(name, ty)
        }
    }

    pub fn parameter(name: Symbol, ty: JType) -> Self {
        Self {
            kind: VariableKind::Parameter,
            ..Self::local(name, ty)
        }
    }

    pub fn this(name: Symbol, ty: JType) -> Self {
        Self {
            kind: VariableKind::This,
            ..Self::local(name, ty)
        }
    }
}
