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

//! Java types as seen by the IR

use jack_common::Symbol;
use std::fmt;

/// Represents a Java primitive type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl PrimitiveType {
    /// Java keyword for the type
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Char => "char",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Void => "void",
        }
    }

    /// byte, char, short, int or long
    pub fn is_integral(self) -> bool {
        matches!(self, PrimitiveType::Byte | PrimitiveType::Char | PrimitiveType::Short | PrimitiveType::Int | PrimitiveType::Long)
    }

    /// float or double
    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }

    /// Integral or floating
    pub fn is_numeric(self) -> bool {
        self.is_integral() || self.is_floating()
    }

    /// Type after unary numeric promotion (byte, char and short widen to int)
    pub fn promoted(self) -> PrimitiveType {
        match self {
            PrimitiveType::Byte | PrimitiveType::Char | PrimitiveType::Short => PrimitiveType::Int,
            other => other,
        }
    }

    /// Type of a binary numeric operation between `self` and `other`
    pub fn binary_promotion(self, other: PrimitiveType) -> Option<PrimitiveType> {
        if self == PrimitiveType::Boolean && other == PrimitiveType::Boolean {
            return Some(PrimitiveType::Boolean);
        }
        if !self.is_numeric() || !other.is_numeric() {
            return None;
        }
        let promoted = if self == PrimitiveType::Double || other == PrimitiveType::Double {
            PrimitiveType::Double
        } else if self == PrimitiveType::Float || other == PrimitiveType::Float {
            PrimitiveType::Float
        } else if self == PrimitiveType::Long || other == PrimitiveType::Long {
            PrimitiveType::Long
        } else {
            PrimitiveType::Int
        };
        Some(promoted)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static type of an IR expression or declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JType {
    /// One of the canonical primitive types
    Primitive(PrimitiveType),
    /// Class or interface type, by interned binary name
    Class(Symbol),
    /// Array of the element type
    Array(Box<JType>),
    /// Type of the `null` literal
    Null,
}

impl JType {
    pub const BOOLEAN: JType = JType::Primitive(PrimitiveType::Boolean);
    pub const BYTE: JType = JType::Primitive(PrimitiveType::Byte);
    pub const CHAR: JType = JType::Primitive(PrimitiveType::Char);
    pub const SHORT: JType = JType::Primitive(PrimitiveType::Short);
    pub const INT: JType = JType::Primitive(PrimitiveType::Int);
    pub const LONG: JType = JType::Primitive(PrimitiveType::Long);
    pub const FLOAT: JType = JType::Primitive(PrimitiveType::Float);
    pub const DOUBLE: JType = JType::Primitive(PrimitiveType::Double);
    pub const VOID: JType = JType::Primitive(PrimitiveType::Void);

    /// Create an array type of `element`
    pub fn array_of(element: JType) -> Self {
        JType::Array(Box::new(element))
    }

    /// Primitive kind, if any
    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            JType::Primitive(primitive) => Some(*primitive),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, JType::Primitive(_))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, JType::Primitive(PrimitiveType::Boolean))
    }

    pub fn is_floating(&self) -> bool {
        self.as_primitive().is_some_and(PrimitiveType::is_floating)
    }

    pub fn is_integral(&self) -> bool {
        self.as_primitive().is_some_and(PrimitiveType::is_integral)
    }

    /// Class, array and null types
    pub fn is_reference(&self) -> bool {
        !self.is_primitive()
    }
}

impl From<PrimitiveType> for JType {
    fn from(primitive: PrimitiveType) -> Self {
        JType::Primitive(primitive)
    }
}
