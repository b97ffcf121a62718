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

//! Operators of binary, assignment and unary expressions

use std::fmt;

/// Operator of a binary expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Ushr,
    BitAnd,
    BitOr,
    BitXor,
    /// Conditional `&&`
    And,
    /// Conditional `||`
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOperator {
    /// Java spelling of the operator
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Rem => "%",
            BinaryOperator::Shl => "<<",
            BinaryOperator::Shr => ">>",
            BinaryOperator::Ushr => ">>>",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
        }
    }

    /// `==`, `!=`, `<`, `<=`, `>`, `>=`
    pub fn is_comparison(self) -> bool {
        matches!(self, BinaryOperator::Eq | BinaryOperator::Ne | BinaryOperator::Lt | BinaryOperator::Le | BinaryOperator::Gt | BinaryOperator::Ge)
    }

    /// `==` and `!=`
    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOperator::Eq | BinaryOperator::Ne)
    }

    /// Short-circuiting `&&` and `||`
    pub fn is_conditional(self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    /// `&`, `|` and `^`
    pub fn is_bitwise(self) -> bool {
        matches!(self, BinaryOperator::BitAnd | BinaryOperator::BitOr | BinaryOperator::BitXor)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOperator::Shl | BinaryOperator::Shr | BinaryOperator::Ushr)
    }

    /// Integral division and remainder throw on a zero divisor
    pub fn is_division(self) -> bool {
        matches!(self, BinaryOperator::Div | BinaryOperator::Rem)
    }

    /// Comparison with the opposite truth value (`<` becomes `>=`)
    pub fn inverse_comparison(self) -> Option<BinaryOperator> {
        match self {
            BinaryOperator::Eq => Some(BinaryOperator::Ne),
            BinaryOperator::Ne => Some(BinaryOperator::Eq),
            BinaryOperator::Lt => Some(BinaryOperator::Ge),
            BinaryOperator::Ge => Some(BinaryOperator::Lt),
            BinaryOperator::Gt => Some(BinaryOperator::Le),
            BinaryOperator::Le => Some(BinaryOperator::Gt),
            _ => None,
        }
    }

    /// De Morgan dual of a boolean connective (`&&` and `||`, `&` and `|`)
    pub fn de_morgan_dual(self) -> Option<BinaryOperator> {
        match self {
            BinaryOperator::And => Some(BinaryOperator::Or),
            BinaryOperator::Or => Some(BinaryOperator::And),
            BinaryOperator::BitAnd => Some(BinaryOperator::BitOr),
            BinaryOperator::BitOr => Some(BinaryOperator::BitAnd),
            _ => None,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Operator of an assignment; everything except `Assign` is compound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOperator {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Ushr,
    BitAnd,
    BitOr,
    BitXor,
}

impl AssignOperator {
    /// Binary operator applied by a compound assignment
    pub fn binary(self) -> Option<BinaryOperator> {
        match self {
            AssignOperator::Assign => None,
            AssignOperator::Add => Some(BinaryOperator::Add),
            AssignOperator::Sub => Some(BinaryOperator::Sub),
            AssignOperator::Mul => Some(BinaryOperator::Mul),
            AssignOperator::Div => Some(BinaryOperator::Div),
            AssignOperator::Rem => Some(BinaryOperator::Rem),
            AssignOperator::Shl => Some(BinaryOperator::Shl),
            AssignOperator::Shr => Some(BinaryOperator::Shr),
            AssignOperator::Ushr => Some(BinaryOperator::Ushr),
            AssignOperator::BitAnd => Some(BinaryOperator::BitAnd),
            AssignOperator::BitOr => Some(BinaryOperator::BitOr),
            AssignOperator::BitXor => Some(BinaryOperator::BitXor),
        }
    }

    /// Compound assignments read their target before writing it
    pub fn is_compound(self) -> bool {
        self != AssignOperator::Assign
    }
}

/// Operator of a prefix expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixOperator {
    /// Logical `!`
    Not,
    /// Arithmetic `-`
    Neg,
    /// Bitwise `~`
    BitNot,
    /// `++x`
    Inc,
    /// `--x`
    Dec,
}

impl PrefixOperator {
    /// `++` and `--` write their operand
    pub fn is_increment(self) -> bool {
        matches!(self, PrefixOperator::Inc | PrefixOperator::Dec)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            PrefixOperator::Not => "!",
            PrefixOperator::Neg => "-",
            PrefixOperator::BitNot => "~",
            PrefixOperator::Inc => "++",
            PrefixOperator::Dec => "--",
        }
    }
}

/// Operator of a postfix expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostfixOperator {
    Inc,
    Dec,
}
