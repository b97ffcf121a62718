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

//! Literal values and the compile-time arithmetic used to fold them
//!
//! All arithmetic follows the Java language rules: integral operations wrap,
//! shifts mask their distance to the width of the promoted left operand,
//! floating-point operations are IEEE 754, and float-to-integral conversions
//! saturate with NaN mapping to zero. Integral division and remainder by zero
//! are never evaluated.

use crate::ir::operator::{BinaryOperator, PrefixOperator};
use crate::ir::types::PrimitiveType;
use jack_common::Symbol;
use std::fmt;

/// Value held by a literal node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralValue {
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Null,
    /// Interned string constant
    String(Symbol),
}

impl LiteralValue {
    /// Primitive type of the literal; `None` for `null` and strings
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        match self {
            LiteralValue::Boolean(_) => Some(PrimitiveType::Boolean),
            LiteralValue::Byte(_) => Some(PrimitiveType::Byte),
            LiteralValue::Char(_) => Some(PrimitiveType::Char),
            LiteralValue::Short(_) => Some(PrimitiveType::Short),
            LiteralValue::Int(_) => Some(PrimitiveType::Int),
            LiteralValue::Long(_) => Some(PrimitiveType::Long),
            LiteralValue::Float(_) => Some(PrimitiveType::Float),
            LiteralValue::Double(_) => Some(PrimitiveType::Double),
            LiteralValue::Null | LiteralValue::String(_) => None,
        }
    }

    /// Boolean payload, if this is a boolean literal
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LiteralValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric or boolean literal
    pub fn is_value(&self) -> bool {
        self.primitive_type().is_some()
    }

    /// Integral literal equal to zero
    pub fn is_integral_zero(&self) -> bool {
        matches!(self.numeric(), Some(Numeric::I32(0)) | Some(Numeric::I64(0)))
    }

    /// Value after unary numeric promotion
    pub fn numeric(&self) -> Option<Numeric> {
        match *self {
            LiteralValue::Boolean(value) => Some(Numeric::Bool(value)),
            LiteralValue::Byte(value) => Some(Numeric::I32(value as i32)),
            LiteralValue::Char(value) => Some(Numeric::I32(value as i32)),
            LiteralValue::Short(value) => Some(Numeric::I32(value as i32)),
            LiteralValue::Int(value) => Some(Numeric::I32(value)),
            LiteralValue::Long(value) => Some(Numeric::I64(value)),
            LiteralValue::Float(value) => Some(Numeric::F32(value)),
            LiteralValue::Double(value) => Some(Numeric::F64(value)),
            LiteralValue::Null | LiteralValue::String(_) => None,
        }
    }

    /// Convert the literal to `target` the way a primitive cast does.
    ///
    /// Booleans convert to and from `{0, 1}`; `None` is returned for `null`,
    /// strings and `void`.
    pub fn coerce(&self, target: PrimitiveType) -> Option<LiteralValue> {
        let numeric = self.numeric()?;
        let converted = match target {
            PrimitiveType::Void => return None,
            PrimitiveType::Boolean => LiteralValue::Boolean(match numeric {
                Numeric::Bool(value) => value,
                Numeric::I32(value) => value != 0,
                Numeric::I64(value) => value != 0,
                Numeric::F32(value) => value != 0.0,
                Numeric::F64(value) => value != 0.0,
            }),
            PrimitiveType::Float => LiteralValue::Float(match numeric {
                Numeric::Bool(value) => value as i32 as f32,
                Numeric::I32(value) => value as f32,
                Numeric::I64(value) => value as f32,
                Numeric::F32(value) => value,
                Numeric::F64(value) => value as f32,
            }),
            PrimitiveType::Double => LiteralValue::Double(match numeric {
                Numeric::Bool(value) => value as i32 as f64,
                Numeric::I32(value) => value as f64,
                Numeric::I64(value) => value as f64,
                Numeric::F32(value) => value as f64,
                Numeric::F64(value) => value,
            }),
            PrimitiveType::Long => LiteralValue::Long(match numeric {
                Numeric::Bool(value) => value as i64,
                Numeric::I32(value) => value as i64,
                Numeric::I64(value) => value,
                Numeric::F32(value) => value as i64,
                Numeric::F64(value) => value as i64,
            }),
            integral => {
                // Narrowing goes through int first, as javac does for f2b and l2b.
                let int = match numeric {
                    Numeric::Bool(value) => value as i32,
                    Numeric::I32(value) => value,
                    Numeric::I64(value) => value as i32,
                    Numeric::F32(value) => value as i32,
                    Numeric::F64(value) => value as i32,
                };
                match integral {
                    PrimitiveType::Byte => LiteralValue::Byte(int as i8),
                    PrimitiveType::Char => LiteralValue::Char(int as u16),
                    PrimitiveType::Short => LiteralValue::Short(int as i16),
                    _ => LiteralValue::Int(int),
                }
            }
        };
        Some(converted)
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Boolean(value) => write!(f, "{}", value),
            LiteralValue::Byte(value) => write!(f, "(byte) {}", value),
            LiteralValue::Char(value) => write!(f, "'\\u{:04x}'", value),
            LiteralValue::Short(value) => write!(f, "(short) {}", value),
            LiteralValue::Int(value) => write!(f, "{}", value),
            LiteralValue::Long(value) => write!(f, "{}L", value),
            LiteralValue::Float(value) => write!(f, "{}f", value),
            LiteralValue::Double(value) => write!(f, "{}d", value),
            LiteralValue::Null => write!(f, "null"),
            LiteralValue::String(symbol) => write!(f, "\"{}\"", symbol),
        }
    }
}

/// Operand category after numeric promotion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Numeric {
    fn rank(self) -> u8 {
        match self {
            Numeric::Bool(_) => 0,
            Numeric::I32(_) => 1,
            Numeric::I64(_) => 2,
            Numeric::F32(_) => 3,
            Numeric::F64(_) => 4,
        }
    }

    fn widen_to(self, rank: u8) -> Numeric {
        match (self, rank) {
            (Numeric::I32(value), 2) => Numeric::I64(value as i64),
            (Numeric::I32(value), 3) => Numeric::F32(value as f32),
            (Numeric::I32(value), 4) => Numeric::F64(value as f64),
            (Numeric::I64(value), 3) => Numeric::F32(value as f32),
            (Numeric::I64(value), 4) => Numeric::F64(value as f64),
            (Numeric::F32(value), 4) => Numeric::F64(value as f64),
            (other, _) => other,
        }
    }

    /// Binary numeric promotion; booleans only pair with booleans
    pub fn promote_pair(lhs: Numeric, rhs: Numeric) -> Option<(Numeric, Numeric)> {
        match (lhs, rhs) {
            (Numeric::Bool(_), Numeric::Bool(_)) => Some((lhs, rhs)),
            (Numeric::Bool(_), _) | (_, Numeric::Bool(_)) => None,
            _ => {
                let rank = lhs.rank().max(rhs.rank());
                Some((lhs.widen_to(rank), rhs.widen_to(rank)))
            }
        }
    }

    fn as_shift_distance(self) -> Option<u32> {
        match self {
            Numeric::I32(value) => Some(value as u32),
            Numeric::I64(value) => Some(value as u32),
            _ => None,
        }
    }
}

/// Evaluate `lhs op rhs` on two literal operands.
///
/// Returns `None` when the operator is not defined for the operand categories
/// or when evaluation would throw (integral division or remainder by zero).
pub fn fold_binary(op: BinaryOperator, lhs: &LiteralValue, rhs: &LiteralValue) -> Option<LiteralValue> {
    let lhs = lhs.numeric()?;
    let rhs = rhs.numeric()?;

    if op.is_shift() {
        return fold_shift(op, lhs, rhs);
    }

    match Numeric::promote_pair(lhs, rhs)? {
        (Numeric::Bool(a), Numeric::Bool(b)) => fold_bool(op, a, b),
        (Numeric::I32(a), Numeric::I32(b)) => fold_int(op, a, b),
        (Numeric::I64(a), Numeric::I64(b)) => fold_long(op, a, b),
        (Numeric::F32(a), Numeric::F32(b)) => fold_float(op, a, b),
        (Numeric::F64(a), Numeric::F64(b)) => fold_double(op, a, b),
        _ => None,
    }
}

/// Evaluate a prefix operator on a literal operand
pub fn fold_prefix(op: PrefixOperator, operand: &LiteralValue) -> Option<LiteralValue> {
    match (op, operand.numeric()?) {
        (PrefixOperator::Not, Numeric::Bool(value)) => Some(LiteralValue::Boolean(!value)),
        (PrefixOperator::Neg, Numeric::I32(value)) => Some(LiteralValue::Int(value.wrapping_neg())),
        (PrefixOperator::Neg, Numeric::I64(value)) => Some(LiteralValue::Long(value.wrapping_neg())),
        (PrefixOperator::Neg, Numeric::F32(value)) => Some(LiteralValue::Float(-value)),
        (PrefixOperator::Neg, Numeric::F64(value)) => Some(LiteralValue::Double(-value)),
        (PrefixOperator::BitNot, Numeric::I32(value)) => Some(LiteralValue::Int(!value)),
        (PrefixOperator::BitNot, Numeric::I64(value)) => Some(LiteralValue::Long(!value)),
        _ => None,
    }
}

fn fold_bool(op: BinaryOperator, a: bool, b: bool) -> Option<LiteralValue> {
    let value = match op {
        BinaryOperator::And | BinaryOperator::BitAnd => a && b,
        BinaryOperator::Or | BinaryOperator::BitOr => a || b,
        BinaryOperator::BitXor | BinaryOperator::Ne => a != b,
        BinaryOperator::Eq => a == b,
        _ => return None,
    };
    Some(LiteralValue::Boolean(value))
}

fn fold_int(op: BinaryOperator, a: i32, b: i32) -> Option<LiteralValue> {
    let value = match op {
        BinaryOperator::Add => a.wrapping_add(b),
        BinaryOperator::Sub => a.wrapping_sub(b),
        BinaryOperator::Mul => a.wrapping_mul(b),
        BinaryOperator::Div if b != 0 => a.wrapping_div(b),
        BinaryOperator::Rem if b != 0 => a.wrapping_rem(b),
        BinaryOperator::BitAnd => a & b,
        BinaryOperator::BitOr => a | b,
        BinaryOperator::BitXor => a ^ b,
        comparison if comparison.is_comparison() => return Some(LiteralValue::Boolean(compare(comparison, a, b))),
        _ => return None,
    };
    Some(LiteralValue::Int(value))
}

fn fold_long(op: BinaryOperator, a: i64, b: i64) -> Option<LiteralValue> {
    let value = match op {
        BinaryOperator::Add => a.wrapping_add(b),
        BinaryOperator::Sub => a.wrapping_sub(b),
        BinaryOperator::Mul => a.wrapping_mul(b),
        BinaryOperator::Div if b != 0 => a.wrapping_div(b),
        BinaryOperator::Rem if b != 0 => a.wrapping_rem(b),
        BinaryOperator::BitAnd => a & b,
        BinaryOperator::BitOr => a | b,
        BinaryOperator::BitXor => a ^ b,
        comparison if comparison.is_comparison() => return Some(LiteralValue::Boolean(compare(comparison, a, b))),
        _ => return None,
    };
    Some(LiteralValue::Long(value))
}

fn fold_float(op: BinaryOperator, a: f32, b: f32) -> Option<LiteralValue> {
    let value = match op {
        BinaryOperator::Add => a + b,
        BinaryOperator::Sub => a - b,
        BinaryOperator::Mul => a * b,
        BinaryOperator::Div => a / b,
        BinaryOperator::Rem => a % b,
        comparison if comparison.is_comparison() => return Some(LiteralValue::Boolean(compare(comparison, a, b))),
        _ => return None,
    };
    Some(LiteralValue::Float(value))
}

fn fold_double(op: BinaryOperator, a: f64, b: f64) -> Option<LiteralValue> {
    let value = match op {
        BinaryOperator::Add => a + b,
        BinaryOperator::Sub => a - b,
        BinaryOperator::Mul => a * b,
        BinaryOperator::Div => a / b,
        BinaryOperator::Rem => a % b,
        comparison if comparison.is_comparison() => return Some(LiteralValue::Boolean(compare(comparison, a, b))),
        _ => return None,
    };
    Some(LiteralValue::Double(value))
}

fn fold_shift(op: BinaryOperator, lhs: Numeric, rhs: Numeric) -> Option<LiteralValue> {
    // `wrapping_shl`/`wrapping_shr` mask the distance to the operand width.
    let distance = rhs.as_shift_distance()?;
    match lhs {
        Numeric::I32(value) => Some(LiteralValue::Int(match op {
            BinaryOperator::Shl => value.wrapping_shl(distance),
            BinaryOperator::Shr => value.wrapping_shr(distance),
            BinaryOperator::Ushr => (value as u32).wrapping_shr(distance) as i32,
            _ => return None,
        })),
        Numeric::I64(value) => Some(LiteralValue::Long(match op {
            BinaryOperator::Shl => value.wrapping_shl(distance),
            BinaryOperator::Shr => value.wrapping_shr(distance),
            BinaryOperator::Ushr => (value as u64).wrapping_shr(distance) as i64,
            _ => return None,
        })),
        _ => None,
    }
}

fn compare<T: PartialOrd>(op: BinaryOperator, a: T, b: T) -> bool {
    match op {
        BinaryOperator::Eq => a == b,
        BinaryOperator::Ne => a != b,
        BinaryOperator::Lt => a < b,
        BinaryOperator::Le => a <= b,
        BinaryOperator::Gt => a > b,
        BinaryOperator::Ge => a >= b,
        _ => false,
    }
}
