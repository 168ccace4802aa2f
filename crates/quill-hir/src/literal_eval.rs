//! Compile-time evaluation of operators over literal values.
//!
//! Shared by the optimizer (constant folding) and the evaluator, so the two
//! cannot drift apart: an expression folded at compile time produces exactly
//! the value it would have produced at run time. Integer arithmetic wraps.

use crate::ops::{BoundBinaryOperatorKind, BoundUnaryOperatorKind};
use crate::types::Type;
use crate::value::Value;

/// Integer division or remainder with a zero right operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivisionByZero;

/// Apply a non-mutating unary operator to a literal.
///
/// Increment/decrement operators need a variable to mutate and must never
/// reach this function; that is a defect in the caller.
pub fn evaluate_unary(kind: BoundUnaryOperatorKind, operand: &Value) -> Value {
    match (kind, operand) {
        (BoundUnaryOperatorKind::Identity, value) => value.clone(),
        (BoundUnaryOperatorKind::Negation, Value::Int(value)) => Value::Int(value.wrapping_neg()),
        (BoundUnaryOperatorKind::Negation, Value::Float(value)) => Value::Float(-value),
        (BoundUnaryOperatorKind::LogicalNegation, Value::Bool(value)) => Value::Bool(!value),
        (BoundUnaryOperatorKind::OnesComplement, Value::Int(value)) => Value::Int(!value),
        (kind, operand) => unreachable!(
            "unary operator {kind:?} applied to incompatible operand {operand:?}"
        ),
    }
}

/// Apply a binary operator to two literals.
pub fn evaluate_binary(
    kind: BoundBinaryOperatorKind,
    left: &Value,
    right: &Value,
) -> Result<Value, DivisionByZero> {
    use BoundBinaryOperatorKind::*;

    let value = match (kind, left, right) {
        (Addition, Value::Int(l), Value::Int(r)) => Value::Int(l.wrapping_add(*r)),
        (Addition, Value::Float(l), Value::Float(r)) => Value::Float(l + r),
        (Subtraction, Value::Int(l), Value::Int(r)) => Value::Int(l.wrapping_sub(*r)),
        (Subtraction, Value::Float(l), Value::Float(r)) => Value::Float(l - r),
        (Multiplication, Value::Int(l), Value::Int(r)) => Value::Int(l.wrapping_mul(*r)),
        (Multiplication, Value::Float(l), Value::Float(r)) => Value::Float(l * r),
        (Division, Value::Int(l), Value::Int(r)) => {
            if *r == 0 {
                return Err(DivisionByZero);
            }
            Value::Int(l.wrapping_div(*r))
        }
        (Division, Value::Float(l), Value::Float(r)) => Value::Float(l / r),
        (Remainder, Value::Int(l), Value::Int(r)) => {
            if *r == 0 {
                return Err(DivisionByZero);
            }
            Value::Int(l.wrapping_rem(*r))
        }
        (Remainder, Value::Float(l), Value::Float(r)) => Value::Float(l % r),

        (Less, Value::Int(l), Value::Int(r)) => Value::Bool(l < r),
        (Less, Value::Float(l), Value::Float(r)) => Value::Bool(l < r),
        (Less, Value::Char(l), Value::Char(r)) => Value::Bool(l < r),
        (LessOrEqual, Value::Int(l), Value::Int(r)) => Value::Bool(l <= r),
        (LessOrEqual, Value::Float(l), Value::Float(r)) => Value::Bool(l <= r),
        (LessOrEqual, Value::Char(l), Value::Char(r)) => Value::Bool(l <= r),
        (Greater, Value::Int(l), Value::Int(r)) => Value::Bool(l > r),
        (Greater, Value::Float(l), Value::Float(r)) => Value::Bool(l > r),
        (Greater, Value::Char(l), Value::Char(r)) => Value::Bool(l > r),
        (GreaterOrEqual, Value::Int(l), Value::Int(r)) => Value::Bool(l >= r),
        (GreaterOrEqual, Value::Float(l), Value::Float(r)) => Value::Bool(l >= r),
        (GreaterOrEqual, Value::Char(l), Value::Char(r)) => Value::Bool(l >= r),

        (Equality, l, r) => Value::Bool(l == r),
        (Inequality, l, r) => Value::Bool(l != r),

        (BitwiseAnd, Value::Int(l), Value::Int(r)) => Value::Int(l & r),
        (BitwiseAnd, Value::Bool(l), Value::Bool(r)) => Value::Bool(l & r),
        (BitwiseXor, Value::Int(l), Value::Int(r)) => Value::Int(l ^ r),
        (BitwiseXor, Value::Bool(l), Value::Bool(r)) => Value::Bool(l ^ r),
        (BitwiseOr, Value::Int(l), Value::Int(r)) => Value::Int(l | r),
        (BitwiseOr, Value::Bool(l), Value::Bool(r)) => Value::Bool(l | r),
        (LogicalAnd, Value::Bool(l), Value::Bool(r)) => Value::Bool(*l && *r),
        (LogicalOr, Value::Bool(l), Value::Bool(r)) => Value::Bool(*l || *r),

        (Concatenation, Value::String(l), Value::String(r)) => {
            Value::String(format!("{l}{r}"))
        }

        (kind, left, right) => unreachable!(
            "binary operator {kind:?} applied to incompatible operands {left:?} and {right:?}"
        ),
    };
    Ok(value)
}

/// Convert a literal to `ty`. Only called for conversions the binder has
/// already validated.
pub fn convert(value: &Value, ty: Type) -> Value {
    if value.ty() == ty {
        return value.clone();
    }
    match (value, ty) {
        (Value::Int(v), Type::Float) => Value::Float(*v as f64),
        (Value::Float(v), Type::Int) => Value::Int(*v as i64),
        (Value::Int(v), Type::Char) => {
            Value::Char(u32::try_from(*v).ok().and_then(char::from_u32).unwrap_or('\0'))
        }
        (Value::Char(v), Type::Int) => Value::Int(*v as i64),
        (v, Type::String) => Value::String(v.to_string()),
        (value, ty) => unreachable!("no conversion from {value:?} to {ty}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic_wraps() {
        let result = evaluate_binary(
            BoundBinaryOperatorKind::Addition,
            &Value::Int(i64::MAX),
            &Value::Int(1),
        )
        .unwrap();
        assert_eq!(result, Value::Int(i64::MIN));
    }

    #[test]
    fn integer_division_by_zero_is_an_error() {
        assert_eq!(
            evaluate_binary(BoundBinaryOperatorKind::Division, &Value::Int(1), &Value::Int(0)),
            Err(DivisionByZero)
        );
        assert_eq!(
            evaluate_binary(BoundBinaryOperatorKind::Remainder, &Value::Int(1), &Value::Int(0)),
            Err(DivisionByZero)
        );
    }

    #[test]
    fn float_division_by_zero_is_infinite() {
        let result = evaluate_binary(
            BoundBinaryOperatorKind::Division,
            &Value::Float(1.0),
            &Value::Float(0.0),
        )
        .unwrap();
        assert_eq!(result, Value::Float(f64::INFINITY));
    }

    #[test]
    fn conversions_match_runtime_semantics() {
        assert_eq!(convert(&Value::Int(10), Type::Float), Value::Float(10.0));
        assert_eq!(convert(&Value::Float(3.9), Type::Int), Value::Int(3));
        assert_eq!(convert(&Value::Int(97), Type::Char), Value::Char('a'));
        assert_eq!(convert(&Value::Char('a'), Type::Int), Value::Int(97));
        assert_eq!(
            convert(&Value::Bool(true), Type::String),
            Value::String("true".into())
        );
    }

    #[test]
    fn bitwise_operators_cover_bool_operands() {
        let result = evaluate_binary(
            BoundBinaryOperatorKind::BitwiseXor,
            &Value::Bool(true),
            &Value::Bool(true),
        )
        .unwrap();
        assert_eq!(result, Value::Bool(false));
    }
}
