/**
Compile-time constant values for Mica

Literals produce constants, and constant-foldable operators propagate them.
Folding is total: an operation that cannot be evaluated (overflow, division
by zero, an out-of-range shift) simply yields no constant rather than a
wrapped or poisoned value, and the expression keeps its type.
*/
use std::fmt;
use std::rc::Rc;

use crate::ast::{BinaryOp, UnaryOp};

/// A compile-time known value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(Rc<str>),
}

/// The kind of a constant, used to decide whether two constants can meet
/// in one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Str,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "\"{}\"", v),
        }
    }
}

/// Evaluate a binary operator over two constants of the same kind.
///
/// Returns `None` when the operands have different kinds, the operator is
/// not constant-foldable for that kind, or the result is not representable.
pub fn fold_binary(op: BinaryOp, x: &Value, y: &Value) -> Option<Value> {
    if x.kind() != y.kind() {
        return None;
    }

    match (x, y) {
        (Value::Int(a), Value::Int(b)) => fold_int(op, *a, *b),
        (Value::Float(a), Value::Float(b)) => fold_float(op, *a, *b),
        (Value::Bool(a), Value::Bool(b)) => fold_bool(op, *a, *b),
        (Value::Str(a), Value::Str(b)) => fold_str(op, a, b),
        _ => None,
    }
}

/// Evaluate a unary operator over a constant.
pub fn fold_unary(op: UnaryOp, x: &Value) -> Option<Value> {
    match (op, x) {
        (UnaryOp::Not, Value::Bool(v)) => Some(Value::Bool(!v)),
        (UnaryOp::Neg, Value::Int(v)) => v.checked_neg().map(Value::Int),
        (UnaryOp::Neg, Value::Float(v)) => Some(Value::Float(-v)),
        _ => None,
    }
}

fn fold_int(op: BinaryOp, a: i128, b: i128) -> Option<Value> {
    let int = |v: Option<i128>| v.map(Value::Int);
    match op {
        BinaryOp::Add => int(a.checked_add(b)),
        BinaryOp::Sub => int(a.checked_sub(b)),
        BinaryOp::Mul => int(a.checked_mul(b)),
        BinaryOp::Div => int(a.checked_div(b)),
        BinaryOp::Rem => int(a.checked_rem(b)),
        BinaryOp::BitAnd => Some(Value::Int(a & b)),
        BinaryOp::BitOr => Some(Value::Int(a | b)),
        BinaryOp::BitXor => Some(Value::Int(a ^ b)),
        // A shift count must be a small non-negative number.
        BinaryOp::Shl => int(u32::try_from(b).ok().and_then(|n| a.checked_shl(n))),
        BinaryOp::Shr => int(u32::try_from(b).ok().and_then(|n| a.checked_shr(n))),
        BinaryOp::Eq => Some(Value::Bool(a == b)),
        BinaryOp::Ne => Some(Value::Bool(a != b)),
        BinaryOp::Lt => Some(Value::Bool(a < b)),
        BinaryOp::Le => Some(Value::Bool(a <= b)),
        BinaryOp::Gt => Some(Value::Bool(a > b)),
        BinaryOp::Ge => Some(Value::Bool(a >= b)),
        _ => None,
    }
}

fn fold_float(op: BinaryOp, a: f64, b: f64) -> Option<Value> {
    // Arithmetic folds only while the result stays finite.
    let float = |v: f64| v.is_finite().then_some(Value::Float(v));
    match op {
        BinaryOp::Add => float(a + b),
        BinaryOp::Sub => float(a - b),
        BinaryOp::Mul => float(a * b),
        BinaryOp::Div => float(a / b),
        BinaryOp::Eq => Some(Value::Bool(a == b)),
        BinaryOp::Ne => Some(Value::Bool(a != b)),
        BinaryOp::Lt => Some(Value::Bool(a < b)),
        BinaryOp::Le => Some(Value::Bool(a <= b)),
        BinaryOp::Gt => Some(Value::Bool(a > b)),
        BinaryOp::Ge => Some(Value::Bool(a >= b)),
        _ => None,
    }
}

fn fold_bool(op: BinaryOp, a: bool, b: bool) -> Option<Value> {
    match op {
        BinaryOp::And => Some(Value::Bool(a && b)),
        BinaryOp::Or => Some(Value::Bool(a || b)),
        BinaryOp::Eq => Some(Value::Bool(a == b)),
        BinaryOp::Ne => Some(Value::Bool(a != b)),
        _ => None,
    }
}

fn fold_str(op: BinaryOp, a: &Rc<str>, b: &Rc<str>) -> Option<Value> {
    match op {
        BinaryOp::Add => Some(Value::Str(format!("{}{}", a, b).into())),
        BinaryOp::Eq => Some(Value::Bool(a == b)),
        BinaryOp::Ne => Some(Value::Bool(a != b)),
        BinaryOp::Lt => Some(Value::Bool(a.as_ref() < b.as_ref())),
        BinaryOp::Le => Some(Value::Bool(a.as_ref() <= b.as_ref())),
        BinaryOp::Gt => Some(Value::Bool(a.as_ref() > b.as_ref())),
        BinaryOp::Ge => Some(Value::Bool(a.as_ref() >= b.as_ref())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_arithmetic() {
        let result = fold_binary(BinaryOp::Add, &Value::Int(2), &Value::Int(3));
        assert_eq!(result, Some(Value::Int(5)));

        let result = fold_binary(BinaryOp::Mul, &Value::Int(3), &Value::Int(4));
        assert_eq!(result, Some(Value::Int(12)));
    }

    #[test]
    fn test_int_overflow_does_not_fold() {
        let result = fold_binary(BinaryOp::Add, &Value::Int(i128::MAX), &Value::Int(1));
        assert_eq!(result, None);

        let result = fold_binary(BinaryOp::Div, &Value::Int(1), &Value::Int(0));
        assert_eq!(result, None);
    }

    #[test]
    fn test_shift_range() {
        let result = fold_binary(BinaryOp::Shl, &Value::Int(1), &Value::Int(4));
        assert_eq!(result, Some(Value::Int(16)));

        // Negative and oversized shift counts refuse to fold.
        assert_eq!(
            fold_binary(BinaryOp::Shl, &Value::Int(1), &Value::Int(-1)),
            None
        );
        assert_eq!(
            fold_binary(BinaryOp::Shl, &Value::Int(1), &Value::Int(500)),
            None
        );
    }

    #[test]
    fn test_bool_algebra() {
        let result = fold_binary(BinaryOp::And, &Value::Bool(true), &Value::Bool(false));
        assert_eq!(result, Some(Value::Bool(false)));

        let result = fold_unary(UnaryOp::Not, &Value::Bool(false));
        assert_eq!(result, Some(Value::Bool(true)));
    }

    #[test]
    fn test_string_concat_and_compare() {
        let a = Value::Str("foo".into());
        let b = Value::Str("bar".into());

        let result = fold_binary(BinaryOp::Add, &a, &b);
        assert_eq!(result, Some(Value::Str("foobar".into())));

        let result = fold_binary(BinaryOp::Lt, &b, &a);
        assert_eq!(result, Some(Value::Bool(true)));
    }

    #[test]
    fn test_mixed_kinds_do_not_fold() {
        let result = fold_binary(BinaryOp::Add, &Value::Int(1), &Value::Float(1.0));
        assert_eq!(result, None);
    }
}
