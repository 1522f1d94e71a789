//! Binary and unary operator evaluation over resolved values.
//!
//! Logical `&&`/`||` never reach this module: they short-circuit, so the
//! renderer evaluates them against node ids before the right operand
//! exists as a value. Everything here works on two finished operands.
//!
//! Arithmetic is numeric-first: integer pairs stay exact with checked
//! `i64` arithmetic, any float operand promotes both sides to `f64`.
//! `+` additionally concatenates when a side is a string; the renderer
//! layers literal-text fallback for unresolved operands on top of this.

use vellum_ir::{BinaryOp, UnaryOp};
use vellum_value::{
    division_by_zero, invalid_binary_op, invalid_unary_op, modulo_by_zero, numeric_overflow,
    Num, NumPair, RenderResult, Value,
};

/// Evaluate a non-logical binary operator over two resolved operands.
pub fn evaluate_binary(op: BinaryOp, left: &Value, right: &Value) -> RenderResult {
    debug_assert!(!op.is_logical(), "logical operators short-circuit upstream");
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            match (left.as_number(), right.as_number()) {
                (Some(l), Some(r)) => arithmetic(op, l, r),
                _ => Err(type_error(op, left, right)),
            }
        }
        BinaryOp::Eq => Ok(Value::Bool(values_equal(left, right))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(left, right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(op, left, right),
        BinaryOp::And | BinaryOp::Or => Err(type_error(op, left, right)),
    }
}

/// Evaluate a unary operator.
pub fn evaluate_unary(op: UnaryOp, operand: &Value) -> RenderResult {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.as_boolean())),
        UnaryOp::Neg => match operand.as_number() {
            Some(Num::Int(n)) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| numeric_overflow(format!("-{n}"))),
            Some(Num::Float(n)) => Ok(Value::Float(-n)),
            None => Err(invalid_unary_op(operand.type_name(), op.as_symbol())),
        },
    }
}

fn add(left: &Value, right: &Value) -> RenderResult {
    if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
        return arithmetic(BinaryOp::Add, l, r);
    }
    // String concatenation fallback. Numeric-string pairs were caught
    // above, so a string here is genuinely textual.
    if left.is_string_like() || right.is_string_like() {
        let mut out = left.to_display();
        out.push_str(&right.to_display());
        return Ok(Value::string(out));
    }
    Err(type_error(BinaryOp::Add, left, right))
}

fn arithmetic(op: BinaryOp, left: Num, right: Num) -> RenderResult {
    match Num::promote(left, right) {
        NumPair::Ints(l, r) => int_arithmetic(op, l, r),
        NumPair::Floats(l, r) => float_arithmetic(op, l, r),
    }
}

fn int_arithmetic(op: BinaryOp, l: i64, r: i64) -> RenderResult {
    let checked = match op {
        BinaryOp::Add => l.checked_add(r),
        BinaryOp::Sub => l.checked_sub(r),
        BinaryOp::Mul => l.checked_mul(r),
        BinaryOp::Div => {
            if r == 0 {
                return Err(division_by_zero());
            }
            l.checked_div(r)
        }
        BinaryOp::Mod => {
            if r == 0 {
                return Err(modulo_by_zero());
            }
            l.checked_rem(r)
        }
        _ => unreachable!("non-arithmetic operator in int_arithmetic"),
    };
    checked
        .map(Value::Int)
        .ok_or_else(|| numeric_overflow(format!("{l} {} {r}", op.as_symbol())))
}

fn float_arithmetic(op: BinaryOp, l: f64, r: f64) -> RenderResult {
    match op {
        BinaryOp::Add => Ok(Value::Float(l + r)),
        BinaryOp::Sub => Ok(Value::Float(l - r)),
        BinaryOp::Mul => Ok(Value::Float(l * r)),
        BinaryOp::Div => {
            if r == 0.0 {
                return Err(division_by_zero());
            }
            Ok(Value::Float(l / r))
        }
        BinaryOp::Mod => {
            if r == 0.0 {
                return Err(modulo_by_zero());
            }
            Ok(Value::Float(l % r))
        }
        _ => unreachable!("non-arithmetic operator in float_arithmetic"),
    }
}

/// Equality with numeric coercion: `1 == 1.0` and `"2" == 2` are true.
/// Everything else is structural, with null equal only to null and
/// objects compared by identity.
fn values_equal(left: &Value, right: &Value) -> bool {
    if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
        return match Num::promote(l, r) {
            NumPair::Ints(a, b) => a == b,
            NumPair::Floats(a, b) => a == b,
        };
    }
    left == right
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> RenderResult {
    use std::cmp::Ordering;

    let ordering = if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
        match Num::promote(l, r) {
            NumPair::Ints(a, b) => a.cmp(&b),
            NumPair::Floats(a, b) => a
                .partial_cmp(&b)
                .ok_or_else(|| type_error(op, left, right))?,
        }
    } else if let (Value::Str(l), Value::Str(r)) = (left, right) {
        l.as_str().cmp(r.as_str())
    } else {
        return Err(type_error(op, left, right));
    };

    let result = match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => unreachable!("non-comparison operator in compare"),
    };
    Ok(Value::Bool(result))
}

fn type_error(op: BinaryOp, left: &Value, right: &Value) -> vellum_value::RenderError {
    invalid_binary_op(left.type_name(), right.type_name(), op.as_symbol())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vellum_value::RenderErrorKind;

    fn eval(op: BinaryOp, l: Value, r: Value) -> RenderResult {
        evaluate_binary(op, &l, &r)
    }

    #[test]
    fn integer_arithmetic_stays_exact() {
        assert_eq!(eval(BinaryOp::Add, Value::Int(2), Value::Int(3)), Ok(Value::Int(5)));
        assert_eq!(eval(BinaryOp::Div, Value::Int(10), Value::Int(4)), Ok(Value::Int(2)));
        assert_eq!(eval(BinaryOp::Mod, Value::Int(10), Value::Int(4)), Ok(Value::Int(2)));
    }

    #[test]
    fn float_operand_promotes() {
        assert_eq!(
            eval(BinaryOp::Div, Value::Int(10), Value::Float(4.0)),
            Ok(Value::Float(2.5))
        );
        assert_eq!(
            eval(BinaryOp::Add, Value::Float(1.5), Value::Int(1)),
            Ok(Value::Float(2.5))
        );
    }

    #[test]
    fn numeric_strings_coerce() {
        assert_eq!(
            eval(BinaryOp::Mul, Value::string("3"), Value::Int(4)),
            Ok(Value::Int(12))
        );
        assert_eq!(
            eval(BinaryOp::Add, Value::string("1"), Value::string("2")),
            Ok(Value::Int(3))
        );
    }

    #[test]
    fn add_concatenates_strings() {
        assert_eq!(
            eval(BinaryOp::Add, Value::string("a"), Value::string("b")),
            Ok(Value::string("ab"))
        );
        assert_eq!(
            eval(BinaryOp::Add, Value::string("n="), Value::Int(5)),
            Ok(Value::string("n=5"))
        );
        assert_eq!(
            eval(BinaryOp::Add, Value::Int(5), Value::string("!")),
            Ok(Value::string("5!"))
        );
    }

    #[test]
    fn add_rejects_incompatible_types() {
        let err = eval(BinaryOp::Add, Value::Bool(true), Value::list(vec![]));
        assert!(matches!(
            err,
            Err(e) if matches!(e.kind, RenderErrorKind::InvalidBinaryOp { .. })
        ));
    }

    #[test]
    fn division_and_modulo_by_zero() {
        assert_eq!(
            eval(BinaryOp::Div, Value::Int(1), Value::Int(0))
                .map_err(|e| e.kind),
            Err(RenderErrorKind::DivisionByZero)
        );
        assert_eq!(
            eval(BinaryOp::Mod, Value::Int(1), Value::Int(0))
                .map_err(|e| e.kind),
            Err(RenderErrorKind::ModuloByZero)
        );
        assert_eq!(
            eval(BinaryOp::Div, Value::Float(1.0), Value::Float(0.0))
                .map_err(|e| e.kind),
            Err(RenderErrorKind::DivisionByZero)
        );
    }

    #[test]
    fn integer_overflow_is_an_error() {
        let err = eval(BinaryOp::Add, Value::Int(i64::MAX), Value::Int(1));
        assert!(matches!(
            err,
            Err(e) if matches!(e.kind, RenderErrorKind::NumericOverflow { .. })
        ));
        let err = evaluate_unary(UnaryOp::Neg, &Value::Int(i64::MIN));
        assert!(matches!(
            err,
            Err(e) if matches!(e.kind, RenderErrorKind::NumericOverflow { .. })
        ));
    }

    #[test]
    fn equality_coerces_numerics() {
        assert_eq!(eval(BinaryOp::Eq, Value::Int(1), Value::Float(1.0)), Ok(Value::Bool(true)));
        assert_eq!(eval(BinaryOp::Eq, Value::string("2"), Value::Int(2)), Ok(Value::Bool(true)));
        assert_eq!(eval(BinaryOp::Ne, Value::Int(1), Value::Int(2)), Ok(Value::Bool(true)));
    }

    #[test]
    fn null_equals_only_null() {
        assert_eq!(eval(BinaryOp::Eq, Value::Null, Value::Null), Ok(Value::Bool(true)));
        assert_eq!(eval(BinaryOp::Eq, Value::Null, Value::Int(0)), Ok(Value::Bool(false)));
        assert_eq!(eval(BinaryOp::Eq, Value::Null, Value::string("")), Ok(Value::Bool(false)));
    }

    #[test]
    fn comparisons_numeric_then_string() {
        assert_eq!(eval(BinaryOp::Lt, Value::Int(1), Value::Float(1.5)), Ok(Value::Bool(true)));
        assert_eq!(
            eval(BinaryOp::Ge, Value::string("10"), Value::Int(2)),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            eval(BinaryOp::Lt, Value::string("abc"), Value::string("abd")),
            Ok(Value::Bool(true))
        );
        let err = eval(BinaryOp::Lt, Value::Bool(true), Value::Int(1));
        assert!(matches!(
            err,
            Err(e) if matches!(e.kind, RenderErrorKind::InvalidBinaryOp { .. })
        ));
    }

    #[test]
    fn unary_operators() {
        assert_eq!(evaluate_unary(UnaryOp::Not, &Value::Bool(true)), Ok(Value::Bool(false)));
        assert_eq!(evaluate_unary(UnaryOp::Not, &Value::Null), Ok(Value::Bool(true)));
        assert_eq!(evaluate_unary(UnaryOp::Not, &Value::string("")), Ok(Value::Bool(true)));
        assert_eq!(evaluate_unary(UnaryOp::Neg, &Value::Int(3)), Ok(Value::Int(-3)));
        assert_eq!(evaluate_unary(UnaryOp::Neg, &Value::string("2.5")), Ok(Value::Float(-2.5)));
        let err = evaluate_unary(UnaryOp::Neg, &Value::string("a"));
        assert!(matches!(
            err,
            Err(e) if matches!(e.kind, RenderErrorKind::InvalidUnaryOp { .. })
        ));
    }
}
