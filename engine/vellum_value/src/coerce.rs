//! Duck-type coercion layer.
//!
//! Templates are dynamically typed: one value may be used as a string in
//! output, a number in arithmetic, and a boolean in `#if`. This module is
//! the single home for those interpretations, so every directive and
//! operator agrees on them.

use crate::Value;

/// A value coerced to a number: exact integer or floating point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

/// A numeric operand pair after promotion.
///
/// Integer/integer stays exact; any float operand promotes the whole pair to
/// `f64`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NumPair {
    Ints(i64, i64),
    Floats(f64, f64),
}

impl Num {
    /// Promote two numbers to a common representation.
    #[expect(
        clippy::cast_precision_loss,
        reason = "float promotion is the defined widening for mixed arithmetic"
    )]
    pub fn promote(a: Num, b: Num) -> NumPair {
        match (a, b) {
            (Num::Int(x), Num::Int(y)) => NumPair::Ints(x, y),
            (Num::Int(x), Num::Float(y)) => NumPair::Floats(x as f64, y),
            (Num::Float(x), Num::Int(y)) => NumPair::Floats(x, y as f64),
            (Num::Float(x), Num::Float(y)) => NumPair::Floats(x, y),
        }
    }

    /// The number as a `Value`.
    pub fn into_value(self) -> Value {
        match self {
            Num::Int(n) => Value::Int(n),
            Num::Float(n) => Value::Float(n),
        }
    }
}

/// Format a float the way templates expect: integral values keep a trailing
/// `.0` so `10 / 4.0` renders as `2.5` and `4.0 + 1` as `5.0`, not `5`.
fn fmt_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.1}")
    } else {
        format!("{n}")
    }
}

impl Value {
    /// Boolean interpretation.
    ///
    /// Null is false; a boolean is itself; empty strings and collections are
    /// false; an object exposing a boolean conversion uses it; anything else
    /// present is true.
    pub fn as_boolean(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Object(obj) => obj.as_boolean().unwrap_or(true),
            Value::Int(_) | Value::Float(_) | Value::Range(_) => true,
        }
    }

    /// Numeric interpretation, if the value has one.
    ///
    /// Numeric strings coerce (`"12"`, `" 2.5 "`); everything else is
    /// `None`.
    pub fn as_number(&self) -> Option<Num> {
        match self {
            Value::Int(n) => Some(Num::Int(*n)),
            Value::Float(n) => Some(Num::Float(*n)),
            Value::Str(s) => {
                let trimmed = s.trim();
                if let Ok(n) = trimmed.parse::<i64>() {
                    Some(Num::Int(n))
                } else if let Ok(n) = trimmed.parse::<f64>() {
                    Some(Num::Float(n))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Whether the value is "empty" under the duck-type convention.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Str(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Whether the value is string-like for the `+` concatenation fallback.
    pub fn is_string_like(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// Output rendering of the value.
    ///
    /// Null renders empty here; whether a null-producing reference renders
    /// its literal text instead is the resolver's decision, made before
    /// display is reached.
    pub fn to_display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => fmt_float(*n),
            Value::Str(s) => (**s).clone(),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::to_display).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Map(map) => {
                // Hash order; hosts wanting stable output should render
                // entries explicitly.
                let parts: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{k}={}", v.to_display()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Range(r) => format!("[{}..{}]", r.start, r.end),
            Value::Object(obj) => obj.display(),
        }
    }
}
