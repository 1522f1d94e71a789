//! Runtime values for the template evaluator.
//!
//! # Heap Enforcement
//!
//! All heap allocations go through factory methods on `Value`. The `Heap<T>`
//! wrapper has a crate-private constructor, so external code cannot create
//! heap values directly:
//!
//! ```text
//! let s = Value::string("hello");        // OK
//! let list = Value::list(vec![]);        // OK
//! let s = Value::Str(Heap::new(...));    // ERROR: Heap::new is pub(crate)
//! ```
//!
//! # Thread Safety
//!
//! Heap payloads use `Arc` internally, so values can be captured into shared
//! templates' macro frames and cloned across renders freely.

mod heap;

use crate::introspect::ObjectRef;
use std::collections::HashMap;
use std::fmt;

pub use heap::Heap;

/// An inclusive integer range value (`[1..5]`).
///
/// Descending ranges iterate downward, matching the template idiom
/// `#foreach($i in [5..1])`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RangeValue {
    pub start: i64,
    pub end: i64,
}

impl RangeValue {
    /// Create a range. Both bounds are inclusive.
    pub fn new(start: i64, end: i64) -> Self {
        RangeValue { start, end }
    }

    /// Number of elements in the range.
    pub fn len(&self) -> u64 {
        self.start.abs_diff(self.end).saturating_add(1)
    }

    /// Ranges always hold at least one element.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate the range, descending when `start > end`.
    pub fn iter(&self) -> Box<dyn Iterator<Item = i64>> {
        if self.start <= self.end {
            Box::new(self.start..=self.end)
        } else {
            Box::new((self.end..=self.start).rev())
        }
    }
}

/// Dynamic value in the template evaluator.
#[derive(Clone)]
pub enum Value {
    /// Null / undefined.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// String value.
    Str(Heap<String>),
    /// List of values.
    List(Heap<Vec<Value>>),
    /// Map from string keys to values.
    Map(Heap<HashMap<String, Value>>),
    /// Inclusive integer range.
    Range(RangeValue),
    /// Host object behind the `Introspectable` contract.
    Object(ObjectRef),
}

// Factory methods (the only way to construct heap values)

impl Value {
    /// Create a string value.
    #[inline]
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Heap::new(s.into()))
    }

    /// Create a list value.
    #[inline]
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Heap::new(items))
    }

    /// Create a map value.
    #[inline]
    pub fn map(entries: HashMap<String, Value>) -> Self {
        Value::Map(Heap::new(entries))
    }

    /// Create a range value.
    #[inline]
    pub fn range(start: i64, end: i64) -> Self {
        Value::Range(RangeValue::new(start, end))
    }

    /// Wrap a host object.
    #[inline]
    pub fn object(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }

    /// Type name for error messages.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Range(_) => "range",
            Value::Object(obj) => obj.type_tag(),
        }
    }

    /// Check for null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl PartialEq for Value {
    /// Structural equality; objects compare by identity.
    ///
    /// Null equals only null, so equality stays reflexive and symmetric over
    /// the whole domain.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => ObjectRef::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(n) => write!(f, "Float({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(items) => f.debug_tuple("List").field(&**items).finish(),
            Value::Map(map) => f.debug_tuple("Map").field(&**map).finish(),
            Value::Range(r) => write!(f, "Range({}..{})", r.start, r.end),
            Value::Object(obj) => write!(f, "Object({})", obj.type_tag()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn null_equals_only_null() {
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Null, Value::Int(0));
        assert_ne!(Value::Null, Value::string(""));
        assert_ne!(Value::Null, Value::Bool(false));
    }

    #[test]
    fn structural_equality() {
        assert_eq!(Value::string("a"), Value::string("a"));
        assert_eq!(
            Value::list(vec![Value::Int(1)]),
            Value::list(vec![Value::Int(1)])
        );
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn range_iteration_both_directions() {
        let up: Vec<i64> = RangeValue::new(1, 3).iter().collect();
        assert_eq!(up, vec![1, 2, 3]);

        let down: Vec<i64> = RangeValue::new(3, 1).iter().collect();
        assert_eq!(down, vec![3, 2, 1]);

        let single: Vec<i64> = RangeValue::new(2, 2).iter().collect();
        assert_eq!(single, vec![2]);
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Int(1).type_name(), "integer");
        assert_eq!(Value::string("x").type_name(), "string");
        assert_eq!(Value::range(1, 2).type_name(), "range");
    }
}
