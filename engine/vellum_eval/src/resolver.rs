//! Member access on resolved values.
//!
//! A reference walks root-then-accessors left to right. The renderer owns
//! the walk (it evaluates index and argument expressions); this module
//! owns the individual steps: property lookup, index access, and method
//! dispatch against each value shape, including the built-in method
//! surface on strings, lists, and maps. Host objects dispatch through
//! `Introspectable`; the evaluator never reflects.
//!
//! Property steps report which access style succeeded so the renderer can
//! memoize it in the introspection cache and retry it first next time.

use crate::context::CachedAccessor;
use vellum_value::{MethodOutcome, Value};

/// Outcome of resolving a full reference path.
#[derive(Clone, Debug)]
pub enum Resolution {
    /// The path resolved to a value (possibly `Null`).
    Resolved(Value),
    /// Some segment failed to resolve.
    Unresolved(Unresolved),
}

/// A failed resolution, carrying what the fallback rendering and the
/// invalid-reference hook need.
#[derive(Clone, Debug)]
pub struct Unresolved {
    /// Literal source spelling to render when no handler substitutes.
    pub raw: String,
    /// Quiet references render empty instead of the literal.
    pub quiet: bool,
    /// The value the failing segment was resolved against; `Null` when
    /// the root itself was unbound.
    pub receiver: Value,
    /// The property/method/index segment that failed; `None` when the
    /// root itself was unbound.
    pub segment: Option<String>,
}

/// Look up a property on a receiver.
///
/// `hint` is a previously cached access style; it is retried first and
/// falls through to the full chain on mismatch. Returns the value and the
/// style that worked, for the renderer to (re-)cache.
pub(crate) fn property_step(
    receiver: &Value,
    name: &str,
    hint: Option<CachedAccessor>,
) -> Option<(Value, CachedAccessor)> {
    if let Some(hint) = hint {
        if let Some(value) = try_style(receiver, name, hint) {
            return Some((value, hint));
        }
    }
    for style in [
        CachedAccessor::MapEntry,
        CachedAccessor::ObjectProperty,
        CachedAccessor::PseudoLen,
    ] {
        if Some(style) != hint {
            if let Some(value) = try_style(receiver, name, style) {
                return Some((value, style));
            }
        }
    }
    None
}

fn try_style(receiver: &Value, name: &str, style: CachedAccessor) -> Option<Value> {
    match style {
        CachedAccessor::MapEntry => match receiver {
            Value::Map(map) => map.get(name).cloned(),
            _ => None,
        },
        CachedAccessor::ObjectProperty => match receiver {
            Value::Object(obj) => obj.get_property(name),
            _ => None,
        },
        CachedAccessor::PseudoLen => pseudo_len(receiver, name),
    }
}

/// `length`/`size` pseudo-properties on built-in collections and strings.
/// Map entries shadow these, so `$map.size` prefers the entry named
/// `size`.
fn pseudo_len(receiver: &Value, name: &str) -> Option<Value> {
    if name != "length" && name != "size" {
        return None;
    }
    let len = match receiver {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        _ => return None,
    };
    Some(Value::Int(i64::try_from(len).unwrap_or(i64::MAX)))
}

/// Bracketed index access. Negative list/string indices count from the
/// end. Out-of-range and unknown-key lookups are unresolved, not errors.
pub(crate) fn index_step(receiver: &Value, index: &Value) -> Option<Value> {
    match receiver {
        Value::List(items) => {
            let i = as_index(index, items.len())?;
            items.get(i).cloned()
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = as_index(index, chars.len())?;
            chars.get(i).map(|c| Value::string(c.to_string()))
        }
        Value::Map(map) => {
            let key = index_key(index)?;
            map.get(&key).cloned()
        }
        Value::Object(obj) => obj.get_property(&index_key(index)?),
        _ => None,
    }
}

fn as_index(index: &Value, len: usize) -> Option<usize> {
    let Value::Int(i) = index else { return None };
    if *i >= 0 {
        usize::try_from(*i).ok()
    } else {
        // Negative indices count back from the end.
        len.checked_sub(usize::try_from(i.checked_neg()?).ok()?)
    }
}

pub(crate) fn index_key(index: &Value) -> Option<String> {
    match index {
        Value::Str(s) => Some((**s).clone()),
        Value::Int(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Method dispatch: built-in methods on built-in values, `Introspectable`
/// dispatch on host objects.
pub(crate) fn method_step(receiver: &Value, name: &str, args: &[Value]) -> MethodOutcome {
    match receiver {
        Value::Object(obj) => obj.call_method(name, args),
        Value::Str(s) => string_method(s, name, args),
        Value::List(items) => list_method(items, name, args),
        Value::Map(map) => map_method(map, name, args),
        _ => MethodOutcome::NotFound,
    }
}

fn len_value(len: usize) -> Value {
    Value::Int(i64::try_from(len).unwrap_or(i64::MAX))
}

fn string_method(s: &str, name: &str, args: &[Value]) -> MethodOutcome {
    match (name, args) {
        ("length" | "size", []) => MethodOutcome::Ok(len_value(s.chars().count())),
        ("isEmpty", []) => MethodOutcome::Ok(Value::Bool(s.is_empty())),
        ("toUpperCase", []) => MethodOutcome::Ok(Value::string(s.to_uppercase())),
        ("toLowerCase", []) => MethodOutcome::Ok(Value::string(s.to_lowercase())),
        ("trim", []) => MethodOutcome::Ok(Value::string(s.trim())),
        ("contains", [Value::Str(needle)]) => {
            MethodOutcome::Ok(Value::Bool(s.contains(needle.as_str())))
        }
        ("startsWith", [Value::Str(prefix)]) => {
            MethodOutcome::Ok(Value::Bool(s.starts_with(prefix.as_str())))
        }
        ("endsWith", [Value::Str(suffix)]) => {
            MethodOutcome::Ok(Value::Bool(s.ends_with(suffix.as_str())))
        }
        ("substring", [Value::Int(start)]) => substring(s, *start, None),
        ("substring", [Value::Int(start), Value::Int(end)]) => substring(s, *start, Some(*end)),
        _ => MethodOutcome::NotFound,
    }
}

fn substring(s: &str, start: i64, end: Option<i64>) -> MethodOutcome {
    let chars: Vec<char> = s.chars().collect();
    let len = i64::try_from(chars.len()).unwrap_or(i64::MAX);
    let end = end.unwrap_or(len);
    if start < 0 || end < start || end > len {
        return MethodOutcome::Failed(format!(
            "substring range {start}..{end} out of bounds for length {len}"
        ));
    }
    #[expect(
        clippy::cast_sign_loss,
        reason = "bounds checked non-negative above"
    )]
    let slice: String = chars[start as usize..end as usize].iter().collect();
    MethodOutcome::Ok(Value::string(slice))
}

fn list_method(items: &[Value], name: &str, args: &[Value]) -> MethodOutcome {
    match (name, args) {
        ("size" | "length", []) => MethodOutcome::Ok(len_value(items.len())),
        ("isEmpty", []) => MethodOutcome::Ok(Value::Bool(items.is_empty())),
        ("get", [index @ Value::Int(_)]) => {
            match as_index(index, items.len()).and_then(|i| items.get(i)) {
                Some(v) => MethodOutcome::Ok(v.clone()),
                None => MethodOutcome::Ok(Value::Null),
            }
        }
        ("contains", [needle]) => MethodOutcome::Ok(Value::Bool(items.contains(needle))),
        _ => MethodOutcome::NotFound,
    }
}

fn map_method(
    map: &std::collections::HashMap<String, Value>,
    name: &str,
    args: &[Value],
) -> MethodOutcome {
    match (name, args) {
        ("size" | "length", []) => MethodOutcome::Ok(len_value(map.len())),
        ("isEmpty", []) => MethodOutcome::Ok(Value::Bool(map.is_empty())),
        ("get", [Value::Str(key)]) => match map.get(key.as_str()) {
            Some(v) => MethodOutcome::Ok(v.clone()),
            None => MethodOutcome::Ok(Value::Null),
        },
        ("containsKey", [Value::Str(key)]) => {
            MethodOutcome::Ok(Value::Bool(map.contains_key(key.as_str())))
        }
        _ => MethodOutcome::NotFound,
    }
}

/// Store through the final accessor of a set target. Only host objects
/// support member writes; built-in collections are immutable snapshots,
/// so a write to them is unresolved and the caller runs the invalid-set
/// chain.
pub(crate) fn set_member(receiver: &Value, name: &str, value: Value) -> bool {
    match receiver {
        Value::Object(obj) => obj.set_property(name, value),
        _ => false,
    }
}
