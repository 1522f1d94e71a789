//! Host-object contract.
//!
//! The evaluator never reflects over host types. Instead, anything a template
//! can dot into implements `Introspectable`: a capability interface covering
//! property get/set, method calls, iteration, and boolean conversion. Host
//! adapters implement it per concrete type; the resolver depends only on the
//! trait.

use crate::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Outcome of a method call against a host object.
///
/// Distinguishes "no such method" (which feeds the invalid-reference event
/// chain) from "the method itself failed" (a method-invocation error,
/// interceptable by the method-exception hook).
#[derive(Clone, Debug, PartialEq)]
pub enum MethodOutcome {
    /// No method with this name/arity on the receiver.
    NotFound,
    /// The method ran and produced a value.
    Ok(Value),
    /// The method ran and failed with the given message.
    Failed(String),
}

/// Capability contract the evaluator requires from host objects.
///
/// # Contract
///
/// `type_tag` and member lookup must be deterministic for a given
/// (concrete type, member name, arity): the resolver memoizes the accessor
/// that worked for a node per type tag, and a flapping lookup would make that
/// cache unsound.
///
/// Implementations must be `Send + Sync`; objects may sit in a context that a
/// host shares between renders. Mutation behind `set_property` is the
/// implementor's concern (interior mutability).
pub trait Introspectable: Send + Sync {
    /// Stable tag for the concrete type, used in diagnostics and as the
    /// introspection-cache key component.
    fn type_tag(&self) -> &str;

    /// Get a named property, or `None` when the object has no such property.
    fn get_property(&self, name: &str) -> Option<Value>;

    /// Set a named property. Returns false when the property is unknown or
    /// read-only; the assignment is then dropped through the invalid-set
    /// event chain.
    fn set_property(&self, _name: &str, _value: Value) -> bool {
        false
    }

    /// Call a named method with evaluated arguments.
    fn call_method(&self, _name: &str, _args: &[Value]) -> MethodOutcome {
        MethodOutcome::NotFound
    }

    /// Produce the items `#foreach` iterates, if the object is iterable.
    fn iterate(&self) -> Option<Vec<Value>> {
        None
    }

    /// Boolean conversion hook for duck-typed truthiness. `None` falls back
    /// to the presence rule (non-null objects are true).
    fn as_boolean(&self) -> Option<bool> {
        None
    }

    /// Output rendering of the object.
    fn display(&self) -> String {
        format!("[{}]", self.type_tag())
    }
}

/// Shared handle to a host object.
///
/// A newtype over `Arc<dyn Introspectable>` so object identity semantics
/// (equality, cloning) live in one place.
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn Introspectable>);

impl ObjectRef {
    /// Wrap a host object.
    pub fn new(obj: impl Introspectable + 'static) -> Self {
        ObjectRef(Arc::new(obj))
    }

    /// Identity comparison; host objects have no structural equality.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl std::ops::Deref for ObjectRef {
    type Target = dyn Introspectable;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.0.type_tag())
    }
}

/// Reference adapter: a mutable string-keyed map exposed as a host object.
///
/// Property get/set read and write the map; iteration yields the values.
/// Useful both as the simplest host adapter and in tests.
pub struct MapObject {
    entries: RwLock<HashMap<String, Value>>,
}

impl MapObject {
    /// Create an empty map object.
    pub fn new() -> Self {
        MapObject {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create from existing entries.
    pub fn from_entries(entries: HashMap<String, Value>) -> Self {
        MapObject {
            entries: RwLock::new(entries),
        }
    }
}

impl Default for MapObject {
    fn default() -> Self {
        Self::new()
    }
}

impl Introspectable for MapObject {
    fn type_tag(&self) -> &str {
        "map-object"
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        self.entries.read().get(name).cloned()
    }

    fn set_property(&self, name: &str, value: Value) -> bool {
        self.entries.write().insert(name.to_owned(), value);
        true
    }

    fn call_method(&self, name: &str, args: &[Value]) -> MethodOutcome {
        match (name, args) {
            ("get", [Value::Str(key)]) => match self.entries.read().get(key.as_str()) {
                Some(v) => MethodOutcome::Ok(v.clone()),
                None => MethodOutcome::Ok(Value::Null),
            },
            ("size", []) => {
                let len = self.entries.read().len();
                MethodOutcome::Ok(Value::Int(i64::try_from(len).unwrap_or(i64::MAX)))
            }
            ("isEmpty", []) => MethodOutcome::Ok(Value::Bool(self.entries.read().is_empty())),
            _ => MethodOutcome::NotFound,
        }
    }

    fn iterate(&self) -> Option<Vec<Value>> {
        Some(self.entries.read().values().cloned().collect())
    }

    fn as_boolean(&self) -> Option<bool> {
        Some(!self.entries.read().is_empty())
    }
}
