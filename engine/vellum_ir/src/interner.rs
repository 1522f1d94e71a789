//! String interner for identifier storage.
//!
//! Template identifiers (variable roots, property and method names, template
//! names) are interned once and compared as `u32` indices afterwards.

// Arc is needed for SharedInterner - templates are parsed once and rendered
// from many threads, and every render needs to look names up.

use crate::Name;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Interner storage behind the lock.
struct InternStore {
    /// Map from string content to index.
    map: FxHashMap<&'static str, u32>,
    /// Storage for string contents.
    strings: Vec<&'static str>,
}

/// String interner for template identifiers.
///
/// Provides O(1) lookup and equality comparison for interned strings.
///
/// # Thread Safety
/// Uses an `RwLock` for concurrent read/write access; lookups take the read
/// lock only. Wrap in [`SharedInterner`] for sharing across renders.
pub struct StringInterner {
    store: RwLock<InternStore>,
}

impl StringInterner {
    /// Create a new interner with the empty string pre-interned at index 0.
    pub fn new() -> Self {
        let mut map = FxHashMap::default();
        let empty: &'static str = "";
        map.insert(empty, 0);
        StringInterner {
            store: RwLock::new(InternStore {
                map,
                strings: vec![empty],
            }),
        }
    }

    /// Intern a string, returning its `Name`.
    ///
    /// # Panics
    /// Panics if more than `u32::MAX` distinct strings are interned.
    pub fn intern(&self, s: &str) -> Name {
        // Fast path: already interned
        {
            let guard = self.store.read();
            if let Some(&idx) = guard.map.get(s) {
                return Name::from_raw(idx);
            }
        }

        let mut guard = self.store.write();

        // Double-check after acquiring the write lock
        if let Some(&idx) = guard.map.get(s) {
            return Name::from_raw(idx);
        }

        // Leak the string to get 'static lifetime; interned strings live for
        // the life of the process.
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let idx = u32::try_from(guard.strings.len())
            .unwrap_or_else(|_| panic!("interner exceeded u32::MAX strings"));
        guard.strings.push(leaked);
        guard.map.insert(leaked, idx);
        Name::from_raw(idx)
    }

    /// Look up the string for a `Name`.
    ///
    /// A name minted by a different interner resolves to a sentinel
    /// spelling rather than panicking.
    pub fn lookup(&self, name: Name) -> &'static str {
        let guard = self.store.read();
        guard
            .strings
            .get(name.raw() as usize)
            .copied()
            .unwrap_or("<unknown name>")
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.store.read().strings.len()
    }

    /// Check if the interner holds only the empty string.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for looking up interned string names.
///
/// Exists to avoid tight coupling: consumers can accept any `StringLookup`
/// implementor without depending directly on `StringInterner`.
pub trait StringLookup {
    /// Look up the string for an interned name.
    fn lookup(&self, name: Name) -> &str;
}

impl StringLookup for StringInterner {
    fn lookup(&self, name: Name) -> &str {
        StringInterner::lookup(self, name)
    }
}

/// Shared interner handle for use across parse and render phases.
///
/// This newtype enforces that all thread-safe interner sharing goes through
/// this type rather than ad-hoc `Arc<StringInterner>` values.
#[derive(Clone)]
pub struct SharedInterner(Arc<StringInterner>);

impl SharedInterner {
    /// Create a new shared interner.
    pub fn new() -> Self {
        SharedInterner(Arc::new(StringInterner::new()))
    }
}

impl Default for SharedInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for SharedInterner {
    type Target = StringInterner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_and_lookup() {
        let interner = StringInterner::new();

        let foo = interner.intern("foo");
        let bar = interner.intern("bar");
        let foo2 = interner.intern("foo");

        assert_eq!(foo, foo2);
        assert_ne!(foo, bar);
        assert_eq!(interner.lookup(foo), "foo");
        assert_eq!(interner.lookup(bar), "bar");
    }

    #[test]
    fn empty_string_pre_interned() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert_eq!(interner.lookup(Name::EMPTY), "");
    }

    #[test]
    fn foreign_name_resolves_to_the_sentinel() {
        let interner = StringInterner::new();
        interner.intern("only");
        assert_eq!(interner.lookup(Name::from_raw(999)), "<unknown name>");
    }

    #[test]
    fn shared_interner_clones_share_storage() {
        let interner = SharedInterner::new();
        let other = interner.clone();

        let a = interner.intern("shared");
        let b = other.intern("shared");
        assert_eq!(a, b);
    }
}
