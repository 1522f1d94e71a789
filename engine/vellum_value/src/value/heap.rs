//! Shared heap wrapper for reference-counted values.

// Arc is the intentional implementation detail of Heap<T>: values are cloned
// freely during rendering and may be captured by macro frames.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Thread-safe shared wrapper for heap-allocated value payloads.
///
/// The constructor is crate-private so all heap values go through the
/// factory methods on [`Value`](crate::Value); external code cannot build a
/// `Value::Str` (or list/map) from an arbitrary `Arc`.
#[repr(transparent)]
pub struct Heap<T: ?Sized>(Arc<T>);

impl<T> Heap<T> {
    /// Create a new heap value. Crate-private by design.
    #[inline]
    pub(crate) fn new(value: T) -> Self {
        Heap(Arc::new(value))
    }
}

impl<T: ?Sized> Heap<T> {
    /// Pointer identity comparison.
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl<T: ?Sized> Clone for Heap<T> {
    #[inline]
    fn clone(&self) -> Self {
        Heap(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> Deref for Heap<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: fmt::Debug + ?Sized> fmt::Debug for Heap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T: PartialEq + ?Sized> PartialEq for Heap<T> {
    fn eq(&self, other: &Self) -> bool {
        *self.0 == *other.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deref_and_eq() {
        let a = Heap::new(String::from("x"));
        let b = Heap::new(String::from("x"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
        assert!(!Heap::ptr_eq(&a, &b));
        let c = a.clone();
        assert!(Heap::ptr_eq(&a, &c));
    }
}
