//! Source positions for template diagnostics.
//!
//! Templates are diagnosed by line and column rather than byte offset: the
//! engine never re-reads the source text after parsing, so positions must be
//! self-describing.

use std::fmt;

/// Line/column position of a node in its template source.
///
/// Layout: 8 bytes total. Lines and columns are 1-based; `DUMMY` (0:0) marks
/// synthesized nodes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
#[repr(C)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
}

impl SourcePos {
    /// Dummy position for synthesized nodes.
    pub const DUMMY: SourcePos = SourcePos { line: 0, column: 0 };

    /// Create a new position.
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        SourcePos { line, column }
    }

    /// Check whether this is the dummy position.
    #[inline]
    pub const fn is_dummy(&self) -> bool {
        self.line == 0 && self.column == 0
    }
}

impl fmt::Debug for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

// Size assertion to prevent accidental regressions
#[cfg(target_pointer_width = "64")]
mod size_asserts {
    use super::SourcePos;
    crate::static_assert_size!(SourcePos, 8);
}
