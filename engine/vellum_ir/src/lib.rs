//! Vellum IR - AST and template container types.
//!
//! This crate contains the structural representation of a parsed template:
//! - `SourcePos` for line/column diagnostics
//! - `Name` and `StringInterner` for interned identifiers
//! - `NodeArena`/`NodeId` flattened node storage
//! - `Node`/`NodeKind` AST model (text, references, expressions, directives)
//! - `Template` and `TemplateBuilder`
//!
//! # Design Philosophy
//!
//! - **Intern identifiers**: variable, property, and method names become
//!   `Name(u32)` for O(1) comparison.
//! - **Flatten the tree**: no `Box<Node>`; children are `NodeId(u32)` indices
//!   into the template's arena. The id doubles as the node identity the
//!   evaluator keys its introspection cache on.
//! - **Init before sharing**: the arena is exclusively owned until the init
//!   pass finishes, so concurrent renders only ever see a fully prepared
//!   tree.

/// Compile-time assertion that a type has a specific size.
///
/// Used to prevent accidental size regressions in frequently-allocated types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod arena;
pub mod ast;
mod interner;
mod name;
mod span;
mod template;

pub use arena::{NodeArena, NodeId};
pub use ast::{Accessor, BinaryOp, IfBranch, Node, NodeKind, RefPath, Trim, UnaryOp};
pub use interner::{SharedInterner, StringInterner, StringLookup};
pub use name::Name;
pub use span::SourcePos;
pub use template::{MacroDef, Template, TemplateBuilder};
