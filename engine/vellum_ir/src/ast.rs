//! AST node model for templates.
//!
//! A template is literal text mixed with references (`$user.name`),
//! expressions, and directives (`#if`, `#set`, `#foreach`, macros). The
//! parser is an external collaborator; it allocates nodes into a
//! [`NodeArena`](crate::NodeArena) and hands the engine a finished tree.
//! Every node carries a [`SourcePos`] for diagnostics.

use crate::{Name, NodeId, SourcePos};
use smallvec::SmallVec;
use std::fmt;

/// Binary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// Source symbol for this operator, used in error messages.
    pub fn as_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Whether this is `&&` or `||`. Logical operators short-circuit, so the
    /// renderer evaluates them itself rather than through `evaluate_binary`.
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

/// Unary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Logical negation (`!x`).
    Not,
    /// Arithmetic negation (`-x`).
    Neg,
}

impl UnaryOp {
    /// Source symbol for this operator, used in error messages.
    pub fn as_symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}

/// One step in a reference path after the root variable.
#[derive(Clone, Debug, PartialEq)]
pub enum Accessor {
    /// Property access: `.name`.
    Property { name: Name },
    /// Bracketed index access: `[expr]`.
    Index { index: NodeId },
    /// Method call: `.name(args)`.
    Method { name: Name, args: Vec<NodeId> },
}

/// A reference path: root variable plus accessors, with its literal source
/// spelling preserved for fallback rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct RefPath {
    /// Root variable name (`$root`).
    pub root: Name,
    /// Accessor chain after the root, left to right.
    pub accessors: SmallVec<[Accessor; 2]>,
    /// Literal source text (`$user.name`), rendered when resolution fails
    /// and no event handler substitutes a value.
    pub raw: String,
    /// Quiet reference (`$!x`): renders empty instead of the literal on
    /// resolution failure.
    pub quiet: bool,
}

/// Whitespace captured around a directive line at parse time.
///
/// `prefix` is the indentation before the directive on its line; `postfix`
/// is the trailing whitespace up to and including the newline. The init pass
/// rewrites both according to the engine's space-gobbling policy, and the
/// renderer emits whatever remains.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Trim {
    pub prefix: String,
    pub postfix: String,
}

impl Trim {
    /// No captured whitespace.
    pub fn none() -> Self {
        Trim::default()
    }

    /// Capture prefix and postfix whitespace.
    pub fn new(prefix: impl Into<String>, postfix: impl Into<String>) -> Self {
        Trim {
            prefix: prefix.into(),
            postfix: postfix.into(),
        }
    }
}

/// One branch of an `#if` chain.
///
/// Branch 0 is the `#if` itself; later entries are `#elseif` (condition
/// `Some`) or `#else` (condition `None`, unconditionally true).
#[derive(Clone, Debug, PartialEq)]
pub struct IfBranch {
    pub condition: Option<NodeId>,
    pub body: NodeId,
    pub pos: SourcePos,
}

/// Node kind with kind-specific static data.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// Literal template text, written to output verbatim.
    Text { text: String },
    /// Comment (`## ...` or `#* ... *#`); renders nothing.
    Comment,
    /// Reference: `$root`, `$root.prop`, `$root.method(args)`, `$root[i]`.
    Reference(RefPath),
    /// Raw (single-quoted) string literal.
    StrLiteral { value: String },
    /// Interpolating (double-quoted) string literal: parts are text and
    /// reference/expression nodes rendered to an in-memory buffer.
    InterpString { parts: Vec<NodeId>, raw: String },
    IntLiteral { value: i64 },
    FloatLiteral { value: f64 },
    BoolLiteral { value: bool },
    /// List literal: `[1, 2, $x]`.
    ListLiteral { items: Vec<NodeId> },
    /// Map literal: `{"k": $v}`.
    MapLiteral { entries: Vec<(NodeId, NodeId)> },
    /// Integer range literal: `[1..$n]`.
    RangeLiteral { start: NodeId, end: NodeId },
    /// Binary expression.
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    /// Unary expression.
    Unary { op: UnaryOp, operand: NodeId },
    /// Ordered sequence of children (template body, directive bodies).
    Block { children: Vec<NodeId> },
    /// `#if` / `#elseif` / `#else` chain.
    If { branches: Vec<IfBranch>, trim: Trim },
    /// `#set($target = expr)`. The target must be a `Reference`; the init
    /// pass rejects anything else.
    Set {
        target: NodeId,
        value: NodeId,
        trim: Trim,
    },
    /// `#foreach($var in $iterable) body #end`.
    Foreach {
        var: Name,
        iterable: NodeId,
        body: NodeId,
        trim: Trim,
    },
    /// `#macro(name $p1 $p2) body #end` — definition only; collected into
    /// the template macro table at init, renders nothing.
    MacroDef {
        name: Name,
        params: Vec<Name>,
        body: NodeId,
        trim: Trim,
    },
    /// Macro invocation: `#name(args)`.
    MacroCall {
        name: Name,
        args: Vec<NodeId>,
        trim: Trim,
    },
    /// `#include("path")` (verbatim) or `#parse("path")` (parsed and
    /// rendered).
    Include {
        parse: bool,
        path: NodeId,
        trim: Trim,
    },
    /// `#evaluate(source)` — renders a string as a template in an isolated
    /// scope.
    Evaluate { source: NodeId, trim: Trim },
}

/// One AST node: kind plus source position.
///
/// Created once during parsing, init-ed once (single-threaded, before the
/// template is shared), rendered many times concurrently. Render never
/// mutates nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub pos: SourcePos,
}

impl Node {
    /// Trim data for directive kinds, if this node carries any.
    pub fn trim(&self) -> Option<&Trim> {
        match &self.kind {
            NodeKind::If { trim, .. }
            | NodeKind::Set { trim, .. }
            | NodeKind::Foreach { trim, .. }
            | NodeKind::MacroDef { trim, .. }
            | NodeKind::MacroCall { trim, .. }
            | NodeKind::Include { trim, .. }
            | NodeKind::Evaluate { trim, .. } => Some(trim),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_symbols() {
        assert_eq!(BinaryOp::Add.as_symbol(), "+");
        assert_eq!(BinaryOp::Ge.as_symbol(), ">=");
        assert_eq!(UnaryOp::Not.as_symbol(), "!");
        assert_eq!(format!("{}", BinaryOp::And), "&&");
    }

    #[test]
    fn logical_classification() {
        assert!(BinaryOp::And.is_logical());
        assert!(BinaryOp::Or.is_logical());
        assert!(!BinaryOp::Add.is_logical());
        assert!(!BinaryOp::Eq.is_logical());
    }

    #[test]
    fn trim_accessor_covers_directives() {
        let node = Node {
            kind: NodeKind::Comment,
            pos: SourcePos::DUMMY,
        };
        assert!(node.trim().is_none());

        let node = Node {
            kind: NodeKind::If {
                branches: vec![],
                trim: Trim::new("  ", "\n"),
            },
            pos: SourcePos::DUMMY,
        };
        let Some(trim) = node.trim() else {
            panic!("expected trim on #if");
        };
        assert_eq!(trim.prefix, "  ");
    }
}
