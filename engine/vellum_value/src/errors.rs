//! Error types for template initialization and rendering.
//!
//! # Structured Error Categories
//!
//! `RenderErrorKind` provides typed categories so callers can match on the
//! failure mode instead of parsing messages. Factory functions (e.g.
//! `division_by_zero()`) are the public construction API; they populate both
//! `kind` and `message`.
//!
//! Resolution fallbacks ("render the literal text") are NOT errors: the
//! resolver returns an explicit `Unresolved` outcome for those. Errors here
//! are the conditions that abort a render unless an event handler
//! substitutes a recovery value.

use std::fmt;
use vellum_ir::{Name, SourcePos};

/// Result of evaluating an expression node.
pub type RenderResult = Result<crate::Value, RenderError>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderErrorKind {
    // Init pass
    TemplateInit { detail: String },

    // Reference / method failures
    MethodInvocation {
        type_tag: String,
        method: String,
        detail: String,
    },
    /// Strict-reference mode found a genuinely missing reference.
    InvalidReference { reference: String },

    // Arithmetic (never event-interceptable)
    DivisionByZero,
    ModuloByZero,
    NumericOverflow { operation: String },
    InvalidBinaryOp {
        left: String,
        right: String,
        op: String,
    },
    InvalidUnaryOp { type_name: String, op: String },
    NotIterable { type_name: String },

    // Resources
    ResourceNotFound { name: String },
    /// `#parse`/`#evaluate` used with no parser configured.
    ParseUnavailable,

    // Limits
    MacroDepthExceeded { depth: usize },
    UndefinedMacro { name: String },

    // Output sink
    Io { detail: String },

    /// Catch-all for conditions without a structured kind.
    Custom { message: String },
}

impl fmt::Display for RenderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemplateInit { detail } => write!(f, "template initialization failed: {detail}"),
            Self::MethodInvocation {
                type_tag,
                method,
                detail,
            } => write!(f, "invocation of {method} on {type_tag} failed: {detail}"),
            Self::InvalidReference { reference } => {
                write!(f, "reference {reference} could not be resolved")
            }
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::ModuloByZero => write!(f, "modulo by zero"),
            Self::NumericOverflow { operation } => write!(f, "integer overflow in {operation}"),
            Self::InvalidBinaryOp { left, right, op } => {
                write!(f, "operator `{op}` cannot be applied to {left} and {right}")
            }
            Self::InvalidUnaryOp { type_name, op } => {
                write!(f, "operator `{op}` cannot be applied to {type_name}")
            }
            Self::NotIterable { type_name } => {
                write!(f, "#foreach cannot iterate a value of type {type_name}")
            }
            Self::ResourceNotFound { name } => write!(f, "resource not found: {name}"),
            Self::ParseUnavailable => {
                write!(f, "no template parser configured for #parse/#evaluate")
            }
            Self::MacroDepthExceeded { depth } => {
                write!(f, "maximum macro call depth exceeded (limit: {depth})")
            }
            Self::UndefinedMacro { name } => write!(f, "undefined macro: #{name}"),
            Self::Io { detail } => write!(f, "output sink failure: {detail}"),
            Self::Custom { message } => write!(f, "{message}"),
        }
    }
}

/// Rendering/initialization error with source context.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderError {
    /// Structured category.
    pub kind: RenderErrorKind,
    /// Human-readable message (equals `kind.to_string()` for factory-created
    /// errors).
    pub message: String,
    /// Source position, attached by the node that observed the failure.
    pub pos: Option<SourcePos>,
    /// Template the failure occurred in.
    pub template: Option<Name>,
}

impl RenderError {
    /// Create an error with just a message, using the `Custom` kind.
    ///
    /// Prefer a specific factory function when one exists.
    pub fn new(message: impl Into<String>) -> Self {
        let msg = message.into();
        Self {
            kind: RenderErrorKind::Custom {
                message: msg.clone(),
            },
            message: msg,
            pos: None,
            template: None,
        }
    }

    fn from_kind(kind: RenderErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            pos: None,
            template: None,
        }
    }

    /// Attach a source position if none is set yet. The innermost position
    /// wins, so outer nodes can add context without clobbering it.
    #[must_use]
    pub fn with_pos(mut self, pos: SourcePos) -> Self {
        if self.pos.is_none() && !pos.is_dummy() {
            self.pos = Some(pos);
        }
        self
    }

    /// Attach the template name if none is set yet.
    #[must_use]
    pub fn with_template(mut self, template: Name) -> Self {
        if self.template.is_none() {
            self.template = Some(template);
        }
        self
    }

    /// Whether this error is interceptable by the method-exception hook.
    ///
    /// Arithmetic and I/O errors always propagate; only genuine method
    /// invocation failures may be substituted.
    pub fn is_method_invocation(&self) -> bool {
        matches!(self.kind, RenderErrorKind::MethodInvocation { .. })
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pos) = self.pos {
            write!(f, "{} at {pos}", self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for RenderError {}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        io_error(err.to_string())
    }
}

// Factory functions

/// Structurally invalid directive usage found by the init pass.
pub fn template_init(detail: impl Into<String>) -> RenderError {
    RenderError::from_kind(RenderErrorKind::TemplateInit {
        detail: detail.into(),
    })
}

/// A resolved method or property accessor failed.
pub fn method_invocation(
    type_tag: impl Into<String>,
    method: impl Into<String>,
    detail: impl Into<String>,
) -> RenderError {
    RenderError::from_kind(RenderErrorKind::MethodInvocation {
        type_tag: type_tag.into(),
        method: method.into(),
        detail: detail.into(),
    })
}

/// Strict-reference mode failure for a missing reference.
pub fn invalid_reference(reference: impl Into<String>) -> RenderError {
    RenderError::from_kind(RenderErrorKind::InvalidReference {
        reference: reference.into(),
    })
}

/// Division by zero.
pub fn division_by_zero() -> RenderError {
    RenderError::from_kind(RenderErrorKind::DivisionByZero)
}

/// Modulo by zero.
pub fn modulo_by_zero() -> RenderError {
    RenderError::from_kind(RenderErrorKind::ModuloByZero)
}

/// Checked integer arithmetic overflowed.
pub fn numeric_overflow(operation: impl Into<String>) -> RenderError {
    RenderError::from_kind(RenderErrorKind::NumericOverflow {
        operation: operation.into(),
    })
}

/// Operator applied to operand types with no defined conversion.
pub fn invalid_binary_op(
    left: impl Into<String>,
    right: impl Into<String>,
    op: impl Into<String>,
) -> RenderError {
    RenderError::from_kind(RenderErrorKind::InvalidBinaryOp {
        left: left.into(),
        right: right.into(),
        op: op.into(),
    })
}

/// Unary operator applied to an unsupported operand.
pub fn invalid_unary_op(type_name: impl Into<String>, op: impl Into<String>) -> RenderError {
    RenderError::from_kind(RenderErrorKind::InvalidUnaryOp {
        type_name: type_name.into(),
        op: op.into(),
    })
}

/// `#foreach` over a non-iterable value.
pub fn not_iterable(type_name: impl Into<String>) -> RenderError {
    RenderError::from_kind(RenderErrorKind::NotIterable {
        type_name: type_name.into(),
    })
}

/// Include/parse target could not be located.
pub fn resource_not_found(name: impl Into<String>) -> RenderError {
    RenderError::from_kind(RenderErrorKind::ResourceNotFound { name: name.into() })
}

/// `#parse`/`#evaluate` with no parser configured.
pub fn parse_unavailable() -> RenderError {
    RenderError::from_kind(RenderErrorKind::ParseUnavailable)
}

/// Macro recursion exceeded the configured depth limit.
pub fn macro_depth_exceeded(depth: usize) -> RenderError {
    RenderError::from_kind(RenderErrorKind::MacroDepthExceeded { depth })
}

/// Call of a macro that no template in scope defines.
pub fn undefined_macro(name: impl Into<String>) -> RenderError {
    RenderError::from_kind(RenderErrorKind::UndefinedMacro { name: name.into() })
}

/// Output sink failure.
pub fn io_error(detail: impl Into<String>) -> RenderError {
    RenderError::from_kind(RenderErrorKind::Io {
        detail: detail.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn factory_messages_match_kind_display() {
        let err = division_by_zero();
        assert_eq!(err.message, "division by zero");
        assert_eq!(err.kind, RenderErrorKind::DivisionByZero);

        let err = invalid_binary_op("string", "list", "-");
        assert_eq!(
            err.message,
            "operator `-` cannot be applied to string and list"
        );
    }

    #[test]
    fn innermost_position_wins() {
        let err = division_by_zero()
            .with_pos(SourcePos::new(3, 7))
            .with_pos(SourcePos::new(1, 1));
        assert_eq!(err.pos, Some(SourcePos::new(3, 7)));
    }

    #[test]
    fn dummy_position_is_not_attached() {
        let err = division_by_zero().with_pos(SourcePos::DUMMY);
        assert_eq!(err.pos, None);
    }

    #[test]
    fn display_includes_position() {
        let err = modulo_by_zero().with_pos(SourcePos::new(2, 5));
        assert_eq!(format!("{err}"), "modulo by zero at line 2, column 5");
    }

    #[test]
    fn method_invocation_interceptability() {
        assert!(method_invocation("map-object", "get", "boom").is_method_invocation());
        assert!(!division_by_zero().is_method_invocation());
        assert!(!io_error("disk full").is_method_invocation());
    }
}
