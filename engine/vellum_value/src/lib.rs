//! Vellum Value - dynamic value domain for the template evaluator.
//!
//! This crate provides:
//! - `Value`: the dynamic value domain (null, booleans, numbers, strings,
//!   lists, maps, ranges, host objects)
//! - Duck-type coercion (`as_boolean`, `as_number`, `to_display`)
//! - `Introspectable`: the capability contract host objects implement
//! - `RenderError`/`RenderErrorKind` with factory constructors

mod coerce;
pub mod errors;
mod introspect;
mod value;

pub use coerce::{Num, NumPair};
pub use introspect::{Introspectable, MapObject, MethodOutcome, ObjectRef};
pub use value::{Heap, RangeValue, Value};

pub use errors::{
    // Core types
    RenderError, RenderErrorKind, RenderResult,
    // Init pass
    template_init,
    // Reference / method failures
    invalid_reference, method_invocation,
    // Arithmetic
    division_by_zero, invalid_binary_op, invalid_unary_op, modulo_by_zero, not_iterable,
    numeric_overflow,
    // Resources
    parse_unavailable, resource_not_found,
    // Limits
    macro_depth_exceeded, undefined_macro,
    // Output sink
    io_error,
};
