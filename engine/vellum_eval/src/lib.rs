//! Vellum Eval - the template evaluation engine.
//!
//! This crate renders parsed templates (`vellum_ir`) over dynamic values
//! (`vellum_value`):
//!
//! - `Context`: the layered name-to-value store (globals, macro frames,
//!   isolated evaluate scopes) with explicit pass-by-reference outcomes
//! - Operator evaluation with short-circuit logic and the `+`
//!   concatenation fallback
//! - Reference resolution with an introspection cache and literal-text
//!   fallback for unresolved references
//! - Directive rendering: `#if`/`#elseif`/`#else`, `#set`, `#foreach`,
//!   macros, `#include`/`#parse`, `#evaluate`
//! - `EventCartridge` host hooks, merged application-then-context
//! - `Engine`: configuration, init pass, and render entry points
//!
//! # Render Lifecycle
//!
//! A template is parsed (externally), initialized exactly once via
//! [`Engine::init_template`] while exclusively owned, then shared
//! read-only across any number of concurrent [`Engine::render`] calls.
//! Each render owns its context and output sink; contexts are
//! single-threaded by design.

mod context;
mod engine;
mod events;
mod exec;
mod gobble;
mod init;
mod operators;
mod resolver;

pub use context::{
    Bindings, CacheKey, CachedAccessor, Context, Housekeeping, Lookup, MacroBinding, MacroFrame,
    RefBinding, ScopeHandle, Store,
};
pub use engine::{
    Engine, EngineBuilder, EngineConfig, MemoryResourceLoader, ResourceLoader, TemplateParser,
};
pub use events::{Capabilities, EventCartridge, EventHandler};
pub use gobble::{dedent, SpaceGobbling};
pub use operators::{evaluate_binary, evaluate_unary};
pub use resolver::{Resolution, Unresolved};
