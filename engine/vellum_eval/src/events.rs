//! Event cartridge: host hooks into reference resolution and includes.
//!
//! A cartridge is an ordered list of handlers. The engine owns one
//! application-level cartridge; a render may attach a second one to its
//! context. At every hook point the application cartridge's handlers run
//! before the context cartridge's.
//!
//! One trait covers all hook points, with default bodies, so a handler
//! implements only what it cares about; `capabilities()` declares which
//! hooks it participates in and is read once at registration.

use bitflags::bitflags;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use vellum_value::{RenderError, Value};

bitflags! {
    /// Hook points a handler participates in.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        /// Transform resolved reference values before output.
        const REFERENCE_INSERTION = 1 << 0;
        /// Substitute values for unresolved references and dropped sets.
        const INVALID_REFERENCE = 1 << 1;
        /// Recover from failed method invocations.
        const METHOD_EXCEPTION = 1 << 2;
        /// Rewrite or block `#include`/`#parse` paths.
        const INCLUDE = 1 << 3;
    }
}

/// Hook-point handler. Implement the methods matching your declared
/// capabilities; undeclared hooks are never called on the handler.
pub trait EventHandler: Send + Sync {
    /// The hook points this handler participates in.
    fn capabilities(&self) -> Capabilities;

    /// A reference resolved to a non-null value about to be written to
    /// output. Returns the (possibly transformed) value; handlers chain.
    fn reference_insertion(&self, _reference: &str, value: Value) -> Value {
        value
    }

    /// A reference could not be resolved (render or `#set` right-hand
    /// side). `receiver` is the value the failing segment was looked up
    /// on (`Null` when the root itself was unbound) and `segment` is the
    /// failing property/method name. Return a substitute value, or
    /// `None` to pass to the next handler and ultimately the literal
    /// fallback.
    fn invalid_reference(
        &self,
        _reference: &str,
        _receiver: &Value,
        _segment: Option<&str>,
        _quiet: bool,
    ) -> Option<Value> {
        None
    }

    /// A `#set` assignment target could not be stored. Return `true` to
    /// mark the event handled and suppress the default warning.
    fn invalid_set(&self, _target: &str) -> bool {
        false
    }

    /// A resolved method invocation failed. Return a substitute value, or
    /// `None` to let the error propagate.
    fn method_exception(
        &self,
        _type_tag: &str,
        _method: &str,
        _error: &RenderError,
    ) -> Option<Value> {
        None
    }

    /// An `#include`/`#parse` is about to load `path` from `template`.
    /// Return the (possibly rewritten) path, or `None` to block the
    /// include silently.
    fn include_path(&self, path: &str, _template: &str) -> Option<String> {
        Some(path.to_owned())
    }
}

type Registered = (Capabilities, Arc<dyn EventHandler>);

/// An ordered, shareable list of event handlers.
///
/// Registration takes a write lock; dispatch clones a snapshot under a
/// read lock, so handlers added mid-render are seen by subsequent hook
/// points but never reorder one in flight.
#[derive(Clone, Default)]
pub struct EventCartridge {
    handlers: Arc<RwLock<Vec<Registered>>>,
}

impl EventCartridge {
    /// Create an empty cartridge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler. Its capabilities are read here, once.
    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) {
        let caps = handler.capabilities();
        self.handlers.write().push((caps, handler));
    }

    /// Remove a previously added handler by identity.
    pub fn remove_handler(&self, handler: &Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .retain(|(_, h)| !Arc::ptr_eq(h, handler));
    }

    /// Attach this cartridge to a render context.
    pub fn attach_to_context(&self, context: &crate::Context) {
        context.attach_cartridge(self.clone());
    }

    fn snapshot(&self, cap: Capabilities) -> Vec<Arc<dyn EventHandler>> {
        self.handlers
            .read()
            .iter()
            .filter(|(caps, _)| caps.contains(cap))
            .map(|(_, h)| Arc::clone(h))
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl fmt::Debug for EventCartridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventCartridge({} handlers)", self.handlers.read().len())
    }
}

/// The merged dispatch view of the application and context cartridges.
///
/// Application handlers always run before context handlers; within one
/// cartridge, registration order.
#[derive(Clone, Debug, Default)]
pub(crate) struct Events {
    app: Option<EventCartridge>,
    ctx: Option<EventCartridge>,
}

impl Events {
    pub(crate) fn new(app: Option<EventCartridge>, ctx: Option<EventCartridge>) -> Self {
        Events { app, ctx }
    }

    fn gather(&self, cap: Capabilities) -> Vec<Arc<dyn EventHandler>> {
        let mut handlers = Vec::new();
        if let Some(app) = &self.app {
            handlers.extend(app.snapshot(cap));
        }
        if let Some(ctx) = &self.ctx {
            handlers.extend(ctx.snapshot(cap));
        }
        handlers
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.app.as_ref().is_none_or(EventCartridge::is_empty)
            && self.ctx.as_ref().is_none_or(EventCartridge::is_empty)
    }

    /// Pipe a resolved value through every capable handler in order.
    pub(crate) fn reference_insertion(&self, reference: &str, value: Value) -> Value {
        let mut value = value;
        for handler in self.gather(Capabilities::REFERENCE_INSERTION) {
            value = handler.reference_insertion(reference, value);
        }
        value
    }

    /// First non-null substitute wins; `None` means literal fallback.
    pub(crate) fn invalid_reference(
        &self,
        reference: &str,
        receiver: &Value,
        segment: Option<&str>,
        quiet: bool,
    ) -> Option<Value> {
        for handler in self.gather(Capabilities::INVALID_REFERENCE) {
            if let Some(value) = handler.invalid_reference(reference, receiver, segment, quiet) {
                return Some(value);
            }
        }
        None
    }

    /// True if any handler claimed the dropped assignment.
    pub(crate) fn invalid_set(&self, target: &str) -> bool {
        self.gather(Capabilities::INVALID_REFERENCE)
            .iter()
            .any(|handler| handler.invalid_set(target))
    }

    /// Singleton semantics: only the first capable handler is consulted.
    /// `None` re-raises the original error.
    pub(crate) fn method_exception(
        &self,
        type_tag: &str,
        method: &str,
        error: &RenderError,
    ) -> Option<Value> {
        self.gather(Capabilities::METHOD_EXCEPTION)
            .first()
            .and_then(|handler| handler.method_exception(type_tag, method, error))
    }

    /// Chain path rewrites; a `None` return blocks the include.
    pub(crate) fn include_path(&self, path: &str, template: &str) -> Option<String> {
        let mut path = path.to_owned();
        for handler in self.gather(Capabilities::INCLUDE) {
            path = handler.include_path(&path, template)?;
        }
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Upper;

    impl EventHandler for Upper {
        fn capabilities(&self) -> Capabilities {
            Capabilities::REFERENCE_INSERTION
        }

        fn reference_insertion(&self, _reference: &str, value: Value) -> Value {
            Value::string(value.to_display().to_uppercase())
        }
    }

    struct Defaulter(Value);

    impl EventHandler for Defaulter {
        fn capabilities(&self) -> Capabilities {
            Capabilities::INVALID_REFERENCE
        }

        fn invalid_reference(
            &self,
            _reference: &str,
            _receiver: &Value,
            _segment: Option<&str>,
            _quiet: bool,
        ) -> Option<Value> {
            Some(self.0.clone())
        }
    }

    struct Blocker;

    impl EventHandler for Blocker {
        fn capabilities(&self) -> Capabilities {
            Capabilities::INCLUDE
        }

        fn include_path(&self, _path: &str, _template: &str) -> Option<String> {
            None
        }
    }

    fn merged(app: &EventCartridge, ctx: &EventCartridge) -> Events {
        Events::new(Some(app.clone()), Some(ctx.clone()))
    }

    #[test]
    fn insertion_pipes_through_handlers() {
        let app = EventCartridge::new();
        app.add_handler(Arc::new(Upper));
        let events = Events::new(Some(app), None);

        let out = events.reference_insertion("$x", Value::string("hi"));
        assert_eq!(out, Value::string("HI"));
    }

    #[test]
    fn application_handlers_run_before_context_handlers() {
        let app = EventCartridge::new();
        let ctx = EventCartridge::new();
        app.add_handler(Arc::new(Defaulter(Value::string("from-app"))));
        ctx.add_handler(Arc::new(Defaulter(Value::string("from-ctx"))));

        let got = merged(&app, &ctx).invalid_reference("$x", &Value::Null, None, false);
        assert_eq!(got, Some(Value::string("from-app")));

        // Context-only falls through to the context handler.
        let got = Events::new(None, Some(ctx)).invalid_reference("$x", &Value::Null, None, false);
        assert_eq!(got, Some(Value::string("from-ctx")));
    }

    #[test]
    fn include_chain_blocks_on_none() {
        let app = EventCartridge::new();
        app.add_handler(Arc::new(Blocker));
        let events = Events::new(Some(app), None);

        assert_eq!(events.include_path("header.vm", "main"), None);
    }

    #[test]
    fn remove_handler_by_identity() {
        let cartridge = EventCartridge::new();
        let handler: Arc<dyn EventHandler> = Arc::new(Upper);
        cartridge.add_handler(Arc::clone(&handler));
        cartridge.remove_handler(&handler);

        let events = Events::new(Some(cartridge), None);
        assert!(events.is_empty());
        let out = events.reference_insertion("$x", Value::string("hi"));
        assert_eq!(out, Value::string("hi"));
    }

    #[test]
    fn empty_events_pass_values_through() {
        let events = Events::default();
        assert!(events.is_empty());
        assert_eq!(events.invalid_reference("$x", &Value::Null, None, false), None);
        assert!(!events.invalid_set("$x"));
        assert_eq!(
            events.include_path("a.vm", "t"),
            Some(String::from("a.vm"))
        );
    }
}
