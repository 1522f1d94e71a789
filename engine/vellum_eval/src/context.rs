//! Context chain: the layered name-to-value store supplying template data.
//!
//! A `Context` is a cheap-clone handle over one of three scope shapes:
//! the user-supplied global bindings, a macro call frame, or an isolated
//! evaluate-block scope. Every context reachable in one render shares a
//! single `Housekeeping` cell carrying the template-name stack, the macro
//! call stack, the introspection cache, and the render-scoped event
//! cartridge.
//!
//! Lookup and write-through surface macro pass-by-reference bindings as
//! explicit `Deferred` outcomes instead of re-entering the evaluator from
//! inside the context; the renderer resolves them against the caller's
//! context.

use crate::events::EventCartridge;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use vellum_ir::{Name, NodeId, RefPath, SharedInterner};
use vellum_value::Value;

/// A single-threaded handle for reference-counted interior mutability.
///
/// Wraps `Rc<RefCell<T>>`; all scope allocations go through the factory so
/// the single-threaded choice is visible in one place.
///
/// # Thread Safety
/// `ScopeHandle<T>` is NOT thread-safe. One render owns one context chain
/// and runs on one thread; `Rc` avoids atomic reference counting on the
/// hottest path of the evaluator.
#[repr(transparent)]
pub struct ScopeHandle<T>(Rc<RefCell<T>>);

impl<T> ScopeHandle<T> {
    /// Create a new handle wrapping the given value.
    #[inline]
    pub fn new(value: T) -> Self {
        ScopeHandle(Rc::new(RefCell::new(value)))
    }
}

impl<T> Clone for ScopeHandle<T> {
    #[inline]
    fn clone(&self) -> Self {
        ScopeHandle(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for ScopeHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopeHandle").field(&self.0).finish()
    }
}

impl<T> Deref for ScopeHandle<T> {
    type Target = RefCell<T>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Flat name-to-value bindings.
pub type Bindings = FxHashMap<Name, Value>;

/// Accessor shape memoized by the introspection cache.
///
/// Records which access style succeeded for a (node, step, runtime type)
/// so repeated renders of the same template over same-shaped data skip the
/// trial chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CachedAccessor {
    /// Map entry lookup by key.
    MapEntry,
    /// Built-in `length`/`size` pseudo-property.
    PseudoLen,
    /// Host object `get_property`.
    ObjectProperty,
}

/// Cache key: node identity, accessor step, runtime type tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub node: NodeId,
    pub step: u32,
    pub tag: Name,
}

/// Per-render housekeeping state.
///
/// Exactly one `Housekeeping` is reachable from every context in a render;
/// it is created with the root context and shared by every derived scope,
/// so the template-name stack and the introspection cache stay consistent
/// no matter which context variant wraps them.
pub struct Housekeeping {
    /// Nested-template stack; the top is the template currently rendering.
    template_stack: Vec<Name>,
    /// Macro invocation stack, for depth limits and diagnostics.
    macro_stack: Vec<Name>,
    /// Memoized accessors, keyed per (node, step, runtime type). Never
    /// evicted; the cache dies with the render.
    accessor_cache: FxHashMap<CacheKey, CachedAccessor>,
    /// Render-scoped event cartridge, if one was attached.
    cartridge: Option<EventCartridge>,
    /// Sentinel reported when the template stack is empty.
    undefined: Name,
}

impl Housekeeping {
    fn new(undefined: Name) -> Self {
        Housekeeping {
            template_stack: Vec::new(),
            macro_stack: Vec::new(),
            accessor_cache: FxHashMap::default(),
            cartridge: None,
            undefined,
        }
    }

    /// The template currently rendering, or the undefined sentinel.
    pub fn current_template(&self) -> Name {
        self.template_stack.last().copied().unwrap_or(self.undefined)
    }

    /// Push a template name around a nested render.
    pub fn push_template(&mut self, name: Name) {
        self.template_stack.push(name);
    }

    /// Pop the current template name.
    pub fn pop_template(&mut self) {
        self.template_stack.pop();
    }

    /// Current macro nesting depth.
    pub fn macro_depth(&self) -> usize {
        self.macro_stack.len()
    }

    /// Push a macro invocation.
    pub fn push_macro(&mut self, name: Name) {
        self.macro_stack.push(name);
    }

    /// Pop the innermost macro invocation.
    pub fn pop_macro(&mut self) {
        self.macro_stack.pop();
    }

    /// Cached accessor for a key, if any.
    pub fn cached_accessor(&self, key: CacheKey) -> Option<CachedAccessor> {
        self.accessor_cache.get(&key).copied()
    }

    /// Record the accessor that worked. Last write wins.
    pub fn cache_accessor(&mut self, key: CacheKey, accessor: CachedAccessor) {
        self.accessor_cache.insert(key, accessor);
    }
}

/// A macro argument binding.
#[derive(Clone, Debug)]
pub enum MacroBinding {
    /// Live reference: re-evaluated against the caller's context on every
    /// access, written through on assignment.
    ByRef(RefBinding),
    /// Captured constant, evaluated once at call time.
    ByValue(Value),
}

/// A live pass-by-reference binding to a caller-side reference.
#[derive(Clone)]
pub struct RefBinding {
    /// The caller's argument reference path.
    pub path: RefPath,
    /// Node identity of the argument, for the introspection cache.
    pub node: NodeId,
    /// The context the path is evaluated/assigned in.
    pub caller: Context,
}

impl fmt::Debug for RefBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefBinding({})", self.path.raw)
    }
}

/// Macro call frame: parameter bindings plus a private local map.
pub struct MacroFrame {
    bindings: FxHashMap<Name, MacroBinding>,
    locals: Bindings,
    caller: Context,
    /// When set, all non-parameter reads and writes stay in `locals` and
    /// never touch the caller.
    local_scope: bool,
    /// Caller argument spellings, for literal fallback inside the body.
    literals: FxHashMap<Name, String>,
}

impl MacroFrame {
    /// Create a frame over the caller's context.
    pub fn new(caller: Context, local_scope: bool) -> Self {
        MacroFrame {
            bindings: FxHashMap::default(),
            locals: Bindings::default(),
            caller,
            local_scope,
            literals: FxHashMap::default(),
        }
    }

    /// Bind a parameter.
    pub fn bind(&mut self, param: Name, binding: MacroBinding) {
        self.bindings.insert(param, binding);
    }

    /// Record the caller's spelling of a parameter's argument.
    pub fn record_literal(&mut self, param: Name, raw: String) {
        self.literals.insert(param, raw);
    }
}

/// Result of a context lookup.
#[derive(Clone, Debug)]
pub enum Lookup {
    /// Bound to a value.
    Hit(Value),
    /// Bound to a live macro reference; the renderer evaluates it against
    /// the caller's context.
    Deferred(RefBinding),
    /// Not bound anywhere in the chain.
    Miss,
}

/// Result of a context write.
#[derive(Clone, Debug)]
pub enum Store {
    /// Written into the chain.
    Stored,
    /// The name is a live macro reference; the renderer assigns through the
    /// caller's reference instead.
    Deferred(RefBinding),
}

#[derive(Clone)]
enum ScopeKind {
    /// User-supplied flat bindings.
    Global(ScopeHandle<Bindings>),
    /// Macro call frame.
    Macro(ScopeHandle<MacroFrame>),
    /// Evaluate-block scope: reads check local then parent, writes go only
    /// to local.
    Isolated {
        local: ScopeHandle<Bindings>,
        parent: Box<ScopeKind>,
    },
}

/// The layered name-to-value store handed to every render.
///
/// Cloning is cheap (reference-counted handles); clones share state.
#[derive(Clone)]
pub struct Context {
    scope: ScopeKind,
    hk: ScopeHandle<Housekeeping>,
    interner: SharedInterner,
}

impl Context {
    /// Create a root context with empty global bindings.
    ///
    /// The housekeeping cell is created here; every scope derived from this
    /// context shares it.
    pub fn new(interner: &SharedInterner) -> Self {
        let undefined = interner.intern("<undefined>");
        Context {
            scope: ScopeKind::Global(ScopeHandle::new(Bindings::default())),
            hk: ScopeHandle::new(Housekeeping::new(undefined)),
            interner: interner.clone(),
        }
    }

    /// The interner this context resolves string keys through.
    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    /// Shared housekeeping cell.
    pub fn housekeeping(&self) -> &ScopeHandle<Housekeeping> {
        &self.hk
    }

    /// Attach a render-scoped event cartridge to this context's render.
    pub fn attach_cartridge(&self, cartridge: EventCartridge) {
        self.hk.borrow_mut().cartridge = Some(cartridge);
    }

    /// The render-scoped event cartridge, if attached.
    pub fn cartridge(&self) -> Option<EventCartridge> {
        self.hk.borrow().cartridge.clone()
    }

    /// Look up a name through the scope chain.
    pub fn get(&self, name: Name) -> Lookup {
        Self::get_in(&self.scope, name)
    }

    fn get_in(scope: &ScopeKind, name: Name) -> Lookup {
        match scope {
            ScopeKind::Global(bindings) => match bindings.borrow().get(&name) {
                Some(v) => Lookup::Hit(v.clone()),
                None => Lookup::Miss,
            },
            ScopeKind::Isolated { local, parent } => {
                if let Some(v) = local.borrow().get(&name) {
                    return Lookup::Hit(v.clone());
                }
                Self::get_in(parent, name)
            }
            ScopeKind::Macro(frame) => {
                let frame = frame.borrow();
                if let Some(binding) = frame.bindings.get(&name) {
                    return match binding {
                        MacroBinding::ByValue(v) => Lookup::Hit(v.clone()),
                        MacroBinding::ByRef(b) => Lookup::Deferred(b.clone()),
                    };
                }
                if let Some(v) = frame.locals.get(&name) {
                    return Lookup::Hit(v.clone());
                }
                if frame.local_scope {
                    Lookup::Miss
                } else {
                    frame.caller.get(name)
                }
            }
        }
    }

    /// Write a name through the scope chain.
    ///
    /// Globals and isolated scopes store directly. Macro frames rebind
    /// by-value parameters, write non-parameter names through to the caller
    /// (or keep them local in local-scope mode), and surface by-reference
    /// parameters as `Store::Deferred` for the renderer to assign through.
    pub fn put(&self, name: Name, value: Value) -> Store {
        Self::put_in(&self.scope, name, value)
    }

    fn put_in(scope: &ScopeKind, name: Name, value: Value) -> Store {
        match scope {
            ScopeKind::Global(bindings) => {
                bindings.borrow_mut().insert(name, value);
                Store::Stored
            }
            ScopeKind::Isolated { local, .. } => {
                local.borrow_mut().insert(name, value);
                Store::Stored
            }
            ScopeKind::Macro(frame) => {
                let mut frame = frame.borrow_mut();
                if let Some(binding) = frame.bindings.get(&name) {
                    match binding {
                        MacroBinding::ByRef(b) if !frame.local_scope => {
                            return Store::Deferred(b.clone());
                        }
                        // Local-scope mode severs write-through; by-value
                        // parameters always rebind in the frame.
                        _ => {
                            frame.bind(name, MacroBinding::ByValue(value));
                            return Store::Stored;
                        }
                    }
                }
                if frame.local_scope {
                    frame.locals.insert(name, value);
                    Store::Stored
                } else {
                    let caller = frame.caller.clone();
                    drop(frame);
                    caller.put(name, value)
                }
            }
        }
    }

    /// Remove a binding from the innermost scope that holds it directly.
    ///
    /// Used by `#foreach` to restore a loop variable that was unset before
    /// the loop.
    pub fn remove(&self, name: Name) {
        Self::remove_in(&self.scope, name);
    }

    fn remove_in(scope: &ScopeKind, name: Name) {
        match scope {
            ScopeKind::Global(bindings) => {
                bindings.borrow_mut().remove(&name);
            }
            ScopeKind::Isolated { local, parent } => {
                if local.borrow_mut().remove(&name).is_none() {
                    Self::remove_in(parent, name);
                }
            }
            ScopeKind::Macro(frame) => {
                let mut guard = frame.borrow_mut();
                // Parameter bindings are part of the call contract and
                // stay in place; only plain locals are removable.
                if guard.bindings.contains_key(&name)
                    || guard.locals.remove(&name).is_some()
                    || guard.local_scope
                {
                    return;
                }
                let caller = guard.caller.clone();
                drop(guard);
                caller.remove(name);
            }
        }
    }

    /// Convenience: look up by string key.
    pub fn get_str(&self, name: &str) -> Lookup {
        self.get(self.interner.intern(name))
    }

    /// Convenience: store by string key.
    pub fn put_str(&self, name: &str, value: Value) -> Store {
        self.put(self.interner.intern(name), value)
    }

    /// Derive a macro call-frame context sharing this render's housekeeping.
    #[must_use]
    pub fn enter_macro(&self, frame: MacroFrame) -> Context {
        Context {
            scope: ScopeKind::Macro(ScopeHandle::new(frame)),
            hk: self.hk.clone(),
            interner: self.interner.clone(),
        }
    }

    /// Derive an isolated evaluate-block context.
    #[must_use]
    pub fn enter_isolated(&self) -> Context {
        Context {
            scope: ScopeKind::Isolated {
                local: ScopeHandle::new(Bindings::default()),
                parent: Box::new(self.scope.clone()),
            },
            hk: self.hk.clone(),
            interner: self.interner.clone(),
        }
    }

    /// The caller's spelling of a macro parameter's argument, if this
    /// context sits inside a macro frame that preserved one.
    pub fn macro_literal(&self, root: Name) -> Option<String> {
        Self::macro_literal_in(&self.scope, root)
    }

    fn macro_literal_in(scope: &ScopeKind, root: Name) -> Option<String> {
        match scope {
            ScopeKind::Global(_) => None,
            ScopeKind::Isolated { parent, .. } => Self::macro_literal_in(parent, root),
            ScopeKind::Macro(frame) => {
                let frame = frame.borrow();
                if let Some(raw) = frame.literals.get(&root) {
                    return Some(raw.clone());
                }
                if frame.local_scope {
                    None
                } else {
                    frame.caller.macro_literal(root)
                }
            }
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.scope {
            ScopeKind::Global(_) => "global",
            ScopeKind::Macro(_) => "macro",
            ScopeKind::Isolated { .. } => "isolated",
        };
        write!(f, "Context({kind})")
    }
}

#[cfg(test)]
mod tests;
