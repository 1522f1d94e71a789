//! Engine facade: configuration, collaborators, and render entry points.
//!
//! An `Engine` is an explicit constructed value carrying everything a
//! render needs: configuration, the shared interner, the application
//! event cartridge, and the optional resource loader and parser. There is
//! no ambient global; embedders that want several differently-configured
//! engines in one process just build several.

use crate::context::Context;
use crate::events::{EventCartridge, Events};
use crate::exec::Renderer;
use crate::gobble::SpaceGobbling;
use crate::init;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::SystemTime;
use vellum_ir::{SharedInterner, Template};
use vellum_value::{io_error, resource_not_found, template_init, RenderError};

/// Engine configuration. Plain data; construct it, tweak fields, hand it
/// to the builder.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Error on genuinely unresolved references instead of rendering the
    /// literal text. Quiet (`$!x`) references are exempt.
    pub strict_references: bool,
    /// Whitespace policy around directive lines.
    pub space_gobbling: SpaceGobbling,
    /// Isolate every non-parameter name inside macro bodies.
    pub macro_local_scope: bool,
    /// Literal fallback inside macro bodies shows the caller's argument
    /// spelling instead of the parameter name.
    pub preserve_arg_literals: bool,
    /// Maximum macro call nesting; negative means unbounded.
    pub max_macro_depth: i32,
    /// Interpolate references inside double-quoted string literals.
    pub string_interpolation: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            strict_references: false,
            space_gobbling: SpaceGobbling::default(),
            macro_local_scope: false,
            preserve_arg_literals: true,
            max_macro_depth: 20,
            string_interpolation: true,
        }
    }
}

/// Loads include/parse targets by resource name.
pub trait ResourceLoader: Send + Sync {
    /// Load a resource's source text.
    fn load(&self, name: &str) -> Result<String, RenderError>;

    /// When the resource last changed, if the loader can tell.
    fn last_modified(&self, name: &str) -> Option<SystemTime>;

    /// Whether the resource changed after `since`. Loaders with no
    /// modification tracking report `false`, never spuriously `true`.
    fn is_source_modified(&self, name: &str, since: SystemTime) -> bool {
        self.last_modified(name).is_some_and(|t| t > since)
    }
}

struct StoredResource {
    source: String,
    modified: SystemTime,
}

/// In-memory resource loader for embedders and tests.
#[derive(Default)]
pub struct MemoryResourceLoader {
    entries: RwLock<HashMap<String, StoredResource>>,
}

impl MemoryResourceLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a resource, stamping it with the current time.
    pub fn insert(&self, name: impl Into<String>, source: impl Into<String>) {
        self.entries.write().insert(
            name.into(),
            StoredResource {
                source: source.into(),
                modified: SystemTime::now(),
            },
        );
    }

    /// Remove a resource.
    pub fn remove(&self, name: &str) {
        self.entries.write().remove(name);
    }
}

impl ResourceLoader for MemoryResourceLoader {
    fn load(&self, name: &str) -> Result<String, RenderError> {
        self.entries
            .read()
            .get(name)
            .map(|r| r.source.clone())
            .ok_or_else(|| resource_not_found(name))
    }

    fn last_modified(&self, name: &str) -> Option<SystemTime> {
        self.entries.read().get(name).map(|r| r.modified)
    }
}

/// Parses template source into a [`Template`].
///
/// Parsing is pluggable; `#parse` and `#evaluate` fail with a
/// `ParseUnavailable` error on engines built without one.
pub trait TemplateParser: Send + Sync {
    /// Parse `source` into a template named `name`, allocating identifiers
    /// through the engine's interner.
    fn parse(
        &self,
        name: &str,
        source: &str,
        interner: &SharedInterner,
    ) -> Result<Template, RenderError>;
}

/// Builder for [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    interner: Option<SharedInterner>,
    loader: Option<Arc<dyn ResourceLoader>>,
    parser: Option<Arc<dyn TemplateParser>>,
}

impl EngineBuilder {
    /// Start with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing interner (templates built against it resolve
    /// names without re-interning).
    #[must_use]
    pub fn interner(mut self, interner: SharedInterner) -> Self {
        self.interner = Some(interner);
        self
    }

    /// Wire a resource loader for `#include`/`#parse`.
    #[must_use]
    pub fn loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Wire a template parser for `#parse`/`#evaluate`.
    #[must_use]
    pub fn parser(mut self, parser: Arc<dyn TemplateParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Finish the engine.
    pub fn build(self) -> Engine {
        Engine {
            config: self.config,
            interner: self.interner.unwrap_or_default(),
            cartridge: EventCartridge::new(),
            loader: self.loader,
            parser: self.parser,
        }
    }
}

/// The template engine.
///
/// Shareable across threads; each render call is independent and owns its
/// context and output sink.
pub struct Engine {
    config: EngineConfig,
    interner: SharedInterner,
    cartridge: EventCartridge,
    loader: Option<Arc<dyn ResourceLoader>>,
    parser: Option<Arc<dyn TemplateParser>>,
}

impl Engine {
    /// An engine with default configuration and no collaborators.
    pub fn new() -> Self {
        EngineBuilder::new().build()
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The interner templates for this engine must be built against.
    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    /// Application-level event cartridge, applied to every render before
    /// any context-level cartridge.
    pub fn cartridge(&self) -> &EventCartridge {
        &self.cartridge
    }

    pub(crate) fn loader(&self) -> Option<&Arc<dyn ResourceLoader>> {
        self.loader.as_ref()
    }

    pub(crate) fn parser(&self) -> Option<&Arc<dyn TemplateParser>> {
        self.parser.as_ref()
    }

    /// Create a fresh render context bound to this engine's interner.
    pub fn new_context(&self) -> Context {
        Context::new(&self.interner)
    }

    /// Run the one-time init pass: validate directive structure, collect
    /// macro definitions, resolve the whitespace policy. Idempotent; must
    /// complete before the template is shared or rendered.
    pub fn init_template(&self, template: &mut Template) -> Result<(), RenderError> {
        init::initialize(template, &self.config)
    }

    /// Render a template into an output sink.
    ///
    /// Writes are incremental; on error the sink keeps everything written
    /// before the failure. There is no rollback.
    pub fn render(
        &self,
        template: &Template,
        context: &Context,
        out: &mut dyn Write,
    ) -> Result<(), RenderError> {
        if !template.is_initialized() {
            return Err(template_init("template rendered before initialization")
                .with_template(template.name()));
        }
        let events = Events::new(Some(self.cartridge.clone()), context.cartridge());
        let renderer = Renderer::new(self, template, events);
        context
            .housekeeping()
            .borrow_mut()
            .push_template(template.name());
        let result = renderer
            .render(context, out)
            .map_err(|e| e.with_template(template.name()));
        context.housekeeping().borrow_mut().pop_template();
        result
    }

    /// Render a template to an in-memory string.
    pub fn evaluate(&self, template: &Template, context: &Context) -> Result<String, RenderError> {
        let mut buf = Vec::new();
        self.render(template, context, &mut buf)?;
        String::from_utf8(buf).map_err(|e| io_error(e.to_string()))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
