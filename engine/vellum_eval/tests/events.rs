//! Event cartridge integration: insertion transforms, invalid-reference
//! substitution ordering, method-exception recovery, and include hooks.

mod common;

use common::{engine_with, init, render};
use std::sync::Arc;
use vellum_eval::{
    Capabilities, Engine, EngineBuilder, EngineConfig, EventCartridge, EventHandler,
    MemoryResourceLoader, TemplateParser,
};
use vellum_ir::{SharedInterner, Template, TemplateBuilder, Trim};
use vellum_value::{
    Introspectable, MethodOutcome, ObjectRef, RenderError, RenderErrorKind, Value,
};

struct Tagger(&'static str);

impl EventHandler for Tagger {
    fn capabilities(&self) -> Capabilities {
        Capabilities::REFERENCE_INSERTION
    }

    fn reference_insertion(&self, _reference: &str, value: Value) -> Value {
        Value::string(format!("{}:{}", self.0, value.to_display()))
    }
}

struct Substitute(&'static str);

impl EventHandler for Substitute {
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
        Some(Value::string(self.0))
    }
}

struct Recoverer;

impl EventHandler for Recoverer {
    fn capabilities(&self) -> Capabilities {
        Capabilities::METHOD_EXCEPTION
    }

    fn method_exception(
        &self,
        _type_tag: &str,
        _method: &str,
        _error: &RenderError,
    ) -> Option<Value> {
        Some(Value::string("recovered"))
    }
}

struct Rewrite {
    from: &'static str,
    to: &'static str,
}

impl EventHandler for Rewrite {
    fn capabilities(&self) -> Capabilities {
        Capabilities::INCLUDE
    }

    fn include_path(&self, path: &str, _template: &str) -> Option<String> {
        if path == self.from {
            Some(self.to.to_owned())
        } else {
            Some(path.to_owned())
        }
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

/// Host object whose only method always fails.
struct Flaky;

impl Introspectable for Flaky {
    fn type_tag(&self) -> &str {
        "flaky"
    }

    fn get_property(&self, _name: &str) -> Option<Value> {
        None
    }

    fn call_method(&self, name: &str, _args: &[Value]) -> MethodOutcome {
        if name == "poke" {
            MethodOutcome::Failed(String::from("backend down"))
        } else {
            MethodOutcome::NotFound
        }
    }
}

/// Parser stub: every source becomes a single verbatim text node.
struct TextParser;

impl TemplateParser for TextParser {
    fn parse(
        &self,
        name: &str,
        source: &str,
        interner: &SharedInterner,
    ) -> Result<Template, RenderError> {
        let mut b = TemplateBuilder::new(name, interner);
        let text = b.text(source);
        let root = b.block(vec![text]);
        Ok(b.build(root))
    }
}

fn var_template(engine: &Engine, name: &str) -> Template {
    let mut b = TemplateBuilder::new("t", engine.interner());
    let var = b.var(name);
    let root = b.block(vec![var]);
    b.build(root)
}

fn include_template(engine: &Engine, path: &str, parse: bool) -> Template {
    let mut b = TemplateBuilder::new("main", engine.interner());
    let path = b.str_lit(path);
    let inc = if parse {
        b.parse(path, Trim::none())
    } else {
        b.include(path, Trim::none())
    };
    let root = b.block(vec![inc]);
    b.build(root)
}

#[test]
fn insertion_handlers_chain_application_then_context() {
    let engine = engine_with(EngineConfig::default());
    engine.cartridge().add_handler(Arc::new(Tagger("app")));

    let mut template = var_template(&engine, "v");
    init(&engine, &mut template);

    let ctx = engine.new_context();
    ctx.put_str("v", Value::string("x"));

    let ctx_cartridge = EventCartridge::new();
    ctx_cartridge.add_handler(Arc::new(Tagger("ctx")));
    ctx_cartridge.attach_to_context(&ctx);

    // Application first, context second: ctx wraps app's output.
    assert_eq!(render(&engine, &template, &ctx), "ctx:app:x");
}

#[test]
fn invalid_reference_substitution_prefers_application_handlers() {
    let engine = engine_with(EngineConfig::default());
    engine.cartridge().add_handler(Arc::new(Substitute("app")));

    let mut template = var_template(&engine, "missing");
    init(&engine, &mut template);

    let ctx = engine.new_context();
    let ctx_cartridge = EventCartridge::new();
    ctx_cartridge.add_handler(Arc::new(Substitute("ctx")));
    ctx_cartridge.attach_to_context(&ctx);

    assert_eq!(render(&engine, &template, &ctx), "app");

    // Without the application handler the context handler answers.
    let engine = engine_with(EngineConfig::default());
    let mut template = var_template(&engine, "missing");
    init(&engine, &mut template);
    let ctx = engine.new_context();
    let ctx_cartridge = EventCartridge::new();
    ctx_cartridge.add_handler(Arc::new(Substitute("ctx")));
    ctx_cartridge.attach_to_context(&ctx);

    assert_eq!(render(&engine, &template, &ctx), "ctx");
}

#[test]
fn insertion_is_skipped_for_null_and_unresolved_references() {
    let engine = engine_with(EngineConfig::default());
    engine.cartridge().add_handler(Arc::new(Tagger("app")));

    let mut template = var_template(&engine, "missing");
    init(&engine, &mut template);

    // No substitution handler: the literal falls through untagged.
    let ctx = engine.new_context();
    assert_eq!(render(&engine, &template, &ctx), "$missing");
}

#[test]
fn invalid_reference_reports_the_failing_segment_and_receiver() {
    use parking_lot::Mutex;

    struct SegmentSpy(Arc<Mutex<Vec<(String, String, String)>>>);

    impl EventHandler for SegmentSpy {
        fn capabilities(&self) -> Capabilities {
            Capabilities::INVALID_REFERENCE
        }

        fn invalid_reference(
            &self,
            reference: &str,
            receiver: &Value,
            segment: Option<&str>,
            _quiet: bool,
        ) -> Option<Value> {
            self.0.lock().push((
                reference.to_owned(),
                receiver.type_name().to_owned(),
                segment.unwrap_or("<root>").to_owned(),
            ));
            None
        }
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let engine = engine_with(EngineConfig::default());
    engine
        .cartridge()
        .add_handler(Arc::new(SegmentSpy(Arc::clone(&seen))));

    // $user.missing fails on the `missing` segment of a map receiver;
    // $ghost fails at the root.
    let mut b = TemplateBuilder::new("t", engine.interner());
    let member = b.prop_ref("user", &["missing"]);
    let ghost = b.var("ghost");
    let root = b.block(vec![member, ghost]);
    let mut template = b.build(root);
    init(&engine, &mut template);

    let ctx = engine.new_context();
    let mut user = std::collections::HashMap::new();
    user.insert(String::from("name"), Value::string("Ada"));
    ctx.put_str("user", Value::map(user));

    assert_eq!(render(&engine, &template, &ctx), "$user.missing$ghost");
    assert_eq!(
        *seen.lock(),
        vec![
            (
                String::from("$user.missing"),
                String::from("map"),
                String::from("missing"),
            ),
            (
                String::from("$ghost"),
                String::from("null"),
                String::from("<root>"),
            ),
        ]
    );
}

#[test]
fn method_exception_handler_substitutes_a_value() {
    let engine = engine_with(EngineConfig::default());
    engine.cartridge().add_handler(Arc::new(Recoverer));

    let mut b = TemplateBuilder::new("t", engine.interner());
    let call = b.method_ref("svc", "poke", vec![], "$svc.poke()");
    let root = b.block(vec![call]);
    let mut template = b.build(root);
    init(&engine, &mut template);

    let ctx = engine.new_context();
    ctx.put_str("svc", Value::object(ObjectRef::new(Flaky)));
    assert_eq!(render(&engine, &template, &ctx), "recovered");
}

#[test]
fn method_exception_handler_recovers_strict_reference_failures() {
    let engine = engine_with(EngineConfig {
        strict_references: true,
        ..EngineConfig::default()
    });
    engine.cartridge().add_handler(Arc::new(Recoverer));

    let mut template = var_template(&engine, "missing");
    init(&engine, &mut template);

    let ctx = engine.new_context();
    assert_eq!(render(&engine, &template, &ctx), "recovered");
}

#[test]
fn method_exception_without_handler_propagates() {
    let engine = engine_with(EngineConfig::default());
    let mut b = TemplateBuilder::new("t", engine.interner());
    let call = b.method_ref("svc", "poke", vec![], "$svc.poke()");
    let root = b.block(vec![call]);
    let mut template = b.build(root);
    init(&engine, &mut template);

    let ctx = engine.new_context();
    ctx.put_str("svc", Value::object(ObjectRef::new(Flaky)));
    let err = engine.evaluate(&template, &ctx);
    assert!(matches!(
        err,
        Err(e) if matches!(e.kind, RenderErrorKind::MethodInvocation { .. })
    ));
}

#[test]
fn include_emits_resource_verbatim() {
    let loader = Arc::new(MemoryResourceLoader::new());
    loader.insert("header.vm", "== $not_a_reference ==");
    let engine = EngineBuilder::new().loader(loader).build();

    let mut template = include_template(&engine, "header.vm", false);
    init(&engine, &mut template);

    let ctx = engine.new_context();
    // #include never parses: reference syntax passes through untouched.
    assert_eq!(render(&engine, &template, &ctx), "== $not_a_reference ==");
}

#[test]
fn include_path_can_be_rewritten() {
    let loader = Arc::new(MemoryResourceLoader::new());
    loader.insert("new.vm", "NEW");
    let engine = EngineBuilder::new().loader(loader).build();
    engine.cartridge().add_handler(Arc::new(Rewrite {
        from: "old.vm",
        to: "new.vm",
    }));

    let mut template = include_template(&engine, "old.vm", false);
    init(&engine, &mut template);

    let ctx = engine.new_context();
    assert_eq!(render(&engine, &template, &ctx), "NEW");
}

#[test]
fn blocked_include_renders_nothing() {
    let loader = Arc::new(MemoryResourceLoader::new());
    loader.insert("secret.vm", "SECRET");
    let engine = EngineBuilder::new().loader(loader).build();
    engine.cartridge().add_handler(Arc::new(Blocker));

    let mut template = include_template(&engine, "secret.vm", false);
    init(&engine, &mut template);

    let ctx = engine.new_context();
    assert_eq!(render(&engine, &template, &ctx), "");
}

#[test]
fn missing_resource_is_an_error() {
    let loader = Arc::new(MemoryResourceLoader::new());
    let engine = EngineBuilder::new().loader(loader).build();

    let mut template = include_template(&engine, "ghost.vm", false);
    init(&engine, &mut template);

    let ctx = engine.new_context();
    let err = engine.evaluate(&template, &ctx);
    assert!(matches!(
        err,
        Err(e) if e.kind == RenderErrorKind::ResourceNotFound { name: String::from("ghost.vm") }
    ));
}

#[test]
fn parse_renders_the_nested_template() {
    let loader = Arc::new(MemoryResourceLoader::new());
    loader.insert("partial.vm", "from partial");
    let engine = EngineBuilder::new()
        .loader(loader)
        .parser(Arc::new(TextParser))
        .build();

    let mut template = include_template(&engine, "partial.vm", true);
    init(&engine, &mut template);

    let ctx = engine.new_context();
    assert_eq!(render(&engine, &template, &ctx), "from partial");
}

#[test]
fn parse_without_a_parser_fails() {
    let loader = Arc::new(MemoryResourceLoader::new());
    loader.insert("partial.vm", "x");
    let engine = EngineBuilder::new().loader(loader).build();

    let mut template = include_template(&engine, "partial.vm", true);
    init(&engine, &mut template);

    let ctx = engine.new_context();
    let err = engine.evaluate(&template, &ctx);
    assert!(matches!(
        err,
        Err(e) if e.kind == RenderErrorKind::ParseUnavailable
    ));
}

#[test]
fn evaluate_directive_renders_through_the_parser() {
    let engine = EngineBuilder::new().parser(Arc::new(TextParser)).build();

    let mut b = TemplateBuilder::new("t", engine.interner());
    let source = b.str_lit("inline body");
    let eval = b.evaluate(source, Trim::none());
    let root = b.block(vec![eval]);
    let mut template = b.build(root);
    init(&engine, &mut template);

    let ctx = engine.new_context();
    assert_eq!(render(&engine, &template, &ctx), "inline body");
}

#[test]
fn invalid_set_handler_claims_dropped_assignments() {
    use parking_lot::Mutex;

    struct SetSpy(Arc<Mutex<Vec<String>>>);

    impl EventHandler for SetSpy {
        fn capabilities(&self) -> Capabilities {
            Capabilities::INVALID_REFERENCE
        }

        fn invalid_set(&self, target: &str) -> bool {
            self.0.lock().push(target.to_owned());
            true
        }
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let engine = engine_with(EngineConfig::default());
    engine
        .cartridge()
        .add_handler(Arc::new(SetSpy(Arc::clone(&seen))));

    // #set($a = $missing) drops the store and fires the hook.
    let mut b = TemplateBuilder::new("t", engine.interner());
    let target = b.var("a");
    let missing = b.var("missing");
    let set = b.set(target, missing, Trim::none());
    let root = b.block(vec![set]);
    let mut template = b.build(root);
    init(&engine, &mut template);

    let ctx = engine.new_context();
    assert_eq!(render(&engine, &template, &ctx), "");
    assert_eq!(*seen.lock(), vec![String::from("$a")]);
    assert!(matches!(
        ctx.get_str("a"),
        vellum_eval::Lookup::Miss
    ));
}
