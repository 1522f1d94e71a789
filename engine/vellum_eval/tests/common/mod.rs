//! Shared helpers for evaluation tests.

use vellum_eval::{Context, Engine, EngineBuilder, EngineConfig};
use vellum_ir::Template;

pub fn engine_with(config: EngineConfig) -> Engine {
    EngineBuilder::new().config(config).build()
}

pub fn init(engine: &Engine, template: &mut Template) {
    if let Err(e) = engine.init_template(template) {
        panic!("init failed: {e}");
    }
}

pub fn render(engine: &Engine, template: &Template, ctx: &Context) -> String {
    match engine.evaluate(template, ctx) {
        Ok(out) => out,
        Err(e) => panic!("render failed: {e}"),
    }
}
