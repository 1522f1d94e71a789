//! The renderer: walks a template's arena and writes output.
//!
//! One `Renderer` serves one template for one render call. All mutable
//! render state lives in the context (scopes, housekeeping), so rendering
//! borrows the renderer immutably and nested templates just stack fresh
//! renderers over the same context.
//!
//! Logical operators and `+` are handled here rather than in `operators`:
//! `&&`/`||` must short-circuit before the right operand is evaluated, and
//! `+` needs each operand's literal source text for the concatenation
//! fallback when its value is unresolved.

use crate::context::{CacheKey, Context, Lookup, MacroBinding, MacroFrame, RefBinding, Store};
use crate::engine::Engine;
use crate::events::Events;
use crate::operators;
use crate::resolver::{self, Resolution, Unresolved};
use std::io::Write;
use vellum_ir::{Accessor, BinaryOp, Name, Node, NodeId, NodeKind, RefPath, Template, Trim};
use vellum_value::{
    invalid_reference, io_error, macro_depth_exceeded, method_invocation, not_iterable,
    parse_unavailable, resource_not_found, undefined_macro, MethodOutcome, Num, RenderError,
    RenderResult, Value,
};

/// An evaluated operand plus the literal text to substitute for it when
/// `+` falls back to concatenation and the value is null/unresolved.
struct Operand {
    value: Value,
    fallback: Option<String>,
}

pub(crate) struct Renderer<'e> {
    engine: &'e Engine,
    template: &'e Template,
    events: Events,
}

impl<'e> Renderer<'e> {
    pub(crate) fn new(engine: &'e Engine, template: &'e Template, events: Events) -> Self {
        Renderer {
            engine,
            template,
            events,
        }
    }

    /// Render the template's root block.
    pub(crate) fn render(&self, ctx: &Context, out: &mut dyn Write) -> Result<(), RenderError> {
        self.render_node(ctx, self.template.root(), out)
    }

    fn node(&self, id: NodeId) -> &Node {
        self.template.arena().node(id)
    }

    fn lookup(&self, name: Name) -> &str {
        self.engine.interner().lookup(name)
    }

    fn render_node(
        &self,
        ctx: &Context,
        id: NodeId,
        out: &mut dyn Write,
    ) -> Result<(), RenderError> {
        let node = self.node(id);
        let pos = node.pos;
        self.render_kind(ctx, id, node, out)
            .map_err(|e| e.with_pos(pos))
    }

    fn render_kind(
        &self,
        ctx: &Context,
        id: NodeId,
        node: &Node,
        out: &mut dyn Write,
    ) -> Result<(), RenderError> {
        match &node.kind {
            NodeKind::Text { text } => {
                out.write_all(text.as_bytes())?;
            }
            NodeKind::Comment | NodeKind::MacroDef { .. } => {
                // Comments render nothing; macro bodies only render when
                // called. A definition still emits its surviving trim.
                if let Some(trim) = node.trim() {
                    emit_trim(trim, out, |_| Ok(()))?;
                }
            }
            NodeKind::Block { children } => {
                for child in children {
                    self.render_node(ctx, *child, out)?;
                }
            }
            NodeKind::Reference(path) => {
                self.render_reference(ctx, id, path, out)?;
            }
            NodeKind::If { branches, trim } => {
                emit_trim(trim, out, |out| {
                    for branch in branches {
                        let chosen = match branch.condition {
                            None => true,
                            Some(cond) => self.eval_expr(ctx, cond)?.as_boolean(),
                        };
                        if chosen {
                            return self.render_node(ctx, branch.body, out);
                        }
                    }
                    Ok(())
                })?;
            }
            NodeKind::Set { target, value, trim } => {
                emit_trim(trim, out, |_| self.exec_set(ctx, *target, *value))?;
            }
            NodeKind::Foreach {
                var,
                iterable,
                body,
                trim,
            } => {
                emit_trim(trim, out, |out| {
                    self.exec_foreach(ctx, *var, *iterable, *body, out)
                })?;
            }
            NodeKind::MacroCall { name, args, trim } => {
                emit_trim(trim, out, |out| self.exec_macro_call(ctx, *name, args, out))?;
            }
            NodeKind::Include { parse, path, trim } => {
                emit_trim(trim, out, |out| self.exec_include(ctx, *parse, *path, out))?;
            }
            NodeKind::Evaluate { source, trim } => {
                emit_trim(trim, out, |out| self.exec_evaluate(ctx, *source, out))?;
            }
            // Literal/expression nodes in output position render their
            // display form (interpolated string parts, mostly).
            _ => {
                let value = self.eval_kind(ctx, id, node)?;
                out.write_all(value.to_display().as_bytes())?;
            }
        }
        Ok(())
    }

    // Expressions

    fn eval_expr(&self, ctx: &Context, id: NodeId) -> RenderResult {
        let node = self.node(id);
        let pos = node.pos;
        self.eval_kind(ctx, id, node).map_err(|e| e.with_pos(pos))
    }

    fn eval_kind(&self, ctx: &Context, id: NodeId, node: &Node) -> RenderResult {
        match &node.kind {
            NodeKind::IntLiteral { value } => Ok(Value::Int(*value)),
            NodeKind::FloatLiteral { value } => Ok(Value::Float(*value)),
            NodeKind::BoolLiteral { value } => Ok(Value::Bool(*value)),
            NodeKind::StrLiteral { value } | NodeKind::Text { text: value } => {
                Ok(Value::string(value.clone()))
            }
            NodeKind::InterpString { parts, raw } => {
                if !self.engine.config().string_interpolation {
                    return Ok(Value::string(raw.clone()));
                }
                let mut buf = Vec::new();
                for part in parts {
                    self.render_node(ctx, *part, &mut buf)?;
                }
                Ok(Value::string(into_string(buf)?))
            }
            NodeKind::ListLiteral { items } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(ctx, *item)?);
                }
                Ok(Value::list(values))
            }
            NodeKind::MapLiteral { entries } => {
                let mut map = std::collections::HashMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.eval_expr(ctx, *key)?.to_display();
                    map.insert(key, self.eval_expr(ctx, *value)?);
                }
                Ok(Value::map(map))
            }
            NodeKind::RangeLiteral { start, end } => {
                let start = self.range_bound(ctx, *start)?;
                let end = self.range_bound(ctx, *end)?;
                Ok(Value::range(start, end))
            }
            NodeKind::Reference(path) => match self.resolve_reference(ctx, id, path)? {
                Resolution::Resolved(value) => Ok(value),
                Resolution::Unresolved(u) => self.unresolved_value(&u),
            },
            NodeKind::Binary { op, lhs, rhs } => self.eval_binary(ctx, *op, *lhs, *rhs),
            NodeKind::Unary { op, operand } => {
                let value = self.eval_expr(ctx, *operand)?;
                operators::evaluate_unary(*op, &value)
            }
            NodeKind::Comment => Ok(Value::Null),
            _ => Err(RenderError::new(
                "directive is not valid in an expression position",
            )),
        }
    }

    fn range_bound(&self, ctx: &Context, id: NodeId) -> Result<i64, RenderError> {
        let value = self.eval_expr(ctx, id)?;
        match value.as_number() {
            Some(Num::Int(n)) => Ok(n),
            _ => Err(RenderError::new(format!(
                "range bound must be an integer, got {}",
                value.type_name()
            ))),
        }
    }

    fn eval_binary(&self, ctx: &Context, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> RenderResult {
        if op.is_logical() {
            let left = self.eval_expr(ctx, lhs)?.as_boolean();
            // Short-circuit: the right operand is never touched when the
            // left decides the outcome.
            let result = match op {
                BinaryOp::And => left && self.eval_expr(ctx, rhs)?.as_boolean(),
                _ => left || self.eval_expr(ctx, rhs)?.as_boolean(),
            };
            return Ok(Value::Bool(result));
        }
        if op == BinaryOp::Add {
            return self.eval_add(ctx, lhs, rhs);
        }
        let left = self.eval_expr(ctx, lhs)?;
        let right = self.eval_expr(ctx, rhs)?;
        operators::evaluate_binary(op, &left, &right)
    }

    /// `+` with the concatenation fallback: when a side is non-numeric and
    /// either side is textual, both render as text, an unresolved operand
    /// contributing its literal source spelling.
    fn eval_add(&self, ctx: &Context, lhs: NodeId, rhs: NodeId) -> RenderResult {
        let left = self.eval_operand(ctx, lhs)?;
        let right = self.eval_operand(ctx, rhs)?;
        if left.value.as_number().is_some() && right.value.as_number().is_some() {
            return operators::evaluate_binary(BinaryOp::Add, &left.value, &right.value);
        }
        if left.value.is_string_like() || right.value.is_string_like() {
            let mut text = operand_text(&left);
            text.push_str(&operand_text(&right));
            return Ok(Value::string(text));
        }
        operators::evaluate_binary(BinaryOp::Add, &left.value, &right.value)
    }

    fn eval_operand(&self, ctx: &Context, id: NodeId) -> Result<Operand, RenderError> {
        let node = self.node(id);
        let NodeKind::Reference(path) = &node.kind else {
            return Ok(Operand {
                value: self.eval_expr(ctx, id)?,
                fallback: None,
            });
        };
        let pos = node.pos;
        match self
            .resolve_reference(ctx, id, path)
            .map_err(|e| e.with_pos(pos))?
        {
            Resolution::Resolved(value) => {
                let fallback = value
                    .is_null()
                    .then(|| self.fallback_text(ctx, path));
                Ok(Operand { value, fallback })
            }
            Resolution::Unresolved(u) => {
                if self.engine.config().strict_references && !u.quiet {
                    let value = self.strict_failure(&u).map_err(|e| e.with_pos(pos))?;
                    return Ok(Operand {
                        value,
                        fallback: None,
                    });
                }
                if let Some(value) =
                    self.events
                        .invalid_reference(&u.raw, &u.receiver, u.segment.as_deref(), u.quiet)
                {
                    return Ok(Operand {
                        value,
                        fallback: None,
                    });
                }
                let fallback = if u.quiet { String::new() } else { u.raw };
                Ok(Operand {
                    value: Value::Null,
                    fallback: Some(fallback),
                })
            }
        }
    }

    /// Expression-position handling of an unresolved reference: strict
    /// mode errors, handlers may substitute, otherwise null.
    fn unresolved_value(&self, u: &Unresolved) -> RenderResult {
        if self.engine.config().strict_references && !u.quiet {
            return self.strict_failure(u);
        }
        if let Some(value) =
            self.events
                .invalid_reference(&u.raw, &u.receiver, u.segment.as_deref(), u.quiet)
        {
            return Ok(value);
        }
        Ok(Value::Null)
    }

    /// Strict mode turns a genuinely unresolved reference into a
    /// method-invocation-class failure; the method-exception hook may
    /// still substitute a recovery value before it propagates.
    fn strict_failure(&self, u: &Unresolved) -> RenderResult {
        let err = invalid_reference(&u.raw);
        let segment = u.segment.as_deref().unwrap_or(&u.raw);
        match self
            .events
            .method_exception(u.receiver.type_name(), segment, &err)
        {
            Some(value) => Ok(value),
            None => Err(err),
        }
    }

    // References

    /// The literal text a failed or null reference renders: the source
    /// spelling, with a macro parameter root replaced by the caller's
    /// argument spelling when literal preservation is on.
    fn literal_text(&self, ctx: &Context, path: &RefPath) -> String {
        if self.engine.config().preserve_arg_literals {
            if let Some(caller_raw) = ctx.macro_literal(path.root) {
                let root = self.lookup(path.root);
                let sigil = if path.quiet { 2 } else { 1 };
                let prefix_len = sigil + root.len();
                if path.raw.len() >= prefix_len {
                    return format!("{caller_raw}{}", &path.raw[prefix_len..]);
                }
            }
        }
        path.raw.clone()
    }

    fn fallback_text(&self, ctx: &Context, path: &RefPath) -> String {
        if path.quiet {
            String::new()
        } else {
            self.literal_text(ctx, path)
        }
    }

    fn unresolved(
        &self,
        ctx: &Context,
        path: &RefPath,
        receiver: Value,
        segment: Option<String>,
    ) -> Resolution {
        Resolution::Unresolved(Unresolved {
            raw: self.literal_text(ctx, path),
            quiet: path.quiet,
            receiver,
            segment,
        })
    }

    /// Spelling of an accessor for invalid-reference reporting.
    fn accessor_label(&self, accessor: &Accessor) -> String {
        match accessor {
            Accessor::Property { name } | Accessor::Method { name, .. } => {
                self.lookup(*name).to_owned()
            }
            Accessor::Index { .. } => String::from("[]"),
        }
    }

    fn resolve_reference(
        &self,
        ctx: &Context,
        node: NodeId,
        path: &RefPath,
    ) -> Result<Resolution, RenderError> {
        self.resolve_path(ctx, node, path, path.accessors.len())
    }

    /// Walk the root and the first `steps` accessors.
    fn resolve_path(
        &self,
        ctx: &Context,
        node: NodeId,
        path: &RefPath,
        steps: usize,
    ) -> Result<Resolution, RenderError> {
        let root = match ctx.get(path.root) {
            Lookup::Hit(value) => Some(value),
            Lookup::Deferred(binding) => match self.resolve_binding(&binding)? {
                Resolution::Resolved(value) => Some(value),
                Resolution::Unresolved(_) => None,
            },
            Lookup::Miss => None,
        };
        let Some(mut current) = root else {
            return Ok(self.unresolved(ctx, path, Value::Null, None));
        };

        for (step, accessor) in path.accessors[..steps].iter().enumerate() {
            if current.is_null() {
                let segment = Some(self.accessor_label(accessor));
                return Ok(self.unresolved(ctx, path, Value::Null, segment));
            }
            match accessor {
                Accessor::Property { name } => {
                    let prop = self.lookup(*name);
                    let key = CacheKey {
                        node,
                        step: u32::try_from(step).unwrap_or(u32::MAX),
                        tag: self.engine.interner().intern(current.type_name()),
                    };
                    let hint = ctx.housekeeping().borrow().cached_accessor(key);
                    match resolver::property_step(&current, prop, hint) {
                        Some((value, style)) => {
                            if hint != Some(style) {
                                ctx.housekeeping().borrow_mut().cache_accessor(key, style);
                            }
                            current = value;
                        }
                        None => {
                            let segment = Some(prop.to_owned());
                            return Ok(self.unresolved(ctx, path, current, segment));
                        }
                    }
                }
                Accessor::Index { index } => {
                    let index = self.eval_expr(ctx, *index)?;
                    match resolver::index_step(&current, &index) {
                        Some(value) => current = value,
                        None => {
                            let segment = Some(index.to_display());
                            return Ok(self.unresolved(ctx, path, current, segment));
                        }
                    }
                }
                Accessor::Method { name, args } => {
                    let method = self.lookup(*name);
                    let mut argv = Vec::with_capacity(args.len());
                    for arg in args {
                        argv.push(self.eval_expr(ctx, *arg)?);
                    }
                    match resolver::method_step(&current, method, &argv) {
                        MethodOutcome::Ok(value) => current = value,
                        MethodOutcome::NotFound => {
                            let segment = Some(method.to_owned());
                            return Ok(self.unresolved(ctx, path, current, segment));
                        }
                        MethodOutcome::Failed(detail) => {
                            let tag = current.type_name().to_owned();
                            let err = method_invocation(tag.as_str(), method, detail);
                            match self.events.method_exception(&tag, method, &err) {
                                Some(value) => current = value,
                                None => return Err(err),
                            }
                        }
                    }
                }
            }
        }
        Ok(Resolution::Resolved(current))
    }

    /// Re-evaluate a macro pass-by-reference binding against its caller.
    fn resolve_binding(&self, binding: &RefBinding) -> Result<Resolution, RenderError> {
        self.resolve_reference(&binding.caller, binding.node, &binding.path)
    }

    fn render_reference(
        &self,
        ctx: &Context,
        id: NodeId,
        path: &RefPath,
        out: &mut dyn Write,
    ) -> Result<(), RenderError> {
        match self.resolve_reference(ctx, id, path)? {
            Resolution::Resolved(value) if !value.is_null() => {
                let value = if self.events.is_empty() {
                    value
                } else {
                    self.events.reference_insertion(&path.raw, value)
                };
                out.write_all(value.to_display().as_bytes())?;
            }
            Resolution::Resolved(_) => {
                // A null value is not a strict-mode failure, but it still
                // falls back to the literal spelling.
                let u = Unresolved {
                    raw: self.literal_text(ctx, path),
                    quiet: path.quiet,
                    receiver: Value::Null,
                    segment: None,
                };
                self.write_fallback(&u, out)?;
            }
            Resolution::Unresolved(u) => {
                if self.engine.config().strict_references && !u.quiet {
                    let value = self.strict_failure(&u)?;
                    out.write_all(value.to_display().as_bytes())?;
                    return Ok(());
                }
                self.write_fallback(&u, out)?;
            }
        }
        Ok(())
    }

    fn write_fallback(&self, u: &Unresolved, out: &mut dyn Write) -> Result<(), RenderError> {
        if let Some(value) =
            self.events
                .invalid_reference(&u.raw, &u.receiver, u.segment.as_deref(), u.quiet)
        {
            out.write_all(value.to_display().as_bytes())?;
        } else if !u.quiet {
            out.write_all(u.raw.as_bytes())?;
        }
        Ok(())
    }

    // Directives

    fn exec_set(&self, ctx: &Context, target: NodeId, value: NodeId) -> Result<(), RenderError> {
        let NodeKind::Reference(path) = &self.node(target).kind else {
            // The init pass rejects non-reference targets.
            return Err(RenderError::new("#set target must be a reference"));
        };
        let operand = self.eval_operand(ctx, value)?;
        if operand.value.is_null() {
            // Null or unresolved right-hand side: the existing binding is
            // retained.
            self.drop_assignment(ctx, path);
            return Ok(());
        }
        self.assign_reference(ctx, target, path, operand.value)
    }

    fn drop_assignment(&self, ctx: &Context, path: &RefPath) {
        let target = self.literal_text(ctx, path);
        if !self.events.invalid_set(&target) {
            tracing::warn!(target = %target, "dropping #set of null or unresolved value");
        }
    }

    fn assign_reference(
        &self,
        ctx: &Context,
        node: NodeId,
        path: &RefPath,
        value: Value,
    ) -> Result<(), RenderError> {
        if path.accessors.is_empty() {
            match ctx.put(path.root, value.clone()) {
                Store::Stored => return Ok(()),
                Store::Deferred(binding) => {
                    // Pass-by-reference parameter: write through into the
                    // caller's reference.
                    let caller = binding.caller.clone();
                    return self.assign_reference(&caller, binding.node, &binding.path, value);
                }
            }
        }

        let last = path.accessors.len() - 1;
        let receiver = match self.resolve_path(ctx, node, path, last)? {
            Resolution::Resolved(value) if !value.is_null() => value,
            _ => {
                self.drop_assignment(ctx, path);
                return Ok(());
            }
        };
        let stored = match &path.accessors[last] {
            Accessor::Property { name } => {
                resolver::set_member(&receiver, self.lookup(*name), value)
            }
            Accessor::Index { index } => {
                let index = self.eval_expr(ctx, *index)?;
                match resolver::index_key(&index) {
                    Some(key) => resolver::set_member(&receiver, &key, value),
                    None => false,
                }
            }
            Accessor::Method { .. } => false,
        };
        if !stored {
            self.drop_assignment(ctx, path);
        }
        Ok(())
    }

    /// Store a loop/engine-managed variable, routing writes through
    /// pass-by-reference bindings when the name collides with one.
    fn store_var(&self, ctx: &Context, var: Name, value: Value) -> Result<(), RenderError> {
        match ctx.put(var, value.clone()) {
            Store::Stored => Ok(()),
            Store::Deferred(binding) => {
                let caller = binding.caller.clone();
                self.assign_reference(&caller, binding.node, &binding.path, value)
            }
        }
    }

    fn exec_foreach(
        &self,
        ctx: &Context,
        var: Name,
        iterable: NodeId,
        body: NodeId,
        out: &mut dyn Write,
    ) -> Result<(), RenderError> {
        let value = self.eval_expr(ctx, iterable)?;
        let items: Vec<Value> = match &value {
            Value::Null => {
                tracing::debug!("skipping #foreach over null iterable");
                return Ok(());
            }
            Value::List(items) => items.iter().cloned().collect(),
            Value::Map(map) => map.values().cloned().collect(),
            Value::Range(range) => range.iter().map(Value::Int).collect(),
            Value::Object(obj) => obj
                .iterate()
                .ok_or_else(|| not_iterable(value.type_name()))?,
            other => return Err(not_iterable(other.type_name())),
        };

        // A loop variable shadowing a pass-by-reference macro parameter is
        // restored through the binding, not by removing it.
        let saved = match ctx.get(var) {
            Lookup::Hit(prior) => Some(prior),
            Lookup::Deferred(binding) => match self.resolve_binding(&binding)? {
                Resolution::Resolved(prior) => Some(prior),
                Resolution::Unresolved(_) => None,
            },
            Lookup::Miss => None,
        };
        let mut result = Ok(());
        for item in items {
            self.store_var(ctx, var, item)?;
            result = self.render_node(ctx, body, out);
            if result.is_err() {
                break;
            }
        }
        // Restore the loop variable even when the body failed.
        match saved {
            Some(prior) => self.store_var(ctx, var, prior)?,
            None => ctx.remove(var),
        }
        result
    }

    fn exec_macro_call(
        &self,
        ctx: &Context,
        name: Name,
        args: &[NodeId],
        out: &mut dyn Write,
    ) -> Result<(), RenderError> {
        let Some(def) = self.template.macro_def(name) else {
            return Err(undefined_macro(self.lookup(name)));
        };
        if args.len() != def.params.len() {
            return Err(RenderError::new(format!(
                "macro #{} expects {} arguments, got {}",
                self.lookup(name),
                def.params.len(),
                args.len()
            )));
        }
        if let Ok(limit) = usize::try_from(self.engine.config().max_macro_depth) {
            if ctx.housekeeping().borrow().macro_depth() >= limit {
                return Err(macro_depth_exceeded(limit));
            }
        }

        let mut frame = MacroFrame::new(ctx.clone(), self.engine.config().macro_local_scope);
        for (param, arg) in def.params.iter().zip(args) {
            if let NodeKind::Reference(path) = &self.node(*arg).kind {
                frame.bind(
                    *param,
                    MacroBinding::ByRef(RefBinding {
                        path: path.clone(),
                        node: *arg,
                        caller: ctx.clone(),
                    }),
                );
                if self.engine.config().preserve_arg_literals {
                    frame.record_literal(*param, self.literal_text(ctx, path));
                }
            } else {
                frame.bind(*param, MacroBinding::ByValue(self.eval_expr(ctx, *arg)?));
            }
        }

        let inner = ctx.enter_macro(frame);
        ctx.housekeeping().borrow_mut().push_macro(name);
        let result = self.render_node(&inner, def.body, out);
        ctx.housekeeping().borrow_mut().pop_macro();
        result
    }

    fn exec_include(
        &self,
        ctx: &Context,
        parse: bool,
        path_id: NodeId,
        out: &mut dyn Write,
    ) -> Result<(), RenderError> {
        let requested = self.eval_expr(ctx, path_id)?.to_display();
        let current = ctx.housekeeping().borrow().current_template();
        let Some(path) = self.events.include_path(&requested, self.lookup(current)) else {
            tracing::debug!(path = %requested, "include blocked by event handler");
            return Ok(());
        };
        let Some(loader) = self.engine.loader() else {
            return Err(resource_not_found(&path));
        };
        let source = loader.load(&path)?;

        if !parse {
            out.write_all(source.as_bytes())?;
            return Ok(());
        }

        let Some(parser) = self.engine.parser() else {
            return Err(parse_unavailable());
        };
        let mut nested = parser.parse(&path, &source, self.engine.interner())?;
        self.engine.init_template(&mut nested)?;
        ctx.housekeeping().borrow_mut().push_template(nested.name());
        let renderer = Renderer::new(self.engine, &nested, self.events.clone());
        let result = renderer.render(ctx, out);
        ctx.housekeeping().borrow_mut().pop_template();
        result
    }

    fn exec_evaluate(
        &self,
        ctx: &Context,
        source_id: NodeId,
        out: &mut dyn Write,
    ) -> Result<(), RenderError> {
        let source = self.eval_expr(ctx, source_id)?.to_display();
        let Some(parser) = self.engine.parser() else {
            return Err(parse_unavailable());
        };
        let mut template = parser.parse("<evaluate>", &source, self.engine.interner())?;
        self.engine.init_template(&mut template)?;
        // Writes inside the evaluated source stay in the isolated scope.
        let isolated = ctx.enter_isolated();
        let renderer = Renderer::new(self.engine, &template, self.events.clone());
        renderer.render(&isolated, out)
    }
}

fn operand_text(operand: &Operand) -> String {
    match &operand.fallback {
        Some(text) if operand.value.is_null() => text.clone(),
        _ => operand.value.to_display(),
    }
}

fn into_string(buf: Vec<u8>) -> Result<String, RenderError> {
    String::from_utf8(buf).map_err(|e| io_error(e.to_string()))
}

/// Emit surviving directive whitespace around the directive's effect.
fn emit_trim(
    trim: &Trim,
    out: &mut dyn Write,
    body: impl FnOnce(&mut dyn Write) -> Result<(), RenderError>,
) -> Result<(), RenderError> {
    if !trim.prefix.is_empty() {
        out.write_all(trim.prefix.as_bytes())?;
    }
    body(out)?;
    if !trim.postfix.is_empty() {
        out.write_all(trim.postfix.as_bytes())?;
    }
    Ok(())
}

