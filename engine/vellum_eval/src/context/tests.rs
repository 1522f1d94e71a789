use super::*;
use pretty_assertions::assert_eq;
use smallvec::SmallVec;
use vellum_ir::RefPath;

fn ctx() -> Context {
    Context::new(&SharedInterner::new())
}

fn hit(lookup: Lookup) -> Value {
    match lookup {
        Lookup::Hit(v) => v,
        other => panic!("expected hit, got {other:?}"),
    }
}

fn ref_binding(caller: &Context, root: &str) -> RefBinding {
    let name = caller.interner().intern(root);
    RefBinding {
        path: RefPath {
            root: name,
            accessors: SmallVec::new(),
            raw: format!("${root}"),
            quiet: false,
        },
        node: NodeId::from_raw(0),
        caller: caller.clone(),
    }
}

#[test]
fn global_put_get_remove() {
    let ctx = ctx();
    assert!(matches!(ctx.get_str("x"), Lookup::Miss));

    assert!(matches!(ctx.put_str("x", Value::Int(1)), Store::Stored));
    assert_eq!(hit(ctx.get_str("x")), Value::Int(1));

    ctx.remove(ctx.interner().intern("x"));
    assert!(matches!(ctx.get_str("x"), Lookup::Miss));
}

#[test]
fn clones_share_bindings() {
    let a = ctx();
    let b = a.clone();
    a.put_str("x", Value::Int(1));
    assert_eq!(hit(b.get_str("x")), Value::Int(1));
}

#[test]
fn macro_frame_by_value_shadows_caller() {
    let caller = ctx();
    caller.put_str("p", Value::string("outer"));

    let mut frame = MacroFrame::new(caller.clone(), false);
    frame.bind(
        caller.interner().intern("p"),
        MacroBinding::ByValue(Value::string("arg")),
    );
    let inner = caller.enter_macro(frame);

    assert_eq!(hit(inner.get_str("p")), Value::string("arg"));
    // Rebinding a by-value parameter stays in the frame.
    inner.put_str("p", Value::string("changed"));
    assert_eq!(hit(inner.get_str("p")), Value::string("changed"));
    assert_eq!(hit(caller.get_str("p")), Value::string("outer"));
}

#[test]
fn macro_frame_falls_through_to_caller() {
    let caller = ctx();
    caller.put_str("shared", Value::Int(7));
    let inner = caller.enter_macro(MacroFrame::new(caller.clone(), false));

    assert_eq!(hit(inner.get_str("shared")), Value::Int(7));

    // Non-parameter writes go through to the caller.
    inner.put_str("out", Value::Int(9));
    assert_eq!(hit(caller.get_str("out")), Value::Int(9));
}

#[test]
fn local_scope_severs_fallthrough() {
    let caller = ctx();
    caller.put_str("shared", Value::Int(7));
    let inner = caller.enter_macro(MacroFrame::new(caller.clone(), true));

    assert!(matches!(inner.get_str("shared"), Lookup::Miss));

    inner.put_str("tmp", Value::Int(1));
    assert_eq!(hit(inner.get_str("tmp")), Value::Int(1));
    assert!(matches!(caller.get_str("tmp"), Lookup::Miss));
}

#[test]
fn by_ref_binding_surfaces_deferred() {
    let caller = ctx();
    let p = caller.interner().intern("p");

    let mut frame = MacroFrame::new(caller.clone(), false);
    frame.bind(p, MacroBinding::ByRef(ref_binding(&caller, "target")));
    let inner = caller.enter_macro(frame);

    let Lookup::Deferred(binding) = inner.get(p) else {
        panic!("expected deferred lookup");
    };
    assert_eq!(binding.path.raw, "$target");

    let Store::Deferred(binding) = inner.put(p, Value::Int(1)) else {
        panic!("expected deferred store");
    };
    assert_eq!(binding.path.raw, "$target");
}

#[test]
fn by_ref_binding_in_local_scope_rebinds_instead() {
    let caller = ctx();
    let p = caller.interner().intern("p");

    let mut frame = MacroFrame::new(caller.clone(), true);
    frame.bind(p, MacroBinding::ByRef(ref_binding(&caller, "target")));
    let inner = caller.enter_macro(frame);

    assert!(matches!(inner.put(p, Value::Int(5)), Store::Stored));
    assert_eq!(hit(inner.get(p)), Value::Int(5));
}

#[test]
fn remove_leaves_parameter_bindings_intact() {
    let caller = ctx();
    caller.put_str("target", Value::Int(1));
    let p = caller.interner().intern("p");

    let mut frame = MacroFrame::new(caller.clone(), false);
    frame.bind(p, MacroBinding::ByRef(ref_binding(&caller, "target")));
    let inner = caller.enter_macro(frame);

    inner.remove(p);
    assert!(matches!(inner.get(p), Lookup::Deferred(_)));
    assert_eq!(hit(caller.get_str("target")), Value::Int(1));
}

#[test]
fn isolated_scope_reads_parent_but_writes_locally() {
    let outer = ctx();
    outer.put_str("x", Value::Int(1));
    let inner = outer.enter_isolated();

    assert_eq!(hit(inner.get_str("x")), Value::Int(1));

    inner.put_str("x", Value::Int(2));
    inner.put_str("y", Value::Int(3));
    assert_eq!(hit(inner.get_str("x")), Value::Int(2));
    assert_eq!(hit(outer.get_str("x")), Value::Int(1));
    assert!(matches!(outer.get_str("y"), Lookup::Miss));
}

#[test]
fn macro_literals_resolve_through_nested_frames() {
    let caller = ctx();
    let p = caller.interner().intern("p");

    let mut frame = MacroFrame::new(caller.clone(), false);
    frame.record_literal(p, String::from("$user.name"));
    let inner = caller.enter_macro(frame);
    let nested = inner.enter_macro(MacroFrame::new(inner.clone(), false));

    assert_eq!(inner.macro_literal(p), Some(String::from("$user.name")));
    assert_eq!(nested.macro_literal(p), Some(String::from("$user.name")));
    assert_eq!(caller.macro_literal(p), None);
}

#[test]
fn housekeeping_is_shared_across_derived_scopes() {
    let outer = ctx();
    let inner = outer.enter_macro(MacroFrame::new(outer.clone(), false));

    let t = outer.interner().intern("page.vm");
    inner.housekeeping().borrow_mut().push_template(t);
    assert_eq!(outer.housekeeping().borrow().current_template(), t);

    outer.housekeeping().borrow_mut().pop_template();
    let sentinel = outer.interner().intern("<undefined>");
    assert_eq!(inner.housekeeping().borrow().current_template(), sentinel);
}

#[test]
fn macro_depth_tracks_push_pop() {
    let ctx = ctx();
    let m = ctx.interner().intern("m");
    {
        let mut hk = ctx.housekeeping().borrow_mut();
        assert_eq!(hk.macro_depth(), 0);
        hk.push_macro(m);
        hk.push_macro(m);
        assert_eq!(hk.macro_depth(), 2);
        hk.pop_macro();
        assert_eq!(hk.macro_depth(), 1);
    }
}

#[test]
fn accessor_cache_last_write_wins() {
    let ctx = ctx();
    let key = CacheKey {
        node: NodeId::from_raw(3),
        step: 0,
        tag: ctx.interner().intern("map"),
    };
    let mut hk = ctx.housekeeping().borrow_mut();

    assert_eq!(hk.cached_accessor(key), None);
    hk.cache_accessor(key, CachedAccessor::MapEntry);
    assert_eq!(hk.cached_accessor(key), Some(CachedAccessor::MapEntry));
    hk.cache_accessor(key, CachedAccessor::PseudoLen);
    assert_eq!(hk.cached_accessor(key), Some(CachedAccessor::PseudoLen));
}
