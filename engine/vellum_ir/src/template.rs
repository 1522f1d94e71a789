//! Template container and construction surface.
//!
//! A `Template` owns its node arena, the root block, and the macro table the
//! init pass collects. `TemplateBuilder` is the construction API an external
//! parser targets; it keeps raw reference spellings alongside the structured
//! path so resolution failures can fall back to the source text.

use crate::ast::{Accessor, BinaryOp, IfBranch, NodeKind, RefPath, Trim, UnaryOp};
use crate::{Name, NodeArena, NodeId, SharedInterner, SourcePos};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// A user-defined macro collected from a `#macro` directive.
#[derive(Clone, Debug)]
pub struct MacroDef {
    pub name: Name,
    pub params: Vec<Name>,
    pub body: NodeId,
    pub pos: SourcePos,
}

/// A parsed template: arena, root block, and macro table.
///
/// Lifecycle: built by the parser, init-ed exactly once while exclusively
/// owned, then shared read-only across concurrent renders (typically behind
/// an `Arc`).
#[derive(Debug)]
pub struct Template {
    name: Name,
    arena: NodeArena,
    root: NodeId,
    macros: FxHashMap<Name, MacroDef>,
    initialized: bool,
}

impl Template {
    /// Create a template from a finished arena and root node.
    pub fn new(name: Name, arena: NodeArena, root: NodeId) -> Self {
        Template {
            name,
            arena,
            root,
            macros: FxHashMap::default(),
            initialized: false,
        }
    }

    /// Template name (resource name or the engine's inline sentinel).
    pub fn name(&self) -> Name {
        self.name
    }

    /// Root block node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node arena, read-only.
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    /// Node arena, mutable. Only the init pass uses this.
    pub fn arena_mut(&mut self) -> &mut NodeArena {
        &mut self.arena
    }

    /// Look up a macro by name.
    pub fn macro_def(&self, name: Name) -> Option<&MacroDef> {
        self.macros.get(&name)
    }

    /// Register a macro definition. Later definitions shadow earlier ones.
    pub fn add_macro(&mut self, def: MacroDef) {
        self.macros.insert(def.name, def);
    }

    /// Whether the init pass has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Mark the init pass complete. A second init call observes this and
    /// returns without touching the tree.
    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }
}

/// Fluent construction surface for templates.
///
/// Allocation methods use the builder's current position cursor; parsers set
/// it with [`TemplateBuilder::at`] as they advance through the source.
pub struct TemplateBuilder {
    interner: SharedInterner,
    arena: NodeArena,
    name: Name,
    pos: SourcePos,
}

impl TemplateBuilder {
    /// Start building a template with the given resource name.
    pub fn new(name: &str, interner: &SharedInterner) -> Self {
        TemplateBuilder {
            interner: interner.clone(),
            arena: NodeArena::new(),
            name: interner.intern(name),
            pos: SourcePos::DUMMY,
        }
    }

    /// Set the position cursor for subsequently allocated nodes.
    pub fn at(&mut self, line: u32, column: u32) -> &mut Self {
        self.pos = SourcePos::new(line, column);
        self
    }

    /// Intern a string through the builder's interner.
    pub fn intern(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.arena.alloc(kind, self.pos)
    }

    // Leaves

    /// Literal text.
    pub fn text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text { text: text.into() })
    }

    /// Comment node.
    pub fn comment(&mut self) -> NodeId {
        self.alloc(NodeKind::Comment)
    }

    /// Simple variable reference: `$name`.
    pub fn var(&mut self, name: &str) -> NodeId {
        let root = self.interner.intern(name);
        let raw = format!("${name}");
        self.alloc(NodeKind::Reference(RefPath {
            root,
            accessors: SmallVec::new(),
            raw,
            quiet: false,
        }))
    }

    /// Quiet variable reference: `$!name`.
    pub fn quiet_var(&mut self, name: &str) -> NodeId {
        let root = self.interner.intern(name);
        let raw = format!("$!{name}");
        self.alloc(NodeKind::Reference(RefPath {
            root,
            accessors: SmallVec::new(),
            raw,
            quiet: true,
        }))
    }

    /// Property chain reference: `$root.p1.p2`.
    pub fn prop_ref(&mut self, root: &str, props: &[&str]) -> NodeId {
        let mut raw = format!("${root}");
        let mut accessors: SmallVec<[Accessor; 2]> = SmallVec::new();
        for prop in props {
            raw.push('.');
            raw.push_str(prop);
            accessors.push(Accessor::Property {
                name: self.interner.intern(prop),
            });
        }
        let root = self.interner.intern(root);
        self.alloc(NodeKind::Reference(RefPath {
            root,
            accessors,
            raw,
            quiet: false,
        }))
    }

    /// Method call reference: `$root.method(args)`. The caller supplies the
    /// exact source spelling for fallback rendering.
    pub fn method_ref(
        &mut self,
        root: &str,
        method: &str,
        args: Vec<NodeId>,
        raw: impl Into<String>,
    ) -> NodeId {
        let root = self.interner.intern(root);
        let name = self.interner.intern(method);
        let mut accessors: SmallVec<[Accessor; 2]> = SmallVec::new();
        accessors.push(Accessor::Method { name, args });
        self.alloc(NodeKind::Reference(RefPath {
            root,
            accessors,
            raw: raw.into(),
            quiet: false,
        }))
    }

    /// Indexed reference: `$root[index]`. The caller supplies the exact
    /// source spelling for fallback rendering.
    pub fn index_ref(&mut self, root: &str, index: NodeId, raw: impl Into<String>) -> NodeId {
        let root = self.interner.intern(root);
        let mut accessors: SmallVec<[Accessor; 2]> = SmallVec::new();
        accessors.push(Accessor::Index { index });
        self.alloc(NodeKind::Reference(RefPath {
            root,
            accessors,
            raw: raw.into(),
            quiet: false,
        }))
    }

    /// Fully custom reference path.
    pub fn reference(&mut self, path: RefPath) -> NodeId {
        self.alloc(NodeKind::Reference(path))
    }

    /// Integer literal.
    pub fn int(&mut self, value: i64) -> NodeId {
        self.alloc(NodeKind::IntLiteral { value })
    }

    /// Float literal.
    pub fn float(&mut self, value: f64) -> NodeId {
        self.alloc(NodeKind::FloatLiteral { value })
    }

    /// Boolean literal.
    pub fn bool_lit(&mut self, value: bool) -> NodeId {
        self.alloc(NodeKind::BoolLiteral { value })
    }

    /// Raw (single-quoted) string literal.
    pub fn str_lit(&mut self, value: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::StrLiteral {
            value: value.into(),
        })
    }

    /// Interpolating (double-quoted) string literal.
    pub fn interp_str(&mut self, parts: Vec<NodeId>, raw: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::InterpString {
            parts,
            raw: raw.into(),
        })
    }

    /// List literal.
    pub fn list(&mut self, items: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::ListLiteral { items })
    }

    /// Map literal.
    pub fn map(&mut self, entries: Vec<(NodeId, NodeId)>) -> NodeId {
        self.alloc(NodeKind::MapLiteral { entries })
    }

    /// Range literal.
    pub fn range(&mut self, start: NodeId, end: NodeId) -> NodeId {
        self.alloc(NodeKind::RangeLiteral { start, end })
    }

    // Expressions

    /// Binary expression.
    pub fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.alloc(NodeKind::Binary { op, lhs, rhs })
    }

    /// Unary expression.
    pub fn unary(&mut self, op: UnaryOp, operand: NodeId) -> NodeId {
        self.alloc(NodeKind::Unary { op, operand })
    }

    /// Block of children.
    pub fn block(&mut self, children: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::Block { children })
    }

    // Directives

    /// `#if` chain. Each entry is (condition, body); `None` marks `#else`.
    pub fn if_dir(&mut self, branches: Vec<(Option<NodeId>, NodeId)>, trim: Trim) -> NodeId {
        let pos = self.pos;
        let branches = branches
            .into_iter()
            .map(|(condition, body)| IfBranch {
                condition,
                body,
                pos,
            })
            .collect();
        self.alloc(NodeKind::If { branches, trim })
    }

    /// `#set($target = value)`.
    pub fn set(&mut self, target: NodeId, value: NodeId, trim: Trim) -> NodeId {
        self.alloc(NodeKind::Set {
            target,
            value,
            trim,
        })
    }

    /// `#foreach($var in iterable) body #end`.
    pub fn foreach(&mut self, var: &str, iterable: NodeId, body: NodeId, trim: Trim) -> NodeId {
        let var = self.interner.intern(var);
        self.alloc(NodeKind::Foreach {
            var,
            iterable,
            body,
            trim,
        })
    }

    /// `#macro(name $params...) body #end`.
    pub fn macro_def(&mut self, name: &str, params: &[&str], body: NodeId, trim: Trim) -> NodeId {
        let name = self.interner.intern(name);
        let params = params.iter().map(|p| self.interner.intern(p)).collect();
        self.alloc(NodeKind::MacroDef {
            name,
            params,
            body,
            trim,
        })
    }

    /// Macro invocation: `#name(args)`.
    pub fn macro_call(&mut self, name: &str, args: Vec<NodeId>, trim: Trim) -> NodeId {
        let name = self.interner.intern(name);
        self.alloc(NodeKind::MacroCall { name, args, trim })
    }

    /// `#include("path")`.
    pub fn include(&mut self, path: NodeId, trim: Trim) -> NodeId {
        self.alloc(NodeKind::Include {
            parse: false,
            path,
            trim,
        })
    }

    /// `#parse("path")`.
    pub fn parse(&mut self, path: NodeId, trim: Trim) -> NodeId {
        self.alloc(NodeKind::Include {
            parse: true,
            path,
            trim,
        })
    }

    /// `#evaluate(source)`.
    pub fn evaluate(&mut self, source: NodeId, trim: Trim) -> NodeId {
        self.alloc(NodeKind::Evaluate { source, trim })
    }

    /// Finish the template with the given root node.
    pub fn build(self, root: NodeId) -> Template {
        Template::new(self.name, self.arena, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_produces_raw_spellings() {
        let interner = SharedInterner::new();
        let mut b = TemplateBuilder::new("t", &interner);

        let simple = b.var("x");
        let quiet = b.quiet_var("x");
        let dotted = b.prop_ref("user", &["name"]);
        let root = b.block(vec![simple, quiet, dotted]);
        let template = b.build(root);

        let raw = |id: NodeId| match &template.arena().node(id).kind {
            NodeKind::Reference(path) => path.raw.clone(),
            other => panic!("expected reference, got {other:?}"),
        };
        assert_eq!(raw(simple), "$x");
        assert_eq!(raw(quiet), "$!x");
        assert_eq!(raw(dotted), "$user.name");
    }

    #[test]
    fn macro_table_shadows_by_name() {
        let interner = SharedInterner::new();
        let mut b = TemplateBuilder::new("t", &interner);
        let body_a = b.block(vec![]);
        let body_b = b.block(vec![]);
        let root = b.block(vec![]);
        let name = b.intern("m");
        let mut template = b.build(root);

        template.add_macro(MacroDef {
            name,
            params: vec![],
            body: body_a,
            pos: SourcePos::DUMMY,
        });
        template.add_macro(MacroDef {
            name,
            params: vec![],
            body: body_b,
            pos: SourcePos::DUMMY,
        });

        let Some(def) = template.macro_def(name) else {
            panic!("macro not registered");
        };
        assert_eq!(def.body, body_b);
    }

    #[test]
    fn initialized_flag_round_trip() {
        let interner = SharedInterner::new();
        let mut b = TemplateBuilder::new("t", &interner);
        let root = b.block(vec![]);
        let mut template = b.build(root);

        assert!(!template.is_initialized());
        template.mark_initialized();
        assert!(template.is_initialized());
    }
}
