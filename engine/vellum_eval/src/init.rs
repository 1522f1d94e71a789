//! One-time template initialization.
//!
//! Runs while the template is still exclusively owned, before it is
//! shared across renders: validates directive structure, collects macro
//! definitions into the template's table, and resolves the engine's
//! whitespace policy into each directive's effective trim. Idempotent; a
//! second call observes the initialized flag and returns immediately.

use crate::engine::EngineConfig;
use crate::gobble::{dedent, SpaceGobbling};
use vellum_ir::{MacroDef, NodeId, NodeKind, Template, Trim};
use vellum_value::{template_init, RenderError};

pub(crate) fn initialize(
    template: &mut Template,
    config: &EngineConfig,
) -> Result<(), RenderError> {
    if template.is_initialized() {
        return Ok(());
    }
    let ids: Vec<NodeId> = template.arena().ids().collect();

    let mut macros: Vec<MacroDef> = Vec::new();
    let mut dedents: Vec<(NodeId, String)> = Vec::new();
    let structured = config.space_gobbling == SpaceGobbling::Structured;

    // Validation and collection over the flat arena; node order does not
    // matter for any of these checks.
    for &id in &ids {
        let node = template.arena().node(id);
        let pos = node.pos;
        let fail = |detail: &str| {
            Err(template_init(detail)
                .with_pos(pos)
                .with_template(template.name()))
        };
        match &node.kind {
            NodeKind::Set { target, .. } => {
                if !matches!(
                    template.arena().node(*target).kind,
                    NodeKind::Reference(_)
                ) {
                    return fail("#set target must be a reference");
                }
            }
            NodeKind::If { branches, trim } => {
                if branches.is_empty() {
                    return fail("#if requires at least one branch");
                }
                let else_count = branches.iter().filter(|b| b.condition.is_none()).count();
                if else_count > 1 || (else_count == 1 && branches[branches.len() - 1].condition.is_some())
                {
                    return fail("#else must be the single last branch");
                }
                if structured {
                    for branch in branches {
                        dedents.push((branch.body, trim.prefix.clone()));
                    }
                }
            }
            NodeKind::Foreach { body, trim, .. } => {
                if structured {
                    dedents.push((*body, trim.prefix.clone()));
                }
            }
            NodeKind::MacroDef {
                name,
                params,
                body,
                trim,
            } => {
                for (i, param) in params.iter().enumerate() {
                    if params[..i].contains(param) {
                        return fail("duplicate macro parameter name");
                    }
                }
                macros.push(MacroDef {
                    name: *name,
                    params: params.clone(),
                    body: *body,
                    pos,
                });
                if structured {
                    dedents.push((*body, trim.prefix.clone()));
                }
            }
            _ => {}
        }
    }

    // Resolve the whitespace policy into each directive's stored trim, so
    // rendering never consults the policy again.
    for &id in &ids {
        let node = template.arena_mut().node_mut(id);
        if let Some(trim) = trim_mut(&mut node.kind) {
            *trim = config.space_gobbling.resolve(trim);
        }
    }

    for (body, indent) in dedents {
        if indent.is_empty() {
            continue;
        }
        dedent_body(template, body, &indent);
    }

    for def in macros {
        template.add_macro(def);
    }
    template.mark_initialized();
    Ok(())
}

fn trim_mut(kind: &mut NodeKind) -> Option<&mut Trim> {
    match kind {
        NodeKind::If { trim, .. }
        | NodeKind::Set { trim, .. }
        | NodeKind::Foreach { trim, .. }
        | NodeKind::MacroDef { trim, .. }
        | NodeKind::MacroCall { trim, .. }
        | NodeKind::Include { trim, .. }
        | NodeKind::Evaluate { trim, .. } => Some(trim),
        _ => None,
    }
}

/// Strip the enclosing directive's indentation from the text content of a
/// directive body.
fn dedent_body(template: &mut Template, body: NodeId, indent: &str) {
    let children: Vec<NodeId> = match &template.arena().node(body).kind {
        NodeKind::Block { children } => children.clone(),
        NodeKind::Text { .. } => vec![body],
        _ => return,
    };
    for child in children {
        let node = template.arena_mut().node_mut(child);
        if let NodeKind::Text { text } = &mut node.kind {
            *text = dedent(text, indent);
        }
    }
}
