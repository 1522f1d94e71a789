//! Space gobbling: whitespace policy around directive lines.
//!
//! The parser captures the indentation before a directive and the trailing
//! whitespace through the newline after it, without deciding what to do
//! with them. The init pass resolves that captured [`Trim`] into the
//! effective whitespace under the engine's policy; the renderer then emits
//! whatever remains, so rendering never re-examines the policy.

use vellum_ir::Trim;

/// Whitespace policy for directive-only lines.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SpaceGobbling {
    /// Preserve all captured whitespace.
    None,
    /// Drop only the newline after a directive, keeping indentation.
    BackwardCompatible,
    /// Remove the whole line footprint of a directive that sits alone on
    /// its line: indentation and trailing newline.
    #[default]
    Lines,
    /// `Lines`, plus nested block content is dedented by the directive's
    /// indentation.
    Structured,
}

impl SpaceGobbling {
    /// Resolve captured whitespace into the effective whitespace to emit.
    pub fn resolve(self, captured: &Trim) -> Trim {
        match self {
            SpaceGobbling::None => captured.clone(),
            SpaceGobbling::BackwardCompatible => Trim {
                prefix: captured.prefix.clone(),
                postfix: strip_trailing_newline(&captured.postfix),
            },
            SpaceGobbling::Lines | SpaceGobbling::Structured => {
                if on_own_line(captured) {
                    Trim::none()
                } else {
                    captured.clone()
                }
            }
        }
    }
}

/// Whether the captured whitespace marks a directive alone on its line.
fn on_own_line(captured: &Trim) -> bool {
    captured.postfix.ends_with('\n') && captured.prefix.chars().all(char::is_whitespace)
}

fn strip_trailing_newline(postfix: &str) -> String {
    let stripped = postfix.strip_suffix('\n').unwrap_or(postfix);
    let stripped = stripped.strip_suffix('\r').unwrap_or(stripped);
    stripped.to_owned()
}

/// Remove `indent` from the start of every line of `text` that carries it.
///
/// Used by the `Structured` policy on directive body content.
pub fn dedent(text: &str, indent: &str) -> String {
    if indent.is_empty() {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut at_line_start = true;
    let mut rest = text;
    while !rest.is_empty() {
        if at_line_start {
            if let Some(stripped) = rest.strip_prefix(indent) {
                rest = stripped;
            }
            at_line_start = false;
            continue;
        }
        let Some(nl) = rest.find('\n') else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..=nl]);
        rest = &rest[nl + 1..];
        at_line_start = true;
    }
    out
}
