//! Graphviz DOT rendering of a `FileGraph`.

use std::fmt::Write;

use super::graph::FileGraph;
use crate::frontend::SourceUnit;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotOptions {
    /// Name after `digraph`.
    pub name: String,
    /// Edges with more symbols than this show a `(count)` label instead.
    pub label_threshold: usize,
}

impl Default for DotOptions {
    fn default() -> Self {
        Self {
            name: "deps".to_string(),
            label_threshold: 5,
        }
    }
}

/// Render the selected units of `graph` and their outgoing edges.
pub fn render_dot(graph: &FileGraph, options: &DotOptions) -> String {
    let mut out = String::with_capacity(4096);
    let _ = writeln!(out, "digraph {} {{", graph_id(&options.name));

    for node in graph.selected() {
        let name = quote(&node.display);
        let _ = writeln!(out, "    {} [shape=rect]", name);
        for (target, label) in graph.outgoing(node.unit) {
            let _ = writeln!(
                out,
                "    {} -> {} [label={}]",
                name,
                quote(&target.display),
                quote(&edge_label(&label.symbols, options.label_threshold))
            );
        }
    }

    out.push('}');
    out
}

/// Units drawn with their edges: paths ending in `suffix`, skipping
/// declaration-only units.
pub fn is_graph_unit(unit: &SourceUnit, suffix: &str) -> bool {
    !unit.declaration_only && unit.path.to_string_lossy().ends_with(suffix)
}

/// Joined names, or `(n)` when there are more than `threshold` of them.
pub fn edge_label(symbols: &[String], threshold: usize) -> String {
    if symbols.len() > threshold {
        format!("({})", symbols.len())
    } else {
        symbols.join(", ")
    }
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Bare DOT identifiers are letters, digits and underscores, not starting
/// with a digit. Anything else is quoted.
fn graph_id(name: &str) -> String {
    let bare = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if bare {
        name.to_string()
    } else {
        quote(name)
    }
}
