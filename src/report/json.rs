//! Machine-readable JSON exports.

use indexmap::IndexMap;
use serde::Serialize;

use super::graph::{FileGraph, GraphStats};
use crate::error::Result;
use crate::frontend::UnitId;

#[derive(Debug, Serialize)]
pub struct GraphExport<'a> {
    pub units: Vec<UnitExport<'a>>,
    pub edges: Vec<EdgeExport<'a>>,
    pub stats: GraphStats,
}

#[derive(Debug, Serialize)]
pub struct UnitExport<'a> {
    pub path: &'a str,
    pub declaration_only: bool,
    pub fan_out: usize,
}

#[derive(Debug, Serialize)]
pub struct EdgeExport<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub symbols: &'a [String],
}

/// One unit's dependency map and the units depending on it, with every
/// unit spelled as a display path.
#[derive(Debug, Serialize)]
pub struct UnitDependencies {
    pub unit: String,
    pub fan_out: usize,
    pub dependencies: IndexMap<String, Vec<String>>,
    pub dependents: Vec<String>,
}

impl<'a> GraphExport<'a> {
    pub fn new(graph: &'a FileGraph) -> Self {
        let mut units = Vec::new();
        let mut edges = Vec::new();
        for node in graph.nodes() {
            units.push(UnitExport {
                path: &node.display,
                declaration_only: node.declaration_only,
                fan_out: graph.fan_out(node.unit),
            });
            for (target, label) in graph.outgoing(node.unit) {
                edges.push(EdgeExport {
                    from: &node.display,
                    to: &target.display,
                    symbols: &label.symbols,
                });
            }
        }
        Self {
            units,
            edges,
            stats: graph.stats(),
        }
    }
}

impl UnitDependencies {
    /// `graph` must hold the outgoing edges of every unit, as
    /// `FileGraph::build` does, for the dependents to be complete.
    pub fn new(graph: &FileGraph, unit: UnitId) -> Self {
        let dependencies = graph
            .outgoing(unit)
            .into_iter()
            .map(|(target, label)| (target.display.clone(), label.symbols.clone()))
            .collect();
        Self {
            unit: graph.node(unit).display.clone(),
            fan_out: graph.fan_out(unit),
            dependencies,
            dependents: graph
                .dependents(unit)
                .into_iter()
                .map(|node| node.display.clone())
                .collect(),
        }
    }
}

pub fn render_graph_json(graph: &FileGraph) -> Result<String> {
    Ok(serde_json::to_string_pretty(&GraphExport::new(graph))?)
}

pub fn render_unit_json(unit: &UnitDependencies) -> Result<String> {
    Ok(serde_json::to_string_pretty(unit)?)
}
