//! The whole-program file graph: every unit as a node, every dependency map
//! entry as a labelled edge.

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::deps::DependencySource;
use crate::frontend::{Frontend, SourceUnit, UnitId};

/// A unit in the file graph.
#[derive(Debug, Clone)]
pub struct UnitNode {
    pub unit: UnitId,
    pub path: PathBuf,
    /// Path relative to the graph root, when it lies under it.
    pub display: String,
    pub declaration_only: bool,
    /// Whether this unit's outgoing edges were collected.
    pub selected: bool,
}

/// Symbol names one unit references from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeLabel {
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub units: usize,
    pub declaration_only: usize,
    pub edges: usize,
    pub symbol_references: usize,
    pub max_fan_out: usize,
}

/// Aggregated dependency maps as a petgraph `DiGraph`.
///
/// Node indices follow unit order, so `NodeIndex::new(unit.index())`
/// always names the node of `unit`.
pub struct FileGraph {
    graph: DiGraph<UnitNode, EdgeLabel>,
}

impl FileGraph {
    /// Collect the dependency maps of every unit.
    pub fn build<F: Frontend + ?Sized>(source: &mut DependencySource<'_, F>, root_dir: &Path) -> Self {
        Self::build_selected(source, root_dir, |_| true)
    }

    /// Collect the dependency maps of the units `select` accepts. Every unit
    /// still gets a node, so edges into unselected units keep their target.
    pub fn build_selected<F, P>(source: &mut DependencySource<'_, F>, root_dir: &Path, select: P) -> Self
    where
        F: Frontend + ?Sized,
        P: Fn(&SourceUnit) -> bool,
    {
        let frontend = source.frontend();
        let mut graph = DiGraph::new();

        for unit in frontend.unit_ids() {
            let data = frontend.unit(unit);
            graph.add_node(UnitNode {
                unit,
                path: data.path.clone(),
                display: display_name(&data.path, root_dir),
                declaration_only: data.declaration_only,
                selected: select(data),
            });
        }

        for unit in frontend.unit_ids() {
            let from = NodeIndex::new(unit.index());
            if !graph[from].selected {
                continue;
            }
            let deps = source.get(unit);
            for (target, symbols) in deps.iter() {
                graph.add_edge(
                    from,
                    NodeIndex::new(target.index()),
                    EdgeLabel {
                        symbols: symbols.to_vec(),
                    },
                );
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "file graph built"
        );
        Self { graph }
    }

    pub fn node(&self, unit: UnitId) -> &UnitNode {
        &self.graph[NodeIndex::new(unit.index())]
    }

    /// Nodes in unit order.
    pub fn nodes(&self) -> impl Iterator<Item = &UnitNode> + '_ {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    pub fn selected(&self) -> impl Iterator<Item = &UnitNode> + '_ {
        self.nodes().filter(|node| node.selected)
    }

    /// Outgoing edges of `unit` in the order its dependency map listed them.
    pub fn outgoing(&self, unit: UnitId) -> Vec<(&UnitNode, &EdgeLabel)> {
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(NodeIndex::new(unit.index()), Direction::Outgoing)
            .map(|edge| (edge.id(), edge.target()))
            .collect();
        // petgraph yields the most recently added edge first
        edges.sort_by_key(|(id, _)| *id);
        edges
            .into_iter()
            .map(|(id, target)| (&self.graph[target], &self.graph[id]))
            .collect()
    }

    /// Units that reference `unit`, in unit order.
    pub fn dependents(&self, unit: UnitId) -> Vec<&UnitNode> {
        let mut sources: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(NodeIndex::new(unit.index()), Direction::Incoming)
            .collect();
        sources.sort();
        sources.dedup();
        sources.into_iter().map(|idx| &self.graph[idx]).collect()
    }

    pub fn fan_out(&self, unit: UnitId) -> usize {
        self.graph
            .edges_directed(NodeIndex::new(unit.index()), Direction::Outgoing)
            .count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            units: self.graph.node_count(),
            edges: self.graph.edge_count(),
            ..Default::default()
        };
        for idx in self.graph.node_indices() {
            if self.graph[idx].declaration_only {
                stats.declaration_only += 1;
            }
            let fan_out = self.graph.edges_directed(idx, Direction::Outgoing).count();
            stats.max_fan_out = stats.max_fan_out.max(fan_out);
        }
        stats.symbol_references = self
            .graph
            .edge_weights()
            .map(|label| label.symbols.len())
            .sum();
        stats
    }
}

/// `root_dir/src/core.ts` -> `src/core.ts`; other paths are shown as given.
pub fn display_name(path: &Path, root_dir: &Path) -> String {
    let relative = path.strip_prefix(root_dir).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}
