//! Renderers over per-unit dependency maps.
//!
//! Every renderer builds and returns a `String`; writing it out is the
//! caller's job.

pub mod dot;
pub mod graph;
pub mod json;
pub mod ranked;

pub use dot::{edge_label, is_graph_unit, render_dot, DotOptions};
pub use graph::{FileGraph, GraphStats, UnitNode};
pub use json::{render_graph_json, render_unit_json, GraphExport, UnitDependencies};
pub use ranked::{render_ranked, truncate, RankedOptions};
