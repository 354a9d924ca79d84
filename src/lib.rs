//! # symdeps
//!
//! File-level symbol dependency graphs for TypeScript projects.
//!
//! Every source unit of a project is walked once; each identifier or
//! qualified name that resolves to a symbol declared exactly once, in another
//! non-declaration unit, becomes an edge labelled with that symbol's name.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use symdeps::{load_program, render_ranked, DependencySource, ProjectConfig, RankedOptions};
//!
//! let project = ProjectConfig::discover(Path::new(".")).unwrap();
//! let program = load_program(&project).unwrap();
//!
//! let mut source = DependencySource::new(&program, true);
//! println!("{}", render_ranked(&mut source, &RankedOptions::default()));
//! ```

pub mod cli;
pub mod config;
pub mod deps;
pub mod error;
pub mod frontend;
pub mod project;
pub mod report;

pub use error::{Result, SymdepsError};

pub use config::SymdepsConfig;
pub use deps::{compute_dependencies, DependencyCache, DependencyMap, DependencySource};
pub use frontend::{
    build_program, build_program_from_sources, load_program, Frontend, NodeCategory, NodeId,
    Program, ProgramBuilder, SourceUnit, Symbol, SymbolId, UnitId,
};
pub use project::ProjectConfig;
pub use report::{
    render_dot, render_graph_json, render_ranked, render_unit_json, DotOptions, FileGraph,
    RankedOptions,
};
