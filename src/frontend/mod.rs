//! The analysis frontend: parsing, binding and symbol resolution.
//!
//! `loader` drives the other modules to produce a `Program`, the read-only
//! context the dependency walker queries through the `Frontend` trait.

mod binder;
pub mod language;
pub mod loader;
pub mod program;
mod resolver;
mod scopes;

pub use language::{is_declaration_file, SupportedLanguage};
pub use loader::{build_program, build_program_from_sources, load_program};
pub use program::{
    DeclarationSite, Frontend, NodeCategory, NodeId, Program, ProgramBuilder, SourceUnit, Symbol,
    SymbolId, UnitId,
};
