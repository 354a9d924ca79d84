//! Cross-unit symbol dependency extraction.

pub mod cache;
pub mod walker;

pub use cache::{DependencyCache, DependencySource};
pub use walker::{compute_dependencies, DependencyMap};
