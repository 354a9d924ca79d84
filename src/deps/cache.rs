//! Memoized dependency maps, keyed by unit path.

use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::walker::{compute_dependencies, DependencyMap};
use crate::frontend::{Frontend, UnitId};

/// Per-run memoization of `compute_dependencies`.
///
/// Entries are never evicted; the cache lives as long as one analysis run.
pub struct DependencyCache<'f, F: ?Sized> {
    frontend: &'f F,
    entries: HashMap<PathBuf, DependencyMap>,
    hits: usize,
    misses: usize,
}

impl<'f, F: Frontend + ?Sized> DependencyCache<'f, F> {
    pub fn new(frontend: &'f F) -> Self {
        Self {
            frontend,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Return the stored map for `key`, computing it from `unit` on first use.
    ///
    /// Later calls with the same key never look at `unit` again.
    pub fn get_or_compute(&mut self, key: &Path, unit: UnitId) -> &DependencyMap {
        match self.entries.entry(key.to_path_buf()) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                debug!(unit = %key.display(), "dependency cache hit");
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                self.misses += 1;
                entry.insert(compute_dependencies(self.frontend, unit))
            }
        }
    }

    /// `get_or_compute` keyed by the unit's own path.
    pub fn get(&mut self, unit: UnitId) -> &DependencyMap {
        let frontend = self.frontend;
        self.get_or_compute(&frontend.unit(unit).path, unit)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

/// Where the reporters get dependency maps from.
///
/// `Fresh` is the reduced configuration: every request walks the tree again.
pub enum DependencySource<'f, F: ?Sized> {
    Cached(DependencyCache<'f, F>),
    Fresh(&'f F),
}

impl<'f, F: Frontend + ?Sized> DependencySource<'f, F> {
    pub fn new(frontend: &'f F, use_cache: bool) -> Self {
        if use_cache {
            DependencySource::Cached(DependencyCache::new(frontend))
        } else {
            DependencySource::Fresh(frontend)
        }
    }

    pub fn frontend(&self) -> &'f F {
        match self {
            DependencySource::Cached(cache) => cache.frontend,
            DependencySource::Fresh(frontend) => *frontend,
        }
    }

    pub fn get(&mut self, unit: UnitId) -> Cow<'_, DependencyMap> {
        match self {
            DependencySource::Cached(cache) => Cow::Borrowed(cache.get(unit)),
            DependencySource::Fresh(frontend) => Cow::Owned(compute_dependencies(*frontend, unit)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::testing::CountingFrontend;
    use crate::frontend::{NodeCategory, ProgramBuilder};

    fn two_unit_program() -> (crate::frontend::Program, UnitId, UnitId) {
        let mut builder = ProgramBuilder::new("/proj");
        let a = builder.add_unit("/proj/a.ts", false);
        let b = builder.add_unit("/proj/b.ts", false);
        let f = builder.add_symbol("f");
        builder.declare(f, a, 1);
        let root = builder.root(b);
        let node = builder.add_node(root, "identifier", NodeCategory::Other);
        builder.bind(node, f);
        (builder.build(), a, b)
    }

    #[test]
    fn test_second_lookup_does_not_traverse() {
        let (program, _, b) = two_unit_program();
        let counting = CountingFrontend::new(&program);
        let mut cache = DependencyCache::new(&counting);

        let first = cache.get_or_compute(Path::new("/proj/b.ts"), b).clone();
        let traversals = counting.children_calls();
        assert!(traversals > 0);

        let second = cache.get_or_compute(Path::new("/proj/b.ts"), b).clone();
        assert_eq!(first, second);
        assert_eq!(counting.children_calls(), traversals);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn test_key_wins_over_unit_argument() {
        let (program, a, b) = two_unit_program();
        let mut cache = DependencyCache::new(&program);

        let for_b = cache.get_or_compute(Path::new("key"), b).clone();
        let again = cache.get_or_compute(Path::new("key"), a).clone();
        assert_eq!(for_b, again);
        assert_eq!(for_b.fan_out(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_fresh_source_walks_every_time() {
        let (program, _, b) = two_unit_program();
        let counting = CountingFrontend::new(&program);
        let mut source = DependencySource::new(&counting, false);

        let first = source.get(b).into_owned();
        let after_first = counting.children_calls();
        let second = source.get(b).into_owned();
        assert_eq!(first, second);
        assert_eq!(counting.children_calls(), after_first * 2);
    }
}
