//! The dependency walker: which other units a unit references, and through
//! which symbols.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::frontend::{Frontend, NodeCategory, NodeId, SymbolId, UnitId};

/// Target unit -> referenced symbol names, for one source unit.
///
/// Targets keep first-reference order, and names keep traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencyMap {
    edges: IndexMap<UnitId, Vec<String>>,
}

impl DependencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct target units.
    pub fn fan_out(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn contains(&self, target: UnitId) -> bool {
        self.edges.contains_key(&target)
    }

    /// Symbol names referenced from `target`, in first-seen order.
    pub fn get(&self, target: UnitId) -> Option<&[String]> {
        self.edges.get(&target).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &[String])> + '_ {
        self.edges.iter().map(|(unit, names)| (*unit, names.as_slice()))
    }

    pub fn targets(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.edges.keys().copied()
    }

    /// Total symbol names across all targets.
    pub fn symbol_references(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    fn record(&mut self, target: UnitId, name: &str) {
        self.edges.entry(target).or_default().push(name.to_string());
    }
}

/// Walk `unit`'s tree and collect its cross-unit symbol references.
///
/// A symbol counts at most once per call, only when it has exactly one
/// declaration, and only when that declaration lives in another unit that
/// is not declaration-only. Children of qualified accesses are not visited.
pub fn compute_dependencies<F: Frontend + ?Sized>(frontend: &F, unit: UnitId) -> DependencyMap {
    let mut walk = Walk {
        frontend,
        unit,
        seen: HashSet::new(),
        visited: 0,
        ambiguous: 0,
        deps: DependencyMap::new(),
    };
    walk.run(frontend.unit(unit).root);

    debug!(
        unit = %frontend.unit(unit).path.display(),
        nodes = walk.visited,
        symbols = walk.seen.len(),
        ambiguous = walk.ambiguous,
        targets = walk.deps.fan_out(),
        "dependencies computed"
    );
    walk.deps
}

struct Walk<'f, F: ?Sized> {
    frontend: &'f F,
    unit: UnitId,
    seen: HashSet<SymbolId>,
    visited: usize,
    ambiguous: usize,
    deps: DependencyMap,
}

impl<F: Frontend + ?Sized> Walk<'_, F> {
    /// Pre-order walk in child order, with an explicit stack.
    fn run(&mut self, root: NodeId) {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            self.visited += 1;
            if let Some(symbol) = self.frontend.resolve(node) {
                if self.seen.insert(symbol) {
                    self.record(symbol);
                }
            }

            if self.frontend.category(node) == NodeCategory::QualifiedAccess {
                continue;
            }
            stack.extend(self.frontend.children(node).iter().rev().copied());
        }
    }

    fn record(&mut self, symbol: SymbolId) {
        let symbol = self.frontend.symbol(symbol);
        let [site] = symbol.declarations.as_slice() else {
            if symbol.declarations.len() > 1 {
                self.ambiguous += 1;
            }
            return;
        };
        if site.unit == self.unit || self.frontend.unit(site.unit).declaration_only {
            return;
        }
        self.deps.record(site.unit, &symbol.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{Program, ProgramBuilder};

    struct Fixture {
        builder: ProgramBuilder,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                builder: ProgramBuilder::new("/proj"),
            }
        }

        fn reference(&mut self, parent: NodeId, symbol: SymbolId) -> NodeId {
            let node = self
                .builder
                .add_node(parent, "identifier", NodeCategory::Other);
            self.builder.bind(node, symbol);
            node
        }

        fn declared(&mut self, name: &str, unit: UnitId) -> SymbolId {
            let symbol = self.builder.add_symbol(name);
            self.builder.declare(symbol, unit, 1);
            symbol
        }

        fn build(self) -> Program {
            self.builder.build()
        }
    }

    #[test]
    fn test_records_cross_unit_reference() {
        let mut fx = Fixture::new();
        let a = fx.builder.add_unit("/proj/a.ts", false);
        let b = fx.builder.add_unit("/proj/b.ts", false);
        let f = fx.declared("f", a);
        let b_root = fx.builder.root(b);
        fx.reference(b_root, f);
        let program = fx.build();

        let deps = compute_dependencies(&program, b);
        assert_eq!(deps.get(a), Some(&["f".to_string()][..]));
        assert_eq!(deps.fan_out(), 1);
        assert!(compute_dependencies(&program, a).is_empty());
    }

    #[test]
    fn test_self_references_are_not_edges() {
        let mut fx = Fixture::new();
        let a = fx.builder.add_unit("/proj/a.ts", false);
        let local = fx.declared("local", a);
        let root = fx.builder.root(a);
        fx.reference(root, local);
        let program = fx.build();

        let deps = compute_dependencies(&program, a);
        assert!(deps.is_empty());
        assert!(!deps.contains(a));
    }

    #[test]
    fn test_declaration_only_targets_are_excluded() {
        let mut fx = Fixture::new();
        let b = fx.builder.add_unit("/proj/b.ts", false);
        let c = fx.builder.add_unit("/proj/c.d.ts", true);
        let t = fx.declared("T", c);
        let root = fx.builder.root(b);
        fx.reference(root, t);
        let program = fx.build();

        assert!(compute_dependencies(&program, b).is_empty());
    }

    #[test]
    fn test_ambiguous_symbols_are_excluded() {
        let mut fx = Fixture::new();
        let a = fx.builder.add_unit("/proj/a.ts", false);
        let b = fx.builder.add_unit("/proj/b.ts", false);
        let c = fx.builder.add_unit("/proj/c.ts", false);
        let merged = fx.declared("merged", a);
        fx.builder.declare(merged, c, 4);
        let single = fx.declared("single", c);
        let root = fx.builder.root(b);
        fx.reference(root, merged);
        fx.reference(root, single);
        let program = fx.build();

        let deps = compute_dependencies(&program, b);
        assert!(!deps.contains(a));
        assert_eq!(deps.get(c), Some(&["single".to_string()][..]));
    }

    #[test]
    fn test_symbols_without_declarations_contribute_nothing() {
        let mut fx = Fixture::new();
        let a = fx.builder.add_unit("/proj/a.ts", false);
        let ghost = fx.builder.add_symbol("ghost");
        let root = fx.builder.root(a);
        fx.reference(root, ghost);
        let program = fx.build();

        assert!(compute_dependencies(&program, a).is_empty());
    }

    #[test]
    fn test_each_symbol_counts_once_in_first_seen_order() {
        let mut fx = Fixture::new();
        let a = fx.builder.add_unit("/proj/a.ts", false);
        let b = fx.builder.add_unit("/proj/b.ts", false);
        let x = fx.declared("x", a);
        let y = fx.declared("y", a);
        // Same name, different symbol: both count.
        let y2 = fx.declared("y", a);
        let root = fx.builder.root(b);
        let call = fx.builder.add_node(root, "call_expression", NodeCategory::Other);
        fx.reference(call, y);
        fx.reference(call, x);
        fx.reference(root, y);
        fx.reference(root, y2);
        fx.reference(root, x);
        let program = fx.build();

        let deps = compute_dependencies(&program, b);
        assert_eq!(
            deps.get(a).unwrap(),
            &["y".to_string(), "x".to_string(), "y".to_string()]
        );
        assert_eq!(deps.symbol_references(), 3);
    }

    #[test]
    fn test_qualified_access_resolves_but_is_not_descended() {
        let mut fx = Fixture::new();
        let ns_unit = fx.builder.add_unit("/proj/ns.ts", false);
        let member_unit = fx.builder.add_unit("/proj/member.ts", false);
        let user = fx.builder.add_unit("/proj/user.ts", false);
        let base = fx.declared("ns", ns_unit);
        let member = fx.declared("member", member_unit);

        let root = fx.builder.root(user);
        let access = fx
            .builder
            .add_node(root, "member_expression", NodeCategory::QualifiedAccess);
        fx.builder.bind(access, member);
        fx.reference(access, base);
        let program = fx.build();

        let deps = compute_dependencies(&program, user);
        assert_eq!(deps.get(member_unit), Some(&["member".to_string()][..]));
        assert!(!deps.contains(ns_unit));
    }

    #[test]
    fn test_targets_keep_first_reference_order() {
        let mut fx = Fixture::new();
        let a = fx.builder.add_unit("/proj/a.ts", false);
        let b = fx.builder.add_unit("/proj/b.ts", false);
        let c = fx.builder.add_unit("/proj/c.ts", false);
        let from_c = fx.declared("fromC", c);
        let from_a = fx.declared("fromA", a);
        let root = fx.builder.root(b);
        fx.reference(root, from_c);
        fx.reference(root, from_a);
        let program = fx.build();

        let deps = compute_dependencies(&program, b);
        assert_eq!(deps.targets().collect::<Vec<_>>(), vec![c, a]);
        assert_eq!(deps, compute_dependencies(&program, b));
    }

    #[test]
    fn test_deeply_nested_tree() {
        let mut fx = Fixture::new();
        let a = fx.builder.add_unit("/proj/a.ts", false);
        let b = fx.builder.add_unit("/proj/b.ts", false);
        let f = fx.declared("f", a);
        let mut parent = fx.builder.root(b);
        for _ in 0..200_000 {
            parent = fx
                .builder
                .add_node(parent, "binary_expression", NodeCategory::Other);
        }
        fx.reference(parent, f);
        let program = fx.build();

        let deps = compute_dependencies(&program, b);
        assert_eq!(deps.get(a), Some(&["f".to_string()][..]));
    }
}
