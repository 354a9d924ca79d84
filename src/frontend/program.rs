//! The analysis context: units, syntax nodes and symbols stored in flat arenas.
//!
//! A `Program` is built once (by `ProgramBuilder`, usually driven by the
//! loader) and is read-only afterwards. The dependency walker and the
//! reporters only see it through the `Frontend` trait.

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Index of a source unit inside its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnitId(u32);

/// Index of a syntax node inside its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// Index of a symbol inside its program. Symbols compare by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

macro_rules! arena_index {
    ($ty:ident) => {
        impl $ty {
            pub fn index(self) -> usize {
                self.0 as usize
            }

            fn from_len(len: usize) -> Self {
                $ty(u32::try_from(len).expect("arena exceeds u32::MAX entries"))
            }
        }
    };
}

arena_index!(UnitId);
arena_index!(NodeId);
arena_index!(SymbolId);

/// The closed set of node categories the walker distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// `a.b`, `N.T` and friends. Resolved as a whole, never descended into.
    QualifiedAccess,
    /// Every other node.
    Other,
}

/// One file of the analyzed program.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Identity of the unit (its path).
    pub path: PathBuf,
    /// Root of the unit's syntax tree.
    pub root: NodeId,
    /// Declaration-only units (`.d.ts`) are never dependency targets.
    pub declaration_only: bool,
}

/// Where a symbol is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclarationSite {
    pub unit: UnitId,
    /// Line of the declaration (1-indexed, 0 when unknown).
    pub line: usize,
}

/// A named entity that identifier-like nodes resolve to.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    /// Declaration sites in the order they were registered.
    pub declarations: Vec<DeclarationSite>,
}

#[derive(Debug, Clone)]
struct SyntaxNode {
    kind: &'static str,
    category: NodeCategory,
    children: Vec<NodeId>,
    resolved: Option<SymbolId>,
}

/// Read-only query surface the dependency walker and reporters need.
pub trait Frontend {
    /// All units, indexed by `UnitId`.
    fn units(&self) -> &[SourceUnit];

    /// Immediate children of a node, in source order.
    fn children(&self, node: NodeId) -> &[NodeId];

    fn category(&self, node: NodeId) -> NodeCategory;

    /// The symbol a node denotes, if any.
    fn resolve(&self, node: NodeId) -> Option<SymbolId>;

    fn symbol(&self, id: SymbolId) -> &Symbol;

    fn unit(&self, id: UnitId) -> &SourceUnit {
        &self.units()[id.index()]
    }

    fn unit_ids(&self) -> Vec<UnitId> {
        (0..self.units().len()).map(UnitId::from_len).collect()
    }
}

/// The whole-program analysis context.
#[derive(Debug, Clone)]
pub struct Program {
    root_dir: PathBuf,
    units: Vec<SourceUnit>,
    nodes: Vec<SyntaxNode>,
    symbols: Vec<Symbol>,
    by_path: HashMap<PathBuf, UnitId>,
}

impl Program {
    /// Directory unit paths are displayed relative to.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Look a unit up by its exact path.
    pub fn unit_by_path(&self, path: &Path) -> Option<UnitId> {
        self.by_path.get(path).copied()
    }

    /// Syntax kind of a node (the tree-sitter kind for loaded programs).
    pub fn kind(&self, node: NodeId) -> &'static str {
        self.nodes[node.index()].kind
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }
}

impl Frontend for Program {
    fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.index()].children
    }

    fn category(&self, node: NodeId) -> NodeCategory {
        self.nodes[node.index()].category
    }

    fn resolve(&self, node: NodeId) -> Option<SymbolId> {
        self.nodes[node.index()].resolved
    }

    fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }
}

/// Incrementally assembles a `Program`.
///
/// Nodes must be added parent-first; each unit gets a `program` root node
/// when it is added.
#[derive(Debug)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: Program {
                root_dir: root_dir.into(),
                units: Vec::new(),
                nodes: Vec::new(),
                symbols: Vec::new(),
                by_path: HashMap::new(),
            },
        }
    }

    /// Register a unit and create its root node.
    pub fn add_unit(&mut self, path: impl Into<PathBuf>, declaration_only: bool) -> UnitId {
        let path = path.into();
        let root = self.push_node("program", NodeCategory::Other);
        let id = UnitId::from_len(self.program.units.len());
        self.program.by_path.insert(path.clone(), id);
        self.program.units.push(SourceUnit {
            path,
            root,
            declaration_only,
        });
        id
    }

    pub fn root(&self, unit: UnitId) -> NodeId {
        self.program.units[unit.index()].root
    }

    pub fn unit_path(&self, unit: UnitId) -> &Path {
        &self.program.units[unit.index()].path
    }

    /// Append a child node under `parent`.
    pub fn add_node(
        &mut self,
        parent: NodeId,
        kind: &'static str,
        category: NodeCategory,
    ) -> NodeId {
        let id = self.push_node(kind, category);
        self.program.nodes[parent.index()].children.push(id);
        id
    }

    /// Create a symbol with no declaration sites yet.
    pub fn add_symbol(&mut self, name: impl Into<String>) -> SymbolId {
        let id = SymbolId::from_len(self.program.symbols.len());
        self.program.symbols.push(Symbol {
            name: name.into(),
            declarations: Vec::new(),
        });
        id
    }

    /// Add a declaration site to a symbol.
    pub fn declare(&mut self, symbol: SymbolId, unit: UnitId, line: usize) {
        self.program.symbols[symbol.index()]
            .declarations
            .push(DeclarationSite { unit, line });
    }

    /// Record that `node` resolves to `symbol`.
    pub fn bind(&mut self, node: NodeId, symbol: SymbolId) {
        self.program.nodes[node.index()].resolved = Some(symbol);
    }

    pub fn build(self) -> Program {
        self.program
    }

    fn push_node(&mut self, kind: &'static str, category: NodeCategory) -> NodeId {
        let id = NodeId::from_len(self.program.nodes.len());
        self.program.nodes.push(SyntaxNode {
            kind,
            category,
            children: Vec::new(),
            resolved: None,
        });
        id
    }
}
