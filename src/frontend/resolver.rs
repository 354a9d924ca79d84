//! Second pass: lower a tree-sitter tree into the program arena and resolve
//! every identifier-like node against lexical scopes, namespaces, the module
//! scope and finally the global scope.

use std::collections::HashMap;
use tree_sitter::Node;

use super::binder::{
    declared_names, hoisted_var_names, is_global_augmentation, join_path, line_of,
    named_children, namespace_segments, node_text, pattern_names, string_value, FUNCTION_KINDS,
};
use super::program::{NodeCategory, NodeId, ProgramBuilder, SymbolId, UnitId};
use super::scopes::{Owner, ProgramScopes};

const QUALIFIED_KINDS: &[&str] = &["member_expression", "nested_type_identifier", "nested_identifier"];

const TYPE_PARAMETER_KINDS: &[&str] = &[
    "class_declaration",
    "abstract_class_declaration",
    "class",
    "interface_declaration",
    "type_alias_declaration",
];

pub(crate) fn category_of(kind: &str) -> NodeCategory {
    if QUALIFIED_KINDS.contains(&kind) {
        NodeCategory::QualifiedAccess
    } else {
        NodeCategory::Other
    }
}

#[derive(Debug)]
enum Frame {
    Locals(HashMap<String, SymbolId>),
    Namespace(Owner, String),
    GlobalAugmentation,
}

/// Lower one unit under its root node.
pub(crate) fn lower_unit(
    builder: &mut ProgramBuilder,
    scopes: &ProgramScopes,
    unit: UnitId,
    tree_root: Node<'_>,
    source: &[u8],
) {
    let root = builder.root(unit);
    let mut lowering = Lowering {
        builder,
        scopes,
        unit,
        source,
        frames: Vec::new(),
    };
    lowering.lower_children(tree_root, root);
}

enum Step<'t> {
    Enter(Node<'t>, NodeId),
    /// Pop the frames opened by the node whose subtree is done.
    Leave(usize),
}

fn push_children<'t>(stack: &mut Vec<Step<'t>>, node: Node<'t>, parent: NodeId) {
    for child in named_children(node).into_iter().rev() {
        if child.kind() != "comment" {
            stack.push(Step::Enter(child, parent));
        }
    }
}

struct Lowering<'a> {
    builder: &'a mut ProgramBuilder,
    scopes: &'a ProgramScopes,
    unit: UnitId,
    source: &'a [u8],
    frames: Vec<Frame>,
}

impl Lowering<'_> {
    /// Lower the named children of `node` below `parent`, depth first in
    /// source order. Iterative, so deeply nested expressions cannot exhaust
    /// the stack.
    fn lower_children(&mut self, node: Node<'_>, parent: NodeId) {
        let mut stack = Vec::new();
        push_children(&mut stack, node, parent);

        while let Some(step) = stack.pop() {
            match step {
                Step::Leave(opened) => {
                    for _ in 0..opened {
                        self.frames.pop();
                    }
                }
                Step::Enter(node, parent) => {
                    let kind = node.kind();
                    let id = self.builder.add_node(parent, kind, category_of(kind));
                    if let Some(symbol) = self.resolve_node(node) {
                        self.builder.bind(id, symbol);
                    }
                    let opened = self.open_scope(node);
                    stack.push(Step::Leave(opened));
                    push_children(&mut stack, node, id);
                }
            }
        }
    }

    fn resolve_node(&self, node: Node<'_>) -> Option<SymbolId> {
        match node.kind() {
            "identifier" | "type_identifier" | "shorthand_property_identifier" => {
                self.resolve_identifier(node)
            }
            kind if QUALIFIED_KINDS.contains(&kind) => self.resolve_qualified(node),
            _ => None,
        }
    }

    fn resolve_identifier(&self, node: Node<'_>) -> Option<SymbolId> {
        let name = node_text(node, self.source);
        let Some(parent) = node.parent() else {
            return self.lookup(name);
        };

        // Clause names standing for a whole module bind nothing.
        let declared = |symbol: SymbolId| !self.scopes.is_module_symbol(symbol);
        match parent.kind() {
            "import_specifier" => {
                let local = parent
                    .child_by_field_name("alias")
                    .or_else(|| parent.child_by_field_name("name"))?;
                self.scopes
                    .imported(self.unit, node_text(local, self.source))
                    .filter(|s| declared(*s))
            }
            "import_clause" | "namespace_import" | "import_require_clause" => self
                .scopes
                .imported(self.unit, name)
                .filter(|s| declared(*s)),
            "export_specifier" => {
                if is_field(parent, "alias", node) {
                    return None;
                }
                let statement = parent.parent().and_then(|clause| clause.parent());
                let symbol = match statement.and_then(|s| s.child_by_field_name("source")) {
                    Some(specifier) => self.scopes.reexported(
                        self.unit,
                        &string_value(specifier, self.source),
                        name,
                    ),
                    None => self.lookup(name),
                };
                symbol.filter(|s| declared(*s))
            }
            kind if QUALIFIED_KINDS.contains(&kind) => {
                // Only the leftmost segment names something on its own.
                let first = named_children(parent).into_iter().next()?;
                if first.id() == node.id() {
                    self.lookup(name)
                } else {
                    None
                }
            }
            _ => self.lookup(name),
        }
    }

    /// Resolve `a.b.c` segment by segment through namespace, enum and
    /// module member tables.
    fn resolve_qualified(&self, node: Node<'_>) -> Option<SymbolId> {
        let segments = qualified_segments(node, self.source)?;
        let (first, rest) = segments.split_first()?;
        let mut symbol = self.lookup(first)?;
        for segment in rest {
            symbol = self.scopes.member_of(symbol, segment)?;
        }
        Some(symbol)
    }

    fn lookup(&self, name: &str) -> Option<SymbolId> {
        for frame in self.frames.iter().rev() {
            let found = match frame {
                Frame::Locals(names) => names.get(name).copied(),
                Frame::Namespace(owner, path) => self.scopes.member(owner, path, name),
                Frame::GlobalAugmentation => None,
            };
            if found.is_some() {
                return found;
            }
        }
        if self.scopes.is_module(self.unit) {
            if let Some(symbol) = self.scopes.module_scope(self.unit, name) {
                return Some(symbol);
            }
        }
        self.scopes.global(name)
    }

    /// Push the frames `node` introduces for its children; returns how many.
    fn open_scope(&mut self, node: Node<'_>) -> usize {
        let kind = node.kind();
        match kind {
            "statement_block" => {
                let parent = node.parent().map(|p| p.kind());
                if parent == Some("ambient_declaration") {
                    return 0;
                }
                let mut names: Vec<(String, usize)> = named_children(node)
                    .into_iter()
                    .filter(|s| !matches!(s.kind(), "export_statement" | "variable_declaration"))
                    .flat_map(|s| declared_names(s, self.source, ""))
                    .map(|d| (d.name, d.line))
                    .collect();
                if matches!(parent, Some("internal_module" | "module" | "class_static_block")) {
                    hoisted_var_names(node, self.source, &mut names);
                }
                self.push_locals(names)
            }
            "switch_body" => {
                let names = named_children(node)
                    .into_iter()
                    .filter(|case| matches!(case.kind(), "switch_case" | "switch_default"))
                    .flat_map(|case| {
                        let value = case.child_by_field_name("value").map(|v| v.id());
                        named_children(case)
                            .into_iter()
                            .filter(move |s| Some(s.id()) != value)
                    })
                    .filter(|s| s.kind() != "variable_declaration")
                    .flat_map(|s| declared_names(s, self.source, ""))
                    .map(|d| (d.name, d.line))
                    .collect();
                self.push_locals(names)
            }
            "for_statement" => {
                let names = node
                    .child_by_field_name("initializer")
                    .filter(|init| init.kind() == "lexical_declaration")
                    .map(|init| declared_names(init, self.source, ""))
                    .unwrap_or_default()
                    .into_iter()
                    .map(|d| (d.name, d.line))
                    .collect();
                self.push_locals(names)
            }
            "for_in_statement"
                if node
                    .child_by_field_name("kind")
                    .is_some_and(|k| matches!(k.kind(), "let" | "const")) =>
            {
                let mut names = Vec::new();
                if let Some(left) = node.child_by_field_name("left") {
                    pattern_names(left, self.source, &mut names);
                }
                self.push_locals(names)
            }
            "index_signature" => {
                let mut names = Vec::new();
                let key = node.child_by_field_name("name").or_else(|| {
                    named_children(node)
                        .into_iter()
                        .find(|n| n.kind() == "mapped_type_clause")
                        .and_then(|clause| clause.child_by_field_name("name"))
                });
                if let Some(key) = key {
                    names.push((node_text(key, self.source).to_string(), line_of(key)));
                }
                self.push_locals(names)
            }
            "conditional_type" => {
                let mut names = Vec::new();
                if let Some(right) = node.child_by_field_name("right") {
                    infer_names(right, self.source, &mut names);
                }
                self.push_locals(names)
            }
            "catch_clause" => {
                let mut names = Vec::new();
                if let Some(parameter) = node.child_by_field_name("parameter") {
                    pattern_names(parameter, self.source, &mut names);
                }
                self.push_locals(names)
            }
            "internal_module" | "module" => self.open_namespace(node),
            "ambient_declaration" if is_global_augmentation(node) => {
                self.frames.push(Frame::GlobalAugmentation);
                1
            }
            k if FUNCTION_KINDS.contains(&k) => {
                let mut names = function_scope_names(node, self.source);
                if let Some(body) = node.child_by_field_name("body") {
                    hoisted_var_names(body, self.source, &mut names);
                }
                self.push_locals(names)
            }
            k if TYPE_PARAMETER_KINDS.contains(&k) => {
                let mut names = Vec::new();
                if let Some(params) = node.child_by_field_name("type_parameters") {
                    type_parameter_names(params, self.source, &mut names);
                }
                self.push_locals(names)
            }
            _ => 0,
        }
    }

    /// One namespace frame per dotted segment: `namespace A.B` sees the
    /// members of `A` and of `A.B`.
    fn open_namespace(&mut self, node: Node<'_>) -> usize {
        let Some(segments) = namespace_segments(node, self.source) else {
            return 0;
        };

        let enclosing = self.frames.iter().rev().find_map(|frame| match frame {
            Frame::Namespace(owner, path) => Some((owner.clone(), path.clone())),
            _ => None,
        });
        let in_global = self
            .frames
            .iter()
            .any(|f| matches!(f, Frame::GlobalAugmentation));

        let (owner, mut path) = match enclosing {
            Some(enclosing) => enclosing,
            None => {
                let declared = self
                    .lookup(&segments[0])
                    .and_then(|symbol| self.scopes.namespace_path(symbol))
                    .map(|(owner, _)| owner.clone());
                let owner = declared.unwrap_or(
                    if in_global || !self.scopes.is_module(self.unit) {
                        Owner::Global
                    } else {
                        Owner::Unit(self.unit)
                    },
                );
                (owner, String::new())
            }
        };

        for segment in &segments {
            path = join_path(&path, segment);
            self.frames.push(Frame::Namespace(owner.clone(), path.clone()));
        }
        segments.len()
    }

    fn push_locals(&mut self, names: Vec<(String, usize)>) -> usize {
        let mut frame: HashMap<String, SymbolId> = HashMap::new();
        for (name, line) in names {
            let symbol = match frame.get(&name) {
                Some(symbol) => *symbol,
                None => {
                    let symbol = self.builder.add_symbol(name.clone());
                    frame.insert(name, symbol);
                    symbol
                }
            };
            self.builder.declare(symbol, self.unit, line);
        }
        self.frames.push(Frame::Locals(frame));
        1
    }
}

fn is_field(parent: Node<'_>, field: &str, node: Node<'_>) -> bool {
    parent
        .child_by_field_name(field)
        .is_some_and(|child| child.id() == node.id())
}

/// `a.b.c` -> `["a", "b", "c"]`; `None` for anything not rooted at a name.
fn qualified_segments(node: Node<'_>, source: &[u8]) -> Option<Vec<String>> {
    match node.kind() {
        "identifier" | "type_identifier" | "property_identifier" => {
            Some(vec![node_text(node, source).to_string()])
        }
        "member_expression" | "nested_type_identifier" | "nested_identifier" => {
            let children = named_children(node);
            let object = node
                .child_by_field_name("object")
                .or_else(|| node.child_by_field_name("module"))
                .or_else(|| children.first().copied())?;
            let property = node
                .child_by_field_name("property")
                .or_else(|| node.child_by_field_name("name"))
                .or_else(|| children.last().copied())?;
            if property.kind() == "private_property_identifier" {
                return None;
            }
            let mut segments = qualified_segments(object, source)?;
            segments.push(node_text(property, source).to_string());
            Some(segments)
        }
        _ => None,
    }
}

/// Parameters, type parameters and the own name of a function expression.
fn function_scope_names(node: Node<'_>, source: &[u8]) -> Vec<(String, usize)> {
    let mut names = Vec::new();

    if matches!(
        node.kind(),
        "function_expression" | "function" | "generator_function"
    ) {
        if let Some(name) = node.child_by_field_name("name") {
            names.push((node_text(name, source).to_string(), line_of(name)));
        }
    }
    if let Some(params) = node.child_by_field_name("type_parameters") {
        type_parameter_names(params, source, &mut names);
    }
    if let Some(params) = node.child_by_field_name("parameters") {
        for param in named_children(params) {
            match param.kind() {
                "required_parameter" | "optional_parameter" => {
                    if let Some(pattern) = param.child_by_field_name("pattern") {
                        pattern_names(pattern, source, &mut names);
                    }
                }
                _ => pattern_names(param, source, &mut names),
            }
        }
    }
    if let Some(param) = node.child_by_field_name("parameter") {
        pattern_names(param, source, &mut names);
    }
    names
}

/// Type variables introduced by `infer X` in a conditional type's `extends`
/// clause. Nested conditional types keep theirs.
fn infer_names(node: Node<'_>, source: &[u8], out: &mut Vec<(String, usize)>) {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        match current.kind() {
            "infer_type" => {
                if let Some(name) = named_children(current).into_iter().next() {
                    out.push((node_text(name, source).to_string(), line_of(name)));
                }
            }
            "conditional_type" => continue,
            _ => {}
        }
        let mut children = named_children(current);
        children.reverse();
        stack.extend(children);
    }
}

fn type_parameter_names(params: Node<'_>, source: &[u8], out: &mut Vec<(String, usize)>) {
    for param in named_children(params) {
        if param.kind() != "type_parameter" {
            continue;
        }
        if let Some(name) = param.child_by_field_name("name") {
            out.push((node_text(name, source).to_string(), line_of(name)));
        }
    }
}
