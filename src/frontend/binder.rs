//! First pass over a parsed file: the names it declares, imports and exports.
//!
//! Runs independently per file (and therefore in parallel). Nothing here
//! knows about other files; the loader links the results together.

use tree_sitter::Node;

/// A declared name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Declared {
    pub name: String,
    pub line: usize,
    /// Dotted member path when the declaration is a namespace or enum.
    pub container: Option<String>,
}

/// Members a namespace or enum contributes under its dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContainerDecl {
    pub path: String,
    /// Global containers merge across every script file.
    pub global: bool,
    pub members: Vec<Declared>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Imported {
    Named(String),
    Default,
    Namespace,
    /// `import x = require("...")`
    Require,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportBinding {
    pub local: String,
    pub specifier: String,
    pub imported: Imported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ExportEntry {
    /// `export { local as exported }`, `export function f`, `export default f`
    Local { exported: String, local: String },
    /// `export { imported as exported } from "specifier"`
    From {
        exported: String,
        imported: String,
        specifier: String,
    },
    /// `export * as exported from "specifier"`
    StarAs { exported: String, specifier: String },
    /// `export * from "specifier"`
    Star { specifier: String },
    /// `export default <expression>` with no name to point at.
    Anonymous { exported: String, line: usize },
}

/// Everything the first pass learns about one file.
#[derive(Debug, Clone, Default)]
pub(crate) struct FileBindings {
    /// Files with top-level imports or exports get their own module scope.
    pub is_module: bool,
    pub top_level: Vec<Declared>,
    /// Declarations inside `declare global { ... }`.
    pub globals: Vec<Declared>,
    pub containers: Vec<ContainerDecl>,
    pub imports: Vec<ImportBinding>,
    pub exports: Vec<ExportEntry>,
}

/// Nodes with their own parameter and `var` scope.
pub(crate) const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
    "function_signature",
    "method_signature",
    "abstract_method_signature",
    "call_signature",
    "construct_signature",
    "function_type",
    "constructor_type",
];

pub(crate) const DEFAULT_EXPORT: &str = "default";
pub(crate) const EXPORT_ASSIGNMENT: &str = "export=";

pub(crate) fn bind_file(root: Node<'_>, source: &[u8]) -> FileBindings {
    let statements = named_children(root);
    let is_module = statements
        .iter()
        .any(|s| matches!(s.kind(), "import_statement" | "export_statement"));

    let mut bindings = FileBindings {
        is_module,
        ..Default::default()
    };
    for statement in statements {
        bindings.bind_top_level(statement, source);
    }
    bindings
}

impl FileBindings {
    fn bind_top_level(&mut self, statement: Node<'_>, source: &[u8]) {
        match statement.kind() {
            "import_statement" => self.bind_import(statement, source),
            "export_statement" => self.bind_export(statement, source),
            "ambient_declaration" if is_global_augmentation(statement) => {
                for body in named_children(statement) {
                    if body.kind() != "statement_block" {
                        continue;
                    }
                    for inner in named_children(body) {
                        let inner = match inner.kind() {
                            "export_statement" => match inner.child_by_field_name("declaration") {
                                Some(declaration) => declaration,
                                None => continue,
                            },
                            _ => inner,
                        };
                        self.globals.extend(declared_names(inner, source, ""));
                        collect_containers(inner, source, "", true, &mut self.containers);
                    }
                }
            }
            _ => {
                self.top_level.extend(declared_names(statement, source, ""));
                if statement.kind() != "variable_declaration" {
                    let mut vars = Vec::new();
                    hoisted_var_names(statement, source, &mut vars);
                    self.top_level
                        .extend(vars.into_iter().map(|(name, line)| Declared {
                            name,
                            line,
                            container: None,
                        }));
                }
                let global = !self.is_module;
                collect_containers(statement, source, "", global, &mut self.containers);
            }
        }
    }

    fn bind_import(&mut self, statement: Node<'_>, source: &[u8]) {
        let specifier = statement
            .child_by_field_name("source")
            .map(|s| string_value(s, source));

        for child in named_children(statement) {
            match child.kind() {
                "import_clause" => {
                    if let Some(specifier) = &specifier {
                        self.bind_import_clause(child, specifier, source);
                    }
                }
                "import_require_clause" => {
                    let local = named_children(child)
                        .into_iter()
                        .find(|n| n.kind() == "identifier")
                        .map(|n| node_text(n, source).to_string());
                    let specifier = child
                        .child_by_field_name("source")
                        .map(|s| string_value(s, source))
                        .or_else(|| specifier.clone());
                    if let (Some(local), Some(specifier)) = (local, specifier) {
                        self.imports.push(ImportBinding {
                            local,
                            specifier,
                            imported: Imported::Require,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    fn bind_import_clause(&mut self, clause: Node<'_>, specifier: &str, source: &[u8]) {
        for part in named_children(clause) {
            match part.kind() {
                "identifier" => self.imports.push(ImportBinding {
                    local: node_text(part, source).to_string(),
                    specifier: specifier.to_string(),
                    imported: Imported::Default,
                }),
                "namespace_import" => {
                    if let Some(local) = named_children(part)
                        .into_iter()
                        .find(|n| n.kind() == "identifier")
                    {
                        self.imports.push(ImportBinding {
                            local: node_text(local, source).to_string(),
                            specifier: specifier.to_string(),
                            imported: Imported::Namespace,
                        });
                    }
                }
                "named_imports" => {
                    for spec in named_children(part) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let Some(name) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        let name = name_text(name, source);
                        let local = spec
                            .child_by_field_name("alias")
                            .map(|a| name_text(a, source))
                            .unwrap_or_else(|| name.clone());
                        self.imports.push(ImportBinding {
                            local,
                            specifier: specifier.to_string(),
                            imported: Imported::Named(name),
                        });
                    }
                }
                _ => {}
            }
        }
    }

    fn bind_export(&mut self, statement: Node<'_>, source: &[u8]) {
        let line = line_of(statement);
        let specifier = statement
            .child_by_field_name("source")
            .map(|s| string_value(s, source));
        let is_default = has_token(statement, "default");

        if let Some(declaration) = statement.child_by_field_name("declaration") {
            let declared = declared_names(declaration, source, "");
            for d in &declared {
                let exported = if is_default {
                    DEFAULT_EXPORT.to_string()
                } else {
                    d.name.clone()
                };
                self.exports.push(ExportEntry::Local {
                    exported,
                    local: d.name.clone(),
                });
            }
            self.top_level.extend(declared);
            collect_containers(declaration, source, "", false, &mut self.containers);
            return;
        }

        if let Some(value) = statement.child_by_field_name("value") {
            self.exports.push(exported_expression(DEFAULT_EXPORT, value, line, source));
            return;
        }

        if has_token(statement, "=") {
            if let Some(value) = named_children(statement)
                .into_iter()
                .find(|n| n.kind() != "comment")
            {
                self.exports
                    .push(exported_expression(EXPORT_ASSIGNMENT, value, line, source));
            }
            return;
        }

        let mut named = false;
        for child in named_children(statement) {
            match child.kind() {
                "export_clause" => {
                    named = true;
                    for spec in named_children(child) {
                        if spec.kind() != "export_specifier" {
                            continue;
                        }
                        let Some(name) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        let name = name_text(name, source);
                        let exported = spec
                            .child_by_field_name("alias")
                            .map(|a| name_text(a, source))
                            .unwrap_or_else(|| name.clone());
                        self.exports.push(match &specifier {
                            Some(specifier) => ExportEntry::From {
                                exported,
                                imported: name,
                                specifier: specifier.clone(),
                            },
                            None => ExportEntry::Local {
                                exported,
                                local: name,
                            },
                        });
                    }
                }
                "namespace_export" => {
                    named = true;
                    let exported = named_children(child)
                        .into_iter()
                        .next()
                        .map(|n| name_text(n, source));
                    if let (Some(exported), Some(specifier)) = (exported, &specifier) {
                        self.exports.push(ExportEntry::StarAs {
                            exported,
                            specifier: specifier.clone(),
                        });
                    }
                }
                _ => {}
            }
        }

        if !named && has_token(statement, "*") {
            if let Some(specifier) = specifier {
                self.exports.push(ExportEntry::Star { specifier });
            }
        }
    }
}

fn exported_expression(exported: &str, value: Node<'_>, line: usize, source: &[u8]) -> ExportEntry {
    match value.kind() {
        "identifier" => ExportEntry::Local {
            exported: exported.to_string(),
            local: node_text(value, source).to_string(),
        },
        _ => ExportEntry::Anonymous {
            exported: exported.to_string(),
            line,
        },
    }
}

/// Names a statement introduces into the scope that contains it.
pub(crate) fn declared_names(node: Node<'_>, source: &[u8], prefix: &str) -> Vec<Declared> {
    let line = line_of(node);
    match node.kind() {
        "function_declaration"
        | "generator_function_declaration"
        | "function_signature"
        | "class_declaration"
        | "abstract_class_declaration"
        | "interface_declaration"
        | "type_alias_declaration" => field_text(node, "name", source)
            .map(|name| {
                vec![Declared {
                    name,
                    line,
                    container: None,
                }]
            })
            .unwrap_or_default(),
        "enum_declaration" => field_text(node, "name", source)
            .map(|name| {
                let container = Some(join_path(prefix, &name));
                vec![Declared {
                    name,
                    line,
                    container,
                }]
            })
            .unwrap_or_default(),
        "internal_module" | "module" => namespace_segments(node, source)
            .and_then(|segments| segments.into_iter().next())
            .map(|first| {
                let container = Some(join_path(prefix, &first));
                vec![Declared {
                    name: first,
                    line,
                    container,
                }]
            })
            .unwrap_or_default(),
        "import_alias" => named_children(node)
            .into_iter()
            .find(|n| n.kind() == "identifier")
            .map(|n| {
                vec![Declared {
                    name: node_text(n, source).to_string(),
                    line,
                    container: None,
                }]
            })
            .unwrap_or_default(),
        "lexical_declaration" | "variable_declaration" => {
            let mut names = Vec::new();
            for declarator in named_children(node) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                if let Some(pattern) = declarator.child_by_field_name("name") {
                    pattern_names(pattern, source, &mut names);
                }
            }
            names
                .into_iter()
                .map(|(name, line)| Declared {
                    name,
                    line,
                    container: None,
                })
                .collect()
        }
        "ambient_declaration" | "expression_statement" => named_children(node)
            .into_iter()
            .flat_map(|inner| declared_names(inner, source, prefix))
            .collect(),
        _ => Vec::new(),
    }
}

/// Record the member tables of namespaces and enums declared by `node`.
pub(crate) fn collect_containers(
    node: Node<'_>,
    source: &[u8],
    prefix: &str,
    global: bool,
    out: &mut Vec<ContainerDecl>,
) {
    match node.kind() {
        "internal_module" | "module" => {
            let Some(segments) = namespace_segments(node, source) else {
                return;
            };
            let line = line_of(node);
            let mut path = prefix.to_string();
            for (i, segment) in segments.iter().enumerate() {
                path = join_path(&path, segment);
                if let Some(next) = segments.get(i + 1) {
                    out.push(ContainerDecl {
                        path: path.clone(),
                        global,
                        members: vec![Declared {
                            name: next.clone(),
                            line,
                            container: Some(join_path(&path, next)),
                        }],
                    });
                }
            }

            let mut members = Vec::new();
            if let Some(body) = node.child_by_field_name("body") {
                for statement in named_children(body) {
                    if statement.kind() != "export_statement" {
                        continue;
                    }
                    if let Some(declaration) = statement.child_by_field_name("declaration") {
                        members.extend(declared_names(declaration, source, &path));
                        collect_containers(declaration, source, &path, global, out);
                    }
                }
            }
            out.push(ContainerDecl {
                path,
                global,
                members,
            });
        }
        "enum_declaration" => {
            let Some(name) = field_text(node, "name", source) else {
                return;
            };
            let members = node
                .child_by_field_name("body")
                .map(|body| enum_members(body, source))
                .unwrap_or_default();
            out.push(ContainerDecl {
                path: join_path(prefix, &name),
                global,
                members,
            });
        }
        "ambient_declaration" | "expression_statement" => {
            for inner in named_children(node) {
                collect_containers(inner, source, prefix, global, out);
            }
        }
        _ => {}
    }
}

fn enum_members(body: Node<'_>, source: &[u8]) -> Vec<Declared> {
    named_children(body)
        .into_iter()
        .filter_map(|member| {
            let name = match member.kind() {
                "property_identifier" | "string" => name_text(member, source),
                "enum_assignment" => name_text(member.child_by_field_name("name")?, source),
                _ => return None,
            };
            Some(Declared {
                name,
                line: line_of(member),
                container: None,
            })
        })
        .collect()
}

/// `var` names declared at or below `node` that belong to the enclosing
/// function, namespace or file. Nested functions and namespaces are not
/// entered, nor are exported or ambient statements.
pub(crate) fn hoisted_var_names(node: Node<'_>, source: &[u8], out: &mut Vec<(String, usize)>) {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        let kind = current.kind();
        match kind {
            "variable_declaration" => {
                for declarator in named_children(current) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    if let Some(pattern) = declarator.child_by_field_name("name") {
                        pattern_names(pattern, source, out);
                    }
                }
                continue;
            }
            "for_in_statement" => {
                let is_var = current
                    .child_by_field_name("kind")
                    .is_some_and(|k| k.kind() == "var");
                if is_var {
                    if let Some(left) = current.child_by_field_name("left") {
                        pattern_names(left, source, out);
                    }
                }
            }
            "internal_module" | "module" | "export_statement" | "ambient_declaration"
            | "class_static_block" => continue,
            k if FUNCTION_KINDS.contains(&k) => continue,
            _ => {}
        }
        let mut children = named_children(current);
        children.reverse();
        stack.extend(children);
    }
}

/// Collect the identifiers a binding pattern declares.
pub(crate) fn pattern_names(node: Node<'_>, source: &[u8], out: &mut Vec<(String, usize)>) {
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => {
            out.push((node_text(node, source).to_string(), line_of(node)));
        }
        "pair_pattern" => {
            if let Some(value) = node.child_by_field_name("value") {
                pattern_names(value, source, out);
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = node.child_by_field_name("left") {
                pattern_names(left, source, out);
            }
        }
        "object_pattern" | "array_pattern" | "rest_pattern" => {
            for child in named_children(node) {
                pattern_names(child, source, out);
            }
        }
        _ => {}
    }
}

/// `namespace A.B.C` -> `["A", "B", "C"]`. `None` for `declare module "x"`.
pub(crate) fn namespace_segments(node: Node<'_>, source: &[u8]) -> Option<Vec<String>> {
    let name = node.child_by_field_name("name")?;
    if name.kind() == "string" {
        return None;
    }
    let segments: Vec<String> = node_text(name, source)
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!segments.is_empty()).then_some(segments)
}

/// `declare global { ... }`
pub(crate) fn is_global_augmentation(node: Node<'_>) -> bool {
    node.kind() == "ambient_declaration"
        && named_children(node)
            .iter()
            .any(|n| n.kind() == "statement_block")
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

pub(crate) fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub(crate) fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token);
    found
}

pub(crate) fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

pub(crate) fn node_text<'s>(node: Node<'_>, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}

pub(crate) fn field_text(node: Node<'_>, field: &str, source: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .map(|n| node_text(n, source).to_string())
}

/// Identifier text, or the unquoted value for string names.
pub(crate) fn name_text(node: Node<'_>, source: &[u8]) -> String {
    match node.kind() {
        "string" => string_value(node, source),
        _ => node_text(node, source).to_string(),
    }
}

pub(crate) fn string_value(node: Node<'_>, source: &[u8]) -> String {
    node_text(node, source)
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}
