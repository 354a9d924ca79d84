//! Cross-file linking: module scopes, imports, exports and namespace members.
//!
//! Built once from every file's `FileBindings` before any tree is lowered.
//! Declarations with the same name in the same scope share one symbol and
//! accumulate declaration sites, which is how merged namespaces, overloads
//! and duplicate script globals end up with several declarations.

use path_clean::PathClean;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::binder::{
    ExportEntry, FileBindings, Imported, DEFAULT_EXPORT, EXPORT_ASSIGNMENT,
};
use super::program::{ProgramBuilder, SymbolId, UnitId};

/// Who a namespace's member table belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Owner {
    /// Script namespaces and `declare global` merge program-wide.
    Global,
    /// Namespaces declared in a module file stay private to it.
    Unit(UnitId),
}

/// Specifier extensions tried in order after the exact path.
const EXTENSIONS: &[&str] = &["ts", "tsx", "d.ts", "js", "jsx", "mts", "cts", "mjs", "cjs"];
const INDEX_FILES: &[&str] = &["index.ts", "index.tsx", "index.d.ts", "index.js", "index.jsx"];

#[derive(Debug)]
pub(crate) struct ProgramScopes {
    global: HashMap<String, SymbolId>,
    module_decls: Vec<HashMap<String, SymbolId>>,
    is_module: Vec<bool>,
    unit_paths: Vec<PathBuf>,
    paths: HashMap<PathBuf, UnitId>,
    exports: Vec<Vec<ExportEntry>>,
    imports: Vec<HashMap<String, (String, Imported)>>,
    linked: Vec<HashMap<String, Option<SymbolId>>>,
    members: HashMap<(Owner, String), HashMap<String, SymbolId>>,
    namespace_paths: HashMap<SymbolId, (Owner, String)>,
    module_symbols: Vec<SymbolId>,
    module_symbol_units: HashMap<SymbolId, UnitId>,
    anonymous: Vec<HashMap<String, SymbolId>>,
}

impl ProgramScopes {
    /// Create every top-level, global and member symbol, then link imports.
    ///
    /// `files` must list every unit of the builder, in `UnitId` order.
    pub(crate) fn link(builder: &mut ProgramBuilder, files: &[(UnitId, &FileBindings)]) -> Self {
        let mut scopes = ProgramScopes {
            global: HashMap::new(),
            module_decls: vec![HashMap::new(); files.len()],
            is_module: files.iter().map(|(_, b)| b.is_module).collect(),
            unit_paths: Vec::with_capacity(files.len()),
            paths: HashMap::new(),
            exports: files.iter().map(|(_, b)| b.exports.clone()).collect(),
            imports: vec![HashMap::new(); files.len()],
            linked: vec![HashMap::new(); files.len()],
            members: HashMap::new(),
            namespace_paths: HashMap::new(),
            module_symbols: Vec::with_capacity(files.len()),
            module_symbol_units: HashMap::new(),
            anonymous: vec![HashMap::new(); files.len()],
        };

        for (unit, _) in files {
            let path = builder.unit_path(*unit).to_path_buf();
            let stem = module_name(&path);
            let symbol = builder.add_symbol(stem);
            builder.declare(symbol, *unit, 1);
            scopes.module_symbols.push(symbol);
            scopes.module_symbol_units.insert(symbol, *unit);
            scopes.paths.insert(path.clean(), *unit);
            scopes.unit_paths.push(path);
        }

        for (unit, bindings) in files {
            scopes.declare_file(builder, *unit, bindings);
        }

        for (unit, bindings) in files {
            for import in &bindings.imports {
                scopes.imports[unit.index()].insert(
                    import.local.clone(),
                    (import.specifier.clone(), import.imported.clone()),
                );
            }
        }

        let mut linked = Vec::with_capacity(files.len());
        for (unit, bindings) in files {
            let table: HashMap<String, Option<SymbolId>> = bindings
                .imports
                .iter()
                .map(|import| {
                    let target = scopes.resolve_import(
                        *unit,
                        &import.specifier,
                        &import.imported,
                        &mut HashSet::new(),
                    );
                    (import.local.clone(), target)
                })
                .collect();
            linked.push(table);
        }
        scopes.linked = linked;
        scopes
    }

    fn declare_file(&mut self, builder: &mut ProgramBuilder, unit: UnitId, bindings: &FileBindings) {
        let local_owner = if bindings.is_module {
            Owner::Unit(unit)
        } else {
            Owner::Global
        };

        for declared in &bindings.top_level {
            let table = if bindings.is_module {
                &mut self.module_decls[unit.index()]
            } else {
                &mut self.global
            };
            let symbol = get_or_create(table, builder, &declared.name);
            builder.declare(symbol, unit, declared.line);
            if let Some(path) = &declared.container {
                self.namespace_paths
                    .insert(symbol, (local_owner.clone(), path.clone()));
            }
        }

        for declared in &bindings.globals {
            let symbol = get_or_create(&mut self.global, builder, &declared.name);
            builder.declare(symbol, unit, declared.line);
            if let Some(path) = &declared.container {
                self.namespace_paths
                    .insert(symbol, (Owner::Global, path.clone()));
            }
        }

        for container in &bindings.containers {
            let owner = if container.global {
                Owner::Global
            } else {
                Owner::Unit(unit)
            };
            for member in &container.members {
                let table = self
                    .members
                    .entry((owner.clone(), container.path.clone()))
                    .or_default();
                let symbol = get_or_create(table, builder, &member.name);
                builder.declare(symbol, unit, member.line);
                if let Some(path) = &member.container {
                    self.namespace_paths
                        .insert(symbol, (owner.clone(), path.clone()));
                }
            }
        }

        for export in &bindings.exports {
            if let ExportEntry::Anonymous { exported, line } = export {
                let symbol = builder.add_symbol(DEFAULT_EXPORT);
                builder.declare(symbol, unit, *line);
                self.anonymous[unit.index()].insert(exported.clone(), symbol);
            }
        }
    }

    pub(crate) fn is_module(&self, unit: UnitId) -> bool {
        self.is_module[unit.index()]
    }

    /// Whether `symbol` stands for a whole module (namespace imports,
    /// `import x = require(..)` without `export =`, `export * as x`).
    pub(crate) fn is_module_symbol(&self, symbol: SymbolId) -> bool {
        self.module_symbol_units.contains_key(&symbol)
    }

    pub(crate) fn global(&self, name: &str) -> Option<SymbolId> {
        self.global.get(name).copied()
    }

    /// A module file's own top-level declarations and its imports.
    pub(crate) fn module_scope(&self, unit: UnitId, name: &str) -> Option<SymbolId> {
        self.module_decls[unit.index()]
            .get(name)
            .copied()
            .or_else(|| self.imported(unit, name))
    }

    /// What an import binding ultimately refers to.
    pub(crate) fn imported(&self, unit: UnitId, local: &str) -> Option<SymbolId> {
        self.linked[unit.index()].get(local).copied().flatten()
    }

    /// `export { name } from "specifier"` seen from `unit`.
    pub(crate) fn reexported(&self, unit: UnitId, specifier: &str, name: &str) -> Option<SymbolId> {
        let target = self.resolve_specifier(unit, specifier)?;
        self.resolve_export(target, name, &mut HashSet::new())
    }

    pub(crate) fn member(&self, owner: &Owner, path: &str, name: &str) -> Option<SymbolId> {
        self.members
            .get(&(owner.clone(), path.to_string()))?
            .get(name)
            .copied()
    }

    /// `container.name`, where `container` is a namespace, an enum or a module.
    pub(crate) fn member_of(&self, container: SymbolId, name: &str) -> Option<SymbolId> {
        if let Some(unit) = self.module_symbol_units.get(&container) {
            return self.resolve_export(*unit, name, &mut HashSet::new());
        }
        let (owner, path) = self.namespace_paths.get(&container)?;
        self.member(owner, path, name)
    }

    /// Where a namespace declared by `symbol` keeps its members.
    pub(crate) fn namespace_path(&self, symbol: SymbolId) -> Option<&(Owner, String)> {
        self.namespace_paths.get(&symbol)
    }

    fn resolve_import(
        &self,
        unit: UnitId,
        specifier: &str,
        imported: &Imported,
        visited: &mut HashSet<(UnitId, String)>,
    ) -> Option<SymbolId> {
        let target = self.resolve_specifier(unit, specifier)?;
        match imported {
            Imported::Named(name) => self.resolve_export(target, name, visited),
            Imported::Default => self.resolve_export(target, DEFAULT_EXPORT, visited),
            Imported::Namespace => Some(self.module_symbols[target.index()]),
            Imported::Require => self
                .resolve_export(target, EXPORT_ASSIGNMENT, visited)
                .or(Some(self.module_symbols[target.index()])),
        }
    }

    fn resolve_export(
        &self,
        unit: UnitId,
        name: &str,
        visited: &mut HashSet<(UnitId, String)>,
    ) -> Option<SymbolId> {
        if !visited.insert((unit, name.to_string())) {
            return None;
        }

        for entry in &self.exports[unit.index()] {
            match entry {
                ExportEntry::Local { exported, local } if exported == name => {
                    return self.module_local(unit, local, visited);
                }
                ExportEntry::From {
                    exported,
                    imported,
                    specifier,
                } if exported == name => {
                    let target = self.resolve_specifier(unit, specifier)?;
                    return self.resolve_export(target, imported, visited);
                }
                ExportEntry::StarAs {
                    exported,
                    specifier,
                } if exported == name => {
                    return self
                        .resolve_specifier(unit, specifier)
                        .map(|target| self.module_symbols[target.index()]);
                }
                ExportEntry::Anonymous { exported, .. } if exported == name => {
                    return self.anonymous[unit.index()].get(name).copied();
                }
                _ => {}
            }
        }

        // `export *` never forwards a default export.
        if name == DEFAULT_EXPORT {
            return None;
        }
        for entry in &self.exports[unit.index()] {
            if let ExportEntry::Star { specifier } = entry {
                let Some(target) = self.resolve_specifier(unit, specifier) else {
                    continue;
                };
                if let Some(symbol) = self.resolve_export(target, name, visited) {
                    return Some(symbol);
                }
            }
        }
        None
    }

    fn module_local(
        &self,
        unit: UnitId,
        local: &str,
        visited: &mut HashSet<(UnitId, String)>,
    ) -> Option<SymbolId> {
        if let Some(symbol) = self.module_decls[unit.index()].get(local) {
            return Some(*symbol);
        }
        if let Some((specifier, imported)) = self.imports[unit.index()].get(local) {
            return self.resolve_import(unit, specifier, imported, visited);
        }
        self.global(local)
    }

    /// Map a relative specifier onto a unit of the program.
    ///
    /// Bare specifiers (packages) are never part of the program.
    pub(crate) fn resolve_specifier(&self, from: UnitId, specifier: &str) -> Option<UnitId> {
        if !is_relative(specifier) {
            return None;
        }
        let dir = self.unit_paths[from.index()].parent()?;
        let base = dir.join(specifier).clean();

        if let Some(unit) = self.paths.get(&base) {
            return Some(*unit);
        }

        // `./x.js` written against `x.ts`
        let swapped: &[&str] = match base.extension().and_then(|e| e.to_str()) {
            Some("js") => &["ts", "tsx", "d.ts"],
            Some("jsx") => &["tsx"],
            Some("mjs") => &["mts", "d.mts"],
            Some("cjs") => &["cts", "d.cts"],
            _ => &[],
        };
        for ext in swapped {
            if let Some(unit) = self.paths.get(&base.with_extension(ext)) {
                return Some(*unit);
            }
        }

        for ext in EXTENSIONS {
            if let Some(unit) = self.paths.get(&with_suffix(&base, ext)) {
                return Some(*unit);
            }
        }
        INDEX_FILES
            .iter()
            .find_map(|index| self.paths.get(&base.join(index)).copied())
    }
}

fn get_or_create(
    table: &mut HashMap<String, SymbolId>,
    builder: &mut ProgramBuilder,
    name: &str,
) -> SymbolId {
    if let Some(symbol) = table.get(name) {
        return *symbol;
    }
    let symbol = builder.add_symbol(name);
    table.insert(name.to_string(), symbol);
    symbol
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(".");
    path.push(ext);
    PathBuf::from(path)
}

/// `src/core.d.ts` -> `core`
fn module_name(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    name.split('.').next().unwrap_or(name).to_string()
}
