//! Builds a `Program` from source files.
//!
//! Reading, parsing and the per-file binding pass run in parallel with
//! rayon. Linking and lowering then run once, in file order, so unit and
//! symbol ids are identical from run to run.

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tree_sitter::{Parser, Tree};

use super::binder::{bind_file, FileBindings};
use super::language::{is_declaration_file, SupportedLanguage};
use super::program::{Frontend, Program, ProgramBuilder, UnitId};
use super::resolver::lower_unit;
use super::scopes::ProgramScopes;
use crate::error::{Result, SymdepsError};
use crate::project::ProjectConfig;

struct ParsedFile {
    path: PathBuf,
    source: String,
    tree: Tree,
    bindings: FileBindings,
}

/// Load every file a project configuration names.
pub fn load_program(project: &ProjectConfig) -> Result<Program> {
    build_program(&project.root_dir, &project.files)
}

/// Read `files` from disk and build a program rooted at `root_dir`.
pub fn build_program(root_dir: &Path, files: &[PathBuf]) -> Result<Program> {
    let sources = files
        .par_iter()
        .map(|path| {
            fs::read_to_string(path)
                .map(|text| (path.clone(), text))
                .map_err(|source| SymdepsError::ReadSource {
                    path: path.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>>>()?;
    build_program_from_sources(root_dir, sources)
}

/// Build a program from in-memory sources, in the given order.
pub fn build_program_from_sources(
    root_dir: impl Into<PathBuf>,
    sources: Vec<(PathBuf, String)>,
) -> Result<Program> {
    let parsed = sources
        .into_par_iter()
        .map(|(path, source)| parse_file(path, source))
        .collect::<Result<Vec<_>>>()?;

    let mut builder = ProgramBuilder::new(root_dir);
    let units: Vec<UnitId> = parsed
        .iter()
        .map(|file| builder.add_unit(file.path.clone(), is_declaration_file(&file.path)))
        .collect();

    let bindings: Vec<(UnitId, &FileBindings)> = units
        .iter()
        .zip(&parsed)
        .map(|(unit, file)| (*unit, &file.bindings))
        .collect();
    let scopes = ProgramScopes::link(&mut builder, &bindings);

    for (unit, file) in units.iter().zip(&parsed) {
        lower_unit(
            &mut builder,
            &scopes,
            *unit,
            file.tree.root_node(),
            file.source.as_bytes(),
        );
    }

    let program = builder.build();
    info!(
        units = program.units().len(),
        nodes = program.node_count(),
        symbols = program.symbol_count(),
        "program built"
    );
    Ok(program)
}

fn parse_file(path: PathBuf, source: String) -> Result<ParsedFile> {
    let language = SupportedLanguage::from_path(&path)
        .ok_or_else(|| SymdepsError::UnsupportedLanguage(path.display().to_string()))?;

    let mut parser = Parser::new();
    parser
        .set_language(&language.tree_sitter_language())
        .map_err(|e| SymdepsError::Parse(format!("{}: {}", path.display(), e)))?;
    let tree = parser.parse(&source, None).ok_or_else(|| {
        SymdepsError::Parse(format!("{}: parser produced no tree", path.display()))
    })?;

    let bindings = bind_file(tree.root_node(), source.as_bytes());
    debug!(
        file = %path.display(),
        language = language.name(),
        module = bindings.is_module,
        declarations = bindings.top_level.len(),
        imports = bindings.imports.len(),
        "parsed"
    );

    Ok(ParsedFile {
        path,
        source,
        tree,
        bindings,
    })
}
