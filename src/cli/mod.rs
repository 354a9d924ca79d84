//! CLI module for symdeps.
//!
//! Commands:
//! - Text: report
//! - Graphviz: graph
//! - JSON: deps, json
//! - Summary: stats
//!
//! `execute` builds the whole output as a `String`; the binary prints it once.

use clap::{Parser, Subcommand};
use path_clean::PathClean;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::config::{SymdepsConfig, CONFIG_FILE_NAME};
use crate::deps::DependencySource;
use crate::error::{Result, SymdepsError};
use crate::frontend::{load_program, Program, UnitId};
use crate::project::ProjectConfig;
use crate::report::{
    is_graph_unit, render_dot, render_graph_json, render_ranked, render_unit_json, DotOptions,
    FileGraph, RankedOptions, UnitDependencies,
};

#[derive(Debug, Parser)]
#[command(name = "symdeps")]
#[command(about = "File-level symbol dependency graphs for TypeScript projects")]
pub struct Cli {
    /// tsconfig.json, or a directory to search upward from
    #[arg(short, long, global = true, default_value = ".")]
    pub project: PathBuf,

    /// Tool settings (default: symdeps.toml next to the project config)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging on stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Units ranked by fan-out, with the symbols behind each edge
    Report {
        /// Keep program order instead of sorting by fan-out
        #[arg(long)]
        unsorted: bool,

        /// Walk every unit again instead of reusing results
        #[arg(long)]
        no_cache: bool,

        /// Maximum width of a symbol list
        #[arg(short, long)]
        width: Option<usize>,
    },

    /// Graphviz DOT description of the selected units
    Graph {
        /// Only units whose path ends with this are drawn
        #[arg(short, long)]
        suffix: Option<String>,

        /// Graph name (default: project directory name)
        #[arg(short, long)]
        name: Option<String>,

        /// Edges with more symbols than this show a count
        #[arg(short, long)]
        threshold: Option<usize>,
    },

    /// One unit's dependencies and dependents as JSON
    Deps {
        /// Path of the unit; its dependents are listed too
        file: PathBuf,
    },

    /// The whole dependency graph as JSON
    Json,

    /// Unit, symbol and edge counts
    Stats,
}

/// Load the project named on the command line and render the command.
pub fn execute(cli: &Cli) -> Result<String> {
    let start = cli
        .project
        .canonicalize()
        .unwrap_or_else(|_| cli.project.clone());
    let project = ProjectConfig::discover(&start)?;
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| project.root_dir.join(CONFIG_FILE_NAME));
    let settings = SymdepsConfig::load(&config_path)?;
    let program = load_program(&project)?;
    run_command(&cli.command, &project, &settings, &program)
}

/// Render `command` for an already loaded program.
pub fn run_command(
    command: &Commands,
    project: &ProjectConfig,
    settings: &SymdepsConfig,
    program: &Program,
) -> Result<String> {
    match command {
        Commands::Report {
            unsorted,
            no_cache,
            width,
        } => {
            let options = RankedOptions {
                sorted: !unsorted,
                width: width.unwrap_or(settings.report.truncate_width),
            };
            let mut source = DependencySource::new(program, !no_cache);
            Ok(render_ranked(&mut source, &options))
        }

        Commands::Graph {
            suffix,
            name,
            threshold,
        } => {
            let suffix = suffix.as_deref().unwrap_or(&settings.graph.suffix);
            let options = DotOptions {
                name: name
                    .clone()
                    .or_else(|| settings.graph.name.clone())
                    .unwrap_or_else(|| project.name()),
                label_threshold: threshold.unwrap_or(settings.graph.label_threshold),
            };
            let mut source = DependencySource::new(program, true);
            let graph = FileGraph::build_selected(&mut source, program.root_dir(), |unit| {
                is_graph_unit(unit, suffix)
            });
            Ok(render_dot(&graph, &options))
        }

        Commands::Deps { file } => {
            let unit = find_unit(program, file)?;
            let mut source = DependencySource::new(program, true);
            let graph = FileGraph::build(&mut source, program.root_dir());
            render_unit_json(&UnitDependencies::new(&graph, unit))
        }

        Commands::Json => {
            let mut source = DependencySource::new(program, true);
            let graph = FileGraph::build(&mut source, program.root_dir());
            render_graph_json(&graph)
        }

        Commands::Stats => {
            let mut source = DependencySource::new(program, true);
            let stats = FileGraph::build(&mut source, program.root_dir()).stats();
            let mut out = String::new();
            let _ = writeln!(out, "units: {}", stats.units);
            let _ = writeln!(out, "declaration-only units: {}", stats.declaration_only);
            let _ = writeln!(out, "symbols: {}", program.symbol_count());
            let _ = writeln!(out, "edges: {}", stats.edges);
            let _ = writeln!(out, "symbol references: {}", stats.symbol_references);
            let _ = write!(out, "max fan-out: {}", stats.max_fan_out);
            Ok(out)
        }
    }
}

/// Match a command-line path against the program's units: as given, then
/// relative to the project directory, then relative to the working directory.
pub fn find_unit(program: &Program, file: &Path) -> Result<UnitId> {
    let mut candidates = vec![file.to_path_buf().clean(), program.root_dir().join(file).clean()];
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(file).clean());
    }
    if let Ok(canonical) = file.canonicalize() {
        candidates.push(canonical);
    }
    candidates
        .iter()
        .find_map(|candidate| program.unit_by_path(candidate))
        .ok_or_else(|| SymdepsError::UnknownUnit(file.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ProgramBuilder;

    #[test]
    fn test_parses_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "symdeps", "report", "--unsorted", "--no-cache", "-w", "40", "--project", "app",
        ])
        .unwrap();

        assert_eq!(cli.project, PathBuf::from("app"));
        match cli.command {
            Commands::Report {
                unsorted,
                no_cache,
                width,
            } => {
                assert!(unsorted);
                assert!(no_cache);
                assert_eq!(width, Some(40));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_graph_defaults() {
        let cli = Cli::try_parse_from(["symdeps", "graph"]).unwrap();
        assert_eq!(cli.project, PathBuf::from("."));
        assert!(matches!(
            cli.command,
            Commands::Graph {
                suffix: None,
                name: None,
                threshold: None
            }
        ));
        assert!(Cli::try_parse_from(["symdeps"]).is_err());
    }

    #[test]
    fn test_find_unit() {
        let mut builder = ProgramBuilder::new("/proj");
        let unit = builder.add_unit("/proj/src/a.ts", false);
        let program = builder.build();

        assert_eq!(find_unit(&program, Path::new("/proj/src/a.ts")).unwrap(), unit);
        assert_eq!(find_unit(&program, Path::new("src/a.ts")).unwrap(), unit);
        assert_eq!(find_unit(&program, Path::new("./src/../src/a.ts")).unwrap(), unit);
        assert!(matches!(
            find_unit(&program, Path::new("src/missing.ts")),
            Err(SymdepsError::UnknownUnit(_))
        ));
    }
}
