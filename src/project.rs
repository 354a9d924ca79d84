//! Project configuration: finding and reading `tsconfig.json`, and turning
//! it into the list of files the program is built from.

use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use path_clean::PathClean;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, SymdepsError};
use crate::frontend::SupportedLanguage;

pub const PROJECT_FILE_NAME: &str = "tsconfig.json";

const DEFAULT_INCLUDE: &str = "**/*";
const DEFAULT_EXCLUDE: &[&str] = &["node_modules", "bower_components", "jspm_packages"];

/// A loaded project: where it lives and which files it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub config_path: PathBuf,
    /// Directory of the configuration file. Relative paths start here.
    pub root_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub allow_js: bool,
}

impl ProjectConfig {
    /// Find and load the project configuration for `start`, which may be
    /// the configuration file itself or any directory below the project.
    pub fn discover(start: &Path) -> Result<Self> {
        let config_path = find_config(start)?;
        Self::load(&config_path)
    }

    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path.to_path_buf().clean();
        let root_dir = config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let merged = MergedConfig::load(&config_path)?;
        let allow_js = merged.allow_js.unwrap_or(false);
        let files = collect_files(&root_dir, &merged, allow_js)?;

        if files.is_empty() {
            return Err(SymdepsError::config(format!(
                "no input files found for {}",
                config_path.display()
            )));
        }
        debug!(
            config = %config_path.display(),
            files = files.len(),
            allow_js,
            "project loaded"
        );
        Ok(Self {
            config_path,
            root_dir,
            files,
            allow_js,
        })
    }

    /// Name of the project directory, used to name the DOT graph.
    pub fn name(&self) -> String {
        self.root_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    }
}

/// `start` itself when it is a file, else the nearest `tsconfig.json` in it
/// or one of its ancestors.
pub fn find_config(start: &Path) -> Result<PathBuf> {
    if start.is_file() {
        return Ok(start.to_path_buf());
    }
    if !start.exists() {
        return Err(SymdepsError::config(format!(
            "{} does not exist",
            start.display()
        )));
    }
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_FILE_NAME))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            SymdepsError::config(format!(
                "no {} found in {} or its parents",
                PROJECT_FILE_NAME,
                start.display()
            ))
        })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Extends {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    extends: Option<Extends>,
    files: Option<Vec<String>>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    compiler_options: Option<RawCompilerOptions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCompilerOptions {
    allow_js: Option<bool>,
}

/// Patterns together with the directory they are relative to.
#[derive(Debug, Clone)]
struct Patterns {
    base: PathBuf,
    patterns: Vec<String>,
}

/// A configuration with its `extends` chain applied. Later files win.
#[derive(Debug, Default)]
struct MergedConfig {
    files: Option<Patterns>,
    include: Option<Patterns>,
    exclude: Option<Patterns>,
    allow_js: Option<bool>,
}

impl MergedConfig {
    fn load(path: &Path) -> Result<Self> {
        let mut merged = MergedConfig::default();
        merged.apply_file(path, &mut HashSet::new())?;
        Ok(merged)
    }

    fn apply_file(&mut self, path: &Path, visited: &mut HashSet<PathBuf>) -> Result<()> {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if !visited.insert(key) {
            return Err(SymdepsError::config(format!(
                "circular extends involving {}",
                path.display()
            )));
        }

        let raw = read_raw(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

        let parents = match &raw.extends {
            Some(Extends::One(parent)) => vec![parent.clone()],
            Some(Extends::Many(parents)) => parents.clone(),
            None => Vec::new(),
        };
        for parent in parents {
            match resolve_extends(&base, &parent) {
                Some(parent_path) => self.apply_file(&parent_path, visited)?,
                None => warn!(
                    config = %path.display(),
                    extends = %parent,
                    "skipping extends entry that is not a relative file"
                ),
            }
        }

        let with_base = |patterns: Vec<String>| Patterns {
            base: base.clone(),
            patterns,
        };
        if let Some(files) = raw.files {
            self.files = Some(with_base(files));
        }
        if let Some(include) = raw.include {
            self.include = Some(with_base(include));
        }
        if let Some(exclude) = raw.exclude {
            self.exclude = Some(with_base(exclude));
        }
        if let Some(allow_js) = raw.compiler_options.and_then(|o| o.allow_js) {
            self.allow_js = Some(allow_js);
        }
        Ok(())
    }
}

fn read_raw(path: &Path) -> Result<RawConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        SymdepsError::config(format!("cannot read {}: {}", path.display(), e))
    })?;
    let content = strip_trailing_commas(&strip_json_comments(&content));
    serde_json::from_str(&content).map_err(|source| SymdepsError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Relative `extends` targets, with `.json` appended when missing. Package
/// names are not resolved.
fn resolve_extends(base: &Path, target: &str) -> Option<PathBuf> {
    if !(target.starts_with("./") || target.starts_with("../") || Path::new(target).is_absolute()) {
        return None;
    }
    let path = base.join(target).clean();
    if path.is_file() || path.extension().is_some() {
        return Some(path);
    }
    let mut with_json = path.into_os_string();
    with_json.push(".json");
    Some(PathBuf::from(with_json))
}

fn collect_files(root_dir: &Path, config: &MergedConfig, allow_js: bool) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    if let Some(explicit) = &config.files {
        for name in &explicit.patterns {
            let path = explicit.base.join(name).clean();
            if !path.is_file() {
                return Err(SymdepsError::config(format!(
                    "file listed in configuration not found: {}",
                    path.display()
                )));
            }
            if SupportedLanguage::from_path(&path).is_none() {
                warn!(file = %path.display(), "skipping file with unsupported extension");
                continue;
            }
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }

    // An explicit `files` list without `include` means nothing else.
    let include = match (&config.include, &config.files) {
        (Some(include), _) => include.clone(),
        (None, Some(_)) => return Ok(files),
        (None, None) => Patterns {
            base: root_dir.to_path_buf(),
            patterns: vec![DEFAULT_INCLUDE.to_string()],
        },
    };
    let exclude = config.exclude.clone().unwrap_or_else(|| Patterns {
        base: root_dir.to_path_buf(),
        patterns: DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect(),
    });

    let overrides = build_overrides(root_dir, &include, &exclude)?;
    let walker = WalkBuilder::new(root_dir)
        .hidden(true)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .overrides(overrides)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.into_path().clean();
        if !is_project_source(&path, allow_js) {
            continue;
        }
        if seen.insert(path.clone()) {
            files.push(path);
        }
    }
    Ok(files)
}

fn is_project_source(path: &Path, allow_js: bool) -> bool {
    SupportedLanguage::from_path(path).is_some()
        && (allow_js || !SupportedLanguage::is_javascript(path))
}

fn build_overrides(root_dir: &Path, include: &Patterns, exclude: &Patterns) -> Result<Override> {
    let mut builder = OverrideBuilder::new(root_dir);
    for pattern in &include.patterns {
        if let Some(glob) = rebase_glob(root_dir, &include.base, pattern, true) {
            builder.add(&glob).map_err(|e| {
                SymdepsError::config(format!("invalid include pattern {:?}: {}", pattern, e))
            })?;
        }
    }
    for pattern in &exclude.patterns {
        if let Some(glob) = rebase_glob(root_dir, &exclude.base, pattern, false) {
            builder.add(&format!("!{}", glob)).map_err(|e| {
                SymdepsError::config(format!("invalid exclude pattern {:?}: {}", pattern, e))
            })?;
        }
    }
    builder
        .build()
        .map_err(|e| SymdepsError::config(format!("invalid file patterns: {}", e)))
}

/// Turn a configuration pattern into a glob relative to the walk root.
///
/// Include patterns naming a directory match everything below it and are
/// anchored at the root. Exclude patterns without a slash match at any depth.
fn rebase_glob(root_dir: &Path, base: &Path, pattern: &str, include: bool) -> Option<String> {
    let trimmed = pattern.trim_start_matches("./").trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    let relative = if base == root_dir {
        trimmed.to_string()
    } else {
        let absolute = base.join(trimmed).clean();
        match absolute.strip_prefix(root_dir) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => {
                warn!(pattern, "skipping pattern outside the project directory");
                return None;
            }
        }
    };

    let last = relative.rsplit('/').next().unwrap_or(&relative);
    let has_wildcard = relative.contains(['*', '?']);
    let glob = if include && !has_wildcard && !last.contains('.') {
        format!("{}/**/*", relative)
    } else {
        relative
    };

    if include || glob.contains('/') {
        Some(format!("/{}", glob.trim_start_matches('/')))
    } else {
        Some(glob)
    }
}

/// Remove `//` and `/* */` comments outside of string literals.
pub(crate) fn strip_json_comments(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        let next = chars.peek().copied();
        match (c, next) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        out.push('\n');
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Drop commas that directly precede `}` or `]`.
pub(crate) fn strip_trailing_commas(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut out = String::with_capacity(content.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn relative(project: &ProjectConfig) -> Vec<String> {
        project
            .files
            .iter()
            .map(|f| {
                f.strip_prefix(&project.root_dir)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_strip_json_comments() {
        let input = r#"{
  // line comment
  "a": "http://not-a-comment", /* block */
  "b": "/* kept */"
}"#;
        let value: serde_json::Value =
            serde_json::from_str(&strip_json_comments(input)).unwrap();
        assert_eq!(value["a"], "http://not-a-comment");
        assert_eq!(value["b"], "/* kept */");
    }

    #[test]
    fn test_strip_trailing_commas() {
        let input = r#"{ "a": [1, 2,], "b": ",}", }"#;
        let value: serde_json::Value =
            serde_json::from_str(&strip_trailing_commas(input)).unwrap();
        assert_eq!(value["a"], serde_json::json!([1, 2]));
        assert_eq!(value["b"], ",}");
    }

    #[test]
    fn test_default_include_and_exclude() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(&root.join("tsconfig.json"), "{ // all defaults\n }");
        write(&root.join("src/b.ts"), "");
        write(&root.join("src/a.ts"), "");
        write(&root.join("src/types.d.ts"), "");
        write(&root.join("src/legacy.js"), "");
        write(&root.join("node_modules/pkg/index.ts"), "");
        write(&root.join("README.md"), "");

        let project = ProjectConfig::discover(root).unwrap();
        assert_eq!(
            relative(&project),
            vec!["src/a.ts", "src/b.ts", "src/types.d.ts"]
        );
        assert!(!project.allow_js);
        assert_eq!(project.name(), root.file_name().unwrap().to_string_lossy());
    }

    #[test]
    fn test_discovers_config_in_ancestor() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(&root.join("tsconfig.json"), "{}");
        write(&root.join("src/deep/x.ts"), "");

        let found = find_config(&root.join("src/deep")).unwrap();
        assert_eq!(found, root.join("tsconfig.json"));
    }

    #[test]
    fn test_files_include_exclude_and_allow_js() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            &root.join("tsconfig.json"),
            r#"{
                "compilerOptions": { "allowJs": true },
                "files": ["extra/entry.ts"],
                "include": ["src"],
                "exclude": ["src/generated"],
            }"#,
        );
        write(&root.join("extra/entry.ts"), "");
        write(&root.join("extra/ignored.ts"), "");
        write(&root.join("src/main.ts"), "");
        write(&root.join("src/util.js"), "");
        write(&root.join("src/generated/out.ts"), "");

        let project = ProjectConfig::load(&root.join("tsconfig.json")).unwrap();
        assert_eq!(
            relative(&project),
            vec!["extra/entry.ts", "src/main.ts", "src/util.js"]
        );
        assert!(project.allow_js);
    }

    #[test]
    fn test_extends_chain() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            &root.join("config/base.json"),
            r#"{ "compilerOptions": { "allowJs": true }, "include": ["../app/lib"] }"#,
        );
        write(
            &root.join("app/tsconfig.json"),
            r#"{ "extends": "../config/base" }"#,
        );
        write(&root.join("app/lib/a.js"), "");
        write(&root.join("app/other/b.ts"), "");

        let project = ProjectConfig::load(&root.join("app/tsconfig.json")).unwrap();
        assert_eq!(relative(&project), vec!["lib/a.js"]);
    }

    #[test]
    fn test_circular_extends_is_an_error() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(&root.join("a.json"), r#"{ "extends": "./b.json" }"#);
        write(&root.join("b.json"), r#"{ "extends": "./a.json" }"#);

        let err = ProjectConfig::load(&root.join("a.json")).unwrap_err();
        assert!(matches!(err, SymdepsError::Config(msg) if msg.contains("circular")));
    }

    #[test]
    fn test_configuration_errors() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        assert!(matches!(
            find_config(&root.join("missing")),
            Err(SymdepsError::Config(_))
        ));

        write(&root.join("tsconfig.json"), "{ not json");
        assert!(matches!(
            ProjectConfig::discover(root),
            Err(SymdepsError::Json { .. })
        ));

        write(&root.join("tsconfig.json"), "{}");
        assert!(matches!(
            ProjectConfig::discover(root),
            Err(SymdepsError::Config(msg)) if msg.contains("no input files")
        ));

        write(&root.join("tsconfig.json"), r#"{ "files": ["gone.ts"] }"#);
        assert!(matches!(
            ProjectConfig::discover(root),
            Err(SymdepsError::Config(msg)) if msg.contains("not found")
        ));
    }

    #[test]
    fn test_rebase_glob() {
        let root = Path::new("/p");
        assert_eq!(rebase_glob(root, root, "src", true).as_deref(), Some("/src/**/*"));
        assert_eq!(rebase_glob(root, root, "./src/", true).as_deref(), Some("/src/**/*"));
        assert_eq!(rebase_glob(root, root, "**/*", true).as_deref(), Some("/**/*"));
        assert_eq!(rebase_glob(root, root, "node_modules", false).as_deref(), Some("node_modules"));
        assert_eq!(
            rebase_glob(root, Path::new("/p/config"), "../lib", true).as_deref(),
            Some("/lib/**/*")
        );
        assert_eq!(rebase_glob(root, Path::new("/elsewhere"), "x", true), None);
    }
}
