//! Tool settings loaded from `symdeps.toml`.
//!
//! ```toml
//! [report]
//! truncate_width = 70
//!
//! [graph]
//! label_threshold = 5
//! suffix = "core.ts"
//! name = "compiler"
//! ```
//!
//! Every key is optional. Command-line flags override file values.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, SymdepsError};

/// Default file name, looked up next to the project configuration.
pub const CONFIG_FILE_NAME: &str = "symdeps.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SymdepsConfig {
    pub report: ReportConfig,
    pub graph: GraphConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Symbol lists wider than this are cut with `...`.
    pub truncate_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { truncate_width: 70 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Edges with more symbols than this are labelled with a count.
    pub label_threshold: usize,
    /// Only units whose path ends with this are drawn with their edges.
    pub suffix: String,
    /// Graph name; the project directory name when unset.
    pub name: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            label_threshold: 5,
            suffix: ".ts".to_string(),
            name: None,
        }
    }
}

impl SymdepsConfig {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no tool config, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents).map_err(|source| SymdepsError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = SymdepsConfig::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, SymdepsConfig::default());
        assert_eq!(config.report.truncate_width, 70);
        assert_eq!(config.graph.label_threshold, 5);
        assert_eq!(config.graph.suffix, ".ts");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[graph]\nsuffix = \"core.ts\"\nname = \"compiler\"\n").unwrap();

        let config = SymdepsConfig::load(&path).unwrap();
        assert_eq!(config.graph.suffix, "core.ts");
        assert_eq!(config.graph.name.as_deref(), Some("compiler"));
        assert_eq!(config.graph.label_threshold, 5);
        assert_eq!(config.report, ReportConfig::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[report]\ntruncate_width = \"wide\"\n").unwrap();

        let err = SymdepsConfig::load(&path).unwrap_err();
        assert!(matches!(err, SymdepsError::Toml { .. }));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(SymdepsConfig::parse("[graph]\nthreshold = 3\n").is_err());
    }
}
