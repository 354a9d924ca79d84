//! Error types for symdeps.
//!
//! Only configuration and program construction can fail. Once a `Program`
//! exists, dependency extraction and rendering are infallible.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for symdeps operations.
#[derive(Debug, Error)]
pub enum SymdepsError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A source file could not be read while building the program.
    #[error("failed to read {path}: {source}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Project or tool configuration could not be found or understood.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed JSON in a project configuration file.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Malformed TOML in a tool configuration file.
    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A report could not be encoded as JSON.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// tree-sitter could not produce a tree for a file.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The file extension has no grammar.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// A path named on the command line is not part of the program.
    #[error("file is not part of the program: {0}")]
    UnknownUnit(String),
}

impl SymdepsError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        SymdepsError::Config(msg.into())
    }
}

/// Result type alias for symdeps operations.
pub type Result<T> = std::result::Result<T, SymdepsError>;
