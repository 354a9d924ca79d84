//! Language detection and tree-sitter grammar loading.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tree_sitter::Language;

/// Supported source languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportedLanguage {
    TypeScript,
    Tsx,
    JavaScript,
}

impl SupportedLanguage {
    /// Detect language from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "ts" | "mts" | "cts" => Some(SupportedLanguage::TypeScript),
            "tsx" | "jsx" => Some(SupportedLanguage::Tsx),
            "js" | "mjs" | "cjs" => Some(SupportedLanguage::JavaScript),
            _ => None,
        }
    }

    /// Get the tree-sitter Language for this language.
    pub fn tree_sitter_language(&self) -> Language {
        match self {
            SupportedLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SupportedLanguage::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            SupportedLanguage::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }

    /// Get the display name.
    pub fn name(&self) -> &'static str {
        match self {
            SupportedLanguage::TypeScript => "TypeScript",
            SupportedLanguage::Tsx => "TSX",
            SupportedLanguage::JavaScript => "JavaScript",
        }
    }

    /// JavaScript sources only join the program when `allowJs` is set.
    pub fn is_javascript(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("js" | "mjs" | "cjs" | "jsx")
        )
    }
}

/// `.d.ts` files only declare shapes for other code.
pub fn is_declaration_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| {
            name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_typescript_family() {
        assert_eq!(
            SupportedLanguage::from_path(Path::new("src/core.ts")),
            Some(SupportedLanguage::TypeScript)
        );
        assert_eq!(
            SupportedLanguage::from_path(Path::new("lib.d.ts")),
            Some(SupportedLanguage::TypeScript)
        );
        assert_eq!(
            SupportedLanguage::from_path(Path::new("App.tsx")),
            Some(SupportedLanguage::Tsx)
        );
        assert_eq!(
            SupportedLanguage::from_path(Path::new("index.mjs")),
            Some(SupportedLanguage::JavaScript)
        );
        assert_eq!(SupportedLanguage::from_path(Path::new("main.rs")), None);
        assert_eq!(SupportedLanguage::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_declaration_files() {
        assert!(is_declaration_file(Path::new("types/lib.d.ts")));
        assert!(is_declaration_file(Path::new("esm.d.mts")));
        assert!(!is_declaration_file(Path::new("src/d.ts")));
        assert!(!is_declaration_file(Path::new("src/types.ts")));
    }

    #[test]
    fn test_javascript_gate() {
        assert!(SupportedLanguage::is_javascript(Path::new("a.js")));
        assert!(SupportedLanguage::is_javascript(Path::new("a.jsx")));
        assert!(!SupportedLanguage::is_javascript(Path::new("a.ts")));
    }
}
