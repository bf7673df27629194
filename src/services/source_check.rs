//! Syntax checks for deliverable source files.

use std::path::Path;

use serde::Deserialize;

/// Source languages the parse gate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Rust,
    Json,
    Yaml,
    Toml,
    /// Checked with an external interpreter.
    Python,
}

impl SourceKind {
    /// Classify by extension. `None` means the file is not source code.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "rs" => Some(Self::Rust),
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "py" => Some(Self::Python),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Python => "python",
        }
    }

    pub fn is_in_process(&self) -> bool {
        !matches!(self, Self::Python)
    }
}

/// Parse `source` in-process. Returns the parser's message on failure.
///
/// Python is not handled here and always returns `Ok`.
pub fn check_in_process(kind: SourceKind, source: &str) -> Result<(), String> {
    match kind {
        SourceKind::Rust => syn::parse_file(source).map(drop).map_err(|e| e.to_string()),
        SourceKind::Json => serde_json::from_str::<serde_json::Value>(source)
            .map(drop)
            .map_err(|e| e.to_string()),
        SourceKind::Yaml => {
            for document in serde_yaml::Deserializer::from_str(source) {
                serde_yaml::Value::deserialize(document).map_err(|e| e.to_string())?;
            }
            Ok(())
        }
        SourceKind::Toml => toml::from_str::<toml::Table>(source)
            .map(drop)
            .map_err(|e| e.to_string().trim().to_string()),
        SourceKind::Python => Ok(()),
    }
}
