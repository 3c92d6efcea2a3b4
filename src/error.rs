//! Crate error type.
//!
//! Query errors carry a source position. Store errors pass through
//! untouched: nothing here knows how to recover from a broken index.

use std::path::PathBuf;

use thiserror::Error;

use crate::query::QueryError;

/// Errors returned by notegraph operations.
#[derive(Debug, Error)]
pub enum NoteGraphError {
    /// Malformed query text (lexical or syntax).
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A field outside the allow-list was requested.
    #[error("Unknown field '{field}'. Supported fields: {}", .supported.join(", "))]
    UnknownField {
        field: String,
        supported: Vec<&'static str>,
    },

    /// A known field used somewhere it has no meaning.
    #[error("Field '{field}' cannot be used {usage}")]
    UnsupportedField { field: String, usage: String },

    #[error(transparent)]
    Store(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid frontmatter in {}: {source}", .path.display())]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, NoteGraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_field_lists_supported() {
        let err = NoteGraphError::UnknownField {
            field: "colour".to_string(),
            supported: vec!["path", "title"],
        };
        let msg = err.to_string();
        assert!(msg.contains("'colour'"));
        assert!(msg.contains("path, title"));
    }
}
