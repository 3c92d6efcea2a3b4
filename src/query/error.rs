//! Positioned query errors.

use serde::Serialize;
use thiserror::Error;

/// How many bytes of source to show on each side of an error position.
const SNIPPET_RADIUS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryErrorKind {
    /// Unexpected character, unterminated string.
    Lexical,
    /// Unexpected token, duplicate clause, missing token.
    Syntax,
}

impl std::fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryErrorKind::Lexical => write!(f, "Lexical error"),
            QueryErrorKind::Syntax => write!(f, "Syntax error"),
        }
    }
}

/// A lexical or syntax error at a byte offset of the query text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind} at position {position}: {message}{}", snippet_suffix(.snippet))]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub message: String,
    pub position: usize,
    /// Source text around `position`, filled in once the query text is known.
    pub snippet: Option<String>,
}

fn snippet_suffix(snippet: &Option<String>) -> String {
    match snippet {
        Some(s) => format!(" (near '{}')", s),
        None => String::new(),
    }
}

impl QueryError {
    pub fn lexical(message: impl Into<String>, position: usize) -> Self {
        Self {
            kind: QueryErrorKind::Lexical,
            message: message.into(),
            position,
            snippet: None,
        }
    }

    pub fn syntax(message: impl Into<String>, position: usize) -> Self {
        Self {
            kind: QueryErrorKind::Syntax,
            message: message.into(),
            position,
            snippet: None,
        }
    }

    /// Attach a snippet of `source` around the error position.
    pub fn with_source(mut self, source: &str) -> Self {
        let start = floor_boundary(source, self.position.saturating_sub(SNIPPET_RADIUS));
        let end = ceil_boundary(source, (self.position + SNIPPET_RADIUS).min(source.len()));
        let snippet = source[start..end].trim();
        if !snippet.is_empty() {
            self.snippet = Some(snippet.to_string());
        }
        self
    }
}

fn floor_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_position_and_snippet() {
        let err = QueryError::syntax("Expected field name", 11).with_source("LIST WHERE = 3");
        let msg = err.to_string();
        assert!(msg.starts_with("Syntax error at position 11"));
        assert!(msg.contains("near 'LIST WHERE = 3'"));
    }

    #[test]
    fn test_snippet_respects_char_boundaries() {
        let source = "LIST WHERE títle = \"ü\" ~";
        let err = QueryError::lexical("Unexpected character '~'", source.len() - 1)
            .with_source(source);
        assert!(err.snippet.unwrap().ends_with('~'));
    }
}
