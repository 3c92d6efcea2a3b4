//! Queryable fields.
//!
//! The allow-list is the `Field` enum itself. Anything that does not parse
//! into a `Field` is rejected, there is no fallthrough to raw columns.

use serde::Serialize;

use crate::error::{NoteGraphError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Path,
    Title,
    Type,
    Created,
    Modified,
    Source,
    Confidence,
    Verified,
    Tags,
    Content,
}

/// How a column's SQLite value maps back into a row value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    List,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Path,
        Field::Title,
        Field::Type,
        Field::Created,
        Field::Modified,
        Field::Source,
        Field::Confidence,
        Field::Verified,
        Field::Tags,
        Field::Content,
    ];

    /// Populated when a query names no fields, alongside path and title.
    pub const DEFAULTS: [Field; 4] = [Field::Type, Field::Created, Field::Modified, Field::Tags];

    /// Resolve a field name or alias. Matching ignores ASCII case.
    pub fn from_name(name: &str) -> Result<Field> {
        let field = match name.to_ascii_lowercase().as_str() {
            "path" | "file.path" => Field::Path,
            "title" => Field::Title,
            "type" => Field::Type,
            "created" | "file.ctime" => Field::Created,
            "modified" | "file.mtime" => Field::Modified,
            "source" => Field::Source,
            "confidence" => Field::Confidence,
            "verified" => Field::Verified,
            "tags" | "file.tags" => Field::Tags,
            "content" => Field::Content,
            _ => {
                return Err(NoteGraphError::UnknownField {
                    field: name.to_string(),
                    supported: Self::supported_names(),
                })
            }
        };
        Ok(field)
    }

    /// Every accepted spelling, canonical names first.
    pub fn supported_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Self::ALL.iter().map(|f| f.name()).collect();
        names.extend(["file.path", "file.ctime", "file.mtime", "file.tags"]);
        names
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Path => "path",
            Field::Title => "title",
            Field::Type => "type",
            Field::Created => "created",
            Field::Modified => "modified",
            Field::Source => "source",
            Field::Confidence => "confidence",
            Field::Verified => "verified",
            Field::Tags => "tags",
            Field::Content => "content",
        }
    }

    /// Column in the `notes` table. Tags live in `note_tags` instead.
    pub fn column(self) -> Option<&'static str> {
        match self {
            Field::Path => Some("path"),
            Field::Title => Some("title"),
            Field::Type => Some("type"),
            Field::Created => Some("created"),
            Field::Modified => Some("modified"),
            Field::Source => Some("source"),
            Field::Confidence => Some("confidence"),
            Field::Verified => Some("verified"),
            Field::Content => Some("content"),
            Field::Tags => None,
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Confidence => FieldKind::Number,
            Field::Verified => FieldKind::Boolean,
            Field::Tags => FieldKind::List,
            Field::Path
            | Field::Title
            | Field::Type
            | Field::Created
            | Field::Modified
            | Field::Source
            | Field::Content => FieldKind::Text,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
