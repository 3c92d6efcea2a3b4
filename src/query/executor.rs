//! Query execution against the note index.
//!
//! Translation and both reads (rows, then tags) happen inside one snapshot.
//! The executor is format-agnostic: it returns structured rows plus the
//! resolved field list and leaves presentation to `format`.

use std::collections::BTreeMap;

use rusqlite::types::ValueRef;
use serde::Serialize;
use tracing::debug;

use super::ast::{ParsedQuery, QueryType};
use super::fields::{Field, FieldKind};
use super::translate::translate;
use crate::error::Result;
use crate::index::NoteIndex;

pub const DEFAULT_LIMIT: u64 = 100;

#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    /// Row cap applied when the query has no LIMIT clause.
    pub default_limit: u64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
        }
    }
}

/// A single cell in a result row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_bool(&self) -> bool {
        matches!(self, FieldValue::Bool(true))
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

/// Row keyed by canonical field name.
pub type QueryRow = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub query_type: QueryType,
    /// Resolved field names, in output order.
    pub fields: Vec<String>,
    pub rows: Vec<QueryRow>,
    pub total: usize,
}

/// Execute a parsed query.
pub fn execute(index: &NoteIndex, query: &ParsedQuery, options: &QueryOptions) -> Result<QueryResult> {
    let translation = translate(query, options.default_limit)?;
    debug!(
        sql = %translation.sql,
        params = translation.params.len(),
        "executing query"
    );

    let snapshot = index.snapshot()?;
    let columns = &translation.columns;
    let fetched: Vec<(i64, QueryRow)> = snapshot.query_rows(
        &translation.sql,
        rusqlite::params_from_iter(translation.params.iter()),
        |row| {
            let id: i64 = row.get(0)?;
            let mut out = QueryRow::new();
            for (i, field) in columns.iter().enumerate() {
                let value = cell_value(*field, row.get_ref(i + 1)?);
                out.insert(field.name().to_string(), value);
            }
            Ok((id, out))
        },
    )?;

    let mut rows = Vec::with_capacity(fetched.len());
    if translation.include_tags {
        let ids: Vec<i64> = fetched.iter().map(|(id, _)| *id).collect();
        let mut tags = snapshot.tags_for(&ids)?;
        for (id, mut row) in fetched {
            let list = tags.remove(&id).unwrap_or_default();
            row.insert(Field::Tags.name().to_string(), FieldValue::List(list));
            rows.push(row);
        }
    } else {
        rows.extend(fetched.into_iter().map(|(_, row)| row));
    }

    let total = rows.len();
    debug!(rows = total, "query complete");
    Ok(QueryResult {
        query_type: query.query_type,
        fields: translation.fields.iter().map(|f| f.name().to_string()).collect(),
        rows,
        total,
    })
}

fn cell_value(field: Field, raw: ValueRef<'_>) -> FieldValue {
    match (field.kind(), raw) {
        (_, ValueRef::Null) => FieldValue::Null,
        (FieldKind::Boolean, ValueRef::Integer(i)) => FieldValue::Bool(i != 0),
        (_, ValueRef::Integer(i)) => FieldValue::Number(i as f64),
        (_, ValueRef::Real(r)) => FieldValue::Number(r),
        (_, ValueRef::Text(bytes)) | (_, ValueRef::Blob(bytes)) => {
            FieldValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NoteGraphError;
    use crate::index::IndexedNote;
    use crate::query::parser::parse_query;

    fn note(path: &str, title: &str, note_type: &str, modified: &str) -> IndexedNote {
        let mut n = IndexedNote::new(path, title);
        n.meta.note_type = Some(note_type.to_string());
        n.meta.modified = Some(modified.to_string());
        n
    }

    fn fixture() -> NoteIndex {
        let mut index = NoteIndex::open_in_memory().unwrap();
        let mut a = note("research/alpha.md", "Alpha", "research", "2024-01-03T00:00:00Z")
            .with_tags(["rust", "db"]);
        a.meta.confidence = Some(0.9);
        a.meta.verified = true;
        a.content = "SQLite internals".to_string();
        let mut b = note("research/beta.md", "Beta", "research", "2024-01-02T00:00:00Z")
            .with_tags(["rust"]);
        b.meta.confidence = Some(0.4);
        let c = note("daily/2024-01-01.md", "Monday", "daily", "2024-01-01T00:00:00Z");
        index.upsert_notes(&[a, b, c]).unwrap();
        index
    }

    fn run(index: &NoteIndex, text: &str) -> Result<QueryResult> {
        execute(index, &parse_query(text).unwrap(), &QueryOptions::default())
    }

    fn paths(result: &QueryResult) -> Vec<String> {
        result.rows.iter().map(|r| r["path"].to_string()).collect()
    }

    #[test]
    fn test_list_defaults_sort_by_modified_desc() {
        let index = fixture();
        let result = run(&index, "LIST").unwrap();
        assert_eq!(
            paths(&result),
            vec!["research/alpha.md", "research/beta.md", "daily/2024-01-01.md"]
        );
        assert_eq!(result.total, 3);
        assert_eq!(
            result.fields,
            vec!["path", "title", "type", "created", "modified", "tags"]
        );
        assert_eq!(
            result.rows[0]["tags"],
            FieldValue::List(vec!["db".to_string(), "rust".to_string()])
        );
        assert_eq!(result.rows[2]["tags"], FieldValue::List(vec![]));
    }

    #[test]
    fn test_table_with_where_and_sort() {
        let index = fixture();
        let result = run(
            &index,
            r#"TABLE title, confidence FROM "research" WHERE verified = false SORT confidence DESC LIMIT 10"#,
        )
        .unwrap();
        assert_eq!(paths(&result), vec!["research/beta.md"]);
        assert_eq!(result.rows[0]["confidence"], FieldValue::Number(0.4));
        assert!(!result.rows[0].contains_key("tags"));
    }

    #[test]
    fn test_contains_tags_and_content() {
        let index = fixture();
        let result = run(&index, r#"LIST WHERE CONTAINS(tags, "RUST") SORT path"#).unwrap();
        assert_eq!(paths(&result), vec!["research/alpha.md", "research/beta.md"]);

        let result = run(&index, r#"LIST WHERE CONTAINS(content, "internals")"#).unwrap();
        assert_eq!(paths(&result), vec!["research/alpha.md"]);
    }

    #[test]
    fn test_from_prefix_is_case_sensitive() {
        let mut index = fixture();
        index
            .upsert_note(&note("Research/gamma.md", "Gamma", "research", "2024-01-04T00:00:00Z"))
            .unwrap();

        let result = run(&index, r#"LIST FROM "Research""#).unwrap();
        assert_eq!(paths(&result), vec!["Research/gamma.md"]);

        let result = run(&index, r#"LIST FROM "research/" SORT path"#).unwrap();
        assert_eq!(paths(&result), vec!["research/alpha.md", "research/beta.md"]);
    }

    #[test]
    fn test_boolean_field_maps_back() {
        let index = fixture();
        let result = run(&index, "TABLE verified WHERE confidence >= 0.9").unwrap();
        assert_eq!(result.rows[0]["verified"], FieldValue::Bool(true));
    }

    #[test]
    fn test_limit_and_bare_identifier_value() {
        let index = fixture();
        let result = run(&index, "LIST WHERE type = research LIMIT 1").unwrap();
        assert_eq!(paths(&result), vec!["research/alpha.md"]);
    }

    #[test]
    fn test_unknown_field_never_returns_rows() {
        let index = fixture();
        let err = run(&index, "TABLE author").unwrap_err();
        assert!(matches!(err, NoteGraphError::UnknownField { ref field, .. } if field == "author"));
    }

    #[test]
    fn test_default_limit_from_options() {
        let index = fixture();
        let options = QueryOptions { default_limit: 2 };
        let result = execute(&index, &parse_query("LIST").unwrap(), &options).unwrap();
        assert_eq!(result.total, 2);
    }
}
