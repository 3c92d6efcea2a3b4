//! Query translation: AST to parameterized SQL.
//!
//! Values never reach the SQL text; each fragment carries its own ordered
//! parameter list. Columns are qualified with the `n` alias of `notes`.

use rusqlite::types::Value as SqlValue;

use super::ast::{CompareOp, ParsedQuery, QueryType, SortOrder, Value, WhereClause};
use super::fields::Field;
use crate::error::{NoteGraphError, Result};

/// A piece of SQL with the parameters for its `?` placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// A complete SELECT ready to run against the index.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub sql: String,
    pub params: Vec<SqlValue>,
    /// Resolved output fields, in output order.
    pub fields: Vec<Field>,
    /// Fields read from the SELECT list, after the leading `n.id`.
    pub columns: Vec<Field>,
    /// Whether rows need a follow-up tag fetch.
    pub include_tags: bool,
}

/// Translate a parsed query into a SELECT over `notes`.
///
/// Absent SORT becomes `modified DESC`, absent LIMIT becomes `default_limit`.
pub fn translate(query: &ParsedQuery, default_limit: u64) -> Result<Translation> {
    let mut fields = resolve_fields(query.fields.as_deref())?;
    // Checklist rendering needs the done state.
    if query.query_type == QueryType::Task && !fields.contains(&Field::Verified) {
        fields.push(Field::Verified);
    }
    let columns: Vec<Field> = fields
        .iter()
        .copied()
        .filter(|f| f.column().is_some())
        .collect();
    let include_tags = fields.contains(&Field::Tags);

    let select_list: Vec<String> = std::iter::once("n.id".to_string())
        .chain(
            columns
                .iter()
                .filter_map(|f| f.column())
                .map(|c| format!("n.{}", c)),
        )
        .collect();

    let mut sql = format!("SELECT {} FROM notes n", select_list.join(", "));
    let mut params = Vec::new();
    let mut conditions = Vec::new();

    // Case-sensitive prefix, same as the graph's prefix filters.
    if let Some(prefix) = &query.from {
        conditions.push("substr(n.path, 1, ?) = ?".to_string());
        params.push(SqlValue::Integer(
            i64::try_from(prefix.chars().count()).unwrap_or(i64::MAX),
        ));
        params.push(SqlValue::Text(prefix.clone()));
    }
    if let Some(clause) = &query.where_clause {
        let fragment = translate_where(clause)?;
        conditions.push(fragment.sql);
        params.extend(fragment.params);
    }
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    let (sort_field, order) = match &query.sort {
        Some(sort) => (Field::from_name(&sort.field)?, sort.order),
        None => (Field::Modified, SortOrder::Desc),
    };
    let sort_column = sort_field.column().ok_or_else(|| NoteGraphError::UnsupportedField {
        field: sort_field.name().to_string(),
        usage: "for sorting".to_string(),
    })?;
    sql.push_str(&format!(" ORDER BY n.{} {}", sort_column, order.as_sql()));
    if sort_field != Field::Path {
        sql.push_str(", n.path ASC");
    }

    let limit = query.limit.unwrap_or(default_limit);
    sql.push_str(" LIMIT ?");
    params.push(SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

    Ok(Translation {
        sql,
        params,
        fields,
        columns,
        include_tags,
    })
}

/// Path and title always lead. No requested fields means the default set.
fn resolve_fields(requested: Option<&[String]>) -> Result<Vec<Field>> {
    let mut fields = vec![Field::Path, Field::Title];
    match requested {
        None => fields.extend(Field::DEFAULTS),
        Some(names) => {
            for name in names {
                let field = Field::from_name(name)?;
                if !fields.contains(&field) {
                    fields.push(field);
                }
            }
        }
    }
    Ok(fields)
}

/// Compile a WHERE tree into one fragment.
pub fn translate_where(clause: &WhereClause) -> Result<SqlFragment> {
    let mut params = Vec::new();
    let sql = compile(clause, &mut params)?;
    Ok(SqlFragment { sql, params })
}

fn compile(clause: &WhereClause, params: &mut Vec<SqlValue>) -> Result<String> {
    match clause {
        WhereClause::Comparison {
            field,
            operator,
            value,
        } => {
            let field = Field::from_name(field)?;
            match field.column() {
                Some(column) => {
                    params.push(comparison_param(field, value));
                    Ok(format!("n.{} {} ?", column, operator.as_sql()))
                }
                None => {
                    let negate = match operator {
                        CompareOp::Eq => false,
                        CompareOp::Ne => true,
                        other => {
                            return Err(NoteGraphError::UnsupportedField {
                                field: field.name().to_string(),
                                usage: format!("with operator '{}'", other),
                            })
                        }
                    };
                    params.push(SqlValue::Text(value_text(value)));
                    Ok(tag_membership(negate))
                }
            }
        }
        WhereClause::Contains { field, value } => {
            let field = Field::from_name(field)?;
            match field.column() {
                Some(column) => {
                    params.push(SqlValue::Text(format!("%{}%", escape_like(&value_text(value)))));
                    Ok(format!("n.{} LIKE ? ESCAPE '\\'", column))
                }
                None => {
                    params.push(SqlValue::Text(value_text(value)));
                    Ok(tag_membership(false))
                }
            }
        }
        WhereClause::Logical {
            operator,
            left,
            right,
        } => {
            let left = compile(left, params)?;
            let right = compile(right, params)?;
            Ok(format!("({}) {} ({})", left, operator.as_sql(), right))
        }
    }
}

fn tag_membership(negate: bool) -> String {
    format!(
        "{}EXISTS (SELECT 1 FROM note_tags t WHERE t.note_id = n.id AND t.tag = ? COLLATE NOCASE)",
        if negate { "NOT " } else { "" }
    )
}

/// Only the verified flag stores booleans as integers.
fn comparison_param(field: Field, value: &Value) -> SqlValue {
    match (field, value) {
        (Field::Verified, Value::Boolean(b)) => SqlValue::Integer(i64::from(*b)),
        (_, Value::Number(n)) => SqlValue::Real(*n),
        (_, other) => SqlValue::Text(value_text(other)),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Boolean(b) => b.to_string(),
    }
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
