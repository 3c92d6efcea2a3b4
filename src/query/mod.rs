//! Query module: a small declarative language over the note index.
//!
//! ## Pipeline
//!
//! ```ignore
//! tokenize(text) -> parse(tokens) -> translate(ast) -> execute(index)
//! ```
//!
//! ```ignore
//! let result = execute_query(&index, r#"TABLE title, confidence FROM "research" SORT confidence DESC"#, &QueryOptions::default())?;
//! println!("{}", render(&result));
//! ```

pub mod ast;
pub mod error;
pub mod executor;
pub mod fields;
pub mod format;
pub mod parser;
pub mod token;
pub mod translate;

pub use ast::{CompareOp, LogicalOp, ParsedQuery, QueryType, SortClause, SortOrder, Value, WhereClause};
pub use error::{QueryError, QueryErrorKind};
pub use executor::{execute, FieldValue, QueryOptions, QueryResult, QueryRow, DEFAULT_LIMIT};
pub use fields::Field;
pub use format::render;
pub use parser::parse_query;
pub use token::{tokenize, Token, TokenKind};

use crate::error::Result;
use crate::index::NoteIndex;

/// Parse and run a query string in one step.
pub fn execute_query(index: &NoteIndex, text: &str, options: &QueryOptions) -> Result<QueryResult> {
    let parsed = parse_query(text)?;
    execute(index, &parsed, options)
}
