//! # notegraph
//!
//! Query language and link graph over an indexed markdown vault.
//!
//! Notes are indexed into SQLite (metadata, tags, raw wiki-link targets).
//! Two read-only surfaces sit on top of that index:
//!
//! - **Queries**: `TABLE` / `LIST` / `TASK` with `FROM`, `WHERE`, `SORT`
//!   and `LIMIT`, translated into parameterized SQL
//! - **Graph**: link resolution, breadth-first traversal, Jaccard
//!   relatedness, orphans and broken links
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notegraph::{api, index_vault, Config, Direction, NoteIndex};
//! use std::path::Path;
//!
//! # fn main() -> notegraph::Result<()> {
//! let root = Path::new("vault");
//! let config = Config::load(root)?;
//! let mut index = NoteIndex::open(&config.index_path(root))?;
//! index_vault(&mut index, root, &config)?;
//!
//! let rows = api::execute_query(&index, "LIST WHERE type = research", &config.query_options())?;
//! let walk = api::traverse_graph(&index, "tech/Docker.md", Direction::Both, 2)?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod query;
pub mod vault;

// Re-exports for convenience
pub use config::Config;
pub use error::{NoteGraphError, Result};

pub use graph::{
    BrokenLink, Direction, GraphNode, LinkInfo, NoteGraph, OrphanKind, RelatedMethod, RelatedNote,
    TraversalResult,
};
pub use index::{IndexedNote, NoteIndex, NoteMetadata};
pub use query::{execute_query, parse_query, render, ParsedQuery, QueryOptions, QueryResult};
pub use vault::{get_note, index_vault, Document, IndexStats};
