//! Vault access: reading notes and keeping the index current.

pub mod indexer;
pub mod reader;

pub use indexer::{index_vault, scan_vault, IndexStats};
pub use reader::{get_note, parse_document, Document, FileTimes};
