//! Persistent note index backed by SQLite.

pub mod schema;
mod store;

pub use store::{IndexStatus, IndexedNote, NoteIndex, NoteMetadata, NoteRecord, Snapshot};
