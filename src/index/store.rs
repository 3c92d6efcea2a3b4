//! Index handle and snapshot reads.
//!
//! `NoteIndex` owns the SQLite connection and is passed explicitly into
//! every query and graph call. Reads go through a `Snapshot`, a deferred
//! transaction, so a single call never sees two different index states.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Params, Row, Transaction};
use serde::Serialize;
use tracing::{debug, info};

use super::schema;
use crate::error::Result;

/// Read-only view of one indexed note, without its body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteMetadata {
    pub path: String,
    pub title: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub note_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub verified: bool,
}

impl NoteMetadata {
    pub fn new(path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            note_type: None,
            created: None,
            modified: None,
            source: None,
            confidence: None,
            verified: false,
        }
    }
}

/// A note row with its surrogate key.
#[derive(Debug, Clone)]
pub struct NoteRecord {
    pub id: i64,
    pub meta: NoteMetadata,
}

/// Everything the index stores for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedNote {
    pub meta: NoteMetadata,
    pub content: String,
    pub content_hash: Option<String>,
    pub tags: Vec<String>,
    /// Raw wiki-link targets, as written.
    pub links: Vec<String>,
}

impl IndexedNote {
    pub fn new(path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            meta: NoteMetadata::new(path, title),
            content: String::new(),
            content_hash: None,
            tags: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }
}

/// Row counts, for status output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStatus {
    pub notes: usize,
    pub tags: usize,
    pub links: usize,
}

impl std::fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} notes, {} tags, {} links",
            self.notes, self.tags, self.links
        )
    }
}

const NOTE_COLUMNS: &str =
    "id, path, title, type, created, modified, source, confidence, verified";

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<NoteRecord> {
    Ok(NoteRecord {
        id: row.get(0)?,
        meta: NoteMetadata {
            path: row.get(1)?,
            title: row.get(2)?,
            note_type: row.get(3)?,
            created: row.get(4)?,
            modified: row.get(5)?,
            source: row.get(6)?,
            confidence: row.get(7)?,
            verified: row.get(8)?,
        },
    })
}

/// SQLite-backed note index.
pub struct NoteIndex {
    conn: Connection,
}

impl NoteIndex {
    /// Open or create an index file, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        info!(path = %path.display(), "opening index");
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "wal")?;
        schema::prepare(&conn)?;
        Ok(Self { conn })
    }

    /// Fresh in-memory index, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::prepare(&conn)?;
        Ok(Self { conn })
    }

    /// Begin a read snapshot. Dropping it ends the transaction.
    pub fn snapshot(&self) -> Result<Snapshot<'_>> {
        Ok(Snapshot {
            tx: self.conn.unchecked_transaction()?,
        })
    }

    pub fn status(&self) -> Result<IndexStatus> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            Ok(usize::try_from(n).unwrap_or_default())
        };
        Ok(IndexStatus {
            notes: count("notes")?,
            tags: count("note_tags")?,
            links: count("links")?,
        })
    }

    /// Stored content hash per path, for change detection.
    pub fn content_hashes(&self) -> Result<HashMap<String, Option<String>>> {
        let mut stmt = self.conn.prepare("SELECT path, content_hash FROM notes")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn upsert_note(&mut self, note: &IndexedNote) -> Result<()> {
        self.upsert_notes(std::slice::from_ref(note)).map(|_| ())
    }

    /// Insert or replace notes, swapping out their tags and links, in one
    /// transaction.
    pub fn upsert_notes(&mut self, notes: &[IndexedNote]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        for note in notes {
            upsert_in(&tx, note)?;
        }
        tx.commit()?;
        debug!(count = notes.len(), "upserted notes");
        Ok(notes.len())
    }

    /// Remove notes by path. Tags and links cascade.
    pub fn remove_notes(&mut self, paths: &[String]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM notes WHERE path = ?1")?;
            for path in paths {
                removed += stmt.execute([path])?;
            }
        }
        tx.commit()?;
        debug!(removed, "removed notes");
        Ok(removed)
    }
}

fn upsert_in(tx: &Transaction<'_>, note: &IndexedNote) -> Result<()> {
    let m = &note.meta;
    let id: i64 = tx.query_row(
        "INSERT INTO notes
            (path, title, type, created, modified, source, confidence, verified, content, content_hash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(path) DO UPDATE SET
            title = excluded.title,
            type = excluded.type,
            created = excluded.created,
            modified = excluded.modified,
            source = excluded.source,
            confidence = excluded.confidence,
            verified = excluded.verified,
            content = excluded.content,
            content_hash = excluded.content_hash
         RETURNING id",
        params![
            m.path,
            m.title,
            m.note_type,
            m.created,
            m.modified,
            m.source,
            m.confidence,
            m.verified,
            note.content,
            note.content_hash,
        ],
        |row| row.get(0),
    )?;

    tx.execute("DELETE FROM note_tags WHERE note_id = ?1", [id])?;
    tx.execute("DELETE FROM links WHERE source_id = ?1", [id])?;

    let mut tag_stmt = tx.prepare_cached("INSERT OR IGNORE INTO note_tags (note_id, tag) VALUES (?1, ?2)")?;
    for tag in &note.tags {
        tag_stmt.execute(params![id, tag])?;
    }
    let mut link_stmt = tx.prepare_cached("INSERT OR IGNORE INTO links (source_id, target) VALUES (?1, ?2)")?;
    for target in &note.links {
        link_stmt.execute(params![id, target])?;
    }
    Ok(())
}

/// One coherent read view of the index.
pub struct Snapshot<'a> {
    tx: Transaction<'a>,
}

impl Snapshot<'_> {
    /// Run a parameterized statement and map every row.
    pub fn query_rows<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.tx.prepare(sql)?;
        let rows = stmt.query_map(params, map)?;
        Ok(rows.collect::<rusqlite::Result<Vec<T>>>()?)
    }

    pub fn note(&self, path: &str) -> Result<Option<NoteMetadata>> {
        let record = self
            .tx
            .query_row(
                &format!("SELECT {} FROM notes WHERE path = ?1", NOTE_COLUMNS),
                [path],
                note_from_row,
            )
            .optional()?;
        Ok(record.map(|r| r.meta))
    }

    /// All notes, ordered by path.
    pub fn all_notes(&self) -> Result<Vec<NoteRecord>> {
        self.query_rows(
            &format!("SELECT {} FROM notes ORDER BY path", NOTE_COLUMNS),
            [],
            note_from_row,
        )
    }

    /// Every (note id, tag) pair.
    pub fn all_tags(&self) -> Result<Vec<(i64, String)>> {
        self.query_rows(
            "SELECT note_id, tag FROM note_tags ORDER BY note_id, tag",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
    }

    /// Every (source id, raw target) pair.
    pub fn all_links(&self) -> Result<Vec<(i64, String)>> {
        self.query_rows(
            "SELECT source_id, target FROM links ORDER BY source_id, rowid",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
    }

    /// Tags for a set of notes, sorted per note.
    pub fn tags_for(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<String>>> {
        let mut out: HashMap<i64, Vec<String>> = HashMap::new();
        if ids.is_empty() {
            return Ok(out);
        }
        // Chunked to stay under SQLite's host parameter limit.
        for chunk in ids.chunks(500) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT note_id, tag FROM note_tags WHERE note_id IN ({}) ORDER BY note_id, tag",
                placeholders
            );
            let pairs: Vec<(i64, String)> = self.query_rows(
                &sql,
                rusqlite::params_from_iter(chunk.iter()),
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            for (id, tag) in pairs {
                out.entry(id).or_default().push(tag);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> IndexedNote {
        let mut note = IndexedNote::new("tech/Docker.md", "Containers")
            .with_tags(["devops", "devops", "tools"])
            .with_links(["Kubernetes", "tech/Podman.md"]);
        note.meta.confidence = Some(0.8);
        note.meta.verified = true;
        note
    }

    #[test]
    fn test_upsert_and_read_back() {
        let mut index = NoteIndex::open_in_memory().unwrap();
        index.upsert_note(&sample()).unwrap();

        let snap = index.snapshot().unwrap();
        let meta = snap.note("tech/Docker.md").unwrap().unwrap();
        assert_eq!(meta.title, "Containers");
        assert_eq!(meta.confidence, Some(0.8));
        assert!(meta.verified);

        // Duplicate tag collapses to one row.
        let tags = snap.all_tags().unwrap();
        assert_eq!(tags.len(), 2);
        let links: Vec<String> = snap.all_links().unwrap().into_iter().map(|(_, t)| t).collect();
        assert_eq!(links, vec!["Kubernetes", "tech/Podman.md"]);
    }

    #[test]
    fn test_upsert_replaces_tags_and_links() {
        let mut index = NoteIndex::open_in_memory().unwrap();
        index.upsert_note(&sample()).unwrap();
        index
            .upsert_note(&IndexedNote::new("tech/Docker.md", "Docker").with_tags(["new"]))
            .unwrap();

        let status = index.status().unwrap();
        assert_eq!(status.notes, 1);
        assert_eq!(status.tags, 1);
        assert_eq!(status.links, 0);
    }

    #[test]
    fn test_remove_cascades() {
        let mut index = NoteIndex::open_in_memory().unwrap();
        index.upsert_note(&sample()).unwrap();
        let removed = index.remove_notes(&["tech/Docker.md".to_string()]).unwrap();
        assert_eq!(removed, 1);

        let status = index.status().unwrap();
        assert_eq!((status.notes, status.tags, status.links), (0, 0, 0));
    }

    #[test]
    fn test_missing_note_is_none() {
        let index = NoteIndex::open_in_memory().unwrap();
        let snap = index.snapshot().unwrap();
        assert!(snap.note("nope.md").unwrap().is_none());
    }

    #[test]
    fn test_tags_for_groups_by_note() {
        let mut index = NoteIndex::open_in_memory().unwrap();
        index.upsert_note(&sample()).unwrap();
        index
            .upsert_note(&IndexedNote::new("b.md", "B").with_tags(["zeta", "alpha"]))
            .unwrap();

        let snap = index.snapshot().unwrap();
        let ids: Vec<i64> = snap.all_notes().unwrap().iter().map(|r| r.id).collect();
        let tags = snap.tags_for(&ids).unwrap();
        let b_id = snap.all_notes().unwrap()[0].id;
        assert_eq!(tags[&b_id], vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("index.db");
        {
            let mut index = NoteIndex::open(&path).unwrap();
            index.upsert_note(&sample()).unwrap();
        }
        let index = NoteIndex::open(&path).unwrap();
        assert_eq!(index.status().unwrap().notes, 1);
        assert!(index.content_hashes().unwrap().contains_key("tech/Docker.md"));
    }
}
