//! Index schema and migrations.
//!
//! Migrations are append-only. `notes` holds one row per document,
//! `note_tags` and `links` hang off it and cascade on delete. Link targets
//! are stored exactly as written; resolution happens at query time.

use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;

struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: "
        CREATE TABLE notes (
            id           INTEGER PRIMARY KEY,
            path         TEXT    NOT NULL UNIQUE,
            title        TEXT    NOT NULL,
            type         TEXT,
            created      TEXT,
            modified     TEXT,
            source       TEXT,
            confidence   REAL,
            verified     INTEGER NOT NULL DEFAULT 0,
            content      TEXT    NOT NULL DEFAULT '',
            content_hash TEXT
        );

        CREATE TABLE note_tags (
            note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
            tag     TEXT    NOT NULL,
            UNIQUE (note_id, tag)
        );

        CREATE TABLE links (
            source_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
            target    TEXT    NOT NULL,
            UNIQUE (source_id, target)
        );

        CREATE INDEX idx_notes_type     ON notes(type);
        CREATE INDEX idx_notes_modified ON notes(modified);
        CREATE INDEX idx_note_tags_tag  ON note_tags(tag);
        CREATE INDEX idx_links_target   ON links(target);
    ",
}];

/// Enable foreign keys and apply pending migrations.
pub(crate) fn prepare(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "on")?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_meta (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let applied: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_meta",
        [],
        |row| row.get(0),
    )?;

    for m in MIGRATIONS.iter().filter(|m| m.version > applied) {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(m.sql)?;
        tx.execute("INSERT INTO schema_meta (version) VALUES (?1)", [m.version])?;
        tx.commit()?;
        debug!(version = m.version, "applied index migration");
    }

    Ok(())
}

/// Latest schema version this build knows about.
pub fn current_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        prepare(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        for expected in ["links", "note_tags", "notes", "schema_meta"] {
            assert!(tables.iter().any(|t| t == expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        prepare(&conn).unwrap();
        prepare(&conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_meta", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, current_version());
    }
}
