//! Vault indexer: walks the vault and keeps the index in sync.
//!
//! Walks note files respecting .gitignore, hashes each one, re-parses only
//! those whose hash changed, and prunes rows for files that are gone.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::reader::{parse_document, FileTimes};
use crate::config::Config;
use crate::error::Result;
use crate::index::{IndexedNote, NoteIndex};

/// Counts from one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub scanned: usize,
    pub indexed: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub failed: usize,
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} scanned, {} indexed, {} unchanged, {} removed, {} failed",
            self.scanned, self.indexed, self.unchanged, self.removed, self.failed
        )
    }
}

enum Outcome {
    Changed(Box<IndexedNote>),
    Unchanged,
    Failed,
}

pub fn content_hash(raw: &[u8]) -> String {
    format!("{:x}", Sha256::digest(raw))
}

/// Vault-relative path with `/` separators.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

/// Note files under `root`, as (absolute, relative) pairs in path order.
pub fn scan_vault(root: &Path, config: &Config) -> Vec<(PathBuf, String)> {
    let mut files: Vec<(PathBuf, String)> = WalkBuilder::new(root)
        .hidden(true) // skips .notegraph too
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map_or(false, |ft| ft.is_file()))
        .filter(|entry| config.is_note(entry.path()))
        .filter_map(|entry| {
            let rel = relative_path(root, entry.path())?;
            Some((entry.into_path(), rel))
        })
        .collect();
    files.sort_by(|a, b| a.1.cmp(&b.1));
    files
}

fn load(abs: &Path, rel: &str, known_hash: Option<&str>) -> Outcome {
    let bytes = match fs::read(abs) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = rel, error = %e, "skipping unreadable note");
            return Outcome::Failed;
        }
    };
    let hash = content_hash(&bytes);
    if known_hash == Some(hash.as_str()) {
        return Outcome::Unchanged;
    }

    let raw = match String::from_utf8(bytes) {
        Ok(raw) => raw,
        Err(_) => {
            warn!(path = rel, "skipping note that is not valid UTF-8");
            return Outcome::Failed;
        }
    };
    let doc = match parse_document(rel, raw) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(path = rel, error = %e, "skipping unparseable note");
            return Outcome::Failed;
        }
    };
    let times = fs::metadata(abs)
        .map(|m| FileTimes::from_metadata(&m))
        .unwrap_or_default();
    Outcome::Changed(Box::new(doc.to_indexed(&times, Some(hash))))
}

/// Bring the index in line with the files under `root`.
pub fn index_vault(index: &mut NoteIndex, root: &Path, config: &Config) -> Result<IndexStats> {
    info!(root = %root.display(), "indexing vault");

    // Phase 1: collect note files
    let files = scan_vault(root, config);
    let known = index.content_hashes()?;

    // Phase 2: hash and parse in parallel
    let outcomes: Vec<Outcome> = files
        .par_iter()
        .map(|(abs, rel)| {
            let known_hash = known.get(rel).and_then(|h| h.as_deref());
            load(abs, rel, known_hash)
        })
        .collect();

    // Phase 3: write changes and prune vanished files
    let mut stats = IndexStats {
        scanned: files.len(),
        ..Default::default()
    };
    let mut changed = Vec::new();
    for outcome in outcomes {
        match outcome {
            Outcome::Changed(note) => changed.push(*note),
            Outcome::Unchanged => stats.unchanged += 1,
            Outcome::Failed => stats.failed += 1,
        }
    }
    stats.indexed = index.upsert_notes(&changed)?;

    let present: HashSet<&str> = files.iter().map(|(_, rel)| rel.as_str()).collect();
    let gone: Vec<String> = known
        .keys()
        .filter(|path| !present.contains(path.as_str()))
        .cloned()
        .collect();
    stats.removed = index.remove_notes(&gone)?;

    info!(
        scanned = stats.scanned,
        indexed = stats.indexed,
        unchanged = stats.unchanged,
        removed = stats.removed,
        failed = stats.failed,
        "vault indexed"
    );
    Ok(stats)
}
