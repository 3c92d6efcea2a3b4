//! Note reader: frontmatter, title, tags and wiki-links.
//!
//! Frontmatter is a YAML block fenced by `---` lines at the very top of the
//! file. Everything after it is the body. Wiki-link targets are kept as
//! written, minus any `|alias` or `#heading` part.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::warn;

use crate::error::{NoteGraphError, Result};
use crate::index::IndexedNote;

static WIKILINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[\[([^\[\]]+?)\]\]").unwrap());
static INLINE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)#([A-Za-z][A-Za-z0-9_/-]*)").unwrap());

/// A note as read from disk.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// Vault-relative, `/`-separated.
    pub path: String,
    pub title: String,
    pub metadata: Map<String, JsonValue>,
    pub body: String,
    pub raw: String,
}

/// Read and parse one note relative to the vault root.
pub fn get_note(root: &Path, path: &str) -> Result<Document> {
    let raw = fs::read_to_string(root.join(path))?;
    parse_document(path, raw)
}

/// Parse note text. `path` is only used for the fallback title and errors.
pub fn parse_document(path: &str, raw: String) -> Result<Document> {
    let (yaml, body) = split_frontmatter(&raw);

    let metadata = match yaml {
        Some(yaml) if !yaml.trim().is_empty() => {
            let parsed: JsonValue =
                serde_yaml::from_str(yaml).map_err(|source| NoteGraphError::Frontmatter {
                    path: PathBuf::from(path),
                    source,
                })?;
            match parsed {
                JsonValue::Object(map) => map,
                JsonValue::Null => Map::new(),
                _ => {
                    warn!(path, "frontmatter is not a mapping, ignoring");
                    Map::new()
                }
            }
        }
        _ => Map::new(),
    };

    let title = metadata
        .get("title")
        .and_then(scalar_text)
        .filter(|t| !t.is_empty())
        .or_else(|| first_heading(body))
        .unwrap_or_else(|| file_stem(path).to_string());
    let body = body.to_string();

    Ok(Document {
        path: path.to_string(),
        title,
        metadata,
        body,
        raw,
    })
}

/// Split into (frontmatter, body). No opening fence means no frontmatter.
fn split_frontmatter(raw: &str) -> (Option<&str>, &str) {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return (None, text);
    };

    // The closing fence is a line holding exactly `---`.
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let content = line.trim_end_matches('\n').trim_end_matches('\r');
        if content == "---" {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, text)
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
}

fn file_stem(path: &str) -> &str {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
}

fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Normalize a timestamp to RFC 3339 UTC. Unparseable text is kept as is.
pub fn normalize_timestamp(text: &str) -> String {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return naive.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return naive.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true);
        }
    }
    text.to_string()
}

/// File timestamps used when frontmatter has none.
#[derive(Debug, Clone, Default)]
pub struct FileTimes {
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

impl FileTimes {
    pub fn from_metadata(meta: &fs::Metadata) -> Self {
        Self {
            created: meta.created().ok().map(DateTime::<Utc>::from),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
        }
    }
}

fn fmt_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl Document {
    fn meta_text(&self, key: &str) -> Option<String> {
        self.metadata
            .get(key)
            .and_then(scalar_text)
            .filter(|s| !s.is_empty())
    }

    /// Frontmatter tags plus inline `#tags`, first spelling wins.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        match self.metadata.get("tags") {
            Some(JsonValue::Array(items)) => tags.extend(items.iter().filter_map(scalar_text)),
            Some(JsonValue::String(s)) => {
                tags.extend(s.split([',', ' ']).map(|t| t.trim().to_string()))
            }
            _ => {}
        }
        tags.extend(
            INLINE_TAG_RE
                .captures_iter(&self.body)
                .map(|cap| cap[1].to_string()),
        );

        let mut seen = HashSet::new();
        tags.into_iter()
            .map(|t| t.trim_start_matches('#').to_string())
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.to_lowercase()))
            .collect()
    }

    /// Wiki-link targets in order of first appearance.
    pub fn links(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        WIKILINK_RE
            .captures_iter(&self.body)
            .filter_map(|cap| {
                let inner = cap.get(1)?.as_str();
                let target = inner.split('|').next()?.split('#').next()?.trim();
                (!target.is_empty()).then(|| target.to_string())
            })
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }

    pub fn confidence(&self) -> Option<f64> {
        let value = match self.metadata.get("confidence")? {
            JsonValue::Number(n) => n.as_f64()?,
            JsonValue::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        value.is_finite().then(|| value.clamp(0.0, 1.0))
    }

    pub fn verified(&self) -> bool {
        match self.metadata.get("verified") {
            Some(JsonValue::Bool(b)) => *b,
            Some(JsonValue::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
            Some(JsonValue::Number(n)) => n.as_f64().map_or(false, |v| v != 0.0),
            _ => false,
        }
    }

    /// Flatten into an index row. Missing timestamps fall back to `times`.
    pub fn to_indexed(&self, times: &FileTimes, content_hash: Option<String>) -> IndexedNote {
        let mut note = IndexedNote::new(self.path.clone(), self.title.clone());
        note.meta.note_type = self.meta_text("type");
        note.meta.source = self.meta_text("source");
        note.meta.created = self
            .meta_text("created")
            .map(|t| normalize_timestamp(&t))
            .or_else(|| times.created.map(fmt_time));
        note.meta.modified = self
            .meta_text("modified")
            .map(|t| normalize_timestamp(&t))
            .or_else(|| times.modified.map(fmt_time));
        note.meta.confidence = self.confidence();
        note.meta.verified = self.verified();
        note.content = self.body.clone();
        note.content_hash = content_hash;
        note.tags = self.tags();
        note.links = self.links();
        note
    }
}
