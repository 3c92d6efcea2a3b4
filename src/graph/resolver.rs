//! Link resolution.
//!
//! A raw wiki-link target is mapped to a note path by strict priority, the
//! first rule that matches wins:
//!
//! 1. exact, case-sensitive path
//! 2. case-insensitive title
//! 3. case-insensitive path without extension, either as a whole or as a
//!    `/`-anchored suffix (which covers bare filenames)
//!
//! When several notes tie within one rule, the earliest in input order wins.
//! `NoteGraph` feeds notes in path order, so that means the smallest path.

use std::collections::HashMap;

/// Extensions stripped from targets and paths before filename matching.
const DOC_EXTENSIONS: &[&str] = &[".md", ".markdown"];

/// Drop a trailing document extension, ignoring case.
pub fn strip_doc_extension(s: &str) -> &str {
    for ext in DOC_EXTENSIONS {
        if s.len() > ext.len() {
            let split = s.len() - ext.len();
            if s.is_char_boundary(split) && s[split..].eq_ignore_ascii_case(ext) {
                return &s[..split];
            }
        }
    }
    s
}

/// Final path component without its document extension.
fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    strip_doc_extension(name)
}

struct Entry {
    path: String,
    /// Lowercased path without extension.
    path_key: String,
}

/// Resolves raw targets against a fixed set of notes.
pub struct LinkResolver {
    entries: Vec<Entry>,
    by_path: HashMap<String, usize>,
    by_path_lower: HashMap<String, Vec<usize>>,
    by_title: HashMap<String, Vec<usize>>,
    by_stem: HashMap<String, Vec<usize>>,
}

impl LinkResolver {
    /// Build from `(path, title)` pairs. Returned indices refer to this order.
    pub fn new<'a, I>(notes: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut resolver = LinkResolver {
            entries: Vec::new(),
            by_path: HashMap::new(),
            by_path_lower: HashMap::new(),
            by_title: HashMap::new(),
            by_stem: HashMap::new(),
        };

        for (i, (path, title)) in notes.into_iter().enumerate() {
            resolver.by_path.entry(path.to_string()).or_insert(i);
            resolver
                .by_path_lower
                .entry(path.to_lowercase())
                .or_default()
                .push(i);
            resolver
                .by_title
                .entry(title.to_lowercase())
                .or_default()
                .push(i);
            resolver
                .by_stem
                .entry(file_stem(path).to_lowercase())
                .or_default()
                .push(i);
            resolver.entries.push(Entry {
                path: path.to_string(),
                path_key: strip_doc_extension(path).to_lowercase(),
            });
        }

        resolver
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve to the note's index, if any rule matches.
    pub fn resolve_index(&self, target: &str) -> Option<usize> {
        let target = target.trim();
        if target.is_empty() {
            return None;
        }

        if let Some(&i) = self.by_path.get(target) {
            return Some(i);
        }

        let lower = target.to_lowercase();
        if let Some(&i) = self.by_title.get(&lower).and_then(|v| v.first()) {
            return Some(i);
        }

        let key = strip_doc_extension(&lower);
        if key.contains('/') {
            let anchored = format!("/{}", key.trim_start_matches('/'));
            self.entries
                .iter()
                .position(|e| e.path_key == key || e.path_key.ends_with(&anchored))
        } else {
            self.by_stem.get(key).and_then(|v| v.first()).copied()
        }
    }

    /// Resolve to a note path.
    pub fn resolve(&self, target: &str) -> Option<&str> {
        self.resolve_index(target)
            .map(|i| self.entries[i].path.as_str())
    }

    pub fn is_resolved(&self, target: &str) -> bool {
        self.resolve_index(target).is_some()
    }

    /// Every note a raw target names by path, title or extension-less
    /// filename, ignoring case. Sorted and deduplicated.
    pub fn mentioned_by(&self, target: &str) -> Vec<usize> {
        let lower = target.trim().to_lowercase();
        if lower.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<usize> = Vec::new();
        for map_hit in [
            self.by_path_lower.get(&lower),
            self.by_title.get(&lower),
            self.by_stem.get(strip_doc_extension(&lower)),
        ]
        .into_iter()
        .flatten()
        {
            hits.extend(map_hit);
        }
        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(notes: &[(&str, &str)]) -> LinkResolver {
        LinkResolver::new(notes.iter().copied())
    }

    #[test]
    fn test_exact_path_first() {
        let r = resolver(&[("a/Note.md", "Other"), ("b/x.md", "a/Note.md")]);
        assert_eq!(r.resolve("a/Note.md"), Some("a/Note.md"));
    }

    #[test]
    fn test_filename_rule_without_extension() {
        let r = resolver(&[("tech/Docker.md", "Containers")]);
        assert_eq!(r.resolve("Docker"), Some("tech/Docker.md"));
        assert_eq!(r.resolve("docker.md"), Some("tech/Docker.md"));
        assert_eq!(r.resolve("tech/docker"), Some("tech/Docker.md"));
        assert_eq!(r.resolve("Containers"), Some("tech/Docker.md"));
        assert_eq!(r.resolve("ech/Docker"), None);
    }

    #[test]
    fn test_title_beats_filename() {
        let r = resolver(&[("notes/Docker.md", "Whale"), ("tech/containers.md", "Docker")]);
        assert_eq!(r.resolve("docker"), Some("tech/containers.md"));
    }

    #[test]
    fn test_ambiguous_stem_takes_first() {
        let r = resolver(&[("a/index.md", "A"), ("b/index.md", "B")]);
        assert_eq!(r.resolve("index"), Some("a/index.md"));
        assert_eq!(r.resolve("b/index"), Some("b/index.md"));
    }

    #[test]
    fn test_unresolved_and_blank() {
        let r = resolver(&[("a.md", "A")]);
        assert!(!r.is_resolved("missing"));
        assert!(!r.is_resolved("   "));
        assert!(r.is_resolved("A"));
    }

    #[test]
    fn test_mentioned_by_collects_all_forms() {
        let r = resolver(&[("a/Docker.md", "Whale"), ("b/docker.md", "B"), ("c.md", "docker")]);
        assert_eq!(r.mentioned_by("DOCKER"), vec![0, 1, 2]);
        assert_eq!(r.mentioned_by("whale"), vec![0]);
        assert_eq!(r.mentioned_by("a/docker.md"), vec![0]);
        assert!(r.mentioned_by("nothing").is_empty());
    }

    #[test]
    fn test_strip_doc_extension() {
        assert_eq!(strip_doc_extension("Note.MD"), "Note");
        assert_eq!(strip_doc_extension("v1.2"), "v1.2");
        assert_eq!(strip_doc_extension(".md"), ".md");
    }
}
