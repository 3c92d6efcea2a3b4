//! Caller-facing operations.
//!
//! Each call takes the index handle explicitly, reads one snapshot, and
//! returns a serializable response. A missing note is reported through
//! `found: false` and empty results, never as an error.

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::graph::{
    BrokenLink, Direction, GraphNode, LinkInfo, NoteGraph, OrphanKind, RelatedMethod, RelatedNote,
    TraversalResult,
};
use crate::index::{NoteIndex, NoteMetadata};
use crate::query::{self, QueryOptions, QueryResult};

pub const MIN_DEPTH: usize = 1;
pub const MAX_DEPTH: usize = 5;

/// Traversal depth as callers are allowed to ask for it.
pub fn clamp_depth(depth: usize) -> usize {
    depth.clamp(MIN_DEPTH, MAX_DEPTH)
}

// ─── Links Response ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct LinksResponse {
    pub path: String,
    pub found: bool,
    pub count: usize,
    pub links: Vec<LinkInfo>,
}

// ─── Traversal Response ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TraversalResponse {
    pub start: String,
    pub direction: Direction,
    /// Depth actually used, after clamping.
    pub depth: usize,
    pub found: bool,
    pub count: usize,
    pub results: Vec<TraversalResult>,
}

// ─── Related Response ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RelatedResponse {
    pub path: String,
    pub method: RelatedMethod,
    pub found: bool,
    pub count: usize,
    pub related: Vec<RelatedNote>,
}

// ─── Orphans / Broken Links Response ───────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct OrphansResponse {
    pub kind: OrphanKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    pub count: usize,
    pub notes: Vec<NoteMetadata>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrokenLinksResponse {
    pub count: usize,
    pub links: Vec<BrokenLink>,
}

// ─── Path / Hubs Response ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct PathResponse {
    pub from: String,
    pub to: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trail: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HubsResponse {
    pub count: usize,
    pub hubs: Vec<GraphNode>,
}

// ─── Operations ────────────────────────────────────────────────────

/// Parse and run a query.
pub fn execute_query(index: &NoteIndex, text: &str, options: &QueryOptions) -> Result<QueryResult> {
    query::execute_query(index, text, options)
}

pub fn get_outgoing_links(index: &NoteIndex, path: &str) -> Result<LinksResponse> {
    let graph = NoteGraph::load(index)?;
    let links = graph.outgoing(path);
    Ok(LinksResponse {
        path: path.to_string(),
        found: graph.note(path).is_some(),
        count: links.len(),
        links,
    })
}

pub fn get_incoming_links(index: &NoteIndex, path: &str) -> Result<LinksResponse> {
    let graph = NoteGraph::load(index)?;
    let links = graph.incoming(path);
    Ok(LinksResponse {
        path: path.to_string(),
        found: graph.note(path).is_some(),
        count: links.len(),
        links,
    })
}

/// Breadth-first walk from `path`. Depth is clamped to 1..=5.
pub fn traverse_graph(
    index: &NoteIndex,
    path: &str,
    direction: Direction,
    depth: usize,
) -> Result<TraversalResponse> {
    let depth = clamp_depth(depth);
    let graph = NoteGraph::load(index)?;
    let results = graph.traverse(path, direction, depth);
    debug!(start = path, ?direction, depth, reached = results.len(), "traversed graph");
    Ok(TraversalResponse {
        start: path.to_string(),
        direction,
        depth,
        found: graph.note(path).is_some(),
        count: results.len(),
        results,
    })
}

pub fn find_related_notes(
    index: &NoteIndex,
    path: &str,
    method: RelatedMethod,
    limit: usize,
) -> Result<RelatedResponse> {
    let graph = NoteGraph::load(index)?;
    let related = graph.related(path, method, limit);
    Ok(RelatedResponse {
        path: path.to_string(),
        method,
        found: graph.note(path).is_some(),
        count: related.len(),
        related,
    })
}

pub fn find_orphans(index: &NoteIndex, kind: OrphanKind, prefix: Option<&str>) -> Result<OrphansResponse> {
    let graph = NoteGraph::load(index)?;
    let notes = graph.orphans(kind, prefix);
    Ok(OrphansResponse {
        kind,
        prefix: prefix.map(str::to_string),
        count: notes.len(),
        notes,
    })
}

pub fn find_broken_links(index: &NoteIndex, prefix: Option<&str>) -> Result<BrokenLinksResponse> {
    let graph = NoteGraph::load(index)?;
    let links = graph.broken_links(prefix);
    Ok(BrokenLinksResponse {
        count: links.len(),
        links,
    })
}

/// Shortest outgoing trail between two notes. Depth is clamped to 1..=5.
pub fn find_path(index: &NoteIndex, from: &str, to: &str, max_depth: usize) -> Result<PathResponse> {
    let graph = NoteGraph::load(index)?;
    let trail = graph.find_path(from, to, clamp_depth(max_depth));
    Ok(PathResponse {
        from: from.to_string(),
        to: to.to_string(),
        found: trail.is_some(),
        trail,
    })
}

pub fn find_hubs(index: &NoteIndex, limit: usize) -> Result<HubsResponse> {
    let graph = NoteGraph::load(index)?;
    let hubs = graph.hubs(limit);
    Ok(HubsResponse {
        count: hubs.len(),
        hubs,
    })
}

pub fn describe_note(index: &NoteIndex, path: &str) -> Result<Option<GraphNode>> {
    Ok(NoteGraph::load(index)?.describe(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexedNote;

    fn chain(len: usize) -> NoteIndex {
        let mut index = NoteIndex::open_in_memory().unwrap();
        let notes: Vec<IndexedNote> = (0..len)
            .map(|i| {
                let note = IndexedNote::new(format!("n{}.md", i), format!("N{}", i));
                if i + 1 < len {
                    note.with_links([format!("n{}", i + 1)])
                } else {
                    note
                }
            })
            .collect();
        index.upsert_notes(&notes).unwrap();
        index
    }

    #[test]
    fn test_depth_is_clamped() {
        let index = chain(9);
        let response = traverse_graph(&index, "n0.md", Direction::Outgoing, 50).unwrap();
        assert_eq!(response.depth, MAX_DEPTH);
        assert_eq!(response.count, 5);

        let response = traverse_graph(&index, "n0.md", Direction::Outgoing, 0).unwrap();
        assert_eq!(response.depth, MIN_DEPTH);
        assert_eq!(response.count, 1);
    }

    #[test]
    fn test_missing_note_is_not_an_error() {
        let index = chain(2);
        let response = get_outgoing_links(&index, "ghost.md").unwrap();
        assert!(!response.found);
        assert_eq!(response.count, 0);
        assert!(!traverse_graph(&index, "ghost.md", Direction::Both, 3).unwrap().found);
        assert!(describe_note(&index, "ghost.md").unwrap().is_none());
    }

    #[test]
    fn test_find_path_and_incoming() {
        let index = chain(4);
        let response = find_path(&index, "n0.md", "n3.md", 5).unwrap();
        assert!(response.found);
        assert_eq!(response.trail.unwrap().len(), 4);

        let incoming = get_incoming_links(&index, "n1.md").unwrap();
        assert_eq!(incoming.count, 1);
        assert_eq!(incoming.links[0].source, "n0.md");
    }

    #[test]
    fn test_prefix_filters_agree() {
        let mut index = NoteIndex::open_in_memory().unwrap();
        index
            .upsert_notes(&[
                IndexedNote::new("research/a.md", "A"),
                IndexedNote::new("Research/b.md", "B"),
            ])
            .unwrap();

        let rows = execute_query(&index, r#"LIST FROM "Research""#, &QueryOptions::default()).unwrap();
        let queried: Vec<String> = rows.rows.iter().map(|r| r["path"].to_string()).collect();
        let orphans = find_orphans(&index, OrphanKind::NoIncoming, Some("Research")).unwrap();
        let orphaned: Vec<String> = orphans.notes.into_iter().map(|n| n.path).collect();
        assert_eq!(queried, vec!["Research/b.md"]);
        assert_eq!(queried, orphaned);
    }

    #[test]
    fn test_responses_serialize() {
        let index = chain(3);
        let orphans = find_orphans(&index, OrphanKind::NoIncoming, None).unwrap();
        let json = serde_json::to_value(&orphans).unwrap();
        assert_eq!(json["kind"], "no_incoming");
        assert_eq!(json["count"], 1);
        assert!(json.get("prefix").is_none());
    }
}
