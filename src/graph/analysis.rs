//! Graph analysis: relatedness, orphans, broken links, hubs.

use std::collections::BTreeMap;

use petgraph::graph::NodeIndex;

use super::engine::NoteGraph;
use super::types::{BrokenLink, GraphNode, OrphanKind, RelatedMethod, RelatedNote};
use crate::index::NoteMetadata;

/// Lowercased key to display form. Ordered so shared lists come out sorted.
type KeySet = BTreeMap<String, String>;

/// Jaccard score and the shared displays, or `None` on empty intersection.
fn jaccard(a: &KeySet, b: &KeySet) -> Option<(f64, Vec<String>)> {
    let shared: Vec<String> = a
        .iter()
        .filter(|(k, _)| b.contains_key(*k))
        .map(|(_, display)| display.clone())
        .collect();
    if shared.is_empty() {
        return None;
    }
    let union = a.len() + b.len() - shared.len();
    Some((shared.len() as f64 / union as f64, shared))
}

fn under_prefix(path: &str, prefix: Option<&str>) -> bool {
    prefix.map_or(true, |p| path.starts_with(p))
}

impl NoteGraph {
    /// Link targets keyed by resolved path, or by raw text when unresolved.
    fn link_keys(&self, node: NodeIndex) -> KeySet {
        self.links[node.index()]
            .iter()
            .map(|target| {
                let display = self.resolver.resolve(target).unwrap_or(target.as_str());
                (display.to_lowercase(), display.to_string())
            })
            .collect()
    }

    fn tag_keys(&self, node: NodeIndex) -> KeySet {
        self.tags[node.index()]
            .iter()
            .map(|tag| (tag.to_lowercase(), tag.clone()))
            .collect()
    }

    /// Notes sharing links and/or tags with `path`, best first.
    ///
    /// With `Both`, the two Jaccard scores are added, not recombined.
    pub fn related(&self, path: &str, method: RelatedMethod, limit: usize) -> Vec<RelatedNote> {
        let Some(origin) = self.node(path) else {
            return Vec::new();
        };
        let origin_links = method.uses_links().then(|| self.link_keys(origin));
        let origin_tags = method.uses_tags().then(|| self.tag_keys(origin));

        let mut related: Vec<RelatedNote> = Vec::new();
        for node in self.nodes().filter(|&n| n != origin) {
            let by_links = origin_links
                .as_ref()
                .and_then(|keys| jaccard(keys, &self.link_keys(node)));
            let by_tags = origin_tags
                .as_ref()
                .and_then(|keys| jaccard(keys, &self.tag_keys(node)));
            if by_links.is_none() && by_tags.is_none() {
                continue;
            }

            let score = by_links.as_ref().map_or(0.0, |(s, _)| *s)
                + by_tags.as_ref().map_or(0.0, |(s, _)| *s);
            related.push(RelatedNote {
                note: self.meta(node).clone(),
                score,
                shared_links: by_links.map(|(_, shared)| shared),
                shared_tags: by_tags.map(|(_, shared)| shared),
            });
        }

        related.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.note.path.cmp(&b.note.path))
        });
        related.truncate(limit);
        related
    }

    /// Orphaned notes in path order. The prefix narrows candidates only;
    /// links from outside it still count.
    pub fn orphans(&self, kind: OrphanKind, prefix: Option<&str>) -> Vec<NoteMetadata> {
        self.nodes()
            .filter(|&n| under_prefix(self.path_of(n), prefix))
            .filter(|&n| {
                let no_incoming = self.incoming_sources(n) == 0;
                let no_outgoing = self.links[n.index()].is_empty();
                match kind {
                    OrphanKind::NoIncoming => no_incoming,
                    OrphanKind::NoOutgoing => no_outgoing,
                    OrphanKind::Isolated => no_incoming && no_outgoing,
                }
            })
            .map(|n| self.meta(n).clone())
            .collect()
    }

    /// Stored links that resolve to no note, grouped by source path.
    pub fn broken_links(&self, prefix: Option<&str>) -> Vec<BrokenLink> {
        self.nodes()
            .filter(|&n| under_prefix(self.path_of(n), prefix))
            .flat_map(|n| {
                self.links[n.index()]
                    .iter()
                    .filter(|target| !self.is_resolved(target))
                    .map(move |target| BrokenLink {
                        source: self.path_of(n).to_string(),
                        target: target.clone(),
                    })
            })
            .collect()
    }

    pub fn describe(&self, path: &str) -> Option<GraphNode> {
        self.node(path).map(|n| self.graph_node(n))
    }

    fn graph_node(&self, node: NodeIndex) -> GraphNode {
        let meta = self.meta(node);
        GraphNode {
            path: meta.path.clone(),
            title: meta.title.clone(),
            incoming_count: self.incoming_sources(node),
            outgoing_count: self.links[node.index()].len(),
        }
    }

    /// Most linked-to notes. Notes nobody links to are left out.
    pub fn hubs(&self, limit: usize) -> Vec<GraphNode> {
        let mut hubs: Vec<GraphNode> = self
            .nodes()
            .map(|n| self.graph_node(n))
            .filter(|g| g.incoming_count > 0)
            .collect();
        hubs.sort_by(|a, b| {
            b.incoming_count
                .cmp(&a.incoming_count)
                .then_with(|| a.path.cmp(&b.path))
        });
        hubs.truncate(limit);
        hubs
    }
}
