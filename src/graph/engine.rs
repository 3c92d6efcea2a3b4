//! Note graph: petgraph snapshot of the index plus BFS traversal.
//!
//! Nodes are added in path order, so a `NodeIndex` doubles as the position
//! in `notes`, `links` and `tags`. Each stored link produces at most one
//! `Resolves` edge to the resolver's pick, plus `Mentions` edges to any
//! other note it names by path, title or filename. Outgoing neighbors follow
//! `Resolves` edges only; incoming neighbors follow both.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction as PgDirection;
use tracing::debug;

use super::resolver::LinkResolver;
use super::types::{Direction, EdgeKind, LinkInfo, TraversalResult};
use crate::error::Result;
use crate::index::{NoteIndex, NoteMetadata};

#[derive(Debug, Clone)]
pub(crate) struct LinkEdge {
    pub kind: EdgeKind,
    /// Raw target text that produced this edge.
    pub target: String,
}

/// Read-only graph built from one index snapshot.
pub struct NoteGraph {
    graph: DiGraph<NoteMetadata, LinkEdge>,
    by_path: HashMap<String, NodeIndex>,
    /// Raw targets per node, in stored order.
    pub(crate) links: Vec<Vec<String>>,
    pub(crate) tags: Vec<Vec<String>>,
    pub(crate) resolver: LinkResolver,
}

/// BFS bookkeeping: discovery order plus parent pointers.
struct Walk {
    order: Vec<(NodeIndex, usize)>,
    parent: HashMap<NodeIndex, NodeIndex>,
}

impl Walk {
    fn trail(&self, graph: &NoteGraph, node: NodeIndex) -> Vec<String> {
        let mut trail = vec![graph.path_of(node).to_string()];
        let mut cur = node;
        while let Some(&prev) = self.parent.get(&cur) {
            trail.push(graph.path_of(prev).to_string());
            cur = prev;
        }
        trail.reverse();
        trail
    }
}

impl NoteGraph {
    /// Load notes, tags and links from a single read snapshot.
    pub fn load(index: &NoteIndex) -> Result<Self> {
        let snapshot = index.snapshot()?;
        let notes = snapshot.all_notes()?;
        let tag_rows = snapshot.all_tags()?;
        let link_rows = snapshot.all_links()?;
        drop(snapshot);

        let position: HashMap<i64, usize> =
            notes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
        let mut links = vec![Vec::new(); notes.len()];
        let mut tags = vec![Vec::new(); notes.len()];
        for (id, target) in link_rows {
            if let Some(&i) = position.get(&id) {
                links[i].push(target);
            }
        }
        for (id, tag) in tag_rows {
            if let Some(&i) = position.get(&id) {
                tags[i].push(tag);
            }
        }

        let metas: Vec<NoteMetadata> = notes.into_iter().map(|n| n.meta).collect();
        Ok(Self::from_parts(metas, links, tags))
    }

    /// Build from notes sorted by path, with per-note raw links and tags.
    pub(crate) fn from_parts(
        notes: Vec<NoteMetadata>,
        links: Vec<Vec<String>>,
        tags: Vec<Vec<String>>,
    ) -> Self {
        let resolver = LinkResolver::new(notes.iter().map(|n| (n.path.as_str(), n.title.as_str())));

        let mut graph = DiGraph::with_capacity(notes.len(), 0);
        let mut by_path = HashMap::with_capacity(notes.len());
        for note in notes {
            let path = note.path.clone();
            let idx = graph.add_node(note);
            by_path.entry(path).or_insert(idx);
        }

        for (src, targets) in links.iter().enumerate() {
            let src_idx = NodeIndex::new(src);
            for target in targets {
                let resolved = resolver.resolve_index(target);
                if let Some(dst) = resolved {
                    graph.add_edge(
                        src_idx,
                        NodeIndex::new(dst),
                        LinkEdge {
                            kind: EdgeKind::Resolves,
                            target: target.clone(),
                        },
                    );
                }
                for dst in resolver.mentioned_by(target) {
                    if Some(dst) != resolved {
                        graph.add_edge(
                            src_idx,
                            NodeIndex::new(dst),
                            LinkEdge {
                                kind: EdgeKind::Mentions,
                                target: target.clone(),
                            },
                        );
                    }
                }
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "note graph built"
        );

        NoteGraph {
            graph,
            by_path,
            links,
            tags,
            resolver,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub(crate) fn node(&self, path: &str) -> Option<NodeIndex> {
        self.by_path.get(path).copied()
    }

    pub(crate) fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub(crate) fn meta(&self, node: NodeIndex) -> &NoteMetadata {
        &self.graph[node]
    }

    pub(crate) fn path_of(&self, node: NodeIndex) -> &str {
        &self.graph[node].path
    }

    pub fn note(&self, path: &str) -> Option<&NoteMetadata> {
        self.node(path).map(|n| self.meta(n))
    }

    /// Resolve a raw target to a note path.
    pub fn resolve(&self, target: &str) -> Option<&str> {
        self.resolver.resolve(target)
    }

    pub fn is_resolved(&self, target: &str) -> bool {
        self.resolver.is_resolved(target)
    }

    /// Stored links of a note, each with its resolution.
    pub fn outgoing(&self, path: &str) -> Vec<LinkInfo> {
        let Some(node) = self.node(path) else {
            return Vec::new();
        };
        self.links[node.index()]
            .iter()
            .map(|target| LinkInfo {
                source: path.to_string(),
                target: target.clone(),
                resolved: self.resolver.resolve(target).map(str::to_string),
            })
            .collect()
    }

    /// Stored links, from any note, that name this note.
    pub fn incoming(&self, path: &str) -> Vec<LinkInfo> {
        let Some(node) = self.node(path) else {
            return Vec::new();
        };
        let mut out: Vec<LinkInfo> = self
            .graph
            .edges_directed(node, PgDirection::Incoming)
            .map(|edge| LinkInfo {
                source: self.path_of(edge.source()).to_string(),
                target: edge.weight().target.clone(),
                resolved: self.resolver.resolve(&edge.weight().target).map(str::to_string),
            })
            .collect();
        out.sort_by(|a, b| a.source.cmp(&b.source).then_with(|| a.target.cmp(&b.target)));
        out.dedup();
        out
    }

    /// Distinct neighbors in path order.
    pub(crate) fn neighbors(&self, node: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = Vec::new();
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            out.extend(
                self.graph
                    .edges_directed(node, PgDirection::Outgoing)
                    .filter(|e| e.weight().kind == EdgeKind::Resolves)
                    .map(|e| e.target()),
            );
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            out.extend(
                self.graph
                    .edges_directed(node, PgDirection::Incoming)
                    .map(|e| e.source()),
            );
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Distinct notes, other than itself, whose links name this note.
    pub(crate) fn incoming_sources(&self, node: NodeIndex) -> usize {
        let mut sources: Vec<NodeIndex> = self
            .graph
            .edges_directed(node, PgDirection::Incoming)
            .map(|e| e.source())
            .filter(|&s| s != node)
            .collect();
        sources.sort_unstable();
        sources.dedup();
        sources.len()
    }

    fn walk(&self, root: NodeIndex, direction: Direction, max_depth: usize) -> Walk {
        let mut walk = Walk {
            order: Vec::new(),
            parent: HashMap::new(),
        };
        let mut visited: HashSet<NodeIndex> = HashSet::from([root]);
        let mut queue: VecDeque<(NodeIndex, usize)> = VecDeque::from([(root, 0)]);

        while let Some((node, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for next in self.neighbors(node, direction) {
                if !visited.insert(next) {
                    continue;
                }
                walk.parent.insert(next, node);
                walk.order.push((next, depth + 1));
                if depth + 1 < max_depth {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        walk
    }

    /// Breadth-first traversal. Each reachable note appears at most once,
    /// at its shallowest depth. A missing start note yields nothing.
    pub fn traverse(&self, start: &str, direction: Direction, max_depth: usize) -> Vec<TraversalResult> {
        let Some(root) = self.node(start) else {
            return Vec::new();
        };
        let walk = self.walk(root, direction, max_depth);
        walk.order
            .iter()
            .map(|&(node, depth)| TraversalResult {
                depth,
                path_trail: walk.trail(self, node),
                note: self.meta(node).clone(),
            })
            .collect()
    }

    /// Whether `to` is reachable from `from` along outgoing links.
    pub fn has_path(&self, from: &str, to: &str, max_depth: usize) -> bool {
        let (Some(root), Some(goal)) = (self.node(from), self.node(to)) else {
            return false;
        };
        self.walk(root, Direction::Outgoing, max_depth)
            .order
            .iter()
            .any(|&(node, _)| node == goal)
    }

    /// Shortest outgoing trail from `from` to `to`, both ends included.
    pub fn find_path(&self, from: &str, to: &str, max_depth: usize) -> Option<Vec<String>> {
        let root = self.node(from)?;
        let goal = self.node(to)?;
        let walk = self.walk(root, Direction::Outgoing, max_depth);
        walk.order
            .iter()
            .any(|&(node, _)| node == goal)
            .then(|| walk.trail(self, goal))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Graph from `(path, title, links, tags)` tuples, sorted by path.
    pub(crate) fn graph(notes: &[(&str, &str, &[&str], &[&str])]) -> NoteGraph {
        let mut notes: Vec<_> = notes.to_vec();
        notes.sort_by_key(|n| n.0);
        let metas = notes.iter().map(|n| NoteMetadata::new(n.0, n.1)).collect();
        let links = notes
            .iter()
            .map(|n| n.2.iter().map(|s| s.to_string()).collect())
            .collect();
        let tags = notes
            .iter()
            .map(|n| n.3.iter().map(|s| s.to_string()).collect())
            .collect();
        NoteGraph::from_parts(metas, links, tags)
    }

    fn cycle() -> NoteGraph {
        graph(&[
            ("a.md", "A", &["b"], &[]),
            ("b.md", "B", &["c"], &[]),
            ("c.md", "C", &["a", "d"], &[]),
            ("d.md", "D", &[], &[]),
        ])
    }

    fn paths(results: &[TraversalResult]) -> Vec<(&str, usize)> {
        results
            .iter()
            .map(|r| (r.note.path.as_str(), r.depth))
            .collect()
    }

    #[test]
    fn test_traverse_outgoing_with_trails() {
        let g = cycle();
        let results = g.traverse("a.md", Direction::Outgoing, 5);
        assert_eq!(paths(&results), vec![("b.md", 1), ("c.md", 2), ("d.md", 3)]);
        assert_eq!(results[2].path_trail, vec!["a.md", "b.md", "c.md", "d.md"]);
    }

    #[test]
    fn test_traverse_terminates_on_cycles_both() {
        let g = cycle();
        let results = g.traverse("a.md", Direction::Both, 5);
        let mut seen: Vec<&str> = results.iter().map(|r| r.note.path.as_str()).collect();
        let total = seen.len();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), total);
        assert_eq!(seen, vec!["b.md", "c.md", "d.md"]);
    }

    #[test]
    fn test_traverse_depth_limit() {
        let g = cycle();
        assert_eq!(paths(&g.traverse("a.md", Direction::Outgoing, 1)), vec![("b.md", 1)]);
        assert!(g.traverse("a.md", Direction::Outgoing, 0).is_empty());
    }

    #[test]
    fn test_traverse_incoming() {
        let g = cycle();
        let results = g.traverse("d.md", Direction::Incoming, 2);
        assert_eq!(paths(&results), vec![("c.md", 1), ("b.md", 2)]);
    }

    #[test]
    fn test_missing_start_is_empty() {
        let g = cycle();
        assert!(g.traverse("zzz.md", Direction::Both, 3).is_empty());
        assert!(g.outgoing("zzz.md").is_empty());
        assert!(g.incoming("zzz.md").is_empty());
    }

    #[test]
    fn test_has_path_and_find_path() {
        let g = cycle();
        assert!(g.has_path("a.md", "d.md", 5));
        assert!(!g.has_path("a.md", "d.md", 2));
        assert!(!g.has_path("d.md", "a.md", 5));
        assert!(!g.has_path("a.md", "a.md", 5));
        assert_eq!(
            g.find_path("b.md", "a.md", 5),
            Some(vec!["b.md".to_string(), "c.md".to_string(), "a.md".to_string()])
        );
        assert_eq!(g.find_path("d.md", "a.md", 5), None);
    }

    #[test]
    fn test_outgoing_reports_resolution() {
        let g = graph(&[
            ("tech/Docker.md", "Containers", &[], &[]),
            ("x.md", "X", &["Docker", "Missing"], &[]),
        ]);
        let links = g.outgoing("x.md");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].resolved.as_deref(), Some("tech/Docker.md"));
        assert_eq!(links[1].resolved, None);
    }

    #[test]
    fn test_incoming_matches_every_form() {
        let g = graph(&[
            ("a.md", "A", &["tech/Docker.md"], &[]),
            ("b.md", "B", &["containers"], &[]),
            ("c.md", "C", &["DOCKER"], &[]),
            ("d.md", "D", &["Other"], &[]),
            ("tech/Docker.md", "Containers", &[], &[]),
        ]);
        let sources: Vec<String> = g
            .incoming("tech/Docker.md")
            .into_iter()
            .map(|l| l.source)
            .collect();
        assert_eq!(sources, vec!["a.md", "b.md", "c.md"]);
    }

    #[test]
    fn test_mentions_count_as_incoming_but_not_outgoing() {
        // "docker" resolves by title to b.md but also names a/docker.md.
        let g = graph(&[
            ("a/docker.md", "A", &[], &[]),
            ("b.md", "Docker", &[], &[]),
            ("c.md", "C", &["docker"], &[]),
        ]);
        assert_eq!(g.incoming("a/docker.md").len(), 1);
        assert_eq!(paths(&g.traverse("c.md", Direction::Outgoing, 1)), vec![("b.md", 1)]);
    }
}
