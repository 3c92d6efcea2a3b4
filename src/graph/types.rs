//! Graph types: directions, traversal results, and derived views.
//!
//! Everything here is computed per request and never persisted.

use std::str::FromStr;

use serde::Serialize;

use crate::index::NoteMetadata;

/// Which edges a traversal follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
    Both,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "incoming" | "in" => Ok(Direction::Incoming),
            "outgoing" | "out" => Ok(Direction::Outgoing),
            "both" => Ok(Direction::Both),
            other => Err(format!(
                "unknown direction '{}', expected incoming, outgoing or both",
                other
            )),
        }
    }
}

/// How an edge came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Source's raw target resolves to the destination.
    Resolves,
    /// Source's raw target names the destination by path, title or stem,
    /// without the destination being the resolver's pick.
    Mentions,
}

/// One node reached by a traversal.
#[derive(Debug, Clone, Serialize)]
pub struct TraversalResult {
    pub depth: usize,
    /// Paths from the root to this node, inclusive at both ends.
    pub path_trail: Vec<String>,
    pub note: NoteMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelatedMethod {
    Links,
    Tags,
    Both,
}

impl RelatedMethod {
    pub(crate) fn uses_links(self) -> bool {
        matches!(self, RelatedMethod::Links | RelatedMethod::Both)
    }

    pub(crate) fn uses_tags(self) -> bool {
        matches!(self, RelatedMethod::Tags | RelatedMethod::Both)
    }
}

impl FromStr for RelatedMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "links" => Ok(RelatedMethod::Links),
            "tags" => Ok(RelatedMethod::Tags),
            "both" => Ok(RelatedMethod::Both),
            other => Err(format!(
                "unknown method '{}', expected links, tags or both",
                other
            )),
        }
    }
}

/// A note ranked by similarity to another.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedNote {
    pub note: NoteMetadata,
    /// Sum of per-method Jaccard scores.
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_links: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanKind {
    NoIncoming,
    NoOutgoing,
    Isolated,
}

impl FromStr for OrphanKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "no_incoming" => Ok(OrphanKind::NoIncoming),
            "no_outgoing" => Ok(OrphanKind::NoOutgoing),
            "isolated" => Ok(OrphanKind::Isolated),
            other => Err(format!(
                "unknown orphan kind '{}', expected no_incoming, no_outgoing or isolated",
                other
            )),
        }
    }
}

/// A stored link, with its resolution if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkInfo {
    pub source: String,
    /// Raw target text as written.
    pub target: String,
    pub resolved: Option<String>,
}

/// A stored link whose target resolves to nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenLink {
    pub source: String,
    pub target: String,
}

/// Derived per-note view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub path: String,
    pub title: String,
    /// Distinct other notes with a link naming this one.
    pub incoming_count: usize,
    /// Stored links, resolved or not.
    pub outgoing_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enums() {
        assert_eq!("BOTH".parse::<Direction>().unwrap(), Direction::Both);
        assert_eq!("out".parse::<Direction>().unwrap(), Direction::Outgoing);
        assert_eq!("no-incoming".parse::<OrphanKind>().unwrap(), OrphanKind::NoIncoming);
        assert_eq!("tags".parse::<RelatedMethod>().unwrap(), RelatedMethod::Tags);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_method_flags() {
        assert!(RelatedMethod::Both.uses_links() && RelatedMethod::Both.uses_tags());
        assert!(!RelatedMethod::Links.uses_tags());
        assert!(!RelatedMethod::Tags.uses_links());
    }
}
