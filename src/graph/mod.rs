//! Link graph over indexed notes.
//!
//! `NoteGraph::load` reads one index snapshot and builds a petgraph
//! `DiGraph` whose edges come from resolved wiki-links. The graph is
//! rebuilt per call and never cached.

pub mod analysis;
pub mod engine;
pub mod resolver;
pub mod types;

pub use engine::NoteGraph;
pub use resolver::LinkResolver;
pub use types::{
    BrokenLink, Direction, EdgeKind, GraphNode, LinkInfo, OrphanKind, RelatedMethod, RelatedNote,
    TraversalResult,
};
