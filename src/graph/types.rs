//! Graph data types shared by the source, the layout and the renderer.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of one graph instance.
///
/// Graph-ready notifications are keyed by this id so that signals for a
/// superseded graph can be told apart from the active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphId(u64);

impl GraphId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A node of the streamed graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    /// Distance from the root (0 = root)
    pub depth: u32,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, depth: u32) -> Self {
        Self {
            id: id.into(),
            depth,
        }
    }

    pub fn is_root(&self) -> bool {
        self.depth == 0
    }
}

/// A directed link between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphLink {
    pub from_id: String,
    pub to_id: String,
}

impl GraphLink {
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
        }
    }
}

/// One incremental mutation of a graph
#[derive(Debug, Clone, PartialEq)]
pub enum StructuralChange {
    NodeAdded(GraphNode),
    LinkAdded(GraphLink),
}

/// Ordered sequence of changes published in one notification
pub type ChangeBatch = Vec<StructuralChange>;
