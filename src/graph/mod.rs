//! Streamed graph data: types, the graph source and the demo download feed.

pub mod feed;
pub mod source;
pub mod types;

pub use feed::{DemoFeed, FeedConfig, FeedError, FeedMessage};
pub use source::{GraphSource, SharedGraph, StreamingGraph};
pub use types::{ChangeBatch, GraphId, GraphLink, GraphNode, StructuralChange};
