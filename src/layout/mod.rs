//! Layout engines: the contract the renderer drives, and the force-directed
//! implementation.

pub mod force;
pub mod quadtree;

pub use force::{ForceLayoutEngine, ForceParams};

use crate::events::{Subscription, SubscriptionId};
use crate::graph::{GraphNode, SharedGraph};
use crate::progress::SharedProgress;
use crate::render::style::NodeUiAttributes;
use egui::Pos2;

/// Events raised by a layout engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutEvent {
    /// The layout has converged on a complete graph
    Ready,
}

/// Incremental layout of one graph.
///
/// Nodes must be registered with [`LayoutEngine::add_node`] before their
/// position is queried.
pub trait LayoutEngine {
    fn subscribe_ready(&self) -> Subscription<LayoutEvent>;

    fn unsubscribe_ready(&self, id: SubscriptionId);

    /// Advance the layout by one bounded increment. Returns true while more
    /// iterations are needed.
    fn step(&mut self) -> bool;

    /// Register a node together with its on-screen box
    fn add_node(&mut self, id: &str, attributes: &NodeUiAttributes);

    /// Fix a node at its designated position, exempt from the simulation
    fn pin_node(&mut self, node: &GraphNode);

    fn is_pinned(&self, id: &str) -> bool;

    /// No more nodes or links will arrive
    fn set_graph_ready(&mut self);

    fn node_position(&self, id: &str) -> Pos2;
}

/// Builds the layout engine for one render cycle
pub type LayoutFactory = Box<dyn Fn(&SharedGraph, &SharedProgress) -> Box<dyn LayoutEngine>>;
