//! Graph sources: the contract the renderer consumes, and the in-memory
//! streaming graph that the download feed fills in.

use super::types::{ChangeBatch, GraphId, GraphLink, GraphNode, StructuralChange};
use crate::events::{EventBus, GraphReady, Subscription, SubscriptionId};
use petgraph::graph::{DiGraph, NodeIndex};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A graph whose nodes and links arrive over time.
pub trait GraphSource {
    fn id(&self) -> GraphId;

    /// Depth of the deepest level this graph is expected to reach
    fn max_depth(&self) -> u32;

    fn node(&self, id: &str) -> Option<&GraphNode>;

    fn for_each_node(&self, f: &mut dyn FnMut(&GraphNode));

    fn for_each_link(&self, f: &mut dyn FnMut(&GraphLink));

    /// True once the source has delivered everything
    fn is_loaded(&self) -> bool;

    /// Subscribe to structural changes made after this call
    fn subscribe_changes(&self) -> Subscription<ChangeBatch>;

    fn unsubscribe_changes(&self, id: SubscriptionId);
}

/// Shared handle to the graph being rendered
pub type SharedGraph = Rc<RefCell<dyn GraphSource>>;

/// Graph built incrementally from a download stream
pub struct StreamingGraph {
    id: GraphId,
    max_depth: u32,
    graph: DiGraph<GraphNode, GraphLink>,
    /// Node id -> index in `graph`
    index: HashMap<String, NodeIndex>,
    changes: EventBus<ChangeBatch>,
    loaded: bool,
}

impl StreamingGraph {
    pub fn new(max_depth: u32) -> Self {
        Self {
            id: GraphId::next(),
            max_depth,
            graph: DiGraph::new(),
            index: HashMap::new(),
            changes: EventBus::new(),
            loaded: false,
        }
    }

    pub fn into_shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Live subscriptions to structural changes
    pub fn change_subscriber_count(&self) -> usize {
        self.changes.subscriber_count()
    }

    pub fn add_node(&mut self, node: GraphNode) -> bool {
        !self.apply(vec![StructuralChange::NodeAdded(node)]).is_empty()
    }

    pub fn add_link(&mut self, link: GraphLink) -> bool {
        !self.apply(vec![StructuralChange::LinkAdded(link)]).is_empty()
    }

    /// Apply a batch of changes and publish the accepted ones as one notification.
    ///
    /// Duplicate nodes, duplicate links and links to unknown nodes are dropped.
    /// Returns the accepted changes.
    pub fn apply(&mut self, changes: ChangeBatch) -> ChangeBatch {
        let mut accepted = Vec::with_capacity(changes.len());
        for change in changes {
            let ok = match &change {
                StructuralChange::NodeAdded(node) => self.insert_node(node),
                StructuralChange::LinkAdded(link) => self.insert_link(link),
            };
            if ok {
                accepted.push(change);
            }
        }
        if !accepted.is_empty() {
            self.changes.publish(accepted.clone());
        }
        accepted
    }

    /// Mark the graph complete and announce it on the host channel
    pub fn finish_loading(&mut self, ready: &EventBus<GraphReady>) {
        if self.loaded {
            return;
        }
        self.loaded = true;
        tracing::info!(
            nodes = self.node_count(),
            links = self.link_count(),
            "graph finished loading"
        );
        ready.publish(GraphReady(self.id));
    }

    fn insert_node(&mut self, node: &GraphNode) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        let idx = self.graph.add_node(node.clone());
        self.index.insert(node.id.clone(), idx);
        true
    }

    fn insert_link(&mut self, link: &GraphLink) -> bool {
        let (Some(&from), Some(&to)) = (self.index.get(&link.from_id), self.index.get(&link.to_id)) else {
            return false;
        };
        if self.graph.contains_edge(from, to) {
            return false;
        }
        self.graph.add_edge(from, to, link.clone());
        true
    }
}

impl GraphSource for StreamingGraph {
    fn id(&self) -> GraphId {
        self.id
    }

    fn max_depth(&self) -> u32 {
        self.max_depth
    }

    fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    fn for_each_node(&self, f: &mut dyn FnMut(&GraphNode)) {
        for node in self.graph.raw_nodes() {
            f(&node.weight);
        }
    }

    fn for_each_link(&self, f: &mut dyn FnMut(&GraphLink)) {
        for edge in self.graph.raw_edges() {
            f(&edge.weight);
        }
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn subscribe_changes(&self) -> Subscription<ChangeBatch> {
        self.changes.subscribe()
    }

    fn unsubscribe_changes(&self, id: SubscriptionId) {
        self.changes.unsubscribe(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_and_dangling_links_are_dropped() {
        let mut graph = StreamingGraph::new(2);
        assert!(graph.add_node(GraphNode::new("A", 0)));
        assert!(!graph.add_node(GraphNode::new("A", 1)));
        assert!(!graph.add_link(GraphLink::new("A", "missing")));

        graph.add_node(GraphNode::new("B", 1));
        assert!(graph.add_link(GraphLink::new("A", "B")));
        assert!(!graph.add_link(GraphLink::new("A", "B")));

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.link_count(), 1);
        assert_eq!(graph.node("A").map(|n| n.depth), Some(0));
    }

    #[test]
    fn test_subscribers_see_only_accepted_changes() {
        let mut graph = StreamingGraph::new(1);
        graph.add_node(GraphNode::new("early", 0));
        let sub = graph.subscribe_changes();

        graph.apply(vec![
            StructuralChange::NodeAdded(GraphNode::new("early", 0)),
            StructuralChange::NodeAdded(GraphNode::new("late", 1)),
            StructuralChange::LinkAdded(GraphLink::new("early", "late")),
        ]);

        let batches = sub.drain();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0],
            vec![
                StructuralChange::NodeAdded(GraphNode::new("late", 1)),
                StructuralChange::LinkAdded(GraphLink::new("early", "late")),
            ]
        );
    }

    #[test]
    fn test_finish_loading_publishes_once() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        let mut graph = StreamingGraph::new(1);

        graph.finish_loading(&bus);
        graph.finish_loading(&bus);

        assert!(graph.is_loaded());
        assert_eq!(sub.drain(), vec![GraphReady(graph.id())]);
    }
}
