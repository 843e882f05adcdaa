//! Keeps scene elements in step with graph nodes and layout positions.

use super::scene::{ElementId, NodeElement, Scene};
use super::style::{d_ratio, NodeStyle};
use super::text::TextMeasure;
use crate::graph::GraphNode;
use crate::layout::LayoutEngine;
use indexmap::IndexMap;

/// Owner of the scene and of the node id -> element registry
pub struct SceneSynchronizer<S> {
    scene: S,
    measure: Box<dyn TextMeasure>,
    style: NodeStyle,
    /// Visual nodes of the current render cycle, in creation order
    nodes: IndexMap<String, ElementId>,
}

impl<S: Scene> SceneSynchronizer<S> {
    pub fn new(scene: S, measure: Box<dyn TextMeasure>, style: NodeStyle) -> Self {
        Self {
            scene,
            measure,
            style,
            nodes: IndexMap::new(),
        }
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn set_style(&mut self, style: NodeStyle) {
        self.style = style;
    }

    /// Forget the registry without touching the scene
    pub fn reset_registry(&mut self) {
        self.nodes = IndexMap::new();
    }

    /// Remove every element and forget the registry
    pub fn clear(&mut self) {
        self.scene.clear();
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn element_for(&self, node_id: &str) -> Option<ElementId> {
        self.nodes.get(node_id).copied()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Create the visual for `node` and register it with the layout in one step.
    ///
    /// Returns `None` if the node already has a visual in this cycle.
    pub fn add_node(
        &mut self,
        node: &GraphNode,
        max_depth: u32,
        layout: &mut dyn LayoutEngine,
    ) -> Option<ElementId> {
        if self.nodes.contains_key(&node.id) {
            return None;
        }

        let ratio = d_ratio(node.depth, max_depth);
        if node.is_root() {
            layout.pin_node(node);
        }

        let attributes = self.style.attributes(&node.id, ratio, self.measure.as_ref());
        layout.add_node(&node.id, &attributes);

        let element = self.scene.create_node(NodeElement {
            label: node.id.clone(),
            d_ratio: ratio,
            attributes,
            translate: layout.node_position(&node.id),
        });
        self.nodes.insert(node.id.clone(), element);
        tracing::trace!(id = %node.id, depth = node.depth, d_ratio = ratio, "node added");
        Some(element)
    }

    /// Move every visual node to its current layout position
    pub fn update_positions(&mut self, layout: &dyn LayoutEngine) {
        for (id, element) in &self.nodes {
            self.scene.set_translate(*element, layout.node_position(id));
        }
    }
}
