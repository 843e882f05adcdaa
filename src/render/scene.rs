//! Scene elements and the retained in-memory scene the host paints.

use super::style::NodeUiAttributes;
use egui::{Pos2, Rect, Vec2};
use std::collections::BTreeMap;

/// Identity of one scene element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

/// Labeled rounded rectangle representing a graph node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeElement {
    pub label: String,
    /// Prominence from depth, 1 for the root
    pub d_ratio: f32,
    /// Geometry relative to `translate`
    pub attributes: NodeUiAttributes,
    pub translate: Pos2,
}

impl NodeElement {
    /// Box in graph coordinates
    pub fn bounds(&self) -> Rect {
        let a = &self.attributes;
        Rect::from_min_size(self.translate + Vec2::new(a.x, a.y), Vec2::new(a.width, a.height))
    }
}

/// Line segment representing a graph link
#[derive(Debug, Clone, PartialEq)]
pub struct LinkElement {
    pub from: Pos2,
    pub to: Pos2,
    /// Drawn fraction of the segment, 0..=1
    pub reveal: f32,
    pub width: f32,
}

impl LinkElement {
    /// End of the drawn part of the segment
    pub fn visible_end(&self) -> Pos2 {
        self.from + (self.to - self.from) * self.reveal.clamp(0.0, 1.0)
    }

    fn distance_to(&self, pos: Pos2) -> f32 {
        let end = self.visible_end();
        let seg = end - self.from;
        let len_sq = seg.length_sq();
        if len_sq <= f32::EPSILON {
            return pos.distance(self.from);
        }
        let t = ((pos - self.from).dot(seg) / len_sq).clamp(0.0, 1.0);
        pos.distance(self.from + seg * t)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Node(NodeElement),
    Link(LinkElement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneElement {
    pub kind: ElementKind,
    pub hovered: bool,
}

/// Scene element builder consumed by the renderer
pub trait Scene {
    fn create_node(&mut self, element: NodeElement) -> ElementId;

    fn create_link(&mut self, element: LinkElement) -> ElementId;

    /// Move a node element
    fn set_translate(&mut self, id: ElementId, pos: Pos2);

    fn set_link_geometry(&mut self, id: ElementId, from: Pos2, to: Pos2, reveal: f32);

    fn set_hovered(&mut self, id: ElementId, hovered: bool);

    /// Drop the hover state of every element
    fn clear_hovered(&mut self);

    fn remove(&mut self, id: ElementId);

    /// Remove every element
    fn clear(&mut self);

    /// Topmost element under `pos` (graph coordinates). Nodes sit above links.
    fn hit_test(&self, pos: Pos2, tolerance: f32) -> Option<ElementId>;
}

/// Scene kept in memory, painted by the host every frame
#[derive(Debug, Default)]
pub struct RetainedScene {
    next_id: u64,
    elements: BTreeMap<ElementId, SceneElement>,
}

impl RetainedScene {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, kind: ElementKind) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.elements.insert(
            id,
            SceneElement {
                kind,
                hovered: false,
            },
        );
        id
    }

    pub fn get(&self, id: ElementId) -> Option<&SceneElement> {
        self.elements.get(&id)
    }

    pub fn node(&self, id: ElementId) -> Option<&NodeElement> {
        match &self.elements.get(&id)?.kind {
            ElementKind::Node(node) => Some(node),
            ElementKind::Link(_) => None,
        }
    }

    pub fn link(&self, id: ElementId) -> Option<&LinkElement> {
        match &self.elements.get(&id)?.kind {
            ElementKind::Link(link) => Some(link),
            ElementKind::Node(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements in creation order
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &SceneElement)> {
        self.elements.iter().map(|(id, el)| (*id, el))
    }

    pub fn hovered(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements
            .iter()
            .filter(|(_, el)| el.hovered)
            .map(|(id, _)| *id)
    }
}

impl Scene for RetainedScene {
    fn create_node(&mut self, element: NodeElement) -> ElementId {
        self.insert(ElementKind::Node(element))
    }

    fn create_link(&mut self, element: LinkElement) -> ElementId {
        self.insert(ElementKind::Link(element))
    }

    fn set_translate(&mut self, id: ElementId, pos: Pos2) {
        if let Some(SceneElement {
            kind: ElementKind::Node(node),
            ..
        }) = self.elements.get_mut(&id)
        {
            node.translate = pos;
        }
    }

    fn set_link_geometry(&mut self, id: ElementId, from: Pos2, to: Pos2, reveal: f32) {
        if let Some(SceneElement {
            kind: ElementKind::Link(link),
            ..
        }) = self.elements.get_mut(&id)
        {
            link.from = from;
            link.to = to;
            link.reveal = reveal;
        }
    }

    fn set_hovered(&mut self, id: ElementId, hovered: bool) {
        if let Some(el) = self.elements.get_mut(&id) {
            el.hovered = hovered;
        }
    }

    fn clear_hovered(&mut self) {
        for el in self.elements.values_mut() {
            el.hovered = false;
        }
    }

    fn remove(&mut self, id: ElementId) {
        self.elements.remove(&id);
    }

    fn clear(&mut self) {
        self.elements.clear();
    }

    fn hit_test(&self, pos: Pos2, tolerance: f32) -> Option<ElementId> {
        let node_hit = self.elements.iter().rev().find_map(|(id, el)| match &el.kind {
            ElementKind::Node(node) if node.bounds().contains(pos) => Some(*id),
            _ => None,
        });
        node_hit.or_else(|| {
            self.elements
                .iter()
                .rev()
                .filter_map(|(id, el)| match &el.kind {
                    ElementKind::Link(link) => {
                        let d = link.distance_to(pos);
                        (d <= tolerance.max(link.width / 2.0)).then_some((*id, d))
                    }
                    ElementKind::Node(_) => None,
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(id, _)| id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_at(x: f32, y: f32) -> NodeElement {
        NodeElement {
            label: "n".into(),
            d_ratio: 0.0,
            attributes: NodeUiAttributes {
                font_size: 12.0,
                width: 20.0,
                height: 10.0,
                x: -10.0,
                y: -5.0,
                rx: 2.0,
                ry: 2.0,
                px: -8.0,
                py: 3.0,
                stroke_width: 1.0,
            },
            translate: Pos2::new(x, y),
        }
    }

    fn link(from: Pos2, to: Pos2) -> LinkElement {
        LinkElement {
            from,
            to,
            reveal: 1.0,
            width: 2.0,
        }
    }

    #[test]
    fn test_hit_test_prefers_nodes_over_links() {
        let mut scene = RetainedScene::new();
        let l = scene.create_link(link(Pos2::new(-100.0, 0.0), Pos2::new(100.0, 0.0)));
        let n = scene.create_node(node_at(0.0, 0.0));

        assert_eq!(scene.hit_test(Pos2::new(0.0, 0.0), 3.0), Some(n));
        assert_eq!(scene.hit_test(Pos2::new(50.0, 2.0), 3.0), Some(l));
        assert_eq!(scene.hit_test(Pos2::new(50.0, 20.0), 3.0), None);
    }

    #[test]
    fn test_unrevealed_part_of_link_is_not_hit() {
        let mut scene = RetainedScene::new();
        let id = scene.create_link(link(Pos2::new(0.0, 0.0), Pos2::new(100.0, 0.0)));
        scene.set_link_geometry(id, Pos2::new(0.0, 0.0), Pos2::new(100.0, 0.0), 0.5);

        assert_eq!(scene.hit_test(Pos2::new(25.0, 0.0), 1.0), Some(id));
        assert_eq!(scene.hit_test(Pos2::new(75.0, 0.0), 1.0), None);
    }

    #[test]
    fn test_translate_and_hover() {
        let mut scene = RetainedScene::new();
        let a = scene.create_node(node_at(0.0, 0.0));
        let b = scene.create_node(node_at(0.0, 0.0));

        scene.set_translate(a, Pos2::new(40.0, 40.0));
        assert_eq!(scene.node(a).map(|n| n.translate), Some(Pos2::new(40.0, 40.0)));

        scene.set_hovered(a, true);
        scene.set_hovered(b, true);
        assert_eq!(scene.hovered().count(), 2);
        scene.clear_hovered();
        assert_eq!(scene.hovered().count(), 0);

        scene.remove(a);
        assert!(scene.get(a).is_none());
        scene.clear();
        assert!(scene.is_empty());
    }
}
