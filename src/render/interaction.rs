//! Links and pointer interaction.
//!
//! Once the layout is ready the manager draws one segment per link, lets the
//! segments grow in from their source node, and turns pointer input on them
//! into tooltip and details events for the host.

use super::scene::{ElementId, LinkElement, Scene};
use super::sync::SceneSynchronizer;
use crate::events::{EventBus, TooltipEvent, UiEvent};
use crate::graph::{GraphLink, GraphSource};
use crate::layout::LayoutEngine;
use egui::Pos2;
use std::collections::HashMap;

/// Share of the full length revealed per animation tick
const REVEAL_PER_TICK: f32 = 0.08;

const LINK_WIDTH: f32 = 2.0;

/// A drawn link and its element
#[derive(Debug, Clone, PartialEq)]
struct LinkInfo {
    link: GraphLink,
    element: ElementId,
}

pub struct InteractionManager {
    /// Element id -> link
    links: HashMap<ElementId, LinkInfo>,
    reveal: f32,
    ui: EventBus<UiEvent>,
}

impl InteractionManager {
    /// Draw every link whose endpoints both have a visual node
    pub fn new<S: Scene>(
        graph: &dyn GraphSource,
        layout: &dyn LayoutEngine,
        sync: &mut SceneSynchronizer<S>,
        ui: EventBus<UiEvent>,
    ) -> Self {
        let mut pending = Vec::new();
        graph.for_each_link(&mut |link| {
            if sync.element_for(&link.from_id).is_some() && sync.element_for(&link.to_id).is_some() {
                pending.push(link.clone());
            }
        });

        let mut links = HashMap::with_capacity(pending.len());
        for link in pending {
            let element = sync.scene_mut().create_link(LinkElement {
                from: layout.node_position(&link.from_id),
                to: layout.node_position(&link.to_id),
                reveal: 0.0,
                width: LINK_WIDTH,
            });
            links.insert(element, LinkInfo { link, element });
        }
        tracing::debug!(links = links.len(), "links drawn");

        Self {
            links,
            reveal: 0.0,
            ui,
        }
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_animating(&self) -> bool {
        self.reveal < 1.0
    }

    /// Grow the links by one tick. Returns true while still growing.
    pub fn animate<S: Scene>(&mut self, sync: &mut SceneSynchronizer<S>, layout: &dyn LayoutEngine) -> bool {
        if !self.is_animating() {
            return false;
        }
        self.reveal = (self.reveal + REVEAL_PER_TICK).min(1.0);
        self.update_positions(sync, layout);
        self.is_animating()
    }

    /// Follow the current layout positions of the endpoints
    pub fn update_positions<S: Scene>(&self, sync: &mut SceneSynchronizer<S>, layout: &dyn LayoutEngine) {
        for info in self.links.values() {
            sync.scene_mut().set_link_geometry(
                info.element,
                layout.node_position(&info.link.from_id),
                layout.node_position(&info.link.to_id),
                self.reveal,
            );
        }
    }

    /// Pointer moved over `target` at screen position `pointer`
    pub fn on_pointer_move<S: Scene>(
        &self,
        sync: &mut SceneSynchronizer<S>,
        target: Option<ElementId>,
        pointer: Pos2,
    ) {
        match target.and_then(|id| self.links.get(&id)) {
            Some(info) => {
                self.ui
                    .publish(UiEvent::ShowTooltip(TooltipEvent::shown(&info.link, pointer.x, pointer.y)));
                self.highlight(sync, info);
            }
            None => {
                self.ui.publish(UiEvent::ShowTooltip(TooltipEvent::hidden()));
                sync.scene_mut().clear_hovered();
            }
        }
    }

    pub fn on_click(&self, target: Option<ElementId>) {
        if let Some(info) = target.and_then(|id| self.links.get(&id)) {
            tracing::debug!(from = %info.link.from_id, to = %info.link.to_id, "link clicked");
            self.ui.publish(UiEvent::ShowDetails(info.link.clone()));
        }
    }

    /// Highlight the link and both endpoints, dropping any previous highlight
    fn highlight<S: Scene>(&self, sync: &mut SceneSynchronizer<S>, info: &LinkInfo) {
        let endpoints = [
            sync.element_for(&info.link.from_id),
            sync.element_for(&info.link.to_id),
        ];
        let scene = sync.scene_mut();
        scene.clear_hovered();
        for element in endpoints.into_iter().flatten() {
            scene.set_hovered(element, true);
        }
        scene.set_hovered(info.element, true);
    }

    /// Remove the link elements and any highlight
    pub fn dispose<S: Scene>(self, sync: &mut SceneSynchronizer<S>) {
        let scene = sync.scene_mut();
        scene.clear_hovered();
        for element in self.links.into_keys() {
            scene.remove(element);
        }
    }
}
