//! The render coordinator.
//!
//! Sequences graph construction, layout convergence and scene updates into one
//! cancelable pipeline. The host drives it with [`RenderCoordinator::tick`]
//! once per display refresh; every event source (graph changes, graph ready,
//! layout ready) is drained at the start of a tick, so nodes are always
//! registered before the frame asks for their positions.

use super::frame::FrameScheduler;
use super::interaction::InteractionManager;
use super::scene::Scene;
use super::style::NodeStyle;
use super::sync::SceneSynchronizer;
use super::text::TextMeasure;
use crate::events::{GraphReady, HostBus, Subscription};
use crate::graph::{ChangeBatch, GraphId, GraphNode, SharedGraph, StructuralChange};
use crate::layout::{LayoutEngine, LayoutEvent, LayoutFactory};
use crate::progress::SharedProgress;
use egui::Pos2;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("renderer has been disposed")]
    Disposed,
}

/// Everything that belongs to one `render()` call
struct ActiveCycle {
    graph: SharedGraph,
    graph_id: GraphId,
    max_depth: u32,
    layout: Box<dyn LayoutEngine>,
    layout_ready: Subscription<LayoutEvent>,
    changes: Subscription<ChangeBatch>,
    /// The graph-ready signal has been applied to this cycle
    graph_ready: bool,
    /// Present once the layout is ready
    interaction: Option<InteractionManager>,
}

enum RenderCycle {
    Idle,
    Active(ActiveCycle),
    Disposed,
}

pub struct RenderCoordinator<S> {
    sync: SceneSynchronizer<S>,
    progress: SharedProgress,
    bus: HostBus,
    layout_factory: LayoutFactory,
    graph_ready: Option<Subscription<GraphReady>>,
    frames: FrameScheduler,
    cycle: RenderCycle,
}

impl<S: Scene> RenderCoordinator<S> {
    pub fn new(
        scene: S,
        measure: Box<dyn TextMeasure>,
        style: NodeStyle,
        progress: SharedProgress,
        bus: HostBus,
        layout_factory: LayoutFactory,
    ) -> Self {
        let graph_ready = bus.graph_ready.subscribe();
        Self {
            sync: SceneSynchronizer::new(scene, measure, style),
            progress,
            bus,
            layout_factory,
            graph_ready: Some(graph_ready),
            frames: FrameScheduler::new(),
            cycle: RenderCycle::Idle,
        }
    }

    pub fn scene(&self) -> &S {
        self.sync.scene()
    }

    pub fn synchronizer(&self) -> &SceneSynchronizer<S> {
        &self.sync
    }

    pub fn progress(&self) -> &SharedProgress {
        &self.progress
    }

    /// Takes effect on the next `render()`
    pub fn set_layout_factory(&mut self, factory: LayoutFactory) {
        self.layout_factory = factory;
    }

    /// Takes effect for nodes added from now on
    pub fn set_node_style(&mut self, style: NodeStyle) {
        self.sync.set_style(style);
    }

    pub fn active_graph(&self) -> Option<GraphId> {
        match &self.cycle {
            RenderCycle::Active(cycle) => Some(cycle.graph_id),
            RenderCycle::Idle | RenderCycle::Disposed => None,
        }
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.cycle, RenderCycle::Disposed)
    }

    pub fn is_frame_pending(&self) -> bool {
        self.frames.is_pending()
    }

    /// True once links are drawn and pointer input is handled
    pub fn is_interactive(&self) -> bool {
        matches!(&self.cycle, RenderCycle::Active(cycle) if cycle.interaction.is_some())
    }

    pub fn interaction(&self) -> Option<&InteractionManager> {
        match &self.cycle {
            RenderCycle::Active(cycle) => cycle.interaction.as_ref(),
            RenderCycle::Idle | RenderCycle::Disposed => None,
        }
    }

    pub fn layout(&self) -> Option<&dyn LayoutEngine> {
        match &self.cycle {
            RenderCycle::Active(cycle) => Some(cycle.layout.as_ref()),
            RenderCycle::Idle | RenderCycle::Disposed => None,
        }
    }

    /// Start a fresh visualization of `graph`, replacing the current one
    pub fn render(&mut self, graph: SharedGraph) -> Result<(), RenderError> {
        if self.is_disposed() {
            return Err(RenderError::Disposed);
        }
        self.clear_last_scene();

        let (graph_id, max_depth, already_loaded) = {
            let g = graph.borrow();
            (g.id(), g.max_depth(), g.is_loaded())
        };
        let mut layout = (self.layout_factory)(&graph, &self.progress);
        let layout_ready = layout.subscribe_ready();

        self.sync.reset_registry();
        let mut existing: Vec<GraphNode> = Vec::new();
        graph.borrow().for_each_node(&mut |node| existing.push(node.clone()));
        for node in &existing {
            self.sync.add_node(node, max_depth, layout.as_mut());
        }
        let changes = graph.borrow().subscribe_changes();

        tracing::info!(?graph_id, nodes = existing.len(), max_depth, "render started");
        self.cycle = RenderCycle::Active(ActiveCycle {
            graph,
            graph_id,
            max_depth,
            layout,
            layout_ready,
            changes,
            graph_ready: false,
            interaction: None,
        });

        // A graph that finished loading before render() will never announce it again
        if already_loaded {
            self.on_graph_ready(graph_id);
        }

        self.frames.cancel();
        self.frames.request();
        Ok(())
    }

    /// Process pending events, then run the frame if one is due.
    ///
    /// Returns true while the host should keep refreshing.
    pub fn tick(&mut self) -> bool {
        self.pump();
        if self.frames.take_due().is_some() {
            self.frame();
            self.pump();
        }

        let mut animating = false;
        if let RenderCycle::Active(cycle) = &mut self.cycle {
            if let Some(interaction) = &mut cycle.interaction {
                animating = interaction.animate(&mut self.sync, cycle.layout.as_ref());
            }
        }
        self.frames.is_pending() || animating
    }

    /// Drain every inbox: graph ready, graph changes, layout ready
    pub fn pump(&mut self) {
        let ready: Vec<GraphReady> = self
            .graph_ready
            .as_ref()
            .map(|sub| sub.drain())
            .unwrap_or_default();
        for GraphReady(id) in ready {
            self.on_graph_ready(id);
        }

        let RenderCycle::Active(cycle) = &self.cycle else {
            return;
        };
        let batches = cycle.changes.drain();
        let layout_events = cycle.layout_ready.drain();

        for changes in batches {
            self.on_graph_structure_changed(&changes);
        }
        if layout_events.contains(&LayoutEvent::Ready) {
            self.draw_links();
        }
    }

    /// One step of the layout plus a full position refresh
    fn frame(&mut self) {
        let RenderCycle::Active(cycle) = &mut self.cycle else {
            return;
        };
        if cycle.layout.step() {
            self.frames.request();
        }
        // Always refresh, so the converged positions are the ones on screen
        self.sync.update_positions(cycle.layout.as_ref());
        if let Some(interaction) = &cycle.interaction {
            interaction.update_positions(&mut self.sync, cycle.layout.as_ref());
        }
    }

    fn on_graph_ready(&mut self, id: GraphId) {
        match &mut self.cycle {
            RenderCycle::Active(cycle) if cycle.graph_id == id => {
                if cycle.graph_ready {
                    tracing::debug!(graph_id = ?id, "graph already ready");
                    return;
                }
                cycle.graph_ready = true;
                tracing::info!(graph_id = ?id, "graph ready, starting layout");
                cycle.layout.set_graph_ready();
                self.progress.borrow_mut().start_layout();
            }
            _ => tracing::debug!(graph_id = ?id, "ignoring ready signal for inactive graph"),
        }
    }

    fn on_graph_structure_changed(&mut self, changes: &[StructuralChange]) {
        let RenderCycle::Active(cycle) = &mut self.cycle else {
            return;
        };
        for change in changes {
            if let StructuralChange::NodeAdded(node) = change {
                self.sync.add_node(node, cycle.max_depth, cycle.layout.as_mut());
            }
        }
    }

    /// Layout converged: finish progress and make the scene interactive
    fn draw_links(&mut self) {
        let RenderCycle::Active(cycle) = &mut self.cycle else {
            return;
        };
        self.progress.borrow_mut().done();
        if let Some(previous) = cycle.interaction.take() {
            previous.dispose(&mut self.sync);
        }
        let interaction = InteractionManager::new(
            &*cycle.graph.borrow(),
            cycle.layout.as_ref(),
            &mut self.sync,
            self.bus.ui.clone(),
        );
        tracing::info!(links = interaction.link_count(), "layout ready, scene interactive");
        cycle.interaction = Some(interaction);
    }

    /// Pointer moved to `graph_pos` (graph coordinates) / `screen_pos`.
    /// Ignored until the scene is interactive.
    pub fn pointer_moved(&mut self, graph_pos: Pos2, screen_pos: Pos2, tolerance: f32) {
        let RenderCycle::Active(ActiveCycle {
            interaction: Some(interaction),
            ..
        }) = &self.cycle
        else {
            return;
        };
        let target = self.sync.scene().hit_test(graph_pos, tolerance);
        interaction.on_pointer_move(&mut self.sync, target, screen_pos);
    }

    /// Pointer left the canvas
    pub fn pointer_left(&mut self) {
        if let RenderCycle::Active(ActiveCycle {
            interaction: Some(interaction),
            ..
        }) = &self.cycle
        {
            interaction.on_pointer_move(&mut self.sync, None, Pos2::ZERO);
        }
    }

    /// Click at `graph_pos`. Ignored until the scene is interactive.
    pub fn clicked(&mut self, graph_pos: Pos2, tolerance: f32) {
        let RenderCycle::Active(ActiveCycle {
            interaction: Some(interaction),
            ..
        }) = &self.cycle
        else {
            return;
        };
        let target = self.sync.scene().hit_test(graph_pos, tolerance);
        interaction.on_click(target);
    }

    /// Tear down the current cycle. Safe to call with no active cycle.
    pub fn clear_last_scene(&mut self) {
        self.frames.cancel();
        let previous = match std::mem::replace(&mut self.cycle, RenderCycle::Idle) {
            RenderCycle::Disposed => {
                self.cycle = RenderCycle::Disposed;
                None
            }
            RenderCycle::Idle => None,
            RenderCycle::Active(cycle) => Some(cycle),
        };

        if let Some(cycle) = previous {
            cycle.layout.unsubscribe_ready(cycle.layout_ready.id());
            cycle.graph.borrow().unsubscribe_changes(cycle.changes.id());
            if let Some(interaction) = cycle.interaction {
                interaction.dispose(&mut self.sync);
            }
            tracing::debug!(graph_id = ?cycle.graph_id, "previous render torn down");
        }
        self.sync.clear();
    }

    /// Tear everything down for good
    pub fn dispose(&mut self) {
        self.clear_last_scene();
        if let Some(sub) = self.graph_ready.take() {
            self.bus.graph_ready.unsubscribe(sub.id());
        }
        self.cycle = RenderCycle::Disposed;
        tracing::info!("renderer disposed");
    }
}
