//! Main application state and UI.

use crate::theme;
use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rounding, Stroke, Vec2};
use graph_stream_viz::events::{HostBus, Subscription, TooltipEvent, UiEvent};
use graph_stream_viz::graph::{DemoFeed, GraphLink, GraphSource, StreamingGraph};
use graph_stream_viz::layout::ForceLayoutEngine;
use graph_stream_viz::progress::{Phase, ProgressTracker, SharedProgress};
use graph_stream_viz::render::{
    ElementKind, EguiTextMeasure, RenderCoordinator, RetainedScene, Viewport,
};
use graph_stream_viz::settings::Settings;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

/// Labels smaller than this on screen are not drawn
const MIN_LABEL_PX: f32 = 3.0;

/// What to tell the coordinator about the pointer this frame
#[derive(Debug, Clone, Copy, PartialEq)]
enum PointerAction {
    Move(Pos2),
    Leave,
    Nothing,
}

/// Forwards the pointer only when it moves, enters or leaves the canvas
#[derive(Debug, Default)]
struct PointerForwarding {
    on_canvas: bool,
}

impl PointerForwarding {
    /// `hover` is the pointer position over the canvas, if any
    fn update(&mut self, hover: Option<Pos2>, moved: bool) -> PointerAction {
        match hover {
            Some(pos) if moved || !self.on_canvas => {
                self.on_canvas = true;
                PointerAction::Move(pos)
            }
            Some(_) => PointerAction::Nothing,
            None if self.on_canvas => {
                self.on_canvas = false;
                PointerAction::Leave
            }
            None => PointerAction::Nothing,
        }
    }
}

pub struct VisualizerApp {
    bus: HostBus,
    progress: SharedProgress,
    coordinator: RenderCoordinator<RetainedScene>,

    // Current session
    graph: Option<Rc<RefCell<StreamingGraph>>>,
    feed: Option<DemoFeed>,
    started: bool,

    // Host-side UI state
    ui_events: Subscription<UiEvent>,
    tooltip: Option<TooltipEvent>,
    details: Option<GraphLink>,
    viewport: Viewport,
    pointer: PointerForwarding,

    // Settings persistence
    settings: Settings,
    settings_dirty: bool,
    last_settings_save: Instant,
}

impl VisualizerApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Load saved settings
        let settings = Settings::load();

        let bus = HostBus::new();
        let progress = ProgressTracker::shared();
        let coordinator = RenderCoordinator::new(
            RetainedScene::new(),
            Box::new(EguiTextMeasure::new(cc.egui_ctx.clone())),
            settings.node_style.clone(),
            progress.clone(),
            bus.clone(),
            ForceLayoutEngine::factory(settings.physics.clone()),
        );
        let ui_events = bus.ui.subscribe();

        Self {
            viewport: Viewport::new(settings.initial_view.to_rect()),
            bus,
            progress,
            coordinator,
            graph: None,
            feed: None,
            started: false,
            ui_events,
            tooltip: None,
            details: None,
            pointer: PointerForwarding::default(),
            settings,
            settings_dirty: false,
            last_settings_save: Instant::now(),
        }
    }

    /// Start a new download and render it from scratch
    fn start_session(&mut self) {
        // Dropping the old feed disconnects its worker
        self.feed = None;
        self.tooltip = None;
        self.details = None;
        self.viewport = Viewport::new(self.settings.initial_view.to_rect());

        {
            let mut progress = self.progress.borrow_mut();
            progress.reset();
            progress.start_download();
        }

        let graph = StreamingGraph::new(self.settings.feed.max_depth).into_shared();
        self.feed = Some(DemoFeed::spawn(self.settings.feed.clone()));
        tracing::info!(seed = %self.settings.feed.seed, "session started");

        if let Err(e) = self.coordinator.render(graph.clone()) {
            tracing::warn!("could not start rendering: {e}");
        }
        self.graph = Some(graph);
    }

    /// Mark settings as needing to be saved
    fn mark_settings_dirty(&mut self) {
        self.settings_dirty = true;
    }

    /// Save settings if dirty and enough time has passed (debounce)
    fn maybe_save_settings(&mut self) {
        if self.settings_dirty && self.last_settings_save.elapsed().as_secs() >= 2 {
            self.settings.save();
            self.settings_dirty = false;
            self.last_settings_save = Instant::now();
        }
    }

    fn drain_feed(&mut self) {
        let (Some(feed), Some(graph)) = (self.feed.as_mut(), self.graph.as_ref()) else {
            return;
        };
        feed.drain_into(
            &mut graph.borrow_mut(),
            &mut self.progress.borrow_mut(),
            &self.bus.graph_ready,
        );
    }

    fn drain_ui_events(&mut self) {
        for event in self.ui_events.drain() {
            match event {
                UiEvent::ShowTooltip(tooltip) => {
                    self.tooltip = tooltip.is_visible.then_some(tooltip);
                }
                UiEvent::ShowDetails(link) => self.details = Some(link),
            }
        }
    }

    fn render_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.heading("Graph Stream");
        ui.add_space(10.0);

        let state = self.progress.borrow().snapshot();
        ui.horizontal(|ui| {
            if state.working {
                ui.spinner();
            }
            ui.label(state.phase.label());
        });
        if !state.message.is_empty() {
            ui.label(egui::RichText::new(&state.message).color(theme::text::MUTED));
        }
        if state.phase == Phase::Download {
            ui.label(format!("Remaining: {}", state.download.remaining));
        }
        if state.phase == Phase::Layout {
            ui.label(format!("Iteration: {}", state.layout.iteration));
        }

        let links = self.coordinator.interaction().map_or(0, |i| i.link_count());
        ui.label(format!(
            "Nodes: {}  Links: {}",
            self.coordinator.synchronizer().len(),
            links
        ));

        if !state.download.errors.is_empty() {
            egui::CollapsingHeader::new(format!("Errors ({})", state.download.errors.len()))
                .default_open(false)
                .show(ui, |ui| {
                    for error in &state.download.errors {
                        ui.colored_label(theme::text::ERROR, error);
                    }
                });
        }

        ui.add_space(10.0);

        // Data section
        egui::CollapsingHeader::new("Data")
            .default_open(true)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Seed");
                    if ui.text_edit_singleline(&mut self.settings.feed.seed).changed() {
                        self.mark_settings_dirty();
                    }
                });
                if ui
                    .add(egui::Slider::new(&mut self.settings.feed.max_depth, 0..=4).text("Max depth"))
                    .changed()
                {
                    self.mark_settings_dirty();
                }
                if ui
                    .add(egui::Slider::new(&mut self.settings.feed.fan_out, 1..=12).text("Fan-out"))
                    .changed()
                {
                    self.mark_settings_dirty();
                }
                ui.add_space(5.0);
                if ui.button("⟳ Restart").clicked() {
                    self.start_session();
                }
            });

        // Node style section
        egui::CollapsingHeader::new("Nodes")
            .default_open(false)
            .show(ui, |ui| {
                let style = &mut self.settings.node_style;
                let mut changed = false;
                changed |= ui
                    .add(egui::Slider::new(&mut style.min_font_size, 6.0..=24.0).text("Min font"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut style.font_size_range, 0.0..=48.0).text("Font range"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut style.corner_radius_range, 0.0..=30.0).text("Corner range"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut style.stroke_width_range, 0.0..=8.0).text("Stroke range"))
                    .changed();
                ui.label(egui::RichText::new("Applies to new nodes").color(theme::text::MUTED));

                if changed {
                    self.coordinator.set_node_style(self.settings.node_style.clone());
                    self.mark_settings_dirty();
                }
            });

        // Physics section
        egui::CollapsingHeader::new("Physics")
            .default_open(false)
            .show(ui, |ui| {
                let physics = &mut self.settings.physics;
                let mut changed = false;
                changed |= ui
                    .add(egui::Slider::new(&mut physics.repulsion, 1000.0..=50000.0).text("Repulsion"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut physics.attraction, 0.01..=0.5).text("Attraction"))
                    .changed();
                changed |= ui
                    .add(
                        egui::Slider::new(&mut physics.centering, 0.0..=0.05)
                            .logarithmic(true)
                            .text("Centering"),
                    )
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut physics.size_physics_weight, 0.0..=5.0).text("Size weight"))
                    .changed();
                ui.label(egui::RichText::new("Applies on restart").color(theme::text::MUTED));

                if changed {
                    self.coordinator
                        .set_layout_factory(ForceLayoutEngine::factory(self.settings.physics.clone()));
                    self.mark_settings_dirty();
                }
            });
    }

    fn render_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        self.viewport.handle_input(ui, &response);

        let zoom = self.viewport.zoom();
        let viewport = &self.viewport;
        let scene = self.coordinator.scene();

        // Draw links first (behind nodes)
        for (_, element) in scene.iter() {
            let ElementKind::Link(link) = &element.kind else {
                continue;
            };
            let color = if element.hovered {
                theme::scene::HIGHLIGHT
            } else {
                theme::scene::LINK
            };
            painter.line_segment(
                [viewport.to_screen(link.from), viewport.to_screen(link.visible_end())],
                Stroke::new((link.width * zoom).max(1.0), color),
            );
        }

        for (_, element) in scene.iter() {
            let ElementKind::Node(node) = &element.kind else {
                continue;
            };
            let bounds = node.bounds();
            let rect = egui::Rect::from_min_max(viewport.to_screen(bounds.min), viewport.to_screen(bounds.max));
            let a = &node.attributes;
            let stroke_color = if element.hovered {
                theme::scene::HIGHLIGHT
            } else {
                theme::scene::NODE_STROKE
            };
            painter.rect(
                rect,
                Rounding::same(a.rx * zoom),
                theme::node_fill(node.d_ratio),
                Stroke::new(a.stroke_width * zoom, stroke_color),
            );

            let font_px = a.font_size * zoom;
            if font_px >= MIN_LABEL_PX {
                let baseline = viewport.to_screen(node.translate + Vec2::new(a.px, a.py));
                painter.text(
                    baseline,
                    Align2::LEFT_BOTTOM,
                    &node.label,
                    FontId::proportional(font_px),
                    theme::scene::LABEL,
                );
            }
        }

        // Pointer input is forwarded in graph coordinates
        let tolerance = self.settings.hover_tolerance / zoom;
        let hover = response.hover_pos().filter(|_| !response.dragged());
        let moved = ui.input(|i| i.pointer.delta() != Vec2::ZERO);
        match self.pointer.update(hover, moved) {
            PointerAction::Move(pos) => {
                let graph_pos = self.viewport.to_graph(pos);
                self.coordinator.pointer_moved(graph_pos, pos, tolerance);
            }
            PointerAction::Leave => self.coordinator.pointer_left(),
            PointerAction::Nothing => {}
        }
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let graph_pos = self.viewport.to_graph(pos);
                self.coordinator.clicked(graph_pos, tolerance);
            }
        }

        let state = self.progress.borrow().snapshot();
        if state.working && self.coordinator.synchronizer().is_empty() {
            painter.text(
                response.rect.center(),
                Align2::CENTER_CENTER,
                "Downloading...",
                FontId::proportional(24.0),
                theme::text::PRIMARY,
            );
        }
    }

    fn render_tooltip(&self, painter: &egui::Painter) {
        let Some(tooltip) = &self.tooltip else {
            return;
        };
        let (Some(from), Some(to)) = (&tooltip.from, &tooltip.to) else {
            return;
        };
        let galley = painter.layout_no_wrap(format!("{from} → {to}"), FontId::default(), Color32::WHITE);
        let pos = Pos2::new(tooltip.x, tooltip.y) + Vec2::new(12.0, 12.0);
        let rect = egui::Rect::from_min_size(pos, galley.size() + Vec2::splat(16.0));
        painter.rect_filled(rect, 4.0, theme::bg::SURFACE);
        painter.galley(pos + Vec2::splat(8.0), galley, Color32::WHITE);
    }

    fn render_details(&mut self, ctx: &egui::Context) {
        let Some(link) = self.details.clone() else {
            return;
        };
        let depth_of = |id: &str| -> Option<u32> {
            let graph = self.graph.as_ref()?.borrow();
            let depth = graph.node(id).map(|n| n.depth);
            depth
        };
        let from_depth = depth_of(&link.from_id);
        let to_depth = depth_of(&link.to_id);

        let mut open = true;
        egui::Window::new("Link")
            .open(&mut open)
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                egui::Grid::new("link_details").num_columns(2).show(ui, |ui| {
                    ui.label("From");
                    ui.label(&link.from_id);
                    ui.end_row();
                    ui.label("Depth");
                    ui.label(from_depth.map_or("-".to_string(), |d| d.to_string()));
                    ui.end_row();
                    ui.label("To");
                    ui.label(&link.to_id);
                    ui.end_row();
                    ui.label("Depth");
                    ui.label(to_depth.map_or("-".to_string(), |d| d.to_string()));
                    ui.end_row();
                });
            });
        if !open {
            self.details = None;
        }
    }
}

impl eframe::App for VisualizerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.maybe_save_settings();

        // Fonts are only available from the first frame on, and node boxes are measured
        if !self.started {
            self.started = true;
            self.start_session();
        }

        self.drain_feed();
        let busy = self.coordinator.tick();
        self.drain_ui_events();

        // Keep refreshing while the layout runs, links animate, or data streams in
        let streaming = self.feed.as_ref().is_some_and(|f| !f.is_finished());
        if busy || streaming {
            ctx.request_repaint();
        }

        // Dark theme
        ctx.set_visuals(egui::Visuals::dark());

        egui::SidePanel::left("sidebar")
            .min_width(220.0)
            .frame(egui::Frame::side_top_panel(&ctx.style()).fill(theme::bg::PANEL))
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.render_sidebar(ui);
                });
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(theme::bg::CANVAS))
            .show(ctx, |ui| {
                self.render_canvas(ui);
                self.render_tooltip(ui.painter());
            });

        self.render_details(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.coordinator.dispose();
        self.feed = None;

        // Force save settings on exit
        if self.settings_dirty {
            self.settings.save();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_forwarded_on_enter_and_move_only() {
        let mut pointer = PointerForwarding::default();
        let p = Pos2::new(10.0, 20.0);

        assert_eq!(pointer.update(None, false), PointerAction::Nothing);
        assert_eq!(pointer.update(Some(p), false), PointerAction::Move(p));
        assert_eq!(pointer.update(Some(p), false), PointerAction::Nothing);
        assert_eq!(pointer.update(Some(p), true), PointerAction::Move(p));
    }

    #[test]
    fn test_pointer_leave_sent_once() {
        let mut pointer = PointerForwarding::default();
        pointer.update(Some(Pos2::ZERO), true);

        assert_eq!(pointer.update(None, true), PointerAction::Leave);
        assert_eq!(pointer.update(None, false), PointerAction::Nothing);
        assert_eq!(pointer.update(None, true), PointerAction::Nothing);
    }
}
