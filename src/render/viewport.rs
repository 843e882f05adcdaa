//! Pan/zoom viewport between graph space and the screen.
//!
//! Graph coordinates are centered on the canvas. Pan is kept in screen space
//! (applied after zoom) so dragging moves 1:1 at any zoom level.

use egui::{PointerButton, Pos2, Rect, Response, Ui, Vec2};

const MIN_ZOOM: f32 = 0.02;
const MAX_ZOOM: f32 = 8.0;

#[derive(Debug, Clone)]
pub struct Viewport {
    pan: Vec2,
    zoom: f32,
    /// Screen rect of the canvas, refreshed every frame
    canvas: Rect,
    /// Graph rectangle to show once the canvas size is known
    initial: Option<Rect>,
}

impl Viewport {
    /// Viewport that will frame `initial` (graph coordinates) on first use
    pub fn new(initial: Rect) -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            canvas: Rect::from_min_size(Pos2::ZERO, Vec2::splat(1.0)),
            initial: Some(initial),
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Fit `rect` (graph coordinates) inside the canvas
    pub fn show_rectangle(&mut self, rect: Rect) {
        let width = rect.width().max(1.0);
        let height = rect.height().max(1.0);
        self.zoom = (self.canvas.width() / width)
            .min(self.canvas.height() / height)
            .clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = -rect.center().to_vec2() * self.zoom;
    }

    pub fn set_canvas(&mut self, canvas: Rect) {
        self.canvas = canvas;
        if let Some(initial) = self.initial.take() {
            self.show_rectangle(initial);
        }
    }

    pub fn to_screen(&self, pos: Pos2) -> Pos2 {
        self.canvas.center() + pos.to_vec2() * self.zoom + self.pan
    }

    pub fn to_graph(&self, screen: Pos2) -> Pos2 {
        ((screen - self.canvas.center() - self.pan) / self.zoom).to_pos2()
    }

    /// Apply drag pan, two-finger scroll pan and cursor-anchored zoom
    pub fn handle_input(&mut self, ui: &Ui, response: &Response) {
        self.set_canvas(response.rect);

        // Gather all input deltas first (allows simultaneous pan+zoom on trackpad)
        let scroll_delta = ui.input(|i| i.smooth_scroll_delta);
        let zoom_delta = ui.input(|i| i.zoom_delta());

        if response.dragged_by(PointerButton::Primary) {
            self.pan += response.drag_delta();
        }
        if scroll_delta != Vec2::ZERO && response.hovered() {
            self.pan += scroll_delta;
        }

        if let Some(cursor) = response.hover_pos() {
            if zoom_delta != 1.0 {
                self.zoom_at(cursor, zoom_delta);
            }
        }
    }

    /// Zoom by `factor` keeping the graph point under `cursor` fixed
    pub fn zoom_at(&mut self, cursor: Pos2, factor: f32) {
        let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let cursor_offset = cursor - self.canvas.center() - self.pan;
        self.pan += cursor_offset * (1.0 - new_zoom / self.zoom);
        self.zoom = new_zoom;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Pos2, b: Pos2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn test_show_rectangle_fits_canvas() {
        let mut viewport = Viewport::new(Rect::from_min_max(Pos2::new(-500.0, -500.0), Pos2::new(500.0, 500.0)));
        viewport.set_canvas(Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0)));

        assert!((viewport.zoom() - 0.6).abs() < 1e-4);
        assert!(close(viewport.to_screen(Pos2::ZERO), Pos2::new(400.0, 300.0)));
        assert!(close(viewport.to_screen(Pos2::new(0.0, -500.0)), Pos2::new(400.0, 0.0)));
    }

    #[test]
    fn test_zoom_keeps_cursor_point() {
        let mut viewport = Viewport::new(Rect::from_center_size(Pos2::ZERO, Vec2::splat(400.0)));
        viewport.set_canvas(Rect::from_min_size(Pos2::ZERO, Vec2::splat(400.0)));

        let cursor = Pos2::new(300.0, 120.0);
        let anchored = viewport.to_graph(cursor);
        viewport.zoom_at(cursor, 1.5);
        assert!(close(viewport.to_graph(cursor), anchored));
        assert!(close(viewport.to_screen(viewport.to_graph(cursor)), cursor));
    }
}
