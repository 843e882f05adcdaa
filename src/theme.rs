//! Color palette for the canvas and the side panel.

use egui::Color32;

/// Background colors for different layers
pub mod bg {
    use super::*;

    /// Canvas background - darkest layer
    pub const CANVAS: Color32 = Color32::from_rgb(14, 17, 23);

    pub const PANEL: Color32 = Color32::from_rgb(20, 22, 28);

    /// Tooltip and details backgrounds
    pub const SURFACE: Color32 = Color32::from_rgba_premultiplied(20, 20, 30, 230);
}

/// Scene element colors
pub mod scene {
    use super::*;

    /// Fill of the deepest nodes
    pub const NODE_FAR: Color32 = Color32::from_rgb(40, 46, 60);

    /// Fill of the root
    pub const NODE_ROOT: Color32 = Color32::from_rgb(59, 130, 246);

    pub const NODE_STROKE: Color32 = Color32::from_rgb(120, 125, 135);

    pub const LABEL: Color32 = Color32::from_rgb(240, 240, 245);

    pub const LINK: Color32 = Color32::from_rgba_premultiplied(90, 100, 120, 160);

    /// Hovered link and its endpoints
    pub const HIGHLIGHT: Color32 = Color32::from_rgb(255, 149, 0);
}

/// Text colors at different emphasis levels
pub mod text {
    use super::*;

    pub const PRIMARY: Color32 = Color32::from_rgb(240, 240, 245);

    pub const MUTED: Color32 = Color32::from_rgb(120, 125, 135);

    pub const ERROR: Color32 = Color32::from_rgb(239, 68, 68);
}

/// Node fill for a node of the given prominence (1 = root, 0 = deepest)
pub fn node_fill(d_ratio: f32) -> Color32 {
    let t = d_ratio.clamp(0.0, 1.0);
    let far = scene::NODE_FAR;
    let root = scene::NODE_ROOT;
    Color32::from_rgb(
        lerp_u8(far.r(), root.r(), t),
        lerp_u8(far.g(), root.g(), t),
        lerp_u8(far.b(), root.b(), t),
    )
}

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let result = a as f32 + (b as f32 - a as f32) * t;
    result.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_fill_endpoints() {
        assert_eq!(node_fill(1.0), scene::NODE_ROOT);
        assert_eq!(node_fill(0.0), scene::NODE_FAR);
        assert_eq!(node_fill(7.0), scene::NODE_ROOT);
    }
}
