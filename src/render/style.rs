//! Visual attributes of a node, derived from its depth and label.
//!
//! Everything scales with `d_ratio`: 1 for the root, 0 for the deepest level.

use super::text::TextMeasure;
use serde::{Deserialize, Serialize};

/// Relative prominence of a node at `depth` in a graph that reaches `max_depth`.
///
/// A graph with `max_depth == 0` only has roots, which get full prominence.
/// Depths beyond `max_depth` are treated as the deepest level.
pub fn d_ratio(depth: u32, max_depth: u32) -> f32 {
    if max_depth == 0 {
        return 1.0;
    }
    let depth = depth.min(max_depth);
    (max_depth - depth) as f32 / max_depth as f32
}

/// Coefficients of the node attribute formulas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStyle {
    pub min_font_size: f32,
    pub font_size_range: f32,
    /// Box height as a multiple of the font size
    pub height_factor: f32,
    /// Horizontal padding, in space widths, on each side of the label
    pub padding_spaces: f32,
    /// Baseline offset from the box top, as a multiple of the font size
    pub baseline_factor: f32,
    pub min_corner_radius: f32,
    pub corner_radius_range: f32,
    pub min_stroke_width: f32,
    pub stroke_width_range: f32,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            min_font_size: 12.0,
            font_size_range: 24.0,
            height_factor: 1.6,
            padding_spaces: 3.0,
            baseline_factor: 1.1,
            min_corner_radius: 2.0,
            corner_radius_range: 15.0,
            min_stroke_width: 1.0,
            stroke_width_range: 4.0,
        }
    }
}

/// Box, label and stroke geometry of one node, relative to its center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeUiAttributes {
    pub font_size: f32,
    pub width: f32,
    pub height: f32,
    /// Box top-left corner
    pub x: f32,
    pub y: f32,
    pub rx: f32,
    pub ry: f32,
    /// Label origin (left edge, baseline)
    pub px: f32,
    pub py: f32,
    pub stroke_width: f32,
}

impl NodeStyle {
    pub fn attributes(&self, label: &str, d_ratio: f32, measure: &dyn TextMeasure) -> NodeUiAttributes {
        let font_size = self.font_size_range * d_ratio + self.min_font_size;
        let size = measure.measure(label, font_size);
        let width = size.total_width + size.space_width * self.padding_spaces * 2.0;
        let height = font_size * self.height_factor;
        let radius = self.corner_radius_range * d_ratio + self.min_corner_radius;

        NodeUiAttributes {
            font_size,
            width,
            height,
            x: -width / 2.0,
            y: -height / 2.0,
            rx: radius,
            ry: radius,
            px: -width / 2.0 + size.space_width * self.padding_spaces,
            py: -height / 2.0 + font_size * self.baseline_factor,
            stroke_width: self.stroke_width_range * d_ratio + self.min_stroke_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::text::FixedAdvanceMeasure;
    use proptest::prelude::*;

    #[test]
    fn test_d_ratio_endpoints() {
        assert_eq!(d_ratio(0, 2), 1.0);
        assert_eq!(d_ratio(1, 2), 0.5);
        assert_eq!(d_ratio(2, 2), 0.0);
        assert_eq!(d_ratio(0, 0), 1.0);
        assert_eq!(d_ratio(5, 2), 0.0);
    }

    #[test]
    fn test_root_attributes() {
        let style = NodeStyle::default();
        let measure = FixedAdvanceMeasure {
            advance: 0.5,
            space: 0.25,
        };
        let attrs = style.attributes("abcd", 1.0, &measure);

        assert_eq!(attrs.font_size, 36.0);
        // 4 glyphs * 18 + 6 spaces * 9
        assert!((attrs.width - 126.0).abs() < 1e-4);
        assert!((attrs.height - 57.6).abs() < 1e-4);
        assert_eq!(attrs.x, -attrs.width / 2.0);
        assert_eq!(attrs.y, -attrs.height / 2.0);
        assert_eq!(attrs.rx, 17.0);
        assert_eq!(attrs.ry, 17.0);
        assert_eq!(attrs.stroke_width, 5.0);
        assert!((attrs.px - (-63.0 + 27.0)).abs() < 1e-4);
        assert!((attrs.py - (-28.8 + 39.6)).abs() < 1e-4);
    }

    #[test]
    fn test_deepest_attributes() {
        let attrs = NodeStyle::default().attributes("x", 0.0, &FixedAdvanceMeasure::default());
        assert_eq!(attrs.font_size, 12.0);
        assert_eq!(attrs.rx, 2.0);
        assert_eq!(attrs.stroke_width, 1.0);
    }

    proptest! {
        #[test]
        fn d_ratio_is_non_increasing(max_depth in 1u32..64, a in 0u32..64, b in 0u32..64) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let lo = lo.min(max_depth);
            let hi = hi.min(max_depth);
            let r_lo = d_ratio(lo, max_depth);
            let r_hi = d_ratio(hi, max_depth);
            prop_assert!(r_lo >= r_hi);
            prop_assert!((0.0..=1.0).contains(&r_lo));
            prop_assert!((0.0..=1.0).contains(&r_hi));
        }

        #[test]
        fn attributes_grow_with_prominence(lo in 0.0f32..1.0, delta in 0.0f32..1.0, label in "[a-z]{1,12}") {
            let hi = (lo + delta).min(1.0);
            let style = NodeStyle::default();
            let measure = FixedAdvanceMeasure::default();
            let small = style.attributes(&label, lo, &measure);
            let large = style.attributes(&label, hi, &measure);
            prop_assert!(large.font_size >= small.font_size);
            prop_assert!(large.width >= small.width);
            prop_assert!(large.height >= small.height);
            prop_assert!(large.rx >= small.rx);
            prop_assert!(large.stroke_width >= small.stroke_width);
        }
    }
}
