//! Label measurement.

use egui::{Color32, Context, FontId};

/// Measured width of a label
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextSize {
    pub total_width: f32,
    /// Width of one space at the same font size
    pub space_width: f32,
}

pub trait TextMeasure {
    fn measure(&self, text: &str, font_size: f32) -> TextSize;
}

/// Measures with the proportional font of a live egui context.
///
/// Fonts are only available once the context has run its first frame.
pub struct EguiTextMeasure {
    ctx: Context,
}

impl EguiTextMeasure {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }
}

impl TextMeasure for EguiTextMeasure {
    fn measure(&self, text: &str, font_size: f32) -> TextSize {
        let font = FontId::proportional(font_size);
        self.ctx.fonts(|fonts| TextSize {
            total_width: fonts
                .layout_no_wrap(text.to_owned(), font.clone(), Color32::WHITE)
                .size()
                .x,
            space_width: fonts.glyph_width(&font, ' '),
        })
    }
}

/// Every glyph advances by the same fraction of the font size
#[derive(Debug, Clone, Copy)]
pub struct FixedAdvanceMeasure {
    pub advance: f32,
    pub space: f32,
}

impl Default for FixedAdvanceMeasure {
    fn default() -> Self {
        Self {
            advance: 0.6,
            space: 0.3,
        }
    }
}

impl TextMeasure for FixedAdvanceMeasure {
    fn measure(&self, text: &str, font_size: f32) -> TextSize {
        TextSize {
            total_width: text.chars().count() as f32 * self.advance * font_size,
            space_width: self.space * font_size,
        }
    }
}
