//! Persistent settings for the visualizer app.

use crate::graph::FeedConfig;
use crate::layout::ForceParams;
use crate::render::NodeStyle;
use egui::{Pos2, Rect};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("settings file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Graph rectangle shown when a visualization starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Default for ViewRect {
    fn default() -> Self {
        Self {
            left: -500.0,
            top: -500.0,
            right: 500.0,
            bottom: 500.0,
        }
    }
}

impl ViewRect {
    pub fn to_rect(self) -> Rect {
        Rect::from_min_max(Pos2::new(self.left, self.top), Pos2::new(self.right, self.bottom))
    }
}

/// All persistable settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Display
    pub node_style: NodeStyle,
    pub initial_view: ViewRect,
    /// Pointer distance, in screen pixels, that still counts as over a link
    pub hover_tolerance: f32,

    // Physics
    pub physics: ForceParams,

    // Data
    pub feed: FeedConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            node_style: NodeStyle::default(),
            initial_view: ViewRect::default(),
            hover_tolerance: 4.0,
            physics: ForceParams::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl Settings {
    /// Get the path to the settings file
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("graph-stream-viz");
            p.push("settings.json");
            p
        })
    }

    /// Load settings from disk, returning defaults if the file doesn't exist or is invalid
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            tracing::warn!("could not determine config directory, using default settings");
            return Self::default();
        };

        match Self::try_load_from(&path) {
            Ok(settings) => {
                tracing::info!(?path, "loaded settings");
                settings
            }
            // File doesn't exist yet, that's fine
            Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!(?path, "{e}, using default settings");
                Self::default()
            }
        }
    }

    pub fn try_load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save settings to disk
    pub fn save(&self) {
        let result = Self::config_path()
            .ok_or(SettingsError::NoConfigDir)
            .and_then(|path| self.save_to(&path).map(|_| path));
        match result {
            Ok(path) => tracing::debug!(?path, "saved settings"),
            Err(e) => tracing::warn!("settings not saved: {e}"),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        // Ensure config directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let json = r#"{ "hover_tolerance": 9.0, "physics": { "repulsion": 123.0 } }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.hover_tolerance, 9.0);
        assert_eq!(settings.physics.repulsion, 123.0);
        assert_eq!(settings.physics.attraction, ForceParams::default().attraction);
        assert_eq!(settings.node_style, NodeStyle::default());
        assert_eq!(settings.initial_view, ViewRect::default());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("graph-stream-viz-missing").join("none.json");
        assert!(matches!(Settings::try_load_from(&path), Err(SettingsError::Io(_))));
    }

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join(format!("graph-stream-viz-test-{}", std::process::id()));
        let path = dir.join("settings.json");
        let mut settings = Settings::default();
        settings.feed.seed = "lattice".into();
        settings.node_style.min_font_size = 10.0;

        settings.save_to(&path).unwrap();
        let loaded = Settings::try_load_from(&path).unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_default_view_spans_origin() {
        let rect = Settings::default().initial_view.to_rect();
        assert_eq!(rect.center(), Pos2::ZERO);
        assert_eq!(rect.width(), 1000.0);
    }
}
