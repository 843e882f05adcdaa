//! Progress of one visualization session: download, then layout.
//!
//! The tracker is a small state machine observed by the UI shell. Every
//! operation is infallible and may be called in any order; the only
//! cross-field rule is that layout completion text is ignored outside the
//! layout phase.

use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

const LAYOUT_STARTED_MESSAGE: &str = "Completed downloading data. Building the results ";

/// Coarse stage of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    #[default]
    None,
    Download,
    Layout,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::None => "Idle",
            Phase::Download => "Downloading",
            Phase::Layout => "Layout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DownloadProgress {
    /// Non-fatal download errors, in arrival order
    pub errors: Vec<String>,
    pub remaining: usize,
    pub current_word: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LayoutProgress {
    pub iteration: u32,
}

/// Observable progress fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressState {
    pub phase: Phase,
    pub message: String,
    pub working: bool,
    pub download: DownloadProgress,
    pub layout: LayoutProgress,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            phase: Phase::None,
            message: String::new(),
            working: true,
            download: DownloadProgress::default(),
            layout: LayoutProgress::default(),
        }
    }
}

/// Single-session progress tracker
#[derive(Debug, Default)]
pub struct ProgressTracker {
    state: ProgressState,
}

/// Handle to the session's tracker, shared by the host, the coordinator and the layout
pub type SharedProgress = Rc<RefCell<ProgressTracker>>;

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedProgress {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn snapshot(&self) -> ProgressState {
        self.state.clone()
    }

    pub fn start_download(&mut self) {
        self.state.phase = Phase::Download;
    }

    pub fn start_layout(&mut self) {
        self.state.message = LAYOUT_STARTED_MESSAGE.to_string();
        self.state.phase = Phase::Layout;
    }

    /// Report streaming download progress. Applies in every phase.
    pub fn update_layout(&mut self, remaining: usize, next_word: &str) {
        self.state.download.current_word = next_word.to_string();
        self.state.download.remaining = remaining;
        self.state.message = format!("Remaining: {}. Downloading {}", remaining, next_word);
    }

    /// Report layout completion; ignored unless the layout phase has started
    pub fn set_layout_completion(&mut self, percent: u32) {
        if self.state.phase == Phase::Layout {
            self.state.message = format!("Results are {}% completed", percent);
        }
    }

    pub fn set_layout_iteration(&mut self, iteration: u32) {
        self.state.layout.iteration = iteration;
    }

    pub fn done(&mut self) {
        self.state.working = false;
    }

    pub fn download_error(&mut self, message: impl Into<String>) {
        self.state.download.errors.push(message.into());
    }

    pub fn reset(&mut self) {
        self.state = ProgressState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_ignored_before_layout() {
        let mut progress = ProgressTracker::new();
        progress.start_download();
        progress.update_layout(3, "apple");
        progress.set_layout_completion(50);
        assert_eq!(progress.state().message, "Remaining: 3. Downloading apple");

        progress.start_layout();
        assert_eq!(progress.state().message, LAYOUT_STARTED_MESSAGE);
        progress.set_layout_completion(50);
        assert!(progress.state().message.contains("50"));
    }

    #[test]
    fn test_update_layout_applies_in_layout_phase() {
        let mut progress = ProgressTracker::new();
        progress.start_layout();
        progress.update_layout(0, "pear");

        let state = progress.state();
        assert_eq!(state.phase, Phase::Layout);
        assert_eq!(state.download.remaining, 0);
        assert_eq!(state.download.current_word, "pear");
    }

    #[test]
    fn test_errors_accumulate_in_order() {
        let mut progress = ProgressTracker::new();
        progress.start_download();
        progress.download_error("x");
        progress.download_error("y");
        progress.download_error("x");

        let state = progress.state();
        assert_eq!(state.download.errors, vec!["x", "y", "x"]);
        assert_eq!(state.phase, Phase::Download);
        assert!(state.working);
    }

    #[test]
    fn test_done_keeps_phase() {
        let mut progress = ProgressTracker::new();
        progress.start_layout();
        progress.done();
        assert_eq!(progress.state().phase, Phase::Layout);
        assert!(!progress.state().working);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut progress = ProgressTracker::new();
        progress.start_download();
        progress.update_layout(12, "plum");
        progress.download_error("timeout");
        progress.start_layout();
        progress.set_layout_iteration(40);
        progress.set_layout_completion(80);
        progress.done();

        progress.reset();
        let expected = ProgressState {
            phase: Phase::None,
            message: String::new(),
            working: true,
            download: DownloadProgress {
                errors: vec![],
                remaining: 0,
                current_word: String::new(),
            },
            layout: LayoutProgress { iteration: 0 },
        };
        assert_eq!(progress.state(), &expected);

        progress.reset();
        assert_eq!(progress.state(), &expected);
    }
}
