//! Cooperative frame scheduling.
//!
//! The host calls [`FrameScheduler::take_due`] once per display refresh. At
//! most one request is pending at a time; requesting again replaces it, and
//! cancelling drops it.

/// Handle of one requested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRequest(u64);

#[derive(Debug, Default)]
pub struct FrameScheduler {
    next: u64,
    pending: Option<FrameRequest>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a frame on the next refresh
    pub fn request(&mut self) -> FrameRequest {
        let request = FrameRequest(self.next);
        self.next += 1;
        self.pending = Some(request);
        request
    }

    /// Drop the pending request, if any
    pub fn cancel(&mut self) -> Option<FrameRequest> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Consume the pending request. Called by the refresh driver.
    pub fn take_due(&mut self) -> Option<FrameRequest> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pending_request() {
        let mut frames = FrameScheduler::new();
        let first = frames.request();
        let second = frames.request();
        assert_ne!(first, second);

        assert_eq!(frames.take_due(), Some(second));
        assert_eq!(frames.take_due(), None);
    }

    #[test]
    fn test_cancel_drops_request() {
        let mut frames = FrameScheduler::new();
        assert_eq!(frames.cancel(), None);

        let request = frames.request();
        assert_eq!(frames.cancel(), Some(request));
        assert!(!frames.is_pending());
        assert_eq!(frames.take_due(), None);
    }
}
