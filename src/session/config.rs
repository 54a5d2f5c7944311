//! Live view configuration

use std::time::Duration;

/// Live view session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delay between the end of one frame and the next capture
    pub frame_interval: Duration,

    /// Outbound events buffered per client before frames are dropped
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(100),
            event_buffer: 16,
        }
    }
}

impl SessionConfig {
    /// Set the frame interval
    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Set the per-client event buffer (minimum 1)
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }
}
