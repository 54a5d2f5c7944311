//! Capture configuration

use std::time::Duration;

/// What a still capture does when the device is already in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusyPolicy {
    /// Wait in FIFO order for the device
    #[default]
    Queue,
    /// Fail immediately with `DeviceBusy`
    Reject,
}

/// Capture gateway configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Upper bound on one driver capture call
    pub timeout: Duration,

    /// Contention handling for still captures (frames always queue)
    pub busy_policy: BusyPolicy,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            busy_policy: BusyPolicy::default(),
        }
    }
}

impl CaptureConfig {
    /// Set the capture timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the busy policy
    pub fn busy_policy(mut self, policy: BusyPolicy) -> Self {
        self.busy_policy = policy;
        self
    }
}
