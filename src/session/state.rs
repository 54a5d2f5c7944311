//! Session lifecycle state

use crate::device::CameraError;

/// Live view lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No session for the connection
    Idle,
    /// Capture loop active
    Running,
    /// Stop requested or loop ended; entry is removed once the loop exits
    Stopped,
}

/// Why a session loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Stop or disconnect was requested
    Stopped,
    /// A capture failed; the error was sent to the client
    Failed(CameraError),
    /// The client's event channel closed
    Disconnected,
}
