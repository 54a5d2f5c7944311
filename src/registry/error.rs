//! Session registry error types

use super::entry::ConnectionId;
use crate::device::CameraError;

/// Error type for session registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Connection was never registered or has disconnected
    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),
    /// Camera precondition failed (e.g., no active device)
    #[error(transparent)]
    Camera(#[from] CameraError),
}
