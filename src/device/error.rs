//! Camera error taxonomy
//!
//! Errors surfaced by device selection and capture. Request paths return them
//! to the caller; the live view loop turns them into an `error` event.

/// Error type for device and capture operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    /// No device is selected
    #[error("no active camera")]
    NoActiveDevice,
    /// Port is not in the current discovery snapshot
    #[error("camera not found: {0}")]
    DeviceNotFound(String),
    /// Another capture holds the device
    #[error("camera is busy")]
    DeviceBusy,
    /// The driver failed or timed out
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    /// The device is no longer in the latest enumeration
    #[error("camera disconnected: {0}")]
    DeviceVanished(String),
}
