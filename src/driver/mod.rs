//! Camera driver capability
//!
//! The physical device is consumed through [`CameraDriver`]: enumeration of
//! attached cameras and capture-with-download. Both calls may be slow and can
//! fail independently of this crate's logic. Callers never invoke a driver
//! directly; the [`DeviceRegistry`](crate::device::DeviceRegistry) owns it
//! behind the exclusive-access guard.
//!
//! Two implementations ship with the crate:
//! - [`GphotoDriver`] drives the `gphoto2` command-line tool
//! - [`ScriptedDriver`] is an in-memory driver with scripted outcomes

pub mod gphoto;
pub mod scripted;

use std::future::Future;

use bytes::Bytes;

use crate::device::Device;

pub use gphoto::GphotoDriver;
pub use scripted::{CaptureOutcome, ScriptedDriver};

/// Driver-level failure
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Spawning or talking to the driver process failed
    #[error("driver I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The driver command exited unsuccessfully
    #[error("driver command failed ({status}): {stderr}")]
    Command { status: String, stderr: String },

    /// Capture succeeded but produced no image data
    #[error("driver returned no image data")]
    EmptyOutput,

    /// The device is no longer reachable
    #[error("device disconnected")]
    Disconnected,

    /// Any other driver failure
    #[error("{0}")]
    Other(String),
}

/// Capability exposed by a camera driver/SDK
///
/// Implementors can write `async fn` directly; the returned futures must be
/// `Send` so sessions can run on the multi-threaded runtime.
pub trait CameraDriver: Send + Sync + 'static {
    /// Enumerate attached cameras
    fn enumerate(&self) -> impl Future<Output = Result<Vec<Device>, DriverError>> + Send;

    /// Trigger a capture on `device` and download the resulting image
    fn capture_and_download(
        &self,
        device: &Device,
    ) -> impl Future<Output = Result<Bytes, DriverError>> + Send;
}
