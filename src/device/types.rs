//! Device identity

use serde::{Deserialize, Serialize};

/// A camera as reported by one discovery snapshot
///
/// The port is unique within a snapshot and is the device's identity for
/// selection and capture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Device {
    /// Model name (e.g., "Nikon DSC D90")
    pub model: String,
    /// Port/address (e.g., "usb:001,004")
    pub port: String,
}

impl Device {
    /// Create a new device
    pub fn new(model: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            port: port.into(),
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.model, self.port)
    }
}
