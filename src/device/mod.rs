//! Device registry
//!
//! Tracks the cameras found by the last discovery and which one is active.
//! The registry also owns the driver, behind the exclusive-access guard that
//! every capture path shares.
//!
//! ```text
//!   discover() ──► driver.enumerate() ──► known: [Device, ...]
//!                                              │
//!                         brand policy / manual selection
//!                                              ▼
//!                                       active_port: Option<String>
//! ```
//!
//! The active device is held by port and resolved against the latest
//! snapshot on every read, so a vanished device is reported instead of used.

pub mod config;
pub mod error;
pub mod policy;
pub mod store;
pub mod types;

pub use config::{RediscoveryPolicy, RegistryConfig};
pub use error::CameraError;
pub use policy::{select_preferred, PREFERRED_BRANDS};
pub use store::{DeviceRegistry, DiscoveryReport, Selection};
pub use types::Device;
