//! Tethered camera service
//!
//! Exposes a single attached camera to remote clients: device discovery,
//! active-device selection, single still captures and a per-client live view
//! stream pushed over WebSocket.
//!
//! # Architecture
//!
//! ```text
//!   HTTP / WebSocket  ──►  server::router
//!                               │
//!            ┌──────────────────┼───────────────────┐
//!            ▼                  ▼                   ▼
//!     DeviceRegistry     CaptureGateway      SessionRegistry
//!      (known/active)    (exclusive guard)    (conn → LiveSession)
//!            │                  │                   │
//!            └──── Arc<Mutex<D: CameraDriver>> ◄────┘
//! ```
//!
//! Every driver call (enumeration and capture) goes through one
//! `tokio::sync::Mutex`, so at most one operation is in flight against the
//! physical device at any instant.

pub mod capture;
pub mod device;
pub mod driver;
pub mod error;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use capture::{BusyPolicy, CaptureConfig, CaptureGateway, CapturedImage};
pub use device::{CameraError, Device, DeviceRegistry, RegistryConfig};
pub use driver::{CameraDriver, DriverError};
pub use error::{Error, Result};
pub use registry::{ConnectionId, SessionRegistry};
pub use server::{CameraServer, ServerConfig};
pub use session::{SessionConfig, StreamEvent};
