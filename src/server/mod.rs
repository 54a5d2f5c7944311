//! HTTP and WebSocket transport
//!
//! Thin adapter: maps requests and socket messages onto the device
//! registry, capture gateway and session registry, and serializes the
//! results for the wire.

pub mod config;
pub mod listener;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ServerConfig;
pub use listener::CameraServer;
pub use routes::router;
pub use state::AppState;
