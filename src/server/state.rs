//! Shared handler state

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use super::config::ServerConfig;
use crate::capture::CaptureGateway;
use crate::device::DeviceRegistry;
use crate::driver::CameraDriver;
use crate::registry::SessionRegistry;
use crate::stats::ServerStats;

/// State shared by every HTTP and WebSocket handler
pub struct AppState<D: CameraDriver> {
    /// Known devices and the active selection
    pub devices: Arc<DeviceRegistry<D>>,
    /// Exclusive capture path
    pub gateway: Arc<CaptureGateway<D>>,
    /// Live view sessions per connection
    pub sessions: Arc<SessionRegistry<D>>,
    /// Cancelled when the server shuts down; closes open sockets
    pub shutdown: CancellationToken,
    /// When the state was created
    pub started_at: Instant,
}

impl<D: CameraDriver> AppState<D> {
    /// Wire up the components around `driver`
    pub fn new(driver: D, config: &ServerConfig) -> Self {
        let devices = Arc::new(DeviceRegistry::with_config(driver, config.registry.clone()));
        let gateway = Arc::new(CaptureGateway::with_config(
            Arc::clone(&devices),
            config.capture.clone(),
        ));
        let sessions = Arc::new(SessionRegistry::with_config(
            Arc::clone(&gateway),
            config.session.clone(),
        ));

        Self {
            devices,
            gateway,
            sessions,
            shutdown: CancellationToken::new(),
            started_at: Instant::now(),
        }
    }

    /// Server-wide counters
    pub async fn stats(&self) -> ServerStats {
        ServerStats {
            total_connections: self.sessions.total_connections(),
            active_connections: self.sessions.connection_count().await as u64,
            active_sessions: self.sessions.active_sessions().await as u64,
            known_devices: self.devices.list_devices().await.len() as u64,
            uptime: self.started_at.elapsed(),
        }
    }
}

// Manual impl: derive would require `D: Clone`
impl<D: CameraDriver> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            devices: Arc::clone(&self.devices),
            gateway: Arc::clone(&self.gateway),
            sessions: Arc::clone(&self.sessions),
            shutdown: self.shutdown.clone(),
            started_at: self.started_at,
        }
    }
}
