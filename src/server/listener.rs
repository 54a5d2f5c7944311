//! Camera server listener
//!
//! Runs startup discovery, binds the HTTP listener and serves the router
//! until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use super::config::ServerConfig;
use super::routes::router;
use super::state::AppState;
use crate::device::DeviceRegistry;
use crate::driver::CameraDriver;
use crate::error::Result;
use crate::registry::SessionRegistry;

/// Camera server
pub struct CameraServer<D: CameraDriver> {
    config: ServerConfig,
    state: AppState<D>,
}

impl<D: CameraDriver> CameraServer<D> {
    /// Create a new server with the given configuration and driver
    pub fn new(config: ServerConfig, driver: D) -> Self {
        let state = AppState::new(driver, &config);
        Self { config, state }
    }

    /// Shared handler state
    pub fn state(&self) -> &AppState<D> {
        &self.state
    }

    /// Get a reference to the device registry
    pub fn devices(&self) -> &Arc<DeviceRegistry<D>> {
        &self.state.devices
    }

    /// Get a reference to the session registry
    pub fn sessions(&self) -> &Arc<SessionRegistry<D>> {
        &self.state.sessions
    }

    /// Router serving this server's state
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Startup discovery always applies the selection policy; a failure
        // is logged and leaves the registry empty.
        let _ = self.state.devices.discover().await;

        let discovery_handle = self
            .config
            .rediscover_interval
            .map(|interval| self.state.devices.spawn_discovery_task(interval));

        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Camera server listening");

        let sessions = Arc::clone(&self.state.sessions);
        let token = self.state.shutdown.clone();

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
                sessions.shutdown().await;
                token.cancel();
            })
            .await;

        if let Some(handle) = discovery_handle {
            handle.abort();
        }

        tracing::info!("Camera server stopped");
        result.map_err(Into::into)
    }
}
