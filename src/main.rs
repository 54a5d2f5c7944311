//! tethercam - serve a tethered camera over HTTP and WebSocket
//!
//! Run with: cargo run -- [--bind ADDR] [--demo]
//!
//! `--demo` swaps the gphoto2 driver for an in-memory camera that returns
//! placeholder frames, so clients can be exercised without hardware.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tethercam::capture::BusyPolicy;
use tethercam::device::{Device, RediscoveryPolicy};
use tethercam::driver::{CameraDriver, GphotoDriver, ScriptedDriver};
use tethercam::{CameraServer, ServerConfig};

#[derive(Parser)]
#[command(name = "tethercam")]
#[command(about = "Expose a tethered camera over HTTP and WebSocket")]
#[command(version)]
struct Cli {
    /// Address to bind the HTTP/WebSocket listener to
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Delay between live view frames in milliseconds
    #[arg(long, default_value = "100")]
    frame_interval_ms: u64,

    /// Capture timeout in milliseconds
    #[arg(long, default_value = "10000")]
    capture_timeout_ms: u64,

    /// Rediscover devices every N seconds (default: only at startup)
    #[arg(long)]
    rediscover_secs: Option<u64>,

    /// Fail still captures immediately while the camera is busy
    #[arg(long)]
    reject_when_busy: bool,

    /// Re-run preferred selection on every rediscovery
    #[arg(long)]
    always_reapply: bool,

    /// Path to the gphoto2 executable
    #[arg(long, default_value = "gphoto2")]
    gphoto2: PathBuf,

    /// Use an in-memory demo camera instead of gphoto2
    #[arg(long)]
    demo: bool,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::with_addr(self.bind)
            .frame_interval(Duration::from_millis(self.frame_interval_ms))
            .capture_timeout(Duration::from_millis(self.capture_timeout_ms));

        if let Some(secs) = self.rediscover_secs {
            config = config.rediscover_every(Duration::from_secs(secs));
        }
        if self.reject_when_busy {
            config = config.busy_policy(BusyPolicy::Reject);
        }
        if self.always_reapply {
            config = config.rediscovery(RediscoveryPolicy::AlwaysReapply);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tethercam=info,tower_http=info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = cli.server_config();

    if cli.demo {
        info!("Using demo camera");
        let driver = ScriptedDriver::with_devices(vec![Device::new("Demo Canon EOS", "usb:demo")]);
        serve(config, driver).await
    } else {
        let driver = GphotoDriver::with_program(cli.gphoto2.clone());
        info!(program = %driver.program().display(), "Using gphoto2 driver");
        serve(config, driver).await
    }
}

async fn serve<D: CameraDriver>(config: ServerConfig, driver: D) -> Result<()> {
    let server = CameraServer::new(config, driver);
    server
        .run_until(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = sigterm() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(unix)]
async fn sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await;
}
