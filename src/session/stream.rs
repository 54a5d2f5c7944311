//! Live view capture loop

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::config::SessionConfig;
use super::event::{EventSink, FramePush, INFO_STOPPED};
use super::state::{SessionEnd, SessionPhase};
use crate::capture::CaptureGateway;
use crate::driver::CameraDriver;
use crate::stats::{SessionCounters, SessionStats};

/// Handle to one client's running live view
///
/// The session is bound to the device port captured at start and keeps
/// capturing from it even if the registry's active device changes.
pub struct LiveSession {
    port: String,
    token: CancellationToken,
    counters: Arc<SessionCounters>,
    handle: JoinHandle<SessionEnd>,
}

impl LiveSession {
    /// Spawn the capture loop
    ///
    /// `on_exit` runs on the loop task after the loop has ended, with the
    /// reason it ended.
    pub fn start<D, F, Fut>(
        gateway: Arc<CaptureGateway<D>>,
        port: String,
        sink: EventSink,
        config: &SessionConfig,
        on_exit: F,
    ) -> Self
    where
        D: CameraDriver,
        F: FnOnce(SessionEnd) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let counters = Arc::new(SessionCounters::new());

        let capture_loop = CaptureLoop {
            gateway,
            port: port.clone(),
            sink,
            interval: config.frame_interval,
            token: token.clone(),
            counters: Arc::clone(&counters),
        };

        let handle = tokio::spawn(async move {
            let end = capture_loop.run().await;
            on_exit(end.clone()).await;
            end
        });

        Self {
            port,
            token,
            counters,
            handle,
        }
    }

    /// Port the session captures from
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Current phase
    pub fn phase(&self) -> SessionPhase {
        if self.token.is_cancelled() || self.handle.is_finished() {
            SessionPhase::Stopped
        } else {
            SessionPhase::Running
        }
    }

    /// Whether the loop is still producing frames
    pub fn is_running(&self) -> bool {
        self.phase() == SessionPhase::Running
    }

    /// Request the loop to stop at its next check point
    ///
    /// Returns `false` if a stop was already requested.
    pub fn stop(&self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.token.cancel();
        true
    }

    /// Counters for this session
    pub fn stats(&self) -> SessionStats {
        self.counters.snapshot()
    }

    /// Wait for the loop task to finish
    pub async fn join(self) -> Option<SessionEnd> {
        match self.handle.await {
            Ok(end) => Some(end),
            Err(e) => {
                tracing::error!(port = %self.port, error = %e, "Live view task failed");
                None
            }
        }
    }
}

struct CaptureLoop<D: CameraDriver> {
    gateway: Arc<CaptureGateway<D>>,
    port: String,
    sink: EventSink,
    interval: Duration,
    token: CancellationToken,
    counters: Arc<SessionCounters>,
}

impl<D: CameraDriver> CaptureLoop<D> {
    async fn run(self) -> SessionEnd {
        tracing::info!(port = %self.port, "Live view started");

        let end = loop {
            if self.token.is_cancelled() {
                break SessionEnd::Stopped;
            }

            // In-flight captures are not interrupted; a stop is observed
            // once the driver call returns.
            match self.gateway.capture_frame(&self.port).await {
                Ok(image) => {
                    if self.token.is_cancelled() {
                        break SessionEnd::Stopped;
                    }
                    let bytes = image.len();
                    match self.sink.push_frame(image.data) {
                        FramePush::Sent => self.counters.record_sent(bytes),
                        FramePush::Dropped => {
                            self.counters.record_dropped();
                            tracing::debug!(port = %self.port, "Client buffer full, frame dropped");
                        }
                        FramePush::Closed => break SessionEnd::Disconnected,
                    }
                }
                Err(e) => {
                    tracing::error!(port = %self.port, error = %e, "Live view error");
                    self.sink.error(e.to_string()).await;
                    break SessionEnd::Failed(e);
                }
            }

            tokio::select! {
                biased;
                _ = self.token.cancelled() => break SessionEnd::Stopped,
                _ = tokio::time::sleep(self.interval) => {}
            }
        };

        if end == SessionEnd::Stopped {
            self.sink.info(INFO_STOPPED).await;
        }

        let stats = self.counters.snapshot();
        tracing::info!(
            port = %self.port,
            reason = ?end,
            frames_sent = stats.frames_sent,
            frames_dropped = stats.frames_dropped,
            "Live view ended"
        );

        end
    }
}
