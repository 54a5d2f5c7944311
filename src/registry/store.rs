//! Session registry implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use super::entry::{ConnectionEntry, ConnectionId};
use super::error::SessionError;
use crate::capture::CaptureGateway;
use crate::driver::CameraDriver;
use crate::session::{
    EventSink, LiveSession, SessionConfig, SessionEnd, SessionPhase, StreamEvent,
    INFO_ALREADY_RUNNING,
};
use crate::stats::SessionStats;

type ConnectionMap = Arc<RwLock<HashMap<ConnectionId, ConnectionEntry>>>;

/// Result of a start request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new loop was spawned, bound to `port`
    Started { port: String },
    /// A loop was already running; nothing changed
    AlreadyRunning,
}

/// Result of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The running loop was told to stop
    Stopping,
    /// No loop was running
    NotRunning,
}

/// Registry of client connections and their live view sessions
///
/// Thread-safe via `RwLock`. The lock is never held across a wait on a
/// session loop or on a client's event buffer.
pub struct SessionRegistry<D: CameraDriver> {
    connections: ConnectionMap,
    gateway: Arc<CaptureGateway<D>>,
    config: SessionConfig,
    next_connection_id: AtomicU64,
    next_generation: AtomicU64,
    total_connections: AtomicU64,
}

impl<D: CameraDriver> SessionRegistry<D> {
    /// Create a registry with default session configuration
    pub fn new(gateway: Arc<CaptureGateway<D>>) -> Self {
        Self::with_config(gateway, SessionConfig::default())
    }

    /// Create a registry with custom session configuration
    pub fn with_config(gateway: Arc<CaptureGateway<D>>, config: SessionConfig) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            gateway,
            config,
            next_connection_id: AtomicU64::new(1),
            next_generation: AtomicU64::new(1),
            total_connections: AtomicU64::new(0),
        }
    }

    /// Get the session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Capture gateway sessions capture through
    pub fn gateway(&self) -> &Arc<CaptureGateway<D>> {
        &self.gateway
    }

    /// Create an event channel sized for this registry's sessions
    pub fn event_channel(&self) -> (EventSink, mpsc::Receiver<StreamEvent>) {
        EventSink::channel(self.config.event_buffer)
    }

    /// Register a connected client
    pub async fn register(&self, sink: EventSink) -> ConnectionId {
        let conn = ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::Relaxed));
        self.total_connections.fetch_add(1, Ordering::Relaxed);

        let mut connections = self.connections.write().await;
        connections.insert(conn, ConnectionEntry::new(sink));

        tracing::debug!(conn_id = %conn, clients = connections.len(), "Client connected");
        conn
    }

    /// Start a live view for `conn`
    ///
    /// A no-op reporting `AlreadyRunning` (and an info event) if a loop is
    /// running. Fails with `NoActiveDevice` (sent to the client as an error
    /// event) when no device is selected. If a previous loop is still
    /// winding down after a stop, waits for it to exit first. Concurrent
    /// starts on one connection are serialized.
    pub async fn start_session(&self, conn: ConnectionId) -> Result<StartOutcome, SessionError> {
        let start_lock = {
            let connections = self.connections.read().await;
            let entry = connections
                .get(&conn)
                .ok_or(SessionError::UnknownConnection(conn))?;
            Arc::clone(&entry.start_lock)
        };
        let _starting = start_lock.lock().await;

        let (sink, previous, already_running) = {
            let mut connections = self.connections.write().await;
            let entry = connections
                .get_mut(&conn)
                .ok_or(SessionError::UnknownConnection(conn))?;

            let already_running = entry.is_streaming();
            let previous = if already_running {
                None
            } else {
                entry.session.take()
            };
            (entry.sink.clone(), previous, already_running)
        };

        if already_running {
            sink.info(INFO_ALREADY_RUNNING).await;
            return Ok(StartOutcome::AlreadyRunning);
        }

        if let Some(previous) = previous {
            tracing::debug!(conn_id = %conn, "Waiting for previous live view to exit");
            previous.join().await;
        }

        let device = match self.gateway.devices().resolve_active().await {
            Ok(device) => device,
            Err(e) => {
                tracing::warn!(conn_id = %conn, error = %e, "Live view rejected");
                sink.error(e.to_string()).await;
                return Err(e.into());
            }
        };

        let mut connections = self.connections.write().await;
        let entry = connections
            .get_mut(&conn)
            .ok_or(SessionError::UnknownConnection(conn))?;

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let map = Arc::clone(&self.connections);

        let session = LiveSession::start(
            Arc::clone(&self.gateway),
            device.port.clone(),
            entry.sink.clone(),
            &self.config,
            move |end| finish_session(map, conn, generation, end),
        );

        entry.generation = generation;
        entry.session = Some(session);

        tracing::info!(
            conn_id = %conn,
            model = %device.model,
            port = %device.port,
            "Live view session started"
        );

        Ok(StartOutcome::Started { port: device.port })
    }

    /// Stop the live view for `conn`
    ///
    /// Idempotent: stopping an idle or already-stopping session reports
    /// `NotRunning` and emits nothing. The loop sends the `stopped` info
    /// event once it has exited.
    pub async fn stop_session(&self, conn: ConnectionId) -> Result<StopOutcome, SessionError> {
        let connections = self.connections.read().await;
        let entry = connections
            .get(&conn)
            .ok_or(SessionError::UnknownConnection(conn))?;

        match &entry.session {
            Some(session) if session.is_running() => {
                session.stop();
                tracing::info!(conn_id = %conn, "Live view stop requested");
                Ok(StopOutcome::Stopping)
            }
            _ => Ok(StopOutcome::NotRunning),
        }
    }

    /// Tear down everything for a disconnected client
    pub async fn on_disconnect(&self, conn: ConnectionId) {
        let removed = self.connections.write().await.remove(&conn);

        let Some(entry) = removed else {
            return;
        };

        if let Some(session) = &entry.session {
            session.stop();
        }

        tracing::debug!(
            conn_id = %conn,
            connected_secs = entry.connected_at.elapsed().as_secs(),
            "Client disconnected"
        );
    }

    /// Stop every running session
    pub async fn shutdown(&self) {
        let connections = self.connections.read().await;
        let mut stopped = 0;
        for entry in connections.values() {
            if let Some(session) = &entry.session {
                if session.stop() {
                    stopped += 1;
                }
            }
        }
        tracing::info!(sessions = stopped, "Live view sessions stopped for shutdown");
    }

    /// Lifecycle phase for `conn`, or `None` if it is not connected
    pub async fn phase(&self, conn: ConnectionId) -> Option<SessionPhase> {
        let connections = self.connections.read().await;
        let entry = connections.get(&conn)?;
        Some(
            entry
                .session
                .as_ref()
                .map_or(SessionPhase::Idle, LiveSession::phase),
        )
    }

    /// Counters for the session on `conn`
    pub async fn session_stats(&self, conn: ConnectionId) -> Option<SessionStats> {
        let connections = self.connections.read().await;
        connections.get(&conn)?.session.as_ref().map(LiveSession::stats)
    }

    /// Counters for every connection with a running loop, ordered by id
    pub async fn streaming_stats(&self) -> Vec<(ConnectionId, SessionStats)> {
        let connections = self.connections.read().await;
        let mut stats: Vec<_> = connections
            .iter()
            .filter_map(|(conn, entry)| {
                entry
                    .session
                    .as_ref()
                    .filter(|session| session.is_running())
                    .map(|session| (*conn, session.stats()))
            })
            .collect();
        stats.sort_by_key(|(conn, _)| *conn);
        stats
    }

    /// Number of connections with a running loop
    pub async fn active_sessions(&self) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter(|entry| entry.is_streaming())
            .count()
    }

    /// Number of connected clients
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Connections registered since startup
    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }
}

/// Clear the session slot when its loop exits
///
/// Generation-checked: a loop never clears a newer session's slot.
async fn finish_session(
    connections: ConnectionMap,
    conn: ConnectionId,
    generation: u64,
    end: SessionEnd,
) {
    let mut connections = connections.write().await;

    if let Some(entry) = connections.get_mut(&conn) {
        if entry.generation == generation {
            entry.session = None;
        }
    }

    tracing::debug!(conn_id = %conn, generation, reason = ?end, "Live view session removed");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::device::{CameraError, Device, DeviceRegistry};
    use crate::driver::{CaptureOutcome, ScriptedDriver};
    use crate::session::INFO_STOPPED;

    fn nikon() -> Device {
        Device::new("Nikon D90", "usb:001")
    }

    fn generic() -> Device {
        Device::new("Generic Cam", "usb:002")
    }

    async fn registry_with(devices: Vec<Device>) -> (SessionRegistry<ScriptedDriver>, ScriptedDriver) {
        let driver = ScriptedDriver::with_devices(devices);
        let devices = Arc::new(DeviceRegistry::new(driver.clone()));
        let _ = devices.discover().await;
        let gateway = Arc::new(CaptureGateway::new(devices));
        (SessionRegistry::new(gateway), driver)
    }

    /// Let spawned loops run until they block on time
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_device() {
        let (registry, _) = registry_with(vec![]).await;
        let (sink, mut rx) = registry.event_channel();
        let conn = registry.register(sink).await;

        let result = registry.start_session(conn).await;
        assert_eq!(result, Err(SessionError::Camera(CameraError::NoActiveDevice)));
        assert!(matches!(rx.recv().await, Some(StreamEvent::Error(_))));
        assert_eq!(registry.phase(conn).await, Some(SessionPhase::Idle));
    }

    #[tokio::test]
    async fn test_unknown_connection() {
        let (registry, _) = registry_with(vec![nikon()]).await;
        let conn = ConnectionId::new(42);

        assert_eq!(
            registry.start_session(conn).await,
            Err(SessionError::UnknownConnection(conn))
        );
        assert_eq!(
            registry.stop_session(conn).await,
            Err(SessionError::UnknownConnection(conn))
        );
        assert_eq!(registry.phase(conn).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_noop() {
        let (registry, driver) = registry_with(vec![nikon()]).await;
        let (sink, mut rx) = registry.event_channel();
        let conn = registry.register(sink).await;

        let first = registry.start_session(conn).await.unwrap();
        assert_eq!(first, StartOutcome::Started { port: "usb:001".into() });
        assert!(matches!(rx.recv().await, Some(StreamEvent::Frame(_))));

        let second = registry.start_session(conn).await.unwrap();
        assert_eq!(second, StartOutcome::AlreadyRunning);
        assert_eq!(rx.recv().await, Some(StreamEvent::Info(INFO_ALREADY_RUNNING.into())));
        assert_eq!(registry.phase(conn).await, Some(SessionPhase::Running));
        assert_eq!(registry.active_sessions().await, 1);

        // One loop: one capture per frame interval
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(driver.capture_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let (registry, _) = registry_with(vec![nikon()]).await;
        let (sink, mut rx) = registry.event_channel();
        let conn = registry.register(sink).await;

        // Idle: nothing to stop, nothing emitted
        assert_eq!(registry.stop_session(conn).await, Ok(StopOutcome::NotRunning));

        registry.start_session(conn).await.unwrap();
        assert!(matches!(rx.recv().await, Some(StreamEvent::Frame(_))));

        assert_eq!(registry.stop_session(conn).await, Ok(StopOutcome::Stopping));
        assert_eq!(registry.stop_session(conn).await, Ok(StopOutcome::NotRunning));

        assert_eq!(rx.recv().await, Some(StreamEvent::Info(INFO_STOPPED.into())));
        settle().await;
        assert_eq!(registry.phase(conn).await, Some(SessionPhase::Idle));
        assert_eq!(registry.stop_session(conn).await, Ok(StopOutcome::NotRunning));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_failure() {
        let (registry, driver) = registry_with(vec![nikon()]).await;
        driver.push_outcome(CaptureOutcome::Fail("busy".into()));
        let (sink, mut rx) = registry.event_channel();
        let conn = registry.register(sink).await;

        registry.start_session(conn).await.unwrap();
        assert!(matches!(rx.recv().await, Some(StreamEvent::Error(_))));
        settle().await;
        assert_eq!(registry.phase(conn).await, Some(SessionPhase::Idle));
        assert_eq!(registry.active_sessions().await, 0);

        registry.start_session(conn).await.unwrap();
        assert!(matches!(rx.recv().await, Some(StreamEvent::Frame(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_waits_for_stopping_loop() {
        let (registry, driver) = registry_with(vec![nikon()]).await;
        driver.set_latency(Duration::from_millis(80));
        let (sink, mut rx) = registry.event_channel();
        let conn = registry.register(sink).await;

        registry.start_session(conn).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        registry.stop_session(conn).await.unwrap();

        // Old loop is mid-capture; restart must wait for it
        let outcome = registry.start_session(conn).await.unwrap();
        assert!(matches!(outcome, StartOutcome::Started { .. }));
        assert_eq!(rx.recv().await, Some(StreamEvent::Info(INFO_STOPPED.into())));
        assert!(matches!(rx.recv().await, Some(StreamEvent::Frame(_))));
        assert_eq!(driver.peak_concurrency(), 1);
        assert_eq!(registry.phase(conn).await, Some(SessionPhase::Running));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_stops_session() {
        let (registry, driver) = registry_with(vec![nikon()]).await;
        let (sink, mut rx) = registry.event_channel();
        let conn = registry.register(sink).await;

        registry.start_session(conn).await.unwrap();
        assert!(matches!(rx.recv().await, Some(StreamEvent::Frame(_))));

        registry.on_disconnect(conn).await;
        assert_eq!(registry.connection_count().await, 0);
        assert_eq!(registry.phase(conn).await, None);

        let captures = driver.capture_count();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(driver.capture_count(), captures);

        // Disconnecting again is harmless
        registry.on_disconnect(conn).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_stays_bound_to_port() {
        let (registry, driver) = registry_with(vec![nikon(), generic()]).await;
        let (sink, mut rx) = registry.event_channel();
        let conn = registry.register(sink).await;

        registry.start_session(conn).await.unwrap();
        assert!(matches!(rx.recv().await, Some(StreamEvent::Frame(_))));

        // Switch the active device mid-stream, then unplug the bound one
        registry.gateway().devices().select_by_port("usb:002").await.unwrap();
        assert!(matches!(rx.recv().await, Some(StreamEvent::Frame(_))));

        driver.set_devices(vec![generic()]);
        let _ = registry.gateway().devices().discover().await;
        assert!(
            matches!(rx.recv().await, Some(StreamEvent::Error(ref m)) if m.contains("usb:001"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_are_independent() {
        let (registry, _) = registry_with(vec![nikon()]).await;
        let (sink_a, mut rx_a) = registry.event_channel();
        let (sink_b, mut rx_b) = registry.event_channel();
        let a = registry.register(sink_a).await;
        let b = registry.register(sink_b).await;
        assert_ne!(a, b);

        registry.start_session(a).await.unwrap();
        registry.start_session(b).await.unwrap();
        assert!(matches!(rx_a.recv().await, Some(StreamEvent::Frame(_))));
        assert!(matches!(rx_b.recv().await, Some(StreamEvent::Frame(_))));

        registry.stop_session(a).await.unwrap();
        assert_eq!(rx_a.recv().await, Some(StreamEvent::Info(INFO_STOPPED.into())));
        assert!(matches!(rx_b.recv().await, Some(StreamEvent::Frame(_))));
        assert_eq!(registry.total_connections(), 2);

        registry.shutdown().await;
        settle().await;
        assert_eq!(registry.active_sessions().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_starts_during_wind_down() {
        let (registry, driver) = registry_with(vec![nikon()]).await;
        let registry = Arc::new(registry);
        driver.set_latency(Duration::from_millis(80));
        let (sink, mut rx) = registry.event_channel();
        let conn = registry.register(sink).await;

        registry.start_session(conn).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(registry.stop_session(conn).await, Ok(StopOutcome::Stopping));

        let first = tokio::spawn({
            let registry = Arc::clone(&registry);
            async move { registry.start_session(conn).await }
        });
        let second = tokio::spawn({
            let registry = Arc::clone(&registry);
            async move { registry.start_session(conn).await }
        });

        // The old loop is still inside its capture; neither start may finish
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!first.is_finished());
        assert!(!second.is_finished());

        let mut outcomes = vec![
            first.await.unwrap().unwrap(),
            second.await.unwrap().unwrap(),
        ];
        outcomes.sort_by_key(|outcome| matches!(outcome, StartOutcome::AlreadyRunning));
        assert_eq!(
            outcomes,
            vec![
                StartOutcome::Started { port: "usb:001".into() },
                StartOutcome::AlreadyRunning,
            ]
        );

        assert_eq!(rx.recv().await, Some(StreamEvent::Info(INFO_STOPPED.into())));
        assert_eq!(registry.active_sessions().await, 1);
        assert_eq!(driver.peak_concurrency(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_streaming_stats_lists_running_sessions() {
        let (registry, _) = registry_with(vec![nikon()]).await;
        let (sink_a, mut rx_a) = registry.event_channel();
        let (sink_b, _rx_b) = registry.event_channel();
        let a = registry.register(sink_a).await;
        let b = registry.register(sink_b).await;

        registry.start_session(a).await.unwrap();
        assert!(matches!(rx_a.recv().await, Some(StreamEvent::Frame(_))));

        let stats = registry.streaming_stats().await;
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].0, a);
        assert_eq!(stats[0].1.frames_sent, 1);

        registry.stop_session(a).await.unwrap();
        assert!(registry.streaming_stats().await.is_empty());
        assert_eq!(registry.phase(b).await, Some(SessionPhase::Idle));
    }
}
