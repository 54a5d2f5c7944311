//! Live view and server counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Live counters updated by a running session loop
#[derive(Debug)]
pub struct SessionCounters {
    started_at: Instant,
    frames_sent: AtomicU64,
    frames_dropped: AtomicU64,
    bytes_sent: AtomicU64,
}

impl SessionCounters {
    /// Create counters starting now
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            frames_sent: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
        }
    }

    /// Record a frame handed to the client
    pub fn record_sent(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a frame dropped because the client buffer was full
    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> SessionStats {
        SessionStats {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            duration: self.started_at.elapsed(),
        }
    }
}

impl Default for SessionCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Session-level statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    /// Frames pushed to the client
    pub frames_sent: u64,
    /// Frames dropped on a full client buffer
    pub frames_dropped: u64,
    /// Image bytes pushed to the client
    pub bytes_sent: u64,
    /// Time since the session started
    #[serde(serialize_with = "as_millis")]
    pub duration: Duration,
}

impl SessionStats {
    /// Delivered frames per second over the session lifetime
    pub fn frame_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.frames_sent as f64 / secs
        } else {
            0.0
        }
    }
}

/// Server-wide statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerStats {
    /// Connections accepted since startup
    pub total_connections: u64,
    /// Currently connected clients
    pub active_connections: u64,
    /// Connections with a running live view
    pub active_sessions: u64,
    /// Devices in the latest discovery snapshot
    pub known_devices: u64,
    /// Time since the server started
    #[serde(serialize_with = "as_millis")]
    pub uptime: Duration,
}

fn as_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = SessionCounters::new();
        counters.record_sent(1000);
        counters.record_sent(500);
        counters.record_dropped();

        let stats = counters.snapshot();
        assert_eq!(stats.frames_sent, 2);
        assert_eq!(stats.frames_dropped, 1);
        assert_eq!(stats.bytes_sent, 1500);
    }

    #[test]
    fn test_frame_rate() {
        let stats = SessionStats {
            frames_sent: 50,
            duration: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(stats.frame_rate(), 10.0);
    }

    #[test]
    fn test_frame_rate_zero_duration() {
        let stats = SessionStats {
            frames_sent: 3,
            ..Default::default()
        };
        assert_eq!(stats.frame_rate(), 0.0);
    }

    #[test]
    fn test_stats_serialize_duration_as_millis() {
        let stats = ServerStats {
            uptime: Duration::from_millis(1500),
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["uptime"], 1500);
        assert_eq!(json["active_sessions"], 0);
    }
}
