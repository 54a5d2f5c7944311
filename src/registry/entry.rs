//! Connection entry types

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::session::{EventSink, LiveSession};

/// Identity of one client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric id
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-connection state stored in the registry
pub(super) struct ConnectionEntry {
    /// Outbound events for this client
    pub sink: EventSink,

    /// Live view, if one has been started and has not yet exited
    pub session: Option<LiveSession>,

    /// Generation of the most recently started session
    pub generation: u64,

    /// Held for the whole of a start request, so starts on one connection
    /// run one at a time
    pub start_lock: Arc<Mutex<()>>,

    /// When the client registered
    pub connected_at: Instant,
}

impl ConnectionEntry {
    pub(super) fn new(sink: EventSink) -> Self {
        Self {
            sink,
            session: None,
            generation: 0,
            start_lock: Arc::new(Mutex::new(())),
            connected_at: Instant::now(),
        }
    }

    /// Whether a live view loop is producing frames
    pub(super) fn is_streaming(&self) -> bool {
        self.session.as_ref().is_some_and(LiveSession::is_running)
    }
}
