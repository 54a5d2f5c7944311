//! Events pushed to a viewing client

use bytes::Bytes;
use tokio::sync::mpsc;

/// Info message sent when a start request finds the stream running
pub const INFO_ALREADY_RUNNING: &str = "live view already running";

/// Info message sent once a stopped loop has exited
pub const INFO_STOPPED: &str = "live view stopped";

/// Event delivered to one client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Captured live view frame
    Frame(Bytes),
    /// Capture or request failure
    Error(String),
    /// Informational status
    Info(String),
}

/// Result of pushing a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePush {
    /// Queued for the client
    Sent,
    /// Client buffer full; frame discarded
    Dropped,
    /// Client gone
    Closed,
}

/// Outbound event channel for one client connection
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventSink {
    /// Create a sink and the receiver the transport drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Push a frame without waiting
    ///
    /// Frames never wait on the client; a full buffer drops the frame.
    pub fn push_frame(&self, data: Bytes) -> FramePush {
        match self.tx.try_send(StreamEvent::Frame(data)) {
            Ok(()) => FramePush::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => FramePush::Dropped,
            Err(mpsc::error::TrySendError::Closed(_)) => FramePush::Closed,
        }
    }

    /// Deliver a control event, waiting for buffer space
    ///
    /// Returns `false` if the client has gone away.
    pub async fn notify(&self, event: StreamEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    /// Send an error event
    pub async fn error(&self, message: impl Into<String>) -> bool {
        self.notify(StreamEvent::Error(message.into())).await
    }

    /// Send an info event
    pub async fn info(&self, message: impl Into<String>) -> bool {
        self.notify(StreamEvent::Info(message.into())).await
    }

    /// Whether the client side has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_drop_when_full() {
        let (sink, mut rx) = EventSink::channel(1);

        assert_eq!(sink.push_frame(Bytes::from_static(b"a")), FramePush::Sent);
        assert_eq!(sink.push_frame(Bytes::from_static(b"b")), FramePush::Dropped);

        assert_eq!(rx.recv().await, Some(StreamEvent::Frame(Bytes::from_static(b"a"))));
    }

    #[tokio::test]
    async fn test_closed_sink() {
        let (sink, rx) = EventSink::channel(4);
        drop(rx);

        assert!(sink.is_closed());
        assert_eq!(sink.push_frame(Bytes::new()), FramePush::Closed);
        assert!(!sink.info("hello").await);
    }

    #[tokio::test]
    async fn test_control_events_wait_for_space() {
        let (sink, mut rx) = EventSink::channel(1);
        sink.push_frame(Bytes::from_static(b"a"));

        let notify = {
            let sink = sink.clone();
            tokio::spawn(async move { sink.error("boom").await })
        };

        assert!(matches!(rx.recv().await, Some(StreamEvent::Frame(_))));
        assert_eq!(rx.recv().await, Some(StreamEvent::Error("boom".into())));
        assert!(notify.await.unwrap());
    }
}
