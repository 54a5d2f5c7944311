//! Live view sessions
//!
//! One [`LiveSession`] per viewing client: a background task that captures a
//! frame through the [`CaptureGateway`](crate::capture::CaptureGateway),
//! pushes it to the client's [`EventSink`], and sleeps for the frame
//! interval, until it is cancelled or a capture fails.
//!
//! ```text
//!   Running ──capture ok──► push frame ──sleep──┐
//!      ▲                                        │
//!      └────────────────────────────────────────┘
//!      │ stop / disconnect            │ capture error
//!      ▼                              ▼
//!   Stopped (info "stopped")       Stopped (error event)
//! ```

pub mod config;
pub mod event;
pub mod state;
pub mod stream;

pub use config::SessionConfig;
pub use event::{EventSink, FramePush, StreamEvent, INFO_ALREADY_RUNNING, INFO_STOPPED};
pub use state::{SessionEnd, SessionPhase};
pub use stream::LiveSession;
