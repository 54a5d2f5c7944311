//! Session registry
//!
//! Maps each client connection to its live view session and dispatches
//! start, stop and disconnect signals to it.
//!
//! ```text
//!                   SessionRegistry
//!          ┌──────────────────────────────────┐
//!          │ connections: HashMap<ConnId,     │
//!          │   ConnectionEntry {              │
//!          │     sink: EventSink,             │
//!          │     session: Option<LiveSession>,│
//!          │   }                              │
//!          │ >                                │
//!          └────────────────┬─────────────────┘
//!                           │ start_session()
//!                           ▼
//!       LiveSession loop ──► CaptureGateway ──► frame ──► sink ──► client
//! ```
//!
//! A connection entry lives from `register` until `on_disconnect`. Its
//! session slot is cleared by the loop itself when the loop ends, so a new
//! start is possible after a stop or a capture failure.

pub mod entry;
pub mod error;
pub mod store;

pub use entry::ConnectionId;
pub use error::SessionError;
pub use store::{SessionRegistry, StartOutcome, StopOutcome};
