//! Statistics for live view sessions and the server

pub mod metrics;

pub use metrics::{ServerStats, SessionCounters, SessionStats};
