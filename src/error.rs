//! Crate-level error types

/// Top-level error for server operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket or process I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used by the server surface
pub type Result<T> = std::result::Result<T, Error>;
