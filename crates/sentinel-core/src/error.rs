//! Error types for `Sentinel` core library.

use thiserror::Error;

/// Result type alias using `Sentinel` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `Sentinel` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A value that does not name a known content type, status or band
    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
