//! Error definitions for extraction, generation and configuration.

use thiserror::Error;

#[derive(Debug, Error)]
/// Top-level error type returned by public APIs.
pub enum ScriptContextError {
    /// The manifest could not be parsed, even after wrapping it in a synthetic root.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// A parameter declaration cannot produce a usable identifier.
    #[error(
        "invalid parameter #{position} (id: {}): {reason}",
        .id.as_deref().unwrap_or("<none>")
    )]
    InvalidParameter {
        /// 1-based position of the declaration in document order.
        position: usize,
        id: Option<String>,
        reason: String,
    },
    /// Emission finished with open blocks left on the buffer.
    #[error("unbalanced block nesting: depth {depth} at finalization")]
    UnbalancedBlock { depth: usize },
    /// Invalid generator configuration.
    #[error("config error: {0}")]
    ConfigError(String),
    /// Output serialization failure.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// Filesystem I/O error from CLI or callers that propagate I/O.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
