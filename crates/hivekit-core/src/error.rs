//! Unified error handling for the Hivekit crates.

use thiserror::Error;

/// Top-level error type for the Hivekit framework.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Debug, Error)]
pub enum HivekitError {
    /// An error originating from a worker or the router.
    #[error("Agent error: {0}")]
    Agent(String),

    /// An error from a tool provider connection or capability call.
    #[error("Provider error: {0}")]
    Provider(String),

    /// An error from an outbound HTTP request.
    #[error("HTTP error: {0}")]
    Http(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`HivekitError`].
pub type HivekitResult<T> = Result<T, HivekitError>;
