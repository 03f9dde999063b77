//! Error types for the telemetry session.

use thiserror::Error;

/// Main error type for session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The telemetry source was unreachable or rejected the credentials.
    #[error("Connect error: {0}")]
    Connect(String),

    /// The session header carried no usable session identifier.
    #[error("Invalid session header: {0}")]
    InvalidHeader(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The telemetry stream failed after the session was established.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Enrichment source error: {0}")]
    Enrichment(String),

    #[error("Session is already running")]
    AlreadyRunning,
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::Serialization(e.to_string())
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
