use thiserror::Error;

/// Top-level error type for Beacon.
#[derive(Debug, Error)]
pub enum BeaconError {
    /// Error from the chat platform.
    #[error("chat error: {0}")]
    Chat(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Malformed lifecycle event.
    #[error("event error: {0}")]
    Event(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
