use thiserror::Error;

/// Errors that can occur when interacting with the event bus.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// The bus has been shut down and no longer accepts events.
    #[error("Event bus is closed")]
    Closed,

    /// The broker rejected or failed to deliver the event.
    #[error("Delivery failed on topic {topic}: {reason}")]
    Delivery { topic: String, reason: String },

    /// A payload could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for event bus operations.
pub type Result<T> = std::result::Result<T, EventBusError>;

/// Error returned by an event handler.
///
/// Handler errors are logged by the dispatcher and never stop consumption.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The event payload did not match the expected contract.
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The local state transition failed.
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    /// Wraps any displayable error as a handler failure.
    pub fn failed(err: impl std::fmt::Display) -> Self {
        HandlerError::Failed(err.to_string())
    }
}
