use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueueError>;

/// Transport failures. Any of these ends the current broker session.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Failed to connect to broker: {0}")]
    Connect(String),

    #[error("Failed to subscribe to scan jobs: {0}")]
    Subscribe(String),

    #[error("Failed to receive scan job: {0}")]
    Receive(String),

    #[error("Failed to publish to {subject}: {reason}")]
    Publish { subject: String, reason: String },

    #[error("Failed to acknowledge scan job: {0}")]
    Ack(String),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}
