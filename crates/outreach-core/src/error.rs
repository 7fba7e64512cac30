use thiserror::Error;

/// Top-level error type for Outreach.
#[derive(Debug, Error)]
pub enum OutreachError {
    /// Error from the messaging transport (send, poll, chat failed to open).
    #[error("transport error: {0}")]
    Transport(String),

    /// Error from the reply generator (timeout, quota, malformed response).
    #[error("responder error: {0}")]
    Responder(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Lead store / delivery log error.
    #[error("store error: {0}")]
    Store(String),

    /// A lookup matched nothing (e.g. lead status update for an unknown contact).
    #[error("not found: {0}")]
    NotFound(String),

    /// A raw phone string that cannot be canonicalized.
    #[error("invalid contact: {0}")]
    InvalidContact(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
