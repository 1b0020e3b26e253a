use thiserror::Error;

#[derive(Debug, Error)]
#[allow(clippy::enum_variant_names)]
pub enum SessionError {
    #[error("Session not found: {name}")]
    NotFound { name: String },

    #[error("Session {name} is corrupt: {source}")]
    Corrupt {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid session name: {name:?}")]
    InvalidName { name: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Session task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}

pub type SessionResult<T> = Result<T, SessionError>;
