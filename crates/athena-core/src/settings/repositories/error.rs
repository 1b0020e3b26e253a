use thiserror::Error;

#[derive(Debug, Error)]
#[allow(clippy::enum_variant_names)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Settings task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}

pub type SettingsResult<T> = Result<T, SettingsError>;
