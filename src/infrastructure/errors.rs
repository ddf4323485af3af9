use crate::domain::DomainError;
use thiserror::Error;

/// Failures while reading or writing files.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed S2V data: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed JSON snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Sheet did not evaluate: {0}")]
    Domain(#[from] DomainError),
}

pub type StorageResult<T> = Result<T, StorageError>;
