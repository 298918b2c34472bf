use thiserror::Error;

pub type Result<T> = std::result::Result<T, CofferError>;

#[derive(Debug, Error)]
pub enum CofferError {
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("metadata not found: {0}")]
    MetadataNotFound(String),

    #[error("no storage nodes available")]
    NoNodes,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}
