use thiserror::Error;

/// Errors that can occur while storing uploaded media.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid media file name: {0:?}")]
    InvalidName(String),
    #[error("media file exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
    #[error("media storage IO error: {0}")]
    Io(#[from] std::io::Error),
}
