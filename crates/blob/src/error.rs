use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// An I/O error from the underlying filesystem.
    #[error("blob I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key cannot address a blob.
    #[error("invalid blob key: {0}")]
    InvalidKey(String),

    /// The blob or upload is not permitted by policy.
    #[error("not allowed: {0}")]
    NotAllowed(String),

    /// The upload exceeds the maximum allowed size.
    #[error("blob too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge {
        /// Actual size.
        size: u64,
        /// Maximum allowed size.
        limit: u64,
    },
}
