use thiserror::Error;

/// Errors from key-value store operations.
///
/// A missing key is not an error; reads report it as `None`.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}
