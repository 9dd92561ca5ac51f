use thiserror::Error;

/// Errors raised while loading or interpreting storage configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings are present but inconsistent, e.g. a URL without a token.
    #[error("misconfiguration: {0}")]
    Misconfiguration(String),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
}
