use std::fmt;
use std::time::Duration;

/// Connection settings for a Redis-compatible REST endpoint.
#[derive(Clone)]
pub struct RedisRestConfig {
    /// Base URL every command is `POST`ed to.
    pub url: String,

    /// Bearer token sent with every command.
    pub token: String,

    /// Per-request timeout of the HTTP client.
    pub timeout: Duration,
}

impl RedisRestConfig {
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for RedisRestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisRestConfig")
            .field("url", &self.url)
            .field("token", &"[redacted]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = RedisRestConfig::new("https://kv.example.com", "secret");
        assert_eq!(cfg.url, "https://kv.example.com");
        assert_eq!(cfg.timeout, Duration::from_secs(10));
    }

    #[test]
    fn debug_hides_token() {
        let cfg = RedisRestConfig::new("https://kv.example.com", "s3cr3t");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("kv.example.com"));
    }
}
