use async_trait::async_trait;

use csvchat_core::QuotaStatus;

use crate::error::RateLimitError;

/// Per-identity daily message quota.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;

    /// Report the remaining quota without consuming any of it.
    ///
    /// May persist a window reset when the stored window has ended.
    async fn peek_remaining(&self, identity: &str) -> Result<QuotaStatus, RateLimitError>;

    /// Consume one unit of quota.
    ///
    /// Fails with [`RateLimitError::QuotaExceeded`] once the quota for the
    /// current window is used up.
    async fn consume(&self, identity: &str) -> Result<QuotaStatus, RateLimitError>;
}
