use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, instrument};

use csvchat_core::{DAILY_QUOTA, FixedWindow, QUOTA_WINDOW_MS, QuotaStatus, fixed_window};
use csvchat_state::StateError;
use csvchat_state_redis::RedisRestClient;

use crate::error::RateLimitError;
use crate::limiter::RateLimiter;

/// Key prefix shared with other fixed-window clients of the same database.
pub const DEFAULT_PREFIX: &str = "@upstash/ratelimit";

/// Increment the window counter and arm its expiry on the first hit.
const FIXED_WINDOW_SCRIPT: &str = r#"
local key     = KEYS[1]
local window  = ARGV[1]
local incrementBy = ARGV[2]

local r = redis.call("INCRBY", key, incrementBy)
if r == tonumber(incrementBy) then
  redis.call("PEXPIRE", key, window)
end

return r
"#;

/// Rate limiter over a remote atomic counter.
///
/// Windows are aligned to the Unix epoch, so every instance sharing the
/// database agrees on them. Each window has its own key,
/// `<prefix>:<identity>:<window index>`, which expires with the window.
pub struct RemoteRateLimiter {
    client: Arc<RedisRestClient>,
    prefix: String,
    limit: u64,
    window_ms: i64,
}

impl RemoteRateLimiter {
    pub fn new(client: Arc<RedisRestClient>) -> Self {
        Self {
            client,
            prefix: DEFAULT_PREFIX.to_owned(),
            limit: DAILY_QUOTA,
            window_ms: QUOTA_WINDOW_MS,
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn window_key(&self, identity: &str, window: &FixedWindow) -> String {
        format!("{}:{identity}:{}", self.prefix, window.index)
    }

    /// [`peek_remaining`](RateLimiter::peek_remaining) at an explicit clock reading.
    ///
    /// # Errors
    ///
    /// [`RateLimitError::Store`] if the counter cannot be read.
    pub async fn peek_remaining_at(
        &self,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<QuotaStatus, RateLimitError> {
        let window = fixed_window(&now, self.window_ms);
        let key = self.window_key(identity, &window);

        let raw: Option<Value> = self.client.command(&["GET", &key]).await?;
        let used = match raw {
            None | Some(Value::Null) => 0,
            Some(value) => parse_count(&value)?,
        };

        Ok(QuotaStatus {
            limit: self.limit,
            remaining: self.limit.saturating_sub(used),
            reset: window.end,
        })
    }

    /// [`consume`](RateLimiter::consume) at an explicit clock reading.
    ///
    /// # Errors
    ///
    /// [`RateLimitError::QuotaExceeded`] once the window's count passes the
    /// quota and [`RateLimitError::Store`] if the counter cannot be updated.
    pub async fn consume_at(
        &self,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<QuotaStatus, RateLimitError> {
        let window = fixed_window(&now, self.window_ms);
        let key = self.window_key(identity, &window);
        let window_ms = self.window_ms.to_string();

        let used: Value = self
            .client
            .eval(FIXED_WINDOW_SCRIPT, &[&key], &[&window_ms, "1"])
            .await?;
        let used = parse_count(&used)?;

        if used > self.limit {
            debug!(identity, used, "quota exhausted");
            return Err(RateLimitError::QuotaExceeded {
                limit: self.limit,
                reset: window.end,
            });
        }
        Ok(QuotaStatus {
            limit: self.limit,
            remaining: self.limit - used,
            reset: window.end,
        })
    }
}

/// Counters come back as JSON numbers from scripts and as strings from `GET`.
fn parse_count(value: &Value) -> Result<u64, StateError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .map(|n| u64::try_from(n).unwrap_or(0))
        .ok_or_else(|| StateError::Serialization(format!("counter is not an integer: {value}")))
}

#[async_trait]
impl RateLimiter for RemoteRateLimiter {
    fn backend(&self) -> &'static str {
        "redis-rest"
    }

    #[instrument(skip(self))]
    async fn peek_remaining(&self, identity: &str) -> Result<QuotaStatus, RateLimitError> {
        self.peek_remaining_at(identity, Utc::now()).await
    }

    #[instrument(skip(self))]
    async fn consume(&self, identity: &str) -> Result<QuotaStatus, RateLimitError> {
        self.consume_at(identity, Utc::now()).await
    }
}
