use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use csvchat_core::{DAILY_QUOTA, QuotaStatus, quota_window};
use csvchat_state::{KeyValueStore, StateError, StateKey};

use crate::error::RateLimitError;
use crate::limiter::RateLimiter;

/// Persisted counter, stored as `{"count":N,"resetTime":MS}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Counter {
    count: u64,
    /// End of the window in epoch milliseconds.
    reset_time: i64,
}

impl Counter {
    fn fresh(count: u64, now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            count,
            reset_time: (now + window).timestamp_millis(),
        }
    }

    fn expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() > self.reset_time
    }

    fn reset(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.reset_time).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Rate limiter keeping one counter per identity in a [`KeyValueStore`]
/// under `limit:<identity>`.
///
/// The window starts at the first request and lasts 24 hours. Updates for
/// one identity are serialized within this process; separate processes
/// sharing a data directory can still race.
pub struct LocalRateLimiter {
    store: Arc<dyn KeyValueStore>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    limit: u64,
    window: Duration,
}

impl LocalRateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
            limit: DAILY_QUOTA,
            window: quota_window(),
        }
    }

    /// Run `op` while holding the identity's lock. The lock entry is dropped
    /// again once no other task is waiting on it.
    async fn with_lock<T>(&self, identity: &str, op: impl Future<Output = T>) -> T {
        let lock = Arc::clone(&self.locks.entry(identity.to_owned()).or_default());
        let out = {
            let _guard = lock.lock().await;
            op.await
        };
        drop(lock);
        self.locks.remove_if(identity, |_, lock| Arc::strong_count(lock) == 1);
        out
    }

    /// Load the counter, falling back to a fresh one when it is missing or
    /// unreadable. The fallback is not persisted.
    async fn load(&self, key: &StateKey, now: DateTime<Utc>) -> Result<Counter, StateError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(Counter::fresh(0, now, self.window));
        };
        match serde_json::from_str(&raw) {
            Ok(counter) => Ok(counter),
            Err(e) => {
                debug!(key = %key, error = %e, "unreadable counter, starting fresh");
                Ok(Counter::fresh(0, now, self.window))
            }
        }
    }

    async fn save(&self, key: &StateKey, counter: &Counter) -> Result<(), StateError> {
        let raw = serde_json::to_string(counter)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        self.store.set(key, &raw).await
    }

    fn status(&self, counter: &Counter) -> QuotaStatus {
        QuotaStatus {
            limit: self.limit,
            remaining: self.limit.saturating_sub(counter.count),
            reset: counter.reset(),
        }
    }

    /// [`peek_remaining`](RateLimiter::peek_remaining) at an explicit clock reading.
    ///
    /// # Errors
    ///
    /// [`RateLimitError::Store`] if a window reset cannot be persisted.
    pub async fn peek_remaining_at(
        &self,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<QuotaStatus, RateLimitError> {
        self.with_lock(identity, self.peek_locked(identity, now)).await
    }

    async fn peek_locked(
        &self,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<QuotaStatus, RateLimitError> {
        let key = StateKey::limit(identity);
        let mut counter = self.load(&key, now).await?;
        if counter.expired(now) {
            counter = Counter::fresh(0, now, self.window);
            self.save(&key, &counter).await?;
            debug!(identity, "quota window reset");
        }
        Ok(self.status(&counter))
    }

    /// [`consume`](RateLimiter::consume) at an explicit clock reading.
    ///
    /// # Errors
    ///
    /// [`RateLimitError::QuotaExceeded`] once the quota is used up and
    /// [`RateLimitError::Store`] if the counter cannot be persisted.
    pub async fn consume_at(
        &self,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<QuotaStatus, RateLimitError> {
        self.with_lock(identity, self.consume_locked(identity, now)).await
    }

    async fn consume_locked(
        &self,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<QuotaStatus, RateLimitError> {
        let key = StateKey::limit(identity);
        let counter = self.load(&key, now).await?;
        let next = if counter.expired(now) {
            Counter::fresh(1, now, self.window)
        } else if counter.count >= self.limit {
            debug!(identity, count = counter.count, "quota exhausted");
            return Err(RateLimitError::QuotaExceeded {
                limit: self.limit,
                reset: counter.reset(),
            });
        } else {
            Counter {
                count: counter.count + 1,
                ..counter
            }
        };

        self.save(&key, &next).await?;
        Ok(self.status(&next))
    }
}

#[async_trait]
impl RateLimiter for LocalRateLimiter {
    fn backend(&self) -> &'static str {
        "local"
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
