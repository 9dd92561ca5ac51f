use async_trait::async_trait;

use crate::error::StateError;
use crate::key::StateKey;

/// Trait for persisting opaque string values by key.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
/// Writes replace the previous value in full; concurrent writers to the same
/// key resolve as last-write-wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;

    /// Store `value` under `key`, overwriting any previous value.
    async fn set(&self, key: &StateKey, value: &str) -> Result<(), StateError>;

    /// Get the value for a key. Returns `None` if not found.
    async fn get(&self, key: &StateKey) -> Result<Option<String>, StateError>;

    /// Delete a key. Deleting a missing key succeeds.
    async fn delete(&self, key: &StateKey) -> Result<(), StateError>;

    /// Check whether a key currently holds a value.
    async fn exists(&self, key: &StateKey) -> Result<bool, StateError> {
        Ok(self.get(key).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify object safety.
    fn _assert_dyn_store(_: &dyn KeyValueStore) {}
}
