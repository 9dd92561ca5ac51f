use async_trait::async_trait;
use dashmap::DashMap;

use csvchat_state::{KeyValueStore, StateError, StateKey};

/// In-memory [`KeyValueStore`] backed by a [`DashMap`].
///
/// Values live for the lifetime of the store. The async trait methods never
/// suspend.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    data: DashMap<String, String>,
}

impl MemoryKeyValueStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn set(&self, key: &StateKey, value: &str) -> Result<(), StateError> {
        self.data.insert(key.canonical(), value.to_owned());
        Ok(())
    }

    async fn get(&self, key: &StateKey) -> Result<Option<String>, StateError> {
        Ok(self.data.get(&key.canonical()).map(|v| v.value().clone()))
    }

    async fn delete(&self, key: &StateKey) -> Result<(), StateError> {
        self.data.remove(&key.canonical());
        Ok(())
    }

    async fn exists(&self, key: &StateKey) -> Result<bool, StateError> {
        Ok(self.data.contains_key(&key.canonical()))
    }
}

#[cfg(test)]
mod tests {
    use csvchat_state::testing::run_store_conformance_tests;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let store = MemoryKeyValueStore::new();
        run_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn len_tracks_live_keys() {
        let store = MemoryKeyValueStore::new();
        assert!(store.is_empty());
        store.set(&StateKey::chat("a"), "1").await.unwrap();
        store.set(&StateKey::chat("a"), "2").await.unwrap();
        store.set(&StateKey::parse("a"), "3").await.unwrap();
        assert_eq!(store.len(), 2);
        store.delete(&StateKey::chat("a")).await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
