use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use csvchat_state::{KeyValueStore, StateError, StateKey};

use crate::client::RedisRestClient;
use crate::config::RedisRestConfig;

/// [`KeyValueStore`] backed by a Redis-compatible REST endpoint.
///
/// Keys are stored under their canonical form (`chat:<id>`, `limit:<id>`,
/// `<key>`), values as plain strings. Each operation is a single command.
pub struct RedisKeyValueStore {
    client: Arc<RedisRestClient>,
}

impl RedisKeyValueStore {
    /// Create a store from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns the error of [`RedisRestClient::new`].
    pub fn new(config: &RedisRestConfig) -> Result<Self, StateError> {
        Ok(Self::with_client(Arc::new(RedisRestClient::new(config)?)))
    }

    pub fn with_client(client: Arc<RedisRestClient>) -> Self {
        Self { client }
    }

    /// Shared handle to the underlying client.
    pub fn client(&self) -> Arc<RedisRestClient> {
        Arc::clone(&self.client)
    }
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    fn backend(&self) -> &'static str {
        "redis-rest"
    }

    async fn set(&self, key: &StateKey, value: &str) -> Result<(), StateError> {
        let key = key.canonical();
        let _: String = self.client.command(&["SET", &key, value]).await?;
        debug!(%key, "value written");
        Ok(())
    }

    async fn get(&self, key: &StateKey) -> Result<Option<String>, StateError> {
        self.client.command(&["GET", &key.canonical()]).await
    }

    async fn delete(&self, key: &StateKey) -> Result<(), StateError> {
        let key = key.canonical();
        let removed: i64 = self.client.command(&["DEL", &key]).await?;
        debug!(%key, removed, "value deleted");
        Ok(())
    }

    async fn exists(&self, key: &StateKey) -> Result<bool, StateError> {
        let count: i64 = self.client.command(&["EXISTS", &key.canonical()]).await?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use csvchat_state::testing::run_store_conformance_tests;

    use super::*;
    use crate::testing::MockRestServer;

    #[tokio::test]
    async fn conformance() {
        let server = MockRestServer::start().await;
        let store = RedisKeyValueStore::new(&server.config()).unwrap();
        run_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn stores_canonical_keys() {
        let server = MockRestServer::start().await;
        let store = RedisKeyValueStore::new(&server.config()).unwrap();

        store.set(&StateKey::chat("abc"), "{}").await.unwrap();
        store.set(&StateKey::parse("plain"), "p").await.unwrap();

        assert_eq!(server.raw_get("chat:abc").as_deref(), Some("{}"));
        assert_eq!(server.raw_get("plain").as_deref(), Some("p"));
    }

    #[tokio::test]
    async fn errors_propagate() {
        let server = MockRestServer::start().await;
        let config = RedisRestConfig::new(server.url(), "wrong");
        let store = RedisKeyValueStore::new(&config).unwrap();

        assert!(store.get(&StateKey::chat("a")).await.is_err());
        assert!(store.set(&StateKey::chat("a"), "v").await.is_err());
        assert!(store.delete(&StateKey::chat("a")).await.is_err());
    }
}
