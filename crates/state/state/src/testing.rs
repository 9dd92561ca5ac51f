use crate::error::StateError;
use crate::key::StateKey;
use crate::store::KeyValueStore;

/// Run the full key-value store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if a store operation fails; assertion failures panic.
pub async fn run_store_conformance_tests(store: &dyn KeyValueStore) -> Result<(), StateError> {
    test_get_missing(store).await?;
    test_set_and_get(store).await?;
    test_overwrite(store).await?;
    test_verbatim_values(store).await?;
    test_delete(store).await?;
    test_exists(store).await?;
    test_namespace_isolation(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn KeyValueStore) -> Result<(), StateError> {
    let key = StateKey::chat("missing");
    let val = store.get(&key).await?;
    assert!(val.is_none(), "get on missing key should return None");
    Ok(())
}

async fn test_set_and_get(store: &dyn KeyValueStore) -> Result<(), StateError> {
    for key in [
        StateKey::chat("set-get"),
        StateKey::limit("set-get"),
        StateKey::parse("set-get"),
    ] {
        store.set(&key, "hello").await?;
        let val = store.get(&key).await?;
        assert_eq!(val.as_deref(), Some("hello"), "round trip for {key}");
    }
    Ok(())
}

async fn test_overwrite(store: &dyn KeyValueStore) -> Result<(), StateError> {
    let key = StateKey::chat("overwrite");
    store.set(&key, "a much longer first value").await?;
    store.set(&key, "short").await?;
    let val = store.get(&key).await?;
    assert_eq!(
        val.as_deref(),
        Some("short"),
        "second write should fully replace the first"
    );
    Ok(())
}

async fn test_verbatim_values(store: &dyn KeyValueStore) -> Result<(), StateError> {
    let key = StateKey::chat("verbatim");
    let value = "{\"messages\":[{\"role\":\"user\",\"content\":\"Σ of col A?\\n\"}]}\n  ";
    store.set(&key, value).await?;
    assert_eq!(store.get(&key).await?.as_deref(), Some(value));

    let empty = StateKey::chat("empty");
    store.set(&empty, "").await?;
    assert_eq!(store.get(&empty).await?.as_deref(), Some(""));
    Ok(())
}

async fn test_delete(store: &dyn KeyValueStore) -> Result<(), StateError> {
    let key = StateKey::chat("to-delete");
    store.set(&key, "bye").await?;
    store.delete(&key).await?;
    let val = store.get(&key).await?;
    assert!(val.is_none(), "get after delete should return None");

    store.delete(&key).await?;
    let val = store.get(&key).await?;
    assert!(val.is_none(), "second delete should leave the key absent");

    store.delete(&StateKey::parse("never-written")).await?;
    Ok(())
}

async fn test_exists(store: &dyn KeyValueStore) -> Result<(), StateError> {
    let key = StateKey::limit("exists");
    assert!(!store.exists(&key).await?);
    store.set(&key, "{}").await?;
    assert!(store.exists(&key).await?);
    store.delete(&key).await?;
    assert!(!store.exists(&key).await?);
    Ok(())
}

async fn test_namespace_isolation(store: &dyn KeyValueStore) -> Result<(), StateError> {
    let chat = StateKey::chat("isolated");
    let plain = StateKey::parse("isolated");
    let limit = StateKey::limit("isolated");

    store.set(&chat, "chat-value").await?;
    assert!(
        store.get(&plain).await?.is_none(),
        "chat key must not be visible without its prefix"
    );
    assert!(
        store.get(&limit).await?.is_none(),
        "chat key must not be visible under another prefix"
    );

    store.set(&plain, "plain-value").await?;
    assert_eq!(store.get(&chat).await?.as_deref(), Some("chat-value"));
    assert_eq!(store.get(&plain).await?.as_deref(), Some("plain-value"));

    store.delete(&plain).await?;
    assert_eq!(
        store.get(&chat).await?.as_deref(),
        Some("chat-value"),
        "deleting the plain key must not touch the chat key"
    );
    Ok(())
}
