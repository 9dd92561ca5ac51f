use serde::{Deserialize, Serialize};

use csvchat_core::Namespace;

/// Key used to address values in a [`KeyValueStore`](crate::KeyValueStore).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub namespace: Namespace,
    pub id: String,
}

impl StateKey {
    /// Create a new state key.
    #[must_use]
    pub fn new(namespace: Namespace, id: impl Into<String>) -> Self {
        Self {
            namespace,
            id: id.into(),
        }
    }

    /// Key of a chat record.
    #[must_use]
    pub fn chat(id: impl Into<String>) -> Self {
        Self::new(Namespace::Chat, id)
    }

    /// Key of a caller's rate-limit counter.
    #[must_use]
    pub fn limit(identity: impl Into<String>) -> Self {
        Self::new(Namespace::Limit, identity)
    }

    /// Parse a raw `prefix:id` key.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let (namespace, id) = Namespace::split_key(raw);
        Self::new(namespace, id)
    }

    /// Return the canonical string form: `chat:<id>`, `limit:<id>` or `<id>`.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self.namespace.prefix() {
            Some(prefix) => format!("{prefix}:{}", self.id),
            None => self.id.clone(),
        }
    }
}

impl From<&str> for StateKey {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_roundtrip() {
        for raw in ["chat:abc", "limit:fp-9", "plain", "other:thing"] {
            assert_eq!(StateKey::parse(raw).canonical(), raw);
        }
    }

    #[test]
    fn constructors() {
        assert_eq!(StateKey::chat("a"), StateKey::parse("chat:a"));
        assert_eq!(StateKey::limit("b").canonical(), "limit:b");
        assert_eq!(StateKey::from("x").namespace, Namespace::Default);
    }

    #[test]
    fn serde_shape() {
        let key = StateKey::chat("abc");
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["namespace"], "chat");
        assert_eq!(json["id"], "abc");
    }
}
