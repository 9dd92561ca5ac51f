use serde::{Deserialize, Serialize};

/// Logical collection a key belongs to, selected by its colon prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Chat records (`chat:<id>`).
    Chat,
    /// Rate-limit counters (`limit:<id>`).
    Limit,
    /// Keys without a recognized prefix.
    Default,
}

impl Namespace {
    /// Every namespace, in a stable order.
    pub const ALL: [Self; 3] = [Self::Chat, Self::Limit, Self::Default];

    /// The key prefix (without the trailing colon), if this namespace has one.
    #[must_use]
    pub const fn prefix(self) -> Option<&'static str> {
        match self {
            Self::Chat => Some("chat"),
            Self::Limit => Some("limit"),
            Self::Default => None,
        }
    }

    /// Return a string representation of the namespace.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Limit => "limit",
            Self::Default => "default",
        }
    }

    /// Split a raw key into its namespace and the remaining identifier.
    ///
    /// Only the first recognized prefix is stripped; unrecognized prefixes
    /// stay part of the identifier of a [`Namespace::Default`] key.
    #[must_use]
    pub fn split_key(key: &str) -> (Self, &str) {
        for ns in [Self::Chat, Self::Limit] {
            if let Some(prefix) = ns.prefix()
                && let Some(rest) = key.strip_prefix(prefix)
                && let Some(id) = rest.strip_prefix(':')
            {
                return (ns, id);
            }
        }
        (Self::Default, key)
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chat" | "chats" => Ok(Self::Chat),
            "limit" | "limits" => Ok(Self::Limit),
            "default" => Ok(Self::Default),
            other => Err(format!("unknown namespace: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_recognized_prefixes() {
        assert_eq!(Namespace::split_key("chat:abc"), (Namespace::Chat, "abc"));
        assert_eq!(Namespace::split_key("limit:fp-1"), (Namespace::Limit, "fp-1"));
    }

    #[test]
    fn split_only_strips_first_prefix() {
        assert_eq!(
            Namespace::split_key("chat:chat:x"),
            (Namespace::Chat, "chat:x")
        );
    }

    #[test]
    fn split_unknown_prefix_is_default() {
        assert_eq!(
            Namespace::split_key("session:42"),
            (Namespace::Default, "session:42")
        );
        assert_eq!(Namespace::split_key("chats"), (Namespace::Default, "chats"));
        assert_eq!(Namespace::split_key("chatty:1"), (Namespace::Default, "chatty:1"));
    }

    #[test]
    fn parse_namespace() {
        assert_eq!("chat".parse::<Namespace>().unwrap(), Namespace::Chat);
        assert_eq!("LIMITS".parse::<Namespace>().unwrap(), Namespace::Limit);
        assert_eq!("default".parse::<Namespace>().unwrap(), Namespace::Default);
        assert!("uploads".parse::<Namespace>().is_err());
    }
}
