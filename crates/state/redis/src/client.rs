use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use csvchat_state::StateError;

use crate::config::RedisRestConfig;

/// Minimal client for a Redis-compatible REST endpoint.
///
/// Every command is sent as `POST <url>` with a JSON array body such as
/// `["SET","chat:abc","{}"]` and a bearer token. The endpoint answers with
/// `{"result": ...}` on success or `{"error": "..."}` on failure.
#[derive(Debug, Clone)]
pub struct RedisRestClient {
    url: String,
    token: String,
    http: Client,
}

impl RedisRestClient {
    /// Build a client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Configuration`] if the URL or token is empty and
    /// [`StateError::Connection`] if the HTTP client cannot be built.
    pub fn new(config: &RedisRestConfig) -> Result<Self, StateError> {
        if config.url.trim().is_empty() {
            return Err(StateError::Configuration("REST url is empty".into()));
        }
        if config.token.trim().is_empty() {
            return Err(StateError::Configuration("REST token is empty".into()));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StateError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(config, http))
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn with_client(config: &RedisRestConfig, http: Client) -> Self {
        Self {
            url: config.url.trim_end_matches('/').to_owned(),
            token: config.token.clone(),
            http,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run one command and decode its `result`.
    ///
    /// A `null` result decodes into `Option::None` when `T` is an `Option`.
    ///
    /// # Errors
    ///
    /// [`StateError::Connection`] when the endpoint cannot be reached,
    /// [`StateError::Backend`] when it reports an error, and
    /// [`StateError::Serialization`] when the answer has an unexpected shape.
    #[instrument(skip(self, args), fields(command = args.first().copied().unwrap_or_default()))]
    pub async fn command<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, StateError> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(args)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    warn!("REST command timed out");
                }
                StateError::Connection(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(StateError::Backend(format!("endpoint returned {status}")));
            }
            Err(e) => {
                return Err(StateError::Serialization(format!(
                    "unreadable REST answer: {e}"
                )));
            }
        };

        if let Some(message) = body.get("error") {
            let message = message
                .as_str()
                .map_or_else(|| message.to_string(), str::to_owned);
            debug!(%status, error = %message, "REST command rejected");
            return Err(StateError::Backend(message));
        }
        if !status.is_success() {
            return Err(StateError::Backend(format!("endpoint returned {status}")));
        }

        let result = body.get("result").cloned().unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| StateError::Serialization(format!("unexpected REST result: {e}")))
    }

    /// Run a Lua script with `EVAL script numkeys key... arg...`.
    ///
    /// # Errors
    ///
    /// Same as [`command`](Self::command).
    pub async fn eval<T: DeserializeOwned>(
        &self,
        script: &str,
        keys: &[&str],
        args: &[&str],
    ) -> Result<T, StateError> {
        let numkeys = keys.len().to_string();
        let mut command = Vec::with_capacity(2 + keys.len() + args.len());
        command.push("EVAL");
        command.push(script);
        command.push(numkeys.as_str());
        command.extend_from_slice(keys);
        command.extend_from_slice(args);
        self.command(&command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRestServer;

    #[test]
    fn empty_credentials_rejected() {
        let err = RedisRestClient::new(&RedisRestConfig::new("", "t")).unwrap_err();
        assert!(matches!(err, StateError::Configuration(_)));
        let err = RedisRestClient::new(&RedisRestConfig::new("http://x", " ")).unwrap_err();
        assert!(matches!(err, StateError::Configuration(_)));
    }

    #[tokio::test]
    async fn command_roundtrip() {
        let server = MockRestServer::start().await;
        let client = RedisRestClient::new(&server.config()).unwrap();

        let ok: String = client.command(&["SET", "k", "v"]).await.unwrap();
        assert_eq!(ok, "OK");
        let val: Option<String> = client.command(&["GET", "k"]).await.unwrap();
        assert_eq!(val.as_deref(), Some("v"));
        let missing: Option<String> = client.command(&["GET", "nope"]).await.unwrap();
        assert!(missing.is_none());

        assert_eq!(
            server.commands()[0],
            ["SET", "k", "v"].map(String::from).to_vec()
        );
    }

    #[tokio::test]
    async fn wrong_token_is_backend_error() {
        let server = MockRestServer::start().await;
        let config = RedisRestConfig::new(server.url(), "not-the-token");
        let client = RedisRestClient::new(&config).unwrap();

        let err = client.command::<String>(&["GET", "k"]).await.unwrap_err();
        assert!(matches!(err, StateError::Backend(msg) if msg == "Unauthorized"));
    }

    #[tokio::test]
    async fn endpoint_error_is_backend_error() {
        let server = MockRestServer::start().await;
        let client = RedisRestClient::new(&server.config()).unwrap();

        let err = client.command::<String>(&["NOSUCH"]).await.unwrap_err();
        assert!(matches!(err, StateError::Backend(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_connection_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = RedisRestConfig::new(format!("http://127.0.0.1:{port}"), "t");
        let client = RedisRestClient::new(&config).unwrap();
        let err = client.command::<String>(&["GET", "k"]).await.unwrap_err();
        assert!(matches!(err, StateError::Connection(_)));
    }

    #[tokio::test]
    async fn eval_builds_key_and_arg_lists() {
        let server = MockRestServer::start().await;
        let client = RedisRestClient::new(&server.config()).unwrap();

        let script = "local r = redis.call(\"INCRBY\", KEYS[1], ARGV[2]) return r";
        let used: i64 = client.eval(script, &["w:1"], &["1000", "1"]).await.unwrap();
        assert_eq!(used, 1);

        let sent = server.commands().pop().unwrap();
        assert_eq!(sent[0], "EVAL");
        assert_eq!(sent[2..], ["1", "w:1", "1000", "1"].map(String::from));
    }
}
