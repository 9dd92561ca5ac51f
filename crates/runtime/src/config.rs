use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use csvchat_blob::DEFAULT_LOCATOR_PREFIX;
use csvchat_state_redis::RedisRestConfig;

use crate::error::ConfigError;

pub const ENV_DATA_DIR: &str = "CSVCHAT_DATA_DIR";
pub const ENV_FILES_PREFIX: &str = "CSVCHAT_FILES_PREFIX";
pub const ENV_REDIS_URL: &str = "UPSTASH_REDIS_REST_URL";
pub const ENV_REDIS_TOKEN: &str = "UPSTASH_REDIS_REST_TOKEN";
pub const ENV_S3_KEY: &str = "S3_UPLOAD_KEY";
pub const ENV_S3_SECRET: &str = "S3_UPLOAD_SECRET";
pub const ENV_S3_BUCKET: &str = "S3_UPLOAD_BUCKET";
pub const ENV_S3_REGION: &str = "S3_UPLOAD_REGION";

/// Storage settings.
///
/// Every field has a default, so an empty TOML table (or no file at all)
/// yields a purely local setup under `./data`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the local data directory.
    pub data_dir: PathBuf,

    /// Public path prefix of uploaded files.
    pub files_prefix: String,

    /// REST endpoint of the remote key-value store.
    pub redis_url: Option<String>,

    /// Bearer token of the remote key-value store.
    pub redis_token: Option<String>,

    /// Per-request timeout towards the remote key-value store, in seconds.
    pub redis_timeout_secs: u64,

    pub s3_key: Option<String>,
    pub s3_secret: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            files_prefix: DEFAULT_LOCATOR_PREFIX.to_owned(),
            redis_url: None,
            redis_token: None,
            redis_timeout_secs: RedisRestConfig::DEFAULT_TIMEOUT.as_secs(),
            s3_key: None,
            s3_secret: None,
            s3_bucket: None,
            s3_region: None,
        }
    }
}

/// Top-level shape of the config file; only `[storage]` is read.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    storage: StorageConfig,
}

impl StorageConfig {
    /// Parse the `[storage]` section of a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if the document is not valid.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(contents)?;
        Ok(file.storage)
    }

    /// Load settings from an optional TOML file, then apply the process
    /// environment on top.
    ///
    /// A path that does not exist falls back to defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] or [`ConfigError::Parse`] for an unreadable file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(path)?;
                Self::from_toml(&contents)?
            }
            Some(path) => {
                info!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        Ok(base.with_env())
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Apply the process environment on top of these settings.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_lookup(|name| std::env::var(name).ok())
    }

    /// Apply variables resolved through `lookup` on top of these settings.
    ///
    /// Unset and empty variables leave the current value untouched.
    #[must_use]
    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(prefix) = get(ENV_FILES_PREFIX) {
            self.files_prefix = prefix;
        }
        for (name, slot) in [
            (ENV_REDIS_URL, &mut self.redis_url),
            (ENV_REDIS_TOKEN, &mut self.redis_token),
            (ENV_S3_KEY, &mut self.s3_key),
            (ENV_S3_SECRET, &mut self.s3_secret),
            (ENV_S3_BUCKET, &mut self.s3_bucket),
            (ENV_S3_REGION, &mut self.s3_region),
        ] {
            if let Some(value) = get(name) {
                *slot = Some(value);
            }
        }
        self
    }

    /// Defaults overridden by variables resolved through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self::default().with_lookup(lookup)
    }

    /// Remote key-value credentials, if configured.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Misconfiguration`] if only one of URL and token is set.
    pub fn redis_credentials(&self) -> Result<Option<RedisCredentials>, ConfigError> {
        match (present(self.redis_url.as_ref()), present(self.redis_token.as_ref())) {
            (Some(url), Some(token)) => Ok(Some(RedisCredentials {
                url: url.to_owned(),
                token: token.to_owned(),
                timeout: Duration::from_secs(self.redis_timeout_secs),
            })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::Misconfiguration(format!(
                "{ENV_REDIS_URL} is set but {ENV_REDIS_TOKEN} is missing"
            ))),
            (None, Some(_)) => Err(ConfigError::Misconfiguration(format!(
                "{ENV_REDIS_TOKEN} is set but {ENV_REDIS_URL} is missing"
            ))),
        }
    }

    /// Object storage credentials, if configured.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Misconfiguration`] if only some of the four are set.
    pub fn s3_credentials(&self) -> Result<Option<S3Credentials>, ConfigError> {
        let parts = [
            (ENV_S3_KEY, present(self.s3_key.as_ref())),
            (ENV_S3_SECRET, present(self.s3_secret.as_ref())),
            (ENV_S3_BUCKET, present(self.s3_bucket.as_ref())),
            (ENV_S3_REGION, present(self.s3_region.as_ref())),
        ];
        match parts.map(|(_, v)| v) {
            [Some(key), Some(secret), Some(bucket), Some(region)] => Ok(Some(S3Credentials {
                key: key.to_owned(),
                secret: secret.to_owned(),
                bucket: bucket.to_owned(),
                region: region.to_owned(),
            })),
            [None, None, None, None] => Ok(None),
            _ => {
                let missing: Vec<_> = parts
                    .iter()
                    .filter(|(_, v)| v.is_none())
                    .map(|(name, _)| *name)
                    .collect();
                Err(ConfigError::Misconfiguration(format!(
                    "incomplete S3 settings, missing {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Complete credentials of the remote key-value store.
#[derive(Clone, PartialEq, Eq)]
pub struct RedisCredentials {
    pub url: String,
    pub token: String,
    pub timeout: Duration,
}

impl RedisCredentials {
    pub fn rest_config(&self) -> RedisRestConfig {
        RedisRestConfig::new(&self.url, &self.token).with_timeout(self.timeout)
    }
}

impl fmt::Debug for RedisCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCredentials")
            .field("url", &self.url)
            .field("token", &"[redacted]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Complete object storage credentials. Recognized but not used for uploads.
#[derive(Clone, PartialEq, Eq)]
pub struct S3Credentials {
    pub key: String,
    pub secret: String,
    pub bucket: String,
    pub region: String,
}

impl fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Credentials")
            .field("key", &self.key)
            .field("secret", &"[redacted]")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = StorageConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert_eq!(cfg.files_prefix, "/api/files");
        assert_eq!(cfg.redis_timeout_secs, 10);
        assert!(cfg.redis_credentials().unwrap().is_none());
        assert!(cfg.s3_credentials().unwrap().is_none());
    }

    #[test]
    fn env_overrides() {
        let cfg = StorageConfig::from_lookup(lookup(&[
            (ENV_DATA_DIR, "/var/lib/csvchat"),
            (ENV_FILES_PREFIX, "/files"),
            (ENV_REDIS_URL, "https://kv.example.com"),
            (ENV_REDIS_TOKEN, "tok"),
        ]));
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/csvchat"));
        assert_eq!(cfg.files_prefix, "/files");

        let creds = cfg.redis_credentials().unwrap().unwrap();
        assert_eq!(creds.url, "https://kv.example.com");
        assert_eq!(creds.token, "tok");
        assert_eq!(creds.timeout, Duration::from_secs(10));
    }

    #[test]
    fn half_redis_config_is_misconfiguration() {
        let only_url = StorageConfig::from_lookup(lookup(&[(ENV_REDIS_URL, "https://kv")]));
        assert!(matches!(
            only_url.redis_credentials(),
            Err(ConfigError::Misconfiguration(msg)) if msg.contains(ENV_REDIS_TOKEN)
        ));

        let only_token = StorageConfig::from_lookup(lookup(&[(ENV_REDIS_TOKEN, "tok")]));
        assert!(only_token.redis_credentials().is_err());
    }

    #[test]
    fn empty_values_count_as_unset() {
        let cfg = StorageConfig::from_lookup(lookup(&[
            (ENV_REDIS_URL, ""),
            (ENV_REDIS_TOKEN, "  "),
            (ENV_DATA_DIR, ""),
        ]));
        assert!(cfg.redis_credentials().unwrap().is_none());
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn s3_credentials() {
        let full = StorageConfig::from_lookup(lookup(&[
            (ENV_S3_KEY, "k"),
            (ENV_S3_SECRET, "s"),
            (ENV_S3_BUCKET, "b"),
            (ENV_S3_REGION, "r"),
        ]));
        let creds = full.s3_credentials().unwrap().unwrap();
        assert_eq!(creds.bucket, "b");
        assert!(!format!("{creds:?}").contains("\"s\""));

        let partial = StorageConfig::from_lookup(lookup(&[(ENV_S3_KEY, "k"), (ENV_S3_BUCKET, "b")]));
        let err = partial.s3_credentials().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(ENV_S3_SECRET) && msg.contains(ENV_S3_REGION));
    }

    #[test]
    fn toml_section() {
        let cfg = StorageConfig::from_toml(
            r#"
            [storage]
            data_dir = "/srv/data"
            redis_url = "https://kv.example.com"
            redis_timeout_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(cfg.files_prefix, "/api/files");
        assert_eq!(cfg.redis_timeout_secs, 3);

        let cfg = cfg.with_lookup(lookup(&[(ENV_REDIS_TOKEN, "tok"), (ENV_DATA_DIR, "/override")]));
        assert_eq!(cfg.data_dir, PathBuf::from("/override"));
        assert_eq!(
            cfg.redis_credentials().unwrap().unwrap().timeout,
            Duration::from_secs(3)
        );
    }

    #[test]
    fn empty_toml_is_default() {
        let cfg = StorageConfig::from_toml("").unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn invalid_toml() {
        let err = StorageConfig::from_toml("[storage]\ndata_dir = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StorageConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(cfg.files_prefix, "/api/files");
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("csvchat.toml");
        std::fs::write(&path, "[storage]\nfiles_prefix = \"/static\"\n").unwrap();
        let cfg = StorageConfig::load(Some(&path)).unwrap();
        if std::env::var(ENV_FILES_PREFIX).is_err() {
            assert_eq!(cfg.files_prefix, "/static");
        }
    }
}
