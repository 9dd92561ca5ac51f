use std::sync::Arc;

use tracing::{info, warn};

use csvchat_blob::{BlobStore, LocalBlobStore};
use csvchat_core::{DataLayout, RetentionPolicy};
use csvchat_ratelimit::{LocalRateLimiter, RateLimiter, RemoteRateLimiter};
use csvchat_state::KeyValueStore;
use csvchat_state_fs::FsKeyValueStore;
use csvchat_state_redis::{RedisKeyValueStore, RedisRestClient};
use csvchat_sweeper::ExpirySweeper;

use crate::config::StorageConfig;

/// Storage handles shared by the rest of the application.
///
/// Built once at startup. The key-value store and the rate limiter are
/// remote when complete remote credentials are configured and local
/// otherwise; blobs always live on local disk.
#[derive(Clone)]
pub struct StorageContext {
    pub layout: DataLayout,
    pub kv: Arc<dyn KeyValueStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub limiter: Arc<dyn RateLimiter>,
    pub sweeper: Arc<ExpirySweeper>,
}

impl StorageContext {
    /// Select and build every backend. Never fails: unusable remote or S3
    /// settings are logged and the local backends are used instead.
    pub fn from_config(config: &StorageConfig) -> Self {
        let layout = DataLayout::new(&config.data_dir);

        let (kv, limiter): (Arc<dyn KeyValueStore>, Arc<dyn RateLimiter>) =
            if let Some(client) = remote_client(config) {
                info!(url = %client.url(), "using remote key-value store and rate limiter");
                (
                    Arc::new(RedisKeyValueStore::with_client(Arc::clone(&client))),
                    Arc::new(RemoteRateLimiter::new(client)),
                )
            } else {
                info!(root = %layout.root().display(), "using local key-value store and rate limiter");
                let kv: Arc<dyn KeyValueStore> = Arc::new(FsKeyValueStore::new(layout.clone()));
                (Arc::clone(&kv), Arc::new(LocalRateLimiter::new(kv)))
            };

        match config.s3_credentials() {
            Ok(Some(s3)) => info!(
                bucket = %s3.bucket,
                region = %s3.region,
                "S3 upload settings present, uploads stay on local disk"
            ),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "ignoring S3 upload settings"),
        }

        let blobs: Arc<dyn BlobStore> =
            Arc::new(LocalBlobStore::new(&layout).with_locator_prefix(&config.files_prefix));
        let sweeper = Arc::new(ExpirySweeper::new(
            layout.clone(),
            RetentionPolicy::default(),
        ));

        Self {
            layout,
            kv,
            blobs,
            limiter,
            sweeper,
        }
    }
}

fn remote_client(config: &StorageConfig) -> Option<Arc<RedisRestClient>> {
    let creds = match config.redis_credentials() {
        Ok(Some(creds)) => creds,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "falling back to local storage");
            return None;
        }
    };
    match RedisRestClient::new(&creds.rest_config()) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!(error = %e, "remote key-value client unavailable, falling back to local storage");
            None
        }
    }
}
