use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use csvchat_core::DataLayout;

use crate::error::BlobError;
use crate::store::BlobStore;
use crate::types::{BlobStat, UploadedBlob};

/// Public path prefix uploaded files are served under.
pub const DEFAULT_LOCATOR_PREFIX: &str = "/api/files";

/// [`BlobStore`] writing one file per blob into `<root>/uploads/`.
///
/// Uploads are written to a hidden temporary sibling and renamed into place,
/// so readers never observe a partially written blob.
#[derive(Debug)]
pub struct LocalBlobStore {
    dir: PathBuf,
    locator_prefix: String,
    ready: OnceCell<()>,
}

impl LocalBlobStore {
    pub fn new(layout: &DataLayout) -> Self {
        Self {
            dir: layout.uploads_dir(),
            locator_prefix: DEFAULT_LOCATOR_PREFIX.to_owned(),
            ready: OnceCell::new(),
        }
    }

    /// Serve locators under `prefix` instead of [`DEFAULT_LOCATOR_PREFIX`].
    #[must_use]
    pub fn with_locator_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.locator_prefix = prefix.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn locator_prefix(&self) -> &str {
        &self.locator_prefix
    }

    async fn ensure_dir(&self) -> Result<(), BlobError> {
        self.ready
            .get_or_try_init(|| async {
                fs::create_dir_all(&self.dir).await?;
                debug!(dir = %self.dir.display(), "upload directory ready");
                Ok::<(), BlobError>(())
            })
            .await?;
        Ok(())
    }

    /// Path of the blob addressed by `key`, or `None` if the key could
    /// address anything outside the upload directory (or a hidden file).
    fn resolve(&self, key: &str) -> Option<PathBuf> {
        if key.is_empty() || key.starts_with('.') || key.contains(['/', '\\', '\0']) {
            return None;
        }
        Some(self.dir.join(key))
    }

    fn resolve_or_err(&self, key: &str) -> Result<PathBuf, BlobError> {
        self.resolve(key)
            .ok_or_else(|| BlobError::InvalidKey(format!("{key:?}")))
    }
}

/// Longest extension carried over from an original file name.
const MAX_EXTENSION_LEN: usize = 16;

/// `.ext` of the original file name, or an empty string when there is none
/// or it is not a short ASCII alphanumeric run.
fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| {
            !e.is_empty()
                && e.len() <= MAX_EXTENSION_LEN
                && e.bytes().all(|b| b.is_ascii_alphanumeric())
        })
        .map(|e| format!(".{e}"))
        .unwrap_or_default()
}

async fn write_then_rename(tmp: &Path, dest: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp).await?;
    file.write_all(content).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(tmp, dest).await
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn backend(&self) -> &'static str {
        "local"
    }

    #[instrument(skip(self, content), fields(bytes = content.len()))]
    async fn upload(
        &self,
        content: Bytes,
        original_name: &str,
    ) -> Result<UploadedBlob, BlobError> {
        self.ensure_dir().await?;

        let id = Uuid::new_v4().simple().to_string();
        let key = format!("{id}{}", extension_of(original_name));
        let dest = self.dir.join(&key);
        let tmp = self.dir.join(format!(".{key}.tmp"));

        if let Err(e) = write_then_rename(&tmp, &dest, &content).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        let blob = UploadedBlob {
            locator: format!("{}/{key}", self.locator_prefix),
            key,
            size: content.len() as u64,
        };
        info!(key = %blob.key, size = blob.size, "blob uploaded");
        Ok(blob)
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Bytes>, BlobError> {
        let Some(path) = self.resolve(key) else {
            debug!(key, "unusable blob key read as absent");
            return Ok(None);
        };
        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                debug!(key, error = %e, "blob read failed, reported as absent");
                Ok(None)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        let path = self.resolve_or_err(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn stat(&self, key: &str) -> Result<Option<BlobStat>, BlobError> {
        let Some(path) = self.resolve(key) else {
            return Ok(None);
        };
        let meta = match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Ok(None),
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    debug!(key, error = %e, "blob stat failed, reported as absent");
                }
                return Ok(None);
            }
        };
        let last_modified = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Ok(Some(BlobStat {
            size: meta.len(),
            last_modified,
        }))
    }
}
