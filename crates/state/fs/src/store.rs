use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use csvchat_core::DataLayout;
use csvchat_core::layout::VALUE_EXTENSION;
use csvchat_state::{KeyValueStore, Namespace, StateError, StateKey};

/// Filesystem-backed [`KeyValueStore`]: one file per key.
///
/// `chat:<id>` lives at `<root>/chats/<id>.json`, `limit:<id>` at
/// `<root>/limits/<id>.json` and every other key at `<root>/<key>.json`.
/// Directories are created on first use, once per store.
///
/// Reads never fail: a missing file, a missing directory or any other read
/// error is reported as `None`. Writes surface their I/O errors.
#[derive(Debug)]
pub struct FsKeyValueStore {
    layout: DataLayout,
    ready: OnceCell<()>,
}

impl FsKeyValueStore {
    pub fn new(layout: DataLayout) -> Self {
        Self {
            layout,
            ready: OnceCell::new(),
        }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Create the value directories exactly once. A failed attempt is retried
    /// by the next caller.
    async fn ensure_dirs(&self) -> Result<(), StateError> {
        self.ready
            .get_or_try_init(|| async {
                for dir in self.layout.value_dirs() {
                    fs::create_dir_all(&dir).await?;
                }
                debug!(root = %self.layout.root().display(), "key-value directories ready");
                Ok::<(), StateError>(())
            })
            .await?;
        Ok(())
    }

    /// Resolve a key to the file holding its value.
    fn path_for(&self, key: &StateKey) -> Result<PathBuf, StateError> {
        validate_id(&key.id)?;
        Ok(self
            .layout
            .namespace_dir(key.namespace)
            .join(format!("{}.{VALUE_EXTENSION}", key.id)))
    }

    /// List the keys currently stored in a namespace, sorted by id. A
    /// namespace directory that does not exist yet lists as empty.
    pub async fn keys(&self, namespace: Namespace) -> Result<Vec<StateKey>, StateError> {
        let dir = self.layout.namespace_dir(namespace);
        let suffix = format!(".{VALUE_EXTENSION}");

        let mut keys = Vec::new();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await.is_ok_and(|t| t.is_file()) {
                continue;
            }
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(|n| n.strip_suffix(suffix.as_str())) else {
                continue;
            };
            if !id.is_empty() {
                keys.push(StateKey::new(namespace, id));
            }
        }
        keys.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(keys)
    }
}

/// Reject ids that would escape their namespace directory.
fn validate_id(id: &str) -> Result<(), StateError> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
        return Err(StateError::InvalidKey(format!("unusable key id: {id:?}")));
    }
    Ok(())
}

#[async_trait]
impl KeyValueStore for FsKeyValueStore {
    fn backend(&self) -> &'static str {
        "fs"
    }

    #[instrument(skip(self, key, value), fields(key = %key, bytes = value.len()))]
    async fn set(&self, key: &StateKey, value: &str) -> Result<(), StateError> {
        let path = self.path_for(key)?;
        self.ensure_dirs().await?;
        fs::write(&path, value).await?;
        debug!(path = %path.display(), "value written");
        Ok(())
    }

    async fn get(&self, key: &StateKey) -> Result<Option<String>, StateError> {
        let path = match self.path_for(key) {
            Ok(path) => path,
            Err(e) => {
                debug!(key = %key, error = %e, "unusable key read as absent");
                return Ok(None);
            }
        };
        if let Err(e) = self.ensure_dirs().await {
            debug!(key = %key, error = %e, "data directory unavailable, key read as absent");
            return Ok(None);
        }

        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                debug!(key = %key, error = %e, "read failed, key read as absent");
                Ok(None)
            }
        }
    }

    async fn delete(&self, key: &StateKey) -> Result<(), StateError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key = %key, "value deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
