use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BlobError;
use crate::types::{BlobStat, UploadedBlob};

/// Storage backend for uploaded files.
///
/// Keys are generated by the store on upload and are opaque to callers.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;

    /// Persist `content` under a freshly generated key that keeps the
    /// extension of `original_name`.
    async fn upload(&self, content: Bytes, original_name: &str)
    -> Result<UploadedBlob, BlobError>;

    /// Fetch a blob's bytes. Returns `None` if it does not exist.
    async fn retrieve(&self, key: &str) -> Result<Option<Bytes>, BlobError>;

    /// Delete a blob. Deleting a missing blob succeeds.
    async fn delete(&self, key: &str) -> Result<(), BlobError>;

    /// Size and modification time of a blob, or `None` if it does not exist.
    async fn stat(&self, key: &str) -> Result<Option<BlobStat>, BlobError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify object safety.
    fn _assert_dyn_store(_: &dyn BlobStore) {}
}
