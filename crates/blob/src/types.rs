use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedBlob {
    /// Public path the blob is served under (`<prefix>/<key>`).
    pub locator: String,
    /// Generated storage key: identifier plus original extension.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
}

/// Filesystem facts about a stored blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobStat {
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}
