use chrono::Duration;

/// How long chat records are kept after their last write.
pub const CHAT_RETENTION_SECS: i64 = 7 * 24 * 60 * 60;

/// How long uploaded files are kept after they were written.
pub const UPLOAD_RETENTION_SECS: i64 = 24 * 60 * 60;

/// Retention thresholds applied by the expiry sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum age of a chat record.
    pub chats: Duration,
    /// Maximum age of an uploaded file.
    pub uploads: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            chats: Duration::seconds(CHAT_RETENTION_SECS),
            uploads: Duration::seconds(UPLOAD_RETENTION_SECS),
        }
    }
}
