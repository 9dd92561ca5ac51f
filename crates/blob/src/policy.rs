use crate::error::BlobError;

/// Largest accepted upload, 30 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 30 * 1024 * 1024;

const CSV_CONTENT_TYPE: &str = "text/csv";

/// Admission rules applied before an upload reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    /// Accept only CSV uploads (by content type or by name) no larger than
    /// `max_bytes`.
    ///
    /// # Errors
    ///
    /// [`BlobError::NotAllowed`] for non-CSV files and
    /// [`BlobError::TooLarge`] for oversized ones.
    pub fn check(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        size: u64,
    ) -> Result<(), BlobError> {
        let is_csv_type = content_type
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|ct| ct.trim().eq_ignore_ascii_case(CSV_CONTENT_TYPE));
        if !is_csv_type && !original_name.ends_with(".csv") {
            return Err(BlobError::NotAllowed(format!(
                "only CSV files are accepted, got {original_name:?}"
            )));
        }
        if size > self.max_bytes {
            return Err(BlobError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_csv_by_name_or_type() {
        let policy = UploadPolicy::default();
        assert!(policy.check("a.csv", None, 10).is_ok());
        assert!(policy.check("export", Some("text/csv"), 10).is_ok());
        assert!(policy.check("export", Some("text/csv; charset=utf-8"), 10).is_ok());
    }

    #[test]
    fn rejects_other_files() {
        let policy = UploadPolicy::default();
        let err = policy.check("a.xlsx", Some("application/vnd.ms-excel"), 10);
        assert!(matches!(err, Err(BlobError::NotAllowed(_))));
        assert!(policy.check("a.CSV", None, 10).is_err());
    }

    #[test]
    fn size_limit_is_inclusive() {
        let policy = UploadPolicy::default();
        assert!(policy.check("a.csv", None, MAX_UPLOAD_BYTES).is_ok());
        let err = policy.check("a.csv", None, MAX_UPLOAD_BYTES + 1).unwrap_err();
        assert!(matches!(
            err,
            BlobError::TooLarge { size, limit } if size == MAX_UPLOAD_BYTES + 1 && limit == MAX_UPLOAD_BYTES
        ));
    }
}
