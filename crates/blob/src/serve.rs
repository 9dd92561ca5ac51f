use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::BlobError;
use crate::store::BlobStore;
use crate::types::BlobStat;

/// Only blobs whose key ends with this suffix are served.
pub const SERVABLE_SUFFIX: &str = ".csv";

/// Clients may cache served blobs for an hour.
pub const CACHE_CONTROL: &str = "public, max-age=3600";

/// Body and response headers for a served blob.
#[derive(Debug, Clone)]
pub struct ServedBlob {
    pub body: Bytes,
    pub headers: Vec<(&'static str, String)>,
}

impl ServedBlob {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Reject keys that may not be served.
///
/// # Errors
///
/// [`BlobError::NotAllowed`] unless the key ends with [`SERVABLE_SUFFIX`].
pub fn ensure_servable(key: &str) -> Result<(), BlobError> {
    if key.ends_with(SERVABLE_SUFFIX) {
        Ok(())
    } else {
        Err(BlobError::NotAllowed(format!(
            "file type not allowed: {key:?}"
        )))
    }
}

/// Format a timestamp as an HTTP IMF-fixdate.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn headers_for(key: &str, stat: Option<BlobStat>) -> Vec<(&'static str, String)> {
    let mut headers = vec![
        ("Content-Type", "text/csv".to_owned()),
        ("Content-Disposition", format!("inline; filename=\"{key}\"")),
    ];
    if let Some(stat) = stat {
        headers.push(("Content-Length", stat.size.to_string()));
        headers.push(("Last-Modified", http_date(stat.last_modified)));
    }
    headers.push(("Cache-Control", CACHE_CONTROL.to_owned()));
    headers
}

/// Load a blob for serving. The key is checked before the store is consulted.
///
/// Returns `Ok(None)` if the blob does not exist. Size and modification
/// headers are included when the store can stat the blob.
///
/// # Errors
///
/// [`BlobError::NotAllowed`] for keys that may not be served, or any error
/// reported by the store.
pub async fn prepare(store: &dyn BlobStore, key: &str) -> Result<Option<ServedBlob>, BlobError> {
    ensure_servable(key)?;
    let Some(body) = store.retrieve(key).await? else {
        return Ok(None);
    };
    let stat = store.stat(key).await?;
    Ok(Some(ServedBlob {
        body,
        headers: headers_for(key, stat),
    }))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::local::LocalBlobStore;
    use csvchat_core::DataLayout;

    #[test]
    fn imf_fixdate() {
        let at = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
        assert_eq!(http_date(at), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn servable_suffix() {
        assert!(ensure_servable("abc.csv").is_ok());
        assert!(matches!(
            ensure_servable("abc.txt"),
            Err(BlobError::NotAllowed(_))
        ));
        assert!(ensure_servable("abc").is_err());
    }

    #[tokio::test]
    async fn prepare_sets_headers() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(&DataLayout::new(dir.path()));
        let blob = store
            .upload(Bytes::from_static(b"a,b\n1,2\n"), "t.csv")
            .await
            .unwrap();

        let served = prepare(&store, &blob.key).await.unwrap().unwrap();
        assert_eq!(served.body.as_ref(), b"a,b\n1,2\n");
        assert_eq!(served.header("content-type"), Some("text/csv"));
        assert_eq!(
            served.header("Content-Disposition").unwrap(),
            format!("inline; filename=\"{}\"", blob.key)
        );
        assert_eq!(served.header("Content-Length"), Some("8"));
        assert!(served.header("Last-Modified").unwrap().ends_with(" GMT"));
        assert_eq!(served.header("Cache-Control"), Some(CACHE_CONTROL));
    }

    #[tokio::test]
    async fn prepare_rejects_before_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(&DataLayout::new(dir.path()));
        let blob = store.upload(Bytes::from_static(b"{}"), "x.json").await.unwrap();

        let err = prepare(&store, &blob.key).await.unwrap_err();
        assert!(matches!(err, BlobError::NotAllowed(_)));
    }

    #[tokio::test]
    async fn prepare_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(&DataLayout::new(dir.path()));
        assert!(prepare(&store, "missing.csv").await.unwrap().is_none());
    }
}
