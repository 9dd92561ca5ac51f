pub mod error;
pub mod local;
pub mod policy;
pub mod serve;
pub mod store;
pub mod types;

pub use error::BlobError;
pub use local::{DEFAULT_LOCATOR_PREFIX, LocalBlobStore};
pub use policy::UploadPolicy;
pub use serve::ServedBlob;
pub use store::BlobStore;
pub use types::{BlobStat, UploadedBlob};
