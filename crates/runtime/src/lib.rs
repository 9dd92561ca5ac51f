pub mod config;
pub mod error;
pub mod factory;

pub use config::{RedisCredentials, S3Credentials, StorageConfig};
pub use error::ConfigError;
pub use factory::StorageContext;
