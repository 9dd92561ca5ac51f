pub mod client;
pub mod config;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::RedisRestClient;
pub use config::RedisRestConfig;
pub use store::RedisKeyValueStore;
