pub mod store;

pub use store::FsKeyValueStore;
