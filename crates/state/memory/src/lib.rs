pub mod store;

pub use store::MemoryKeyValueStore;
