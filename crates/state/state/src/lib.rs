pub mod error;
pub mod key;
pub mod store;
pub mod testing;

pub use csvchat_core::Namespace;
pub use error::StateError;
pub use key::StateKey;
pub use store::KeyValueStore;
