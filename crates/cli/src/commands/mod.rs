pub mod chats;
pub mod files;
pub mod kv;
pub mod quota;
pub mod sweep;
