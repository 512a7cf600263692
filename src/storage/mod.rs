pub mod feed_store;
pub mod keys;
pub mod kv;

pub use feed_store::FeedStore;
pub use kv::{FileStore, KeyValueStore, MemoryStore};
