pub mod kv;
pub mod newsletter;
pub mod overlay;
pub mod timed;

mod error;

pub use error::{Error, Result};
pub use kv::{FileStore, KeyValueStore, MemoryStore, StorageChange};
pub use timed::{TimedCache, TimedEntry};
