//! Persistent key/value store adapters.
//!
//! The members cache treats device storage as a scoped string store that can
//! fail at any time. Adapters report failures as `StoreError`; callers decide
//! whether to degrade.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value for `key`. `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrite the value for `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
