pub mod kv;
pub mod models;
pub mod repository;
pub mod store;

pub use kv::{KeyValueStore, MemoryKeyValueStore};
pub use models::{Article, NotificationMarker, StorageChange};
pub use repository::{SqliteKeyValueStore, StorageError};
pub use store::{Storage, SCHEMA_VERSION};

#[derive(Debug, Clone, Default)]
pub struct StorageService;

impl StorageService {
    pub fn name(&self) -> &'static str {
        "storage"
    }

    pub fn status(&self) -> &'static str {
        "ready"
    }
}
