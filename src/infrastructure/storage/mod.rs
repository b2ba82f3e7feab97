//! Store backends

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::application::errors::StorageError;
use crate::domain::traits::Store;
use crate::infrastructure::config::{StoreBackend, StoreConfig};

/// Build the backend selected in configuration
pub fn build_store(config: &StoreConfig) -> Result<Arc<dyn Store>, StorageError> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Sqlite => {
            tracing::info!("Using sqlite store at {}", config.path.display());
            if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Ok(Arc::new(SqliteStore::open(&config.path)?))
        }
    }
}
