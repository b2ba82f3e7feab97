use async_trait::async_trait;
use crate::application::errors::StorageError;

/// Store trait - abstraction for per-channel key-value persistence
///
/// Values are kept as text; every operation is scoped by channel id so
/// entries of different channels never mix, even on a shared backend.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, channel_id: &str, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, channel_id: &str, key: &str, value: &str) -> Result<(), StorageError>;
    async fn delete(&self, channel_id: &str, key: &str) -> Result<(), StorageError>;

    /// Drop every entry of one channel
    async fn clear(&self, channel_id: &str) -> Result<(), StorageError>;
}
