//! In-memory storage implementation

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::traits::Store;

/// Volatile store, one map per channel
#[derive(Default)]
pub struct MemoryStore {
    channels: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of channels holding at least one entry
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, channel_id: &str, key: &str) -> Result<Option<String>, StorageError> {
        let channels = self.channels.read().await;
        Ok(channels.get(channel_id).and_then(|kv| kv.get(key)).cloned())
    }

    async fn set(&self, channel_id: &str, key: &str, value: &str) -> Result<(), StorageError> {
        let mut channels = self.channels.write().await;
        channels
            .entry(channel_id.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, channel_id: &str, key: &str) -> Result<(), StorageError> {
        let mut channels = self.channels.write().await;
        if let Some(kv) = channels.get_mut(channel_id) {
            kv.remove(key);
            if kv.is_empty() {
                channels.remove(channel_id);
            }
        }
        Ok(())
    }

    async fn clear(&self, channel_id: &str) -> Result<(), StorageError> {
        self.channels.write().await.remove(channel_id);
        Ok(())
    }
}
