//! Per-channel view over a shared store backend

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{Mutex, MutexGuard};

use crate::application::errors::StorageError;
use crate::domain::traits::Store;

/// Key-value memory of one channel
///
/// Every operation holds the channel lock for its own duration only, so the
/// interactive path and the pipeline worker observe a linearizable view
/// without blocking each other for a whole command body.
///
/// Once [`ChannelStore::release`] has run, every operation fails with
/// [`StorageError::Released`], so a job finishing after disposal cannot leave
/// entries behind for the next bot of the same channel.
pub struct ChannelStore {
    channel_id: String,
    backend: Arc<dyn Store>,
    lock: Mutex<()>,
    released: AtomicBool,
}

impl ChannelStore {
    pub fn new(channel_id: impl Into<String>, backend: Arc<dyn Store>) -> Self {
        Self {
            channel_id: channel_id.into(),
            backend,
            lock: Mutex::new(()),
            released: AtomicBool::new(false),
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    async fn acquire(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        let guard = self.lock.lock().await;
        if self.is_released() {
            return Err(StorageError::Released);
        }
        Ok(guard)
    }

    /// Recall a value, or `default` when it is missing or null
    pub async fn get(&self, key: &str, default: Value) -> Result<Value, StorageError> {
        let _guard = self.acquire().await?;
        Ok(self.read(key).await?.unwrap_or(default))
    }

    /// Remember a value
    pub async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let _guard = self.acquire().await?;
        self.write(key, &value).await
    }

    /// Forget one value
    pub async fn forget(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.acquire().await?;
        self.backend.delete(&self.channel_id, key).await
    }

    /// Forget every value of this channel
    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.acquire().await?;
        self.backend.clear(&self.channel_id).await
    }

    /// Forget every value and refuse any further operation
    pub async fn release(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.backend.clear(&self.channel_id).await
    }

    /// Add `delta` to an integer value, starting from 0; returns the new value
    pub async fn increment(&self, key: &str, delta: i64) -> Result<i64, StorageError> {
        let _guard = self.acquire().await?;
        let value = self.read(key).await?.and_then(|v| v.as_i64()).unwrap_or(0) + delta;
        self.write(key, &Value::from(value)).await?;
        Ok(value)
    }

    pub async fn decrement(&self, key: &str, delta: i64) -> Result<i64, StorageError> {
        self.increment(key, -delta).await
    }

    /// Append an item to a list value, replacing anything that is not a list
    pub async fn append(&self, key: &str, item: Value) -> Result<(), StorageError> {
        let _guard = self.acquire().await?;
        let mut items = match self.read(key).await? {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        items.push(item);
        self.write(key, &Value::Array(items)).await
    }

    /// Set one labelled entry of a map value
    pub async fn update(&self, key: &str, label: &str, item: Value) -> Result<(), StorageError> {
        let _guard = self.acquire().await?;
        let mut entries = match self.read(key).await? {
            Some(Value::Object(entries)) => entries,
            _ => Map::new(),
        };
        entries.insert(label.to_string(), item);
        self.write(key, &Value::Object(entries)).await
    }

    async fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
        match self.backend.get(&self.channel_id, key).await? {
            Some(text) => match serde_json::from_str(&text)? {
                Value::Null => Ok(None),
                value => Ok(Some(value)),
            },
            None => Ok(None),
        }
    }

    async fn write(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)?;
        self.backend.set(&self.channel_id, key, &text).await
    }
}
