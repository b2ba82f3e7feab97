//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use shellbot::{BotError, Config, Engine, EngineBuilder, Outbound, Speaker};

static INIT: Once = Once::new();

pub fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Speaker keeping every message it is asked to deliver
#[derive(Default)]
pub struct RecordingSpeaker {
    messages: Mutex<Vec<Outbound>>,
}

impl RecordingSpeaker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<Outbound> {
        self.messages.lock().unwrap().clone()
    }

    /// Contents said in one channel, in order
    pub fn said(&self, channel_id: &str) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .map(|m| m.content.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }

    /// Wait until a channel has received `count` messages
    pub async fn wait_for(&self, channel_id: &str, count: usize) -> Vec<String> {
        for _ in 0..200 {
            let said = self.said(channel_id);
            if said.len() >= count {
                return said;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.said(channel_id)
    }
}

impl Speaker for RecordingSpeaker {
    fn say(&self, message: &Outbound) -> Result<(), BotError> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn platform(&self) -> &str {
        "recording"
    }
}

/// Speaker that refuses every message
pub struct BrokenSpeaker;

impl Speaker for BrokenSpeaker {
    fn say(&self, _message: &Outbound) -> Result<(), BotError> {
        Err(BotError::Delivery("platform is down".to_string()))
    }
}

/// Engine builder wired to a recording speaker and an in-memory store
pub fn engine_with(config: Config, speaker: &Arc<RecordingSpeaker>) -> EngineBuilder {
    ensure_init();
    let mut config = config;
    config.store.backend = shellbot::infrastructure::config::StoreBackend::Memory;
    Engine::builder(config).speaker(speaker.clone())
}
