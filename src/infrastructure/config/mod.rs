//! Configuration management

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;
use crate::application::errors::ConfigError;

/// Shell configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub channel: ChannelConfig,
    pub engine: EngineConfig,
    pub store: StoreConfig,
    /// Application-specific sections, reachable through [`Config::get`]
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
    /// Tree walked by [`Config::get`], built on first lookup
    #[serde(skip)]
    tree: OnceLock<serde_yaml::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    pub version: String,
    /// Said in a channel when its bot is created
    pub banner: Option<String>,
    /// Said in a channel when its bot is disposed
    pub farewell: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ChannelConfig {
    pub title: Option<String>,
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EngineConfig {
    /// Create a bot on first contact with an unknown channel
    pub auto_provision: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: PathBuf,
    /// Values remembered by every new bot
    pub seed: BTreeMap<String, serde_json::Value>,
    /// Values remembered by the bot of one channel, keyed by channel id
    pub channels: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "shellbot".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            banner: None,
            farewell: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { auto_provision: true }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: PathBuf::from("shellbot.db"),
            seed: BTreeMap::new(),
            channels: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    /// Override selected settings from environment variables
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(name) = std::env::var("SHELLBOT_NAME") {
            self.bot.name = name;
        }

        if let Ok(backend) = std::env::var("SHELLBOT_STORE") {
            self.store.backend = match backend.as_str() {
                "memory" => StoreBackend::Memory,
                "sqlite" => StoreBackend::Sqlite,
                other => {
                    return Err(ConfigError::InvalidValue(format!(
                        "SHELLBOT_STORE must be 'memory' or 'sqlite', got '{}'",
                        other
                    )))
                }
            };
        }

        self.tree = OnceLock::new();
        Ok(self)
    }

    /// Read a setting by dotted path, e.g. `channel.title` or `planets.items`
    ///
    /// Returns `default` when the path is missing or holds an incompatible value.
    /// Lookups read a snapshot taken at the first call, so fields changed
    /// afterwards are not seen by `get`.
    pub fn get<T: DeserializeOwned>(&self, path: &str, default: T) -> T {
        let mut node = self.tree();

        for segment in path.split('.') {
            match node {
                serde_yaml::Value::Mapping(map) => match map.get(segment) {
                    Some(value) => node = value,
                    None => return default,
                },
                _ => return default,
            }
        }

        serde_yaml::from_value(node.clone()).unwrap_or(default)
    }

    fn tree(&self) -> &serde_yaml::Value {
        self.tree.get_or_init(|| {
            serde_yaml::to_value(self).unwrap_or_else(|e| {
                tracing::warn!("Failed to index configuration: {}", e);
                serde_yaml::Value::Null
            })
        })
    }
}
