//! Engine - Process-wide registry of bots
//!
//! The engine owns the command registry, the store backend and the speaker,
//! builds one [`Bot`] per channel on first contact and routes every inbound
//! event to the right one.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tokio::sync::RwLock;

use crate::application::bot::Bot;
use crate::application::commands::register_defaults;
use crate::application::errors::BotError;
use crate::application::machine::StateMachine;
use crate::domain::entities::{Command, CommandRegistry, Event};
use crate::domain::traits::{Listener, Speaker, Store};
use crate::infrastructure::config::Config;
use crate::infrastructure::storage::build_store;

struct EngineInner {
    config: Arc<Config>,
    registry: Arc<CommandRegistry>,
    backend: Arc<dyn Store>,
    speaker: Arc<dyn Speaker>,
    machine: Option<Arc<StateMachine>>,
    listeners: Vec<Arc<dyn Listener>>,
    bots: RwLock<Channels>,
}

/// Live bots, and disposed ones whose worker may still be running
#[derive(Default)]
struct Channels {
    live: HashMap<String, Arc<Bot>>,
    retiring: HashMap<String, Arc<Bot>>,
}

/// Cloneable handle on the engine
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

/// Non-owning handle kept by each bot
#[derive(Clone)]
pub struct WeakEngine(Weak<EngineInner>);

impl WeakEngine {
    pub fn upgrade(&self) -> Option<Engine> {
        self.0.upgrade().map(|inner| Engine { inner })
    }
}

/// Builder for [`Engine`]
pub struct EngineBuilder {
    config: Config,
    commands: Vec<Arc<dyn Command>>,
    defaults: bool,
    backend: Option<Arc<dyn Store>>,
    speaker: Option<Arc<dyn Speaker>>,
    machine: Option<Arc<StateMachine>>,
    listeners: Vec<Arc<dyn Listener>>,
}

impl EngineBuilder {
    pub fn command<C: Command + 'static>(mut self, command: C) -> Self {
        self.commands.push(Arc::new(command));
        self
    }

    pub fn command_arc(mut self, command: Arc<dyn Command>) -> Self {
        self.commands.push(command);
        self
    }

    /// Skip the built-in commands (help, version, echo...)
    pub fn without_defaults(mut self) -> Self {
        self.defaults = false;
        self
    }

    /// Use this backend instead of the one selected in configuration
    pub fn store(mut self, backend: Arc<dyn Store>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn speaker(mut self, speaker: Arc<dyn Speaker>) -> Self {
        self.speaker = Some(speaker);
        self
    }

    /// State machine attached to every bot
    pub fn machine(mut self, machine: StateMachine) -> Self {
        self.machine = Some(Arc::new(machine));
        self
    }

    /// Listener attached to every bot at creation
    pub fn listener(mut self, listener: Arc<dyn Listener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Register every command; a keyword conflict fails the build
    pub fn build(self) -> Result<Engine, BotError> {
        let mut registry = CommandRegistry::new();
        if self.defaults {
            register_defaults(&mut registry)?;
        }
        for command in self.commands {
            registry.register_arc(command)?;
        }
        tracing::info!("Loaded {} commands: {}", registry.len(), registry.keywords().join(", "));

        let speaker = self
            .speaker
            .ok_or_else(|| BotError::Internal("No speaker has been configured".to_string()))?;
        let backend = match self.backend {
            Some(backend) => backend,
            None => build_store(&self.config.store)?,
        };

        Ok(Engine {
            inner: Arc::new(EngineInner {
                config: Arc::new(self.config),
                registry: Arc::new(registry),
                backend,
                speaker,
                machine: self.machine,
                listeners: self.listeners,
                bots: RwLock::new(Channels::default()),
            }),
        })
    }
}

impl Engine {
    pub fn builder(config: Config) -> EngineBuilder {
        EngineBuilder {
            config,
            commands: Vec::new(),
            defaults: true,
            backend: None,
            speaker: None,
            machine: None,
            listeners: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.inner.registry
    }

    pub fn downgrade(&self) -> WeakEngine {
        WeakEngine(Arc::downgrade(&self.inner))
    }

    pub async fn get(&self, channel_id: &str) -> Option<Arc<Bot>> {
        self.inner.bots.read().await.live.get(channel_id).cloned()
    }

    /// Bot of a channel, created on first call
    ///
    /// When the channel has just been disposed, the new bot is only built
    /// once the worker of the previous one has exited.
    pub async fn get_or_create(&self, channel_id: &str, is_direct: bool) -> Result<Arc<Bot>, BotError> {
        let mut bots = loop {
            let mut bots = self.inner.bots.write().await;
            if let Some(bot) = bots.live.get(channel_id) {
                return Ok(bot.clone());
            }
            let previous = bots.retiring.get(channel_id).cloned();
            match previous {
                Some(old) if !old.pipeline().is_finished() => {
                    drop(bots);
                    tracing::debug!(channel_id, "Waiting for previous bot to wind down");
                    old.pipeline().join().await;
                }
                Some(_) => {
                    bots.retiring.remove(channel_id);
                    break bots;
                }
                None => break bots,
            }
        };

        tracing::info!(channel_id, is_direct, "Building bot");
        let mut bot = Bot::new(
            channel_id,
            is_direct,
            self.inner.registry.clone(),
            self.inner.backend.clone(),
            self.inner.speaker.clone(),
        )
        .with_config(self.inner.config.clone())
        .with_engine(self.downgrade());

        if let Some(machine) = &self.inner.machine {
            bot = bot.with_machine(machine.clone());
        }
        for listener in &self.inner.listeners {
            bot = bot.with_listener(listener.clone());
        }

        let bot = bot.launch()?;
        self.seed(&bot).await?;
        bots.live.insert(channel_id.to_string(), bot.clone());
        drop(bots);

        bot.notify_enter();
        Ok(bot)
    }

    /// Copy store values from configuration into a new bot
    async fn seed(&self, bot: &Bot) -> Result<(), BotError> {
        let store = &self.inner.config.store;
        let shared = store.seed.iter();
        let own = store.channels.get(bot.channel_id()).into_iter().flatten();

        for (key, value) in shared.chain(own) {
            bot.store().set(key, value.clone()).await?;
        }
        Ok(())
    }

    /// Dispose of a channel; returns false when it was not known
    ///
    /// The job in flight, if any, runs to completion in the background.
    /// Queued jobs are dropped.
    pub async fn dispose(&self, channel_id: &str) -> bool {
        let bot = {
            let mut bots = self.inner.bots.write().await;
            let Some(bot) = bots.live.remove(channel_id) else {
                tracing::debug!(channel_id, "Nothing to dispose");
                return false;
            };
            bots.retiring.insert(channel_id.to_string(), bot.clone());
            bot
        };

        tracing::info!(channel_id, "Disposing bot");
        bot.retire(true).await;

        let engine = self.downgrade();
        tokio::spawn(async move {
            bot.pipeline().join().await;
            if let Some(engine) = engine.upgrade() {
                engine.forget_retired(&bot).await;
            }
        });
        true
    }

    async fn forget_retired(&self, bot: &Arc<Bot>) {
        let mut bots = self.inner.bots.write().await;
        let current = bots.retiring.get(bot.channel_id());
        if current.map_or(false, |current| Arc::ptr_eq(current, bot)) {
            bots.retiring.remove(bot.channel_id());
        }
    }

    /// Disposed bots whose worker has not exited yet
    pub async fn retiring(&self) -> usize {
        self.inner.bots.read().await.retiring.len()
    }

    /// Single entry point for inbound activity
    pub async fn route(&self, event: Event) -> Result<(), BotError> {
        let bot = match self.get(&event.channel_id).await {
            Some(bot) => bot,
            None if self.inner.config.engine.auto_provision => {
                self.get_or_create(&event.channel_id, event.is_direct).await?
            }
            None => {
                tracing::debug!(channel_id = %event.channel_id, kind = event.kind.as_str(), "Ignoring event for unknown channel");
                return Ok(());
            }
        };

        bot.handle(&event).await;
        Ok(())
    }

    pub async fn channel_ids(&self) -> Vec<String> {
        self.inner.bots.read().await.live.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.bots.read().await.live.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stop every bot without forgetting what their stores hold
    pub async fn shutdown(&self) {
        let (bots, retiring) = {
            let mut channels = self.inner.bots.write().await;
            let bots: Vec<Arc<Bot>> = channels.live.drain().map(|(_, bot)| bot).collect();
            let retiring: Vec<Arc<Bot>> = channels.retiring.drain().map(|(_, bot)| bot).collect();
            (bots, retiring)
        };
        tracing::info!("Stopping {} bots", bots.len());

        for bot in &bots {
            bot.retire(false).await;
        }
        for bot in bots.iter().chain(&retiring) {
            bot.pipeline().join().await;
        }
    }
}
