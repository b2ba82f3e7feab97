//! Bot - Per-channel session
//!
//! A bot composes everything one channel needs: a shell over the shared
//! command registry, a store view, a pipeline with its worker, an optional
//! state machine and the listeners attached to the channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock, Weak};

use serde_json::Value;
use tokio::sync::Mutex;

use crate::application::engine::WeakEngine;
use crate::application::errors::{BotError, CommandError};
use crate::application::machine::{StateMachine, Step};
use crate::application::messaging::{Pipeline, Shell};
use crate::application::store::ChannelStore;
use crate::domain::entities::{CommandRegistry, Event, EventKind, Outbound};
use crate::domain::traits::{Capture, Listener, Speaker, Store};
use crate::infrastructure::config::Config;

pub struct Bot {
    channel_id: String,
    is_direct: bool,
    title: Option<String>,
    participants: Vec<String>,
    config: Arc<Config>,
    shell: Shell,
    store: ChannelStore,
    pipeline: Pipeline,
    machine: Option<Arc<StateMachine>>,
    speaker: Arc<dyn Speaker>,
    listeners: RwLock<Vec<Arc<dyn Listener>>>,
    step_lock: Mutex<()>,
    once: std::sync::Mutex<Option<Arc<dyn Capture>>>,
    fallback: std::sync::Mutex<Option<Arc<dyn Capture>>>,
    disposed: AtomicBool,
    engine: Option<WeakEngine>,
    this: OnceLock<Weak<Bot>>,
}

impl Bot {
    pub fn new(
        channel_id: impl Into<String>,
        is_direct: bool,
        registry: Arc<CommandRegistry>,
        backend: Arc<dyn Store>,
        speaker: Arc<dyn Speaker>,
    ) -> Self {
        let channel_id = channel_id.into();
        Self {
            store: ChannelStore::new(channel_id.clone(), backend),
            pipeline: Pipeline::new(channel_id.clone()),
            shell: Shell::new(registry),
            channel_id,
            is_direct,
            title: None,
            participants: Vec::new(),
            config: Arc::new(Config::default()),
            machine: None,
            speaker,
            listeners: RwLock::new(Vec::new()),
            step_lock: Mutex::new(()),
            once: std::sync::Mutex::new(None),
            fallback: std::sync::Mutex::new(None),
            disposed: AtomicBool::new(false),
            engine: None,
            this: OnceLock::new(),
        }
    }

    pub fn with_config(mut self, config: Arc<Config>) -> Self {
        self.title = config.get("channel.title", None);
        self.participants = config.get("channel.participants", Vec::new());
        self.config = config;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_machine(mut self, machine: Arc<StateMachine>) -> Self {
        self.machine = Some(machine);
        self
    }

    pub fn with_listener(self, listener: Arc<dyn Listener>) -> Self {
        self.register(listener);
        self
    }

    pub(crate) fn with_engine(mut self, engine: WeakEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Wrap the bot and start its pipeline worker
    pub fn launch(self) -> Result<Arc<Self>, BotError> {
        let bot = Arc::new(self);
        let _ = bot.this.set(Arc::downgrade(&bot));
        bot.pipeline.start(Arc::downgrade(&bot))?;
        tracing::debug!(channel_id = %bot.channel_id, is_direct = bot.is_direct, "Bot launched");
        Ok(bot)
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn is_direct(&self) -> bool {
        self.is_direct
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    pub fn store(&self) -> &ChannelStore {
        &self.store
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn machine(&self) -> Option<&Arc<StateMachine>> {
        self.machine.as_ref()
    }

    pub(crate) fn step_lock(&self) -> &Mutex<()> {
        &self.step_lock
    }

    /// Owning handle on this bot, once launched
    pub fn shared(&self) -> Option<Arc<Bot>> {
        self.this.get().and_then(Weak::upgrade)
    }

    /// Arm a capture for the next line that matches no command
    ///
    /// `None` disarms the pending capture.
    pub fn call_once(&self, capture: Option<Arc<dyn Capture>>) {
        if let Ok(mut once) = self.once.lock() {
            *once = capture;
        }
    }

    /// Capture every line that matches no command, until replaced
    pub fn callback(&self, capture: Option<Arc<dyn Capture>>) {
        if let Ok(mut fallback) = self.fallback.lock() {
            *fallback = capture;
        }
    }

    /// Pending capture, the one-shot one first
    pub(crate) fn take_capture(&self) -> Option<Arc<dyn Capture>> {
        if self.is_disposed() {
            return None;
        }
        let once = self.once.lock().ok().and_then(|mut once| once.take());
        once.or_else(|| self.fallback.lock().ok().and_then(|fallback| fallback.clone()))
    }

    /// Set once the channel is disposed; long commands should check it
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Post a message to the channel
    pub fn say(&self, content: impl Into<String>) {
        self.post(content.into(), None);
    }

    /// Post a message with a file reference
    pub fn say_with_file(&self, content: impl Into<String>, file: impl Into<String>) {
        self.post(content.into(), Some(file.into()));
    }

    fn post(&self, content: String, file: Option<String>) {
        if content.is_empty() && file.is_none() {
            return;
        }

        let message = Outbound {
            channel_id: self.channel_id.clone(),
            content,
            file,
        };
        if let Err(e) = self.speaker.say(&message) {
            tracing::warn!(
                channel_id = %self.channel_id,
                platform = %self.speaker.platform(),
                "Failed to deliver message: {}",
                e
            );
        }
    }

    /// Attach a listener to this channel
    pub fn register(&self, listener: Arc<dyn Listener>) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push(listener);
        }
    }

    fn listeners(&self) -> Vec<Arc<dyn Listener>> {
        self.listeners
            .read()
            .map(|listeners| listeners.clone())
            .unwrap_or_default()
    }

    /// Handle one line typed in the channel
    pub async fn dispatch(self: &Arc<Self>, line: &str) {
        self.shell.dispatch(self, line, None).await;
    }

    /// Handle one inbound event addressed to this channel
    pub async fn handle(self: &Arc<Self>, event: &Event) {
        if self.is_disposed() {
            tracing::debug!(channel_id = %self.channel_id, "Ignoring event for disposed bot");
            return;
        }

        match event.kind {
            EventKind::Message | EventKind::Upload => {
                self.shell.dispatch(self, &event.text, Some(event)).await;
            }
            EventKind::Join => {
                for listener in self.listeners() {
                    listener.on_join(self, event.actor.as_ref());
                }
            }
            EventKind::Leave => {
                for listener in self.listeners() {
                    listener.on_leave(self, event.actor.as_ref());
                }
            }
        }
    }

    /// Fire a trigger on the state machine of this bot
    pub async fn step(&self, trigger: &str, payload: Value) -> Result<Step, CommandError> {
        let machine = self.machine.as_ref().ok_or(CommandError::NoMachine)?;
        Ok(machine.step(self, trigger, payload).await?)
    }

    /// Dispose of this channel, through the engine when there is one
    pub async fn dispose(&self) {
        if self.is_disposed() {
            return;
        }
        match self.engine.as_ref().and_then(|engine| engine.upgrade()) {
            Some(engine) => {
                engine.dispose(&self.channel_id).await;
            }
            None => self.retire(true).await,
        }
    }

    pub(crate) fn notify_enter(&self) {
        if let Some(banner) = self.config.bot.banner.clone() {
            self.say(banner);
        }
        for listener in self.listeners() {
            listener.on_enter(self);
        }
    }

    /// Stop background work and tear down listeners; runs once
    ///
    /// With `forget`, the store entries of the channel are dropped as well.
    pub(crate) async fn retire(&self, forget: bool) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.pipeline.stop();

        let listeners = self
            .listeners
            .write()
            .map(|mut listeners| std::mem::take(&mut *listeners))
            .unwrap_or_default();
        for listener in &listeners {
            listener.on_dispose(self);
        }
        self.call_once(None);
        self.callback(None);

        if forget {
            if let Some(farewell) = self.config.bot.farewell.clone() {
                self.say(farewell);
            }
            if let Err(e) = self.store.release().await {
                tracing::error!(channel_id = %self.channel_id, "Failed to release store: {}", e);
            }
        }

        tracing::info!(channel_id = %self.channel_id, "Bot retired");
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("channel_id", &self.channel_id)
            .field("is_direct", &self.is_direct)
            .field("title", &self.title)
            .finish()
    }
}
