//! Input - Ask one question and capture the reply
//!
//! ```ignore
//! let input = Input::builder("PO number?").mask("9999A").key("order.id").build()?;
//! input.start(bot).await?;
//! ```
//!
//! The reply is the next line of the channel that matches no command. A reply
//! that does not fit the pattern is refused, and the question stays open.
//! Without a reply, the retry message is said after `tip`, then the question
//! is cancelled after `timeout` unless the input is mandatory.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::application::bot::Bot;
use crate::application::errors::{CommandError, MachineError};
use crate::application::machine::{StateMachine, Step, Transition};
use crate::domain::traits::Capture;
use super::pattern::Pattern;

/// Store key of the map collecting keyed answers
pub const ANSWERS_KEY: &str = "input";

pub const RETRY_MESSAGE: &str = "Invalid input, please retry";
pub const ANSWER_MESSAGE: &str = "Ok, this has been noted";
pub const CANCEL_MESSAGE: &str = "Ok, forget about it";

const TIP_DELAY: Duration = Duration::from_secs(20);
const CANCEL_DELAY: Duration = Duration::from_secs(40);

enum Expect {
    Text,
    Mask(String),
    Regex(String),
    Options(Vec<String>),
}

/// Builder for [`Input`]
pub struct InputBuilder {
    question: String,
    expect: Expect,
    key: Option<String>,
    on_retry: String,
    on_answer: String,
    on_cancel: String,
    tip: Duration,
    timeout: Option<Duration>,
    prefix: String,
}

impl InputBuilder {
    /// Accept only the part of a reply matching a mask, see [`Pattern::mask`]
    pub fn mask(mut self, mask: impl Into<String>) -> Self {
        self.expect = Expect::Mask(mask.into());
        self
    }

    /// Accept only the part of a reply matching a regular expression
    pub fn regex(mut self, regex: impl Into<String>) -> Self {
        self.expect = Expect::Regex(regex.into());
        self
    }

    pub(crate) fn options(mut self, options: Vec<String>) -> Self {
        self.expect = Expect::Options(options);
        self
    }

    /// Also record the answer under this label of the `input` map
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn on_retry(mut self, message: impl Into<String>) -> Self {
        self.on_retry = message.into();
        self
    }

    /// Said once answered; `{}` is replaced by the answer
    pub fn on_answer(mut self, message: impl Into<String>) -> Self {
        self.on_answer = message.into();
        self
    }

    pub fn on_cancel(mut self, message: impl Into<String>) -> Self {
        self.on_cancel = message.into();
        self
    }

    /// Delay before the retry message is said
    pub fn tip(mut self, delay: Duration) -> Self {
        self.tip = delay;
        self
    }

    /// Delay before the question is cancelled
    pub fn timeout(mut self, delay: Duration) -> Self {
        self.timeout = Some(delay);
        self
    }

    /// Never cancel the question
    pub fn mandatory(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Namespace of the store keys of this input
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<Arc<Input>, MachineError> {
        if self.question.trim().is_empty() {
            return Err(MachineError::InvalidDefinition("question is empty".to_string()));
        }
        if self.tip.is_zero() {
            return Err(MachineError::InvalidDefinition("tip delay is zero".to_string()));
        }
        if let Some(timeout) = self.timeout {
            if timeout <= self.tip {
                return Err(MachineError::InvalidDefinition(format!(
                    "timeout of {:?} does not exceed tip of {:?}",
                    timeout, self.tip
                )));
            }
        }

        let pattern = match self.expect {
            Expect::Text => Pattern::Any,
            Expect::Mask(mask) => Pattern::mask(&mask)?,
            Expect::Regex(regex) => Pattern::regex(&regex)?,
            Expect::Options(options) => Pattern::options(options)?,
        };

        let machine = StateMachine::builder()
            .prefix(self.prefix.clone())
            .states(["begin", "waiting", "delayed", "end"])
            .initial("begin")
            .transition(Transition::new("begin", "ask", "waiting").with_action(saying(&self.question)))
            .transition(Transition::new("waiting", "answer", "end"))
            .transition(Transition::new("delayed", "answer", "end"))
            .transition(Transition::new("waiting", "tip", "delayed").with_action(saying(&self.on_retry)))
            .transition(Transition::new("waiting", "cancel", "end").with_action(cancelling(&self.on_cancel)))
            .transition(Transition::new("delayed", "cancel", "end").with_action(cancelling(&self.on_cancel)))
            .build()?;

        Ok(Arc::new(Input {
            token_key: format!("{}.token", self.prefix),
            answer_key: format!("{}.answer", self.prefix),
            question: self.question,
            pattern,
            key: self.key,
            on_retry: self.on_retry,
            on_answer: self.on_answer,
            tip: self.tip,
            timeout: self.timeout,
            machine,
        }))
    }
}

fn saying(message: &str) -> impl Fn(&Bot, &Value) -> Result<(), CommandError> + Send + Sync + 'static {
    let message = message.to_string();
    move |bot: &Bot, _payload: &Value| {
        bot.say(message.clone());
        Ok(())
    }
}

fn cancelling(message: &str) -> impl Fn(&Bot, &Value) -> Result<(), CommandError> + Send + Sync + 'static {
    let message = message.to_string();
    move |bot: &Bot, _payload: &Value| {
        bot.call_once(None);
        bot.say(message.clone());
        Ok(())
    }
}

/// One question asked in a channel
pub struct Input {
    question: String,
    pattern: Pattern,
    key: Option<String>,
    on_retry: String,
    on_answer: String,
    tip: Duration,
    timeout: Option<Duration>,
    token_key: String,
    answer_key: String,
    machine: StateMachine,
}

impl Input {
    pub fn builder(question: impl Into<String>) -> InputBuilder {
        InputBuilder {
            question: question.into(),
            expect: Expect::Text,
            key: None,
            on_retry: RETRY_MESSAGE.to_string(),
            on_answer: ANSWER_MESSAGE.to_string(),
            on_cancel: CANCEL_MESSAGE.to_string(),
            tip: TIP_DELAY,
            timeout: Some(CANCEL_DELAY),
            prefix: "input".to_string(),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Machine tracking this question: `begin`, `waiting`, `delayed`, `end`
    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    /// Last accepted answer in a channel
    pub async fn answer(&self, bot: &Bot) -> Result<Option<String>, CommandError> {
        let value = bot.store().get(&self.answer_key, Value::Null).await?;
        Ok(value.as_str().map(str::to_string))
    }

    /// Ask the question and wait for the reply in the background
    pub async fn start(self: &Arc<Self>, bot: &Bot) -> Result<(), CommandError> {
        self.start_chain(bot, Vec::new()).await
    }

    /// Ask the question, then the ones in `rest` one after the other
    pub(crate) async fn start_chain(self: &Arc<Self>, bot: &Bot, rest: Vec<Arc<Input>>) -> Result<(), CommandError> {
        self.machine.reset(bot).await?;
        bot.store().forget(&self.answer_key).await?;

        let token = Uuid::new_v4().to_string();
        bot.store().set(&self.token_key, Value::String(token.clone())).await?;
        bot.call_once(Some(Arc::new(Reply {
            input: self.clone(),
            token: token.clone(),
            rest,
        })));

        self.machine.step(bot, "ask", Value::Null).await?;
        self.arm_timers(bot, token);
        Ok(())
    }

    fn arm_timers(self: &Arc<Self>, bot: &Bot, token: String) {
        let Some(shared) = bot.shared() else {
            tracing::warn!(channel_id = %bot.channel_id(), "Bot has not been launched, question will not expire");
            return;
        };
        let bot = Arc::downgrade(&shared);
        let input = self.clone();

        tokio::spawn(async move {
            tokio::time::sleep(input.tip).await;
            if !input.fire(&bot, &token, "tip").await {
                return;
            }

            let Some(timeout) = input.timeout else {
                return;
            };
            tokio::time::sleep(timeout.saturating_sub(input.tip)).await;
            input.fire(&bot, &token, "cancel").await;
        });
    }

    /// Step a timer trigger while this question is still open
    async fn fire(&self, bot: &Weak<Bot>, token: &str, trigger: &str) -> bool {
        let Some(bot) = bot.upgrade() else {
            return false;
        };
        if !self.is_open(&bot, token).await {
            return false;
        }

        match self.machine.step(&bot, trigger, Value::Null).await {
            Ok(Step::Moved { .. }) => true,
            Ok(Step::Ignored(_)) => false,
            Err(e) => {
                tracing::warn!(channel_id = %bot.channel_id(), trigger, "Failed to update question: {}", e);
                false
            }
        }
    }

    async fn is_open(&self, bot: &Bot, token: &str) -> bool {
        if bot.is_disposed() {
            return false;
        }
        let Ok(stored) = bot.store().get(&self.token_key, Value::Null).await else {
            return false;
        };
        if stored.as_str() != Some(token) {
            return false;
        }
        matches!(self.machine.current(bot).await.as_deref(), Ok("waiting") | Ok("delayed"))
    }

    async fn accept(&self, bot: &Bot, answer: String) -> Result<(), CommandError> {
        bot.store().set(&self.answer_key, Value::String(answer.clone())).await?;
        if let Some(key) = &self.key {
            bot.store().update(ANSWERS_KEY, key, Value::String(answer.clone())).await?;
        }

        bot.say(self.on_answer.replace("{}", &answer));
        self.machine.step(bot, "answer", Value::String(answer)).await?;
        Ok(())
    }
}

/// Capture armed while a question waits for its reply
#[derive(Clone)]
struct Reply {
    input: Arc<Input>,
    token: String,
    rest: Vec<Arc<Input>>,
}

#[async_trait]
impl Capture for Reply {
    async fn capture(&self, bot: &Bot, text: &str) -> Result<(), CommandError> {
        if !self.input.is_open(bot, &self.token).await {
            tracing::debug!(channel_id = %bot.channel_id(), "Question is closed, showing help");
            bot.say(bot.shell().help_text(bot.is_direct(), ""));
            return Ok(());
        }

        let Some(answer) = self.input.pattern.filter(text) else {
            bot.say(self.input.on_retry.clone());
            bot.call_once(Some(Arc::new(self.clone())));
            return Ok(());
        };

        tracing::debug!(channel_id = %bot.channel_id(), "Question has been answered");
        self.input.accept(bot, answer).await?;

        if let Some((next, rest)) = self.rest.split_first() {
            next.start_chain(bot, rest.to_vec()).await?;
        }
        Ok(())
    }
}
