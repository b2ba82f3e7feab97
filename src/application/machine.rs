//! State machine - Declarative driver for multi-turn dialogs
//!
//! A machine definition is shared by every bot it is attached to. The
//! current state of each bot lives in that bot's store under
//! `<prefix>.state`, so it survives restarts when the store is durable.
//!
//! ```ignore
//! let machine = StateMachine::builder()
//!     .states(["idle", "collecting", "done"])
//!     .initial("idle")
//!     .transition(Transition::new("idle", "start", "collecting"))
//!     .transition(Transition::new("collecting", "finish", "done"))
//!     .build()?;
//!
//! machine.step(&bot, "start", Value::Null).await?;
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::application::bot::Bot;
use crate::application::errors::{CommandError, MachineError};

/// Callback run while a transition occurs
pub type Action = Arc<dyn Fn(&Bot, &Value) -> Result<(), CommandError> + Send + Sync>;

/// Condition a transition requires
pub type Guard = Arc<dyn Fn(&Bot, &Value) -> bool + Send + Sync>;

/// Callback run when entering or leaving a state
pub type Hook = Arc<dyn Fn(&Bot) + Send + Sync>;

/// Outcome of [`StateMachine::step`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Moved { from: String, to: String },
    /// No transition matched, the machine stays where it is
    Ignored(String),
}

impl Step {
    /// State of the machine after the step
    pub fn state(&self) -> &str {
        match self {
            Step::Moved { to, .. } => to,
            Step::Ignored(state) => state,
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Step::Ignored(_))
    }
}

/// One edge of the machine
#[derive(Clone)]
pub struct Transition {
    source: String,
    trigger: String,
    target: String,
    action: Option<Action>,
    guard: Option<Guard>,
}

impl Transition {
    pub fn new(
        source: impl Into<String>,
        trigger: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            trigger: trigger.into(),
            target: target.into(),
            action: None,
            guard: None,
        }
    }

    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&Bot, &Value) -> Result<(), CommandError> + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    pub fn with_guard<F>(mut self, guard: F) -> Self
    where
        F: Fn(&Bot, &Value) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --{}--> {}", self.source, self.trigger, self.target)
    }
}

/// Builder for [`StateMachine`]
#[derive(Default)]
pub struct MachineBuilder {
    prefix: Option<String>,
    states: BTreeSet<String>,
    initial: Option<String>,
    transitions: Vec<Transition>,
    on_enter: HashMap<String, Hook>,
    on_exit: HashMap<String, Hook>,
}

impl MachineBuilder {
    /// Namespace of the store key holding the current state
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.states.insert(state.into());
        self
    }

    pub fn states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.states.extend(states.into_iter().map(Into::into));
        self
    }

    pub fn initial(mut self, state: impl Into<String>) -> Self {
        self.initial = Some(state.into());
        self
    }

    pub fn transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn on_enter<F>(mut self, state: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&Bot) + Send + Sync + 'static,
    {
        self.on_enter.insert(state.into(), Arc::new(hook));
        self
    }

    pub fn on_exit<F>(mut self, state: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&Bot) + Send + Sync + 'static,
    {
        self.on_exit.insert(state.into(), Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<StateMachine, MachineError> {
        let initial = self.initial.unwrap_or_default();
        if !self.states.contains(&initial) {
            return Err(MachineError::InvalidInitial(initial));
        }

        for state in self.on_enter.keys().chain(self.on_exit.keys()) {
            if !self.states.contains(state) {
                return Err(MachineError::InvalidTarget(state.clone()));
            }
        }

        let mut transitions = HashMap::new();
        for transition in self.transitions {
            if !self.states.contains(&transition.source) {
                return Err(MachineError::InvalidSource(transition.source));
            }
            if !self.states.contains(&transition.target) {
                return Err(MachineError::InvalidTarget(transition.target));
            }

            let key = (transition.source.clone(), transition.trigger.clone());
            if transitions.contains_key(&key) {
                return Err(MachineError::DuplicateTransition {
                    state: key.0,
                    trigger: key.1,
                });
            }
            transitions.insert(key, transition);
        }

        let prefix = self.prefix.unwrap_or_else(|| "machine".to_string());
        Ok(StateMachine {
            state_key: format!("{}.state", prefix),
            states: self.states,
            initial,
            transitions,
            on_enter: self.on_enter,
            on_exit: self.on_exit,
        })
    }
}

/// Finite state machine driven by named triggers
pub struct StateMachine {
    state_key: String,
    states: BTreeSet<String>,
    initial: String,
    transitions: HashMap<(String, String), Transition>,
    on_enter: HashMap<String, Hook>,
    on_exit: HashMap<String, Hook>,
}

impl StateMachine {
    pub fn builder() -> MachineBuilder {
        MachineBuilder::default()
    }

    pub fn states(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|s| s.as_str())
    }

    pub fn initial(&self) -> &str {
        &self.initial
    }

    /// Store key holding the current state
    pub fn state_key(&self) -> &str {
        &self.state_key
    }

    /// A terminal state has no outgoing transition
    pub fn is_terminal(&self, state: &str) -> bool {
        self.states.contains(state) && !self.transitions.keys().any(|(source, _)| source == state)
    }

    /// Current state of the machine for a bot
    pub async fn current(&self, bot: &Bot) -> Result<String, MachineError> {
        let value = bot.store().get(&self.state_key, Value::Null).await?;
        match value.as_str() {
            Some(state) if self.states.contains(state) => Ok(state.to_string()),
            Some(state) => {
                tracing::warn!(
                    channel_id = %bot.channel_id(),
                    "Unknown state '{}' in store, using '{}'",
                    state,
                    self.initial
                );
                Ok(self.initial.clone())
            }
            None => Ok(self.initial.clone()),
        }
    }

    /// Fire a trigger
    ///
    /// When `(current, trigger)` has a transition whose guard accepts the
    /// payload, its action runs, then the new state is persisted. Otherwise
    /// the machine is left untouched and [`Step::Ignored`] is returned. A
    /// failing action also leaves the state unchanged.
    pub async fn step(&self, bot: &Bot, trigger: &str, payload: Value) -> Result<Step, MachineError> {
        let _guard = bot.step_lock().lock().await;
        let current = self.current(bot).await?;

        let Some(transition) = self.transitions.get(&(current.clone(), trigger.to_string())) else {
            tracing::debug!(channel_id = %bot.channel_id(), state = %current, trigger, "Trigger ignored");
            return Ok(Step::Ignored(current));
        };

        if let Some(guard) = &transition.guard {
            if !guard(bot, &payload) {
                tracing::debug!(channel_id = %bot.channel_id(), "Guard refused {}", transition);
                return Ok(Step::Ignored(current));
            }
        }

        tracing::debug!(channel_id = %bot.channel_id(), "Transitioning: {}", transition);
        if let Some(action) = &transition.action {
            action(bot, &payload).map_err(|e| MachineError::Action {
                trigger: trigger.to_string(),
                reason: e.to_string(),
            })?;
        }

        if let Some(hook) = self.on_exit.get(&current) {
            hook(bot);
        }
        bot.store()
            .set(&self.state_key, Value::String(transition.target.clone()))
            .await?;
        if let Some(hook) = self.on_enter.get(&transition.target) {
            hook(bot);
        }

        Ok(Step::Moved {
            from: current,
            to: transition.target.clone(),
        })
    }

    /// Put the machine back in its initial state
    pub async fn reset(&self, bot: &Bot) -> Result<(), MachineError> {
        let _guard = bot.step_lock().lock().await;
        bot.store()
            .set(&self.state_key, Value::String(self.initial.clone()))
            .await?;
        tracing::debug!(channel_id = %bot.channel_id(), state = %self.initial, "Machine reset");
        if let Some(hook) = self.on_enter.get(&self.initial) {
            hook(bot);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_rejects_unknown_initial_state() {
        let err = StateMachine::builder()
            .states(["idle"])
            .initial("running")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, MachineError::InvalidInitial(s) if s == "running"));
    }

    #[test]
    fn build_rejects_transitions_outside_states() {
        let err = StateMachine::builder()
            .states(["idle", "done"])
            .initial("idle")
            .transition(Transition::new("idle", "go", "nowhere"))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, MachineError::InvalidTarget(s) if s == "nowhere"));

        let err = StateMachine::builder()
            .states(["idle", "done"])
            .initial("idle")
            .transition(Transition::new("limbo", "go", "done"))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, MachineError::InvalidSource(s) if s == "limbo"));
    }

    #[test]
    fn build_rejects_duplicate_transitions() {
        let err = StateMachine::builder()
            .states(["idle", "a", "b"])
            .initial("idle")
            .transition(Transition::new("idle", "go", "a"))
            .transition(Transition::new("idle", "go", "b"))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, MachineError::DuplicateTransition { .. }));
    }

    #[test]
    fn terminal_states_have_no_outgoing_transition() {
        let machine = StateMachine::builder()
            .prefix("order")
            .states(["idle", "collecting", "done"])
            .initial("idle")
            .transition(Transition::new("idle", "start", "collecting"))
            .transition(Transition::new("collecting", "finish", "done"))
            .build()
            .unwrap();

        assert_eq!(machine.state_key(), "order.state");
        assert!(!machine.is_terminal("idle"));
        assert!(machine.is_terminal("done"));
        assert!(!machine.is_terminal("unknown"));
        assert_eq!(machine.states().collect::<Vec<_>>(), vec!["collecting", "done", "idle"]);
    }
}
