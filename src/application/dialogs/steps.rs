use std::collections::HashSet;

use crate::application::errors::MachineError;
use crate::application::machine::{StateMachine, Transition};

/// Linear process, one state per step
///
/// The machine starts in `begin`. Each `next` trigger enters the following
/// step and says its label and message. The last step is terminal.
///
/// ```ignore
/// let machine = Steps::new()
///     .step("Level 1", "Initial capture of information")
///     .step("Level 2", "Escalation to technical experts")
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct Steps {
    prefix: String,
    steps: Vec<(String, String)>,
}

impl Default for Steps {
    fn default() -> Self {
        Self {
            prefix: "steps".to_string(),
            steps: Vec::new(),
        }
    }
}

impl Steps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn step(mut self, label: impl Into<String>, message: impl Into<String>) -> Self {
        self.steps.push((label.into(), message.into()));
        self
    }

    pub fn build(self) -> Result<StateMachine, MachineError> {
        if self.steps.is_empty() {
            return Err(MachineError::InvalidDefinition("no step has been defined".to_string()));
        }

        let mut labels = HashSet::new();
        for (label, _) in &self.steps {
            if label == "begin" || !labels.insert(label.as_str()) {
                return Err(MachineError::InvalidDefinition(format!("step label '{}' is not unique", label)));
            }
        }

        let mut builder = StateMachine::builder()
            .prefix(self.prefix)
            .state("begin")
            .initial("begin");

        let mut previous = "begin".to_string();
        for (label, message) in self.steps {
            let announce = format!("{} - {}", label, message);
            builder = builder
                .state(label.clone())
                .transition(Transition::new(previous, "next", label.clone()))
                .on_enter(label.clone(), move |bot| bot.say(announce.clone()));
            previous = label;
        }

        builder.build()
    }
}
