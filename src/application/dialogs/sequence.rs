use std::sync::Arc;

use crate::application::bot::Bot;
use crate::application::errors::CommandError;
use super::Input;

/// Inputs asked one after the other
///
/// The next question is asked once the previous one has been answered. A
/// cancelled question ends the sequence.
#[derive(Clone, Default)]
pub struct Sequence {
    inputs: Vec<Arc<Input>>,
}

impl Sequence {
    pub fn new(inputs: Vec<Arc<Input>>) -> Self {
        Self { inputs }
    }

    pub fn then(mut self, input: Arc<Input>) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Ask the first question; nothing happens for an empty sequence
    pub async fn start(&self, bot: &Bot) -> Result<(), CommandError> {
        match self.inputs.split_first() {
            Some((first, rest)) => first.start_chain(bot, rest.to_vec()).await,
            None => Ok(()),
        }
    }
}
