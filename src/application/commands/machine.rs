use async_trait::async_trait;
use serde_json::Value;

use crate::application::bot::Bot;
use crate::application::errors::CommandError;
use crate::application::machine::Step;
use crate::domain::entities::{Command, Request, Visibility};

/// Puts the dialog of a direct channel back at its beginning
pub struct StartCommand;

#[async_trait]
impl Command for StartCommand {
    fn keyword(&self) -> &str {
        "start"
    }

    fn information_message(&self) -> &str {
        "Start the conversation over"
    }

    fn visibility(&self) -> Visibility {
        Visibility::Direct
    }

    async fn execute(&self, bot: &Bot, _request: &Request) -> Result<(), CommandError> {
        let Some(machine) = bot.machine() else {
            bot.say("No state machine is available");
            return Ok(());
        };

        machine.reset(bot).await?;
        Ok(())
    }
}

/// Fires a trigger, `next` by default
pub struct StepCommand;

#[async_trait]
impl Command for StepCommand {
    fn keyword(&self) -> &str {
        "step"
    }

    fn information_message(&self) -> &str {
        "Move the conversation forward"
    }

    fn usage_message(&self) -> Option<&str> {
        Some("step [trigger]")
    }

    async fn execute(&self, bot: &Bot, request: &Request) -> Result<(), CommandError> {
        let arguments = request.arguments.trim();
        let (trigger, rest) = match arguments.split_once(char::is_whitespace) {
            Some((trigger, rest)) => (trigger, rest.trim_start()),
            None if arguments.is_empty() => ("next", ""),
            None => (arguments, ""),
        };
        let payload = if rest.is_empty() {
            Value::Null
        } else {
            Value::String(rest.to_string())
        };

        match bot.step(trigger, payload).await {
            Ok(Step::Ignored(state)) => {
                bot.say(format!("Nothing to do on '{}' while {}", trigger, state));
                Ok(())
            }
            Ok(Step::Moved { .. }) => Ok(()),
            Err(CommandError::NoMachine) => {
                bot.say("No state machine is available");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
