use std::time::Duration;

use async_trait::async_trait;

use crate::application::bot::Bot;
use crate::application::errors::CommandError;
use crate::application::messaging::UPLOAD_KEYWORD;
use crate::domain::entities::{Command, Request};

/// Lists the commands of the channel, or describes one of them
pub struct HelpCommand;

#[async_trait]
impl Command for HelpCommand {
    fn keyword(&self) -> &str {
        "help"
    }

    fn information_message(&self) -> &str {
        "Show available commands"
    }

    fn usage_message(&self) -> Option<&str> {
        Some("help [command]")
    }

    async fn execute(&self, bot: &Bot, request: &Request) -> Result<(), CommandError> {
        bot.say(bot.shell().help_text(bot.is_direct(), &request.arguments));
        Ok(())
    }
}

pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    fn keyword(&self) -> &str {
        "version"
    }

    fn information_message(&self) -> &str {
        "Show bot version"
    }

    async fn execute(&self, bot: &Bot, _request: &Request) -> Result<(), CommandError> {
        let config = bot.config();
        bot.say(format!("{} version {}", config.bot.name, config.bot.version));
        Ok(())
    }
}

/// Repeats its arguments
pub struct EchoCommand;

#[async_trait]
impl Command for EchoCommand {
    fn keyword(&self) -> &str {
        "echo"
    }

    fn information_message(&self) -> &str {
        "Repeat a message"
    }

    fn usage_message(&self) -> Option<&str> {
        Some("echo <text>")
    }

    fn is_hidden(&self) -> bool {
        true
    }

    async fn execute(&self, bot: &Bot, request: &Request) -> Result<(), CommandError> {
        bot.say(request.arguments.clone());
        Ok(())
    }
}

/// Waits in the background, then reports back
pub struct SleepCommand;

#[async_trait]
impl Command for SleepCommand {
    fn keyword(&self) -> &str {
        "sleep"
    }

    fn information_message(&self) -> &str {
        "Wait for a number of seconds"
    }

    fn usage_message(&self) -> Option<&str> {
        Some("sleep <seconds>")
    }

    fn is_interactive(&self) -> bool {
        false
    }

    fn is_hidden(&self) -> bool {
        true
    }

    async fn execute(&self, bot: &Bot, request: &Request) -> Result<(), CommandError> {
        let arguments = request.arguments.trim();
        let seconds = if arguments.is_empty() {
            1.0
        } else {
            arguments
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite() && *s >= 0.0)
                .ok_or_else(|| CommandError::InvalidArgs(format!("'{}' is not a duration", arguments)))?
        };
        let delay = Duration::try_from_secs_f64(seconds)
            .map_err(|_| CommandError::InvalidArgs(format!("'{}' is too long", arguments)))?;

        tokio::time::sleep(delay).await;
        if !bot.is_disposed() {
            bot.say(format!("Slept for {} seconds", seconds));
        }
        Ok(())
    }
}

/// Answers bare uploads
pub struct UploadCommand;

#[async_trait]
impl Command for UploadCommand {
    fn keyword(&self) -> &str {
        UPLOAD_KEYWORD
    }

    fn information_message(&self) -> &str {
        "Acknowledge a shared file"
    }

    fn is_hidden(&self) -> bool {
        true
    }

    async fn execute(&self, bot: &Bot, request: &Request) -> Result<(), CommandError> {
        tracing::info!(
            channel_id = %bot.channel_id(),
            attachment = ?request.attachment,
            url = ?request.url,
            "Received upload"
        );
        bot.say("Thank you for the information shared!");
        Ok(())
    }
}
