//! Shell - Resolves input lines to commands and runs them

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinError;

use crate::application::bot::Bot;
use crate::application::errors::CommandError;
use crate::domain::entities::{Command, CommandRegistry, Event, Request};
use crate::domain::traits::Capture;
use super::parser::parse_line;

/// Keyword of the command receiving bare uploads
pub const UPLOAD_KEYWORD: &str = "*upload";

/// Per-channel dispatcher over the engine-wide command registry
pub struct Shell {
    registry: Arc<CommandRegistry>,
    handled: AtomicU64,
}

impl Shell {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self {
            registry,
            handled: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Number of lines handled so far
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    /// Handle one line of input for a bot
    ///
    /// Interactive commands complete before this returns. Other commands are
    /// queued on the bot pipeline and this returns right away. Failures are
    /// reported to the channel and never escape.
    pub async fn dispatch(&self, bot: &Arc<Bot>, line: &str, event: Option<&Event>) {
        let parsed = parse_line(line);
        let count = self.handled.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(channel_id = %bot.channel_id(), count, "Handling: {}", line);

        let has_upload = event.map_or(false, |e| e.url.is_some() || e.attachment.is_some());
        let keyword = if parsed.is_empty() && has_upload {
            UPLOAD_KEYWORD.to_string()
        } else {
            parsed.keyword
        };

        let command = match self.registry.find(&keyword, bot.is_direct()) {
            Ok(command) => command.clone(),
            Err(e) => {
                let text = line.trim();
                let capture = if text.is_empty() { None } else { bot.take_capture() };
                match capture {
                    Some(capture) => {
                        tracing::debug!("{}, handing text over to capture", e);
                        if let Err(e) = capture_isolated(bot.clone(), capture, text.to_string()).await {
                            report_failure(bot, "capture", &e);
                        }
                    }
                    None => {
                        tracing::debug!("{}, showing help", e);
                        bot.say(self.help_text(bot.is_direct(), ""));
                    }
                }
                return;
            }
        };

        let request = match event {
            Some(event) => Request::from_event(parsed.arguments, event),
            None => Request::new(parsed.arguments),
        };

        if command.is_interactive() {
            if let Err(e) = execute_isolated(bot.clone(), command.clone(), request).await {
                report_failure(bot, command.keyword(), &e);
            }
            return;
        }

        match bot.pipeline().submit(command.clone(), request) {
            Ok(sequence) => {
                tracing::debug!(keyword = %command.keyword(), sequence, "Queued for background execution");
            }
            Err(e) => {
                tracing::warn!(keyword = %command.keyword(), "Unable to queue command: {}", e);
                bot.say(format!("Sorry, I cannot handle '{}' anymore", command.keyword()));
            }
        }
    }

    /// Help listing for a channel mode, or usage of one command
    pub fn help_text(&self, is_direct: bool, arguments: &str) -> String {
        let arguments = arguments.trim();

        if arguments.is_empty() {
            let lines: Vec<String> = self
                .registry
                .listed(is_direct)
                .map(|c| format!("{} - {}", c.keyword(), c.information_message()))
                .collect();

            if lines.is_empty() {
                return "No command has been found.".to_string();
            }
            return format!("Available commands:\n{}", lines.join("\n"));
        }

        match self.registry.find(arguments, is_direct) {
            Ok(command) => format!(
                "{} - {}\nusage: {}",
                command.keyword(),
                command.information_message(),
                command.usage_message().unwrap_or(command.keyword())
            ),
            Err(_) => "This command is unknown.".to_string(),
        }
    }
}

/// Run one command body on its own task so that a panic stays contained
pub(crate) async fn execute_isolated(
    bot: Arc<Bot>,
    command: Arc<dyn Command>,
    request: Request,
) -> Result<(), CommandError> {
    let handle = tokio::spawn(async move { command.execute(&bot, &request).await });

    joined(handle.await)
}

/// Hand free text to a capture, on its own task as for commands
async fn capture_isolated(bot: Arc<Bot>, capture: Arc<dyn Capture>, text: String) -> Result<(), CommandError> {
    let handle = tokio::spawn(async move { capture.capture(&bot, &text).await });
    joined(handle.await)
}

fn joined(outcome: Result<Result<(), CommandError>, JoinError>) -> Result<(), CommandError> {
    match outcome {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(CommandError::Panicked(panic_reason(e.into_panic()))),
        Err(e) => Err(CommandError::ExecutionFailed(e.to_string())),
    }
}

/// Tell the channel that a command failed, and log it
pub(crate) fn report_failure(bot: &Bot, keyword: &str, error: &CommandError) {
    if bot.is_disposed() {
        tracing::debug!(channel_id = %bot.channel_id(), keyword = %keyword, "Command failed after disposal: {}", error);
        return;
    }
    tracing::error!(channel_id = %bot.channel_id(), keyword = %keyword, "Command failed: {}", error);
    bot.say(format!("Sorry, I failed to handle '{}': {}", keyword, error));
}

fn panic_reason(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(reason) = payload.downcast_ref::<&str>() {
        reason.to_string()
    } else if let Some(reason) = payload.downcast_ref::<String>() {
        reason.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::register_defaults;

    fn shell() -> Shell {
        let mut registry = CommandRegistry::new();
        register_defaults(&mut registry).unwrap();
        Shell::new(Arc::new(registry))
    }

    #[test]
    fn help_lists_commands_of_the_channel_mode() {
        let shell = shell();

        let direct = shell.help_text(true, "");
        assert!(direct.starts_with("Available commands:\n"));
        assert!(direct.contains("start - Start the conversation over"));
        assert!(!direct.contains("close"));
        assert!(!direct.contains("echo"));

        let group = shell.help_text(false, "  ");
        assert!(group.contains("close - Close this channel"));
        assert!(!group.contains("start -"));
    }

    #[test]
    fn help_describes_one_command() {
        let shell = shell();

        assert_eq!(
            shell.help_text(true, "HELP"),
            "help - Show available commands\nusage: help [command]"
        );
        assert_eq!(shell.help_text(true, "version"), "version - Show bot version\nusage: version");
        assert_eq!(shell.help_text(true, "close"), "This command is unknown.");
        assert_eq!(shell.help_text(true, "magic"), "This command is unknown.");
    }

    #[test]
    fn empty_registry_has_no_listing() {
        let shell = Shell::new(Arc::new(CommandRegistry::new()));
        assert_eq!(shell.help_text(false, ""), "No command has been found.");
    }

    #[test]
    fn panic_payloads_become_reasons() {
        assert_eq!(panic_reason(Box::new("static")), "static");
        assert_eq!(panic_reason(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_reason(Box::new(42u8)), "unknown panic");
    }
}
