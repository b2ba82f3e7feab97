use async_trait::async_trait;

use crate::application::bot::Bot;
use crate::application::errors::CommandError;
use crate::domain::entities::{Command, Request, Visibility};

/// Lets the members of a group release the bot
pub struct CloseCommand;

#[async_trait]
impl Command for CloseCommand {
    fn keyword(&self) -> &str {
        "close"
    }

    fn information_message(&self) -> &str {
        "Close this channel"
    }

    fn visibility(&self) -> Visibility {
        Visibility::Group
    }

    async fn execute(&self, bot: &Bot, _request: &Request) -> Result<(), CommandError> {
        bot.say("Closing this channel");
        bot.dispose().await;
        Ok(())
    }
}
