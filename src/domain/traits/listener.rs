use crate::application::bot::Bot;
use crate::domain::entities::User;

/// Lifecycle callbacks attached to a bot
///
/// Listeners are owned by the bot they are attached to and are dropped when
/// the engine disposes of that bot.
pub trait Listener: Send + Sync {
    /// The bot has been created for a channel
    fn on_enter(&self, _bot: &Bot) {}

    /// Someone joined the channel
    fn on_join(&self, _bot: &Bot, _actor: Option<&User>) {}

    /// Someone left the channel
    fn on_leave(&self, _bot: &Bot, _actor: Option<&User>) {}

    /// The bot is being disposed
    fn on_dispose(&self, _bot: &Bot) {}
}
