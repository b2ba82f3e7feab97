use crate::application::errors::BotError;
use crate::domain::entities::Outbound;

/// Speaker trait - abstraction for the outbound side of a messaging platform
///
/// Delivery is fire-and-forget from the command's perspective: the
/// implementation may post synchronously or hand the message to its own
/// queue. Errors are logged by the caller and never reach the command.
pub trait Speaker: Send + Sync {
    /// Post a message to a channel
    fn say(&self, message: &Outbound) -> Result<(), BotError>;

    /// Name of the platform, for logs
    fn platform(&self) -> &str {
        "unknown"
    }
}
