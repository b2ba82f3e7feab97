use async_trait::async_trait;

use crate::application::bot::Bot;
use crate::application::errors::CommandError;

/// Receives free text that matched no command
///
/// A bot holds at most one capture armed for the next line only, and one
/// fallback kept until it is replaced. The one-shot capture has precedence.
#[async_trait]
pub trait Capture: Send + Sync {
    async fn capture(&self, bot: &Bot, text: &str) -> Result<(), CommandError>;
}
