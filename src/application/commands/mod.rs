//! Built-in commands registered by every engine unless disabled

mod basic;
mod channel;
mod machine;

pub use basic::{EchoCommand, HelpCommand, SleepCommand, UploadCommand, VersionCommand};
pub use channel::CloseCommand;
pub use machine::{StartCommand, StepCommand};

use crate::application::errors::ShellError;
use crate::domain::entities::CommandRegistry;

pub fn register_defaults(registry: &mut CommandRegistry) -> Result<(), ShellError> {
    registry.register(HelpCommand)?;
    registry.register(VersionCommand)?;
    registry.register(EchoCommand)?;
    registry.register(SleepCommand)?;
    registry.register(UploadCommand)?;
    registry.register(CloseCommand)?;
    registry.register(StartCommand)?;
    registry.register(StepCommand)?;
    Ok(())
}
