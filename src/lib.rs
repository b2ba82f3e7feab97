//! shellbot - A chat-driven command shell
//!
//! Inbound events are routed by the [`Engine`] to one [`Bot`] per channel.
//! Each bot resolves typed lines to commands, runs interactive ones right
//! away and queues the others on its own ordered pipeline.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bot::Bot;
pub use application::dialogs::{menu, Input, Sequence, Steps};
pub use application::engine::{Engine, EngineBuilder};
pub use application::errors::{
    BotError, CommandError, ConfigError, MachineError, PipelineError, ShellError, StorageError,
};
pub use application::machine::{StateMachine, Step, Transition};
pub use domain::entities::{Command, Event, EventKind, Outbound, Request, User, Visibility};
pub use domain::traits::{Capture, Listener, Speaker, Store};
pub use infrastructure::config::Config;
