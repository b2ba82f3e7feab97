//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Shell error: {0}")]
    Shell(#[from] ShellError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("State machine error: {0}")]
    Machine(#[from] MachineError),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Command registry and dispatch errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShellError {
    #[error("Command '{0}' is already registered")]
    DuplicateKeyword(String),

    #[error("Invalid keyword: '{0}'")]
    InvalidKeyword(String),

    /// Never surfaced to the channel, the shell answers with help instead
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

/// Command execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Command panicked: {0}")]
    Panicked(String),

    #[error("No state machine is available")]
    NoMachine,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Machine(#[from] MachineError),
}

/// Background job queue errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Pipeline has been stopped")]
    Stopped,

    #[error("Pipeline worker is already running")]
    AlreadyStarted,
}

/// State machine construction and stepping errors
#[derive(Error, Debug)]
pub enum MachineError {
    #[error("Invalid initial state '{0}'")]
    InvalidInitial(String),

    #[error("Invalid source state '{0}'")]
    InvalidSource(String),

    #[error("Invalid target state '{0}'")]
    InvalidTarget(String),

    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    #[error("Transition from '{state}' on '{trigger}' is already defined")]
    DuplicateTransition { state: String, trigger: String },

    #[error("Action failed on '{trigger}': {reason}")]
    Action { trigger: String, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Lock poisoned")]
    Poisoned,

    /// The channel has been disposed and its memory forgotten
    #[error("Store has been released")]
    Released,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
