//! Application layer - Shell, pipeline, state machine and their composition
//! 
//! This layer contains:
//! - Messaging: Line parsing, command dispatch, background pipeline
//! - Machine: Generic state machine driver
//! - Dialogs: Questions, menus, sequences and steps built on machines
//! - Store: Per-channel view over a store backend
//! - Bot / Engine: Per-channel sessions and their registry
//! - Commands: Built-in commands
//! - Errors: Error taxonomy

pub mod bot;
pub mod commands;
pub mod dialogs;
pub mod engine;
pub mod errors;
pub mod machine;
pub mod messaging;
pub mod store;
