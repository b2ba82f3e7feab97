//! Domain layer - Core types shared by every other layer
//! 
//! This layer contains:
//! - Entities: Core objects (User, Event, Command)
//! - Traits: Abstractions for infrastructure (Speaker, Store, Listener)

pub mod entities;
pub mod traits;
