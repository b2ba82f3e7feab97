//! Domain traits - Abstractions for infrastructure implementations

pub mod capture;
pub mod listener;
pub mod speaker;
pub mod store;

pub use capture::Capture;
pub use listener::Listener;
pub use speaker::Speaker;
pub use store::Store;
