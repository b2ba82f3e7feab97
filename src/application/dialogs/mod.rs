//! Dialogs - Ready-made machines for guided conversations
//!
//! - [`Input`] asks one question and captures the reply typed next
//! - [`menu`] builds an input answered with the digit of an option
//! - [`Sequence`] chains inputs, each one asked once the previous is answered
//! - [`Steps`] builds a linear machine moved forward with the `step` command

pub mod input;
pub mod menu;
pub mod pattern;
pub mod sequence;
pub mod steps;

pub use input::{Input, InputBuilder, ANSWERS_KEY};
pub use menu::menu;
pub use pattern::Pattern;
pub use sequence::Sequence;
pub use steps::Steps;
