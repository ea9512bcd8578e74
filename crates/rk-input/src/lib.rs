//! Input handling for the retrokit core host
//!
//! Merges physical-controller, on-screen and synthetic input sources into
//! one consistent snapshot served to the core's input-state queries.

pub mod buttons;
pub mod mapping;
pub mod state;

pub use buttons::{JoypadButtons, SyntheticButton};
pub use mapping::{ButtonMapping, HostButton};
pub use state::{InputAggregator, InputSnapshot, TouchState};
