//! Callback routing for the retrokit core host
//!
//! The plugin interface registers plain C function pointers with the core,
//! with no way to pass host state alongside them. This crate provides the
//! address-stable `extern "C"` callback set and the process-wide dispatch
//! slot those callbacks route through: the session installs a `HostContext`
//! before the core is initialized, and every callback resolves it on entry.
//! With no context installed the callbacks are inert and return neutral
//! values, never crash.
//!
//! One active core per process is an accepted constraint of the interface,
//! not something this crate works around.

pub mod callbacks;
pub mod context;
pub mod environment;
pub mod variables;

pub use callbacks::callbacks;
pub use context::{clear, install, installed, HostContext};
pub use environment::HostDirectories;
pub use variables::VariableTable;
