//! Session orchestration for the retrokit core host
//!
//! Ties the loaded core to the host services: maps the ROM, drives the
//! core's run entry point at real-time cadence on a dedicated thread, and
//! persists save states and battery-backed RAM.

pub mod rom;
pub mod scheduler;
pub mod session;
pub mod state;

pub use rom::RomImage;
pub use scheduler::{ExecutionScheduler, SchedulerState};
pub use session::{build_context, GameSession, SessionState};
pub use state::StateManager;
