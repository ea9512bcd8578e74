//! Shared foundation for the retrokit core host
//!
//! This crate provides the error types and host configuration used by
//! every other crate in the workspace.

pub mod config;
pub mod error;

pub use config::HostConfig;
pub use error::{AudioError, HostError, LoadError, Result, SessionError, StateError};
