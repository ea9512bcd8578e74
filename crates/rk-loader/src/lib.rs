//! Core module loading for the retrokit host
//!
//! Locates the core binary among a fixed-priority candidate list, opens it,
//! resolves the full entry-point table, registers the host callback set and
//! initializes the core. A load either completes fully or fails with a
//! diagnostic naming the path or symbol at fault; there is no partially
//! initialized state.

pub mod module;
pub mod symbols;

pub use module::{CoreLoader, CoreModule};
pub use symbols::{CoreSymbols, HostCallbacks, SymbolSource};
