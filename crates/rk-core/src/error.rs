//! Error types for the retrokit core host

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the core host
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Core-module loading and symbol-resolution errors
///
/// Every variant names the path or symbol that failed so a load failure
/// can be diagnosed without rerunning under a debugger.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Core module not found, tried: {tried}")]
    ModuleNotFound { tried: String },

    #[error("Failed to open core module {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Required symbol missing from core: {0}")]
    MissingSymbol(&'static str),
}

/// Audio output errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No output device available")]
    NoOutputDevice,

    #[error("Failed to query output config: {0}")]
    ConfigQuery(String),

    #[error("Failed to build output stream: {0}")]
    StreamBuild(String),

    #[error("Failed to start output stream: {0}")]
    StreamStart(String),
}

/// Save-state and battery-RAM errors
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Core does not expose save states")]
    Unsupported,

    #[error("Core reported a zero-size save state")]
    EmptyState,

    #[error("Core failed to serialize state ({0} bytes)")]
    SerializeFailed(usize),

    #[error("Core failed to deserialize state ({0} bytes)")]
    DeserializeFailed(usize),

    #[error("Malformed state file {path}: {reason}")]
    MalformedFile { path: PathBuf, reason: String },
}

/// Session lifecycle errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Core rejected game: {0}")]
    GameRejected(PathBuf),

    #[error("No game loaded")]
    NoGameLoaded,
}

impl LoadError {
    /// Build a `ModuleNotFound` from the candidate list that was searched
    pub fn module_not_found(candidates: &[PathBuf]) -> Self {
        let tried = candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        LoadError::ModuleNotFound { tried }
    }
}

/// Result type alias for host operations
pub type Result<T> = std::result::Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LoadError::MissingSymbol("retro_set_audio_sample");
        assert_eq!(
            format!("{}", err),
            "Required symbol missing from core: retro_set_audio_sample"
        );

        let err = LoadError::module_not_found(&[
            PathBuf::from("/opt/cores/core.so"),
            PathBuf::from("./core.so"),
        ]);
        assert_eq!(
            format!("{}", err),
            "Core module not found, tried: /opt/cores/core.so, ./core.so"
        );
    }

    #[test]
    fn test_error_conversion() {
        let load_err = LoadError::MissingSymbol("retro_run");
        let host_err: HostError = load_err.into();
        assert!(matches!(host_err, HostError::Load(_)));

        let state_err = StateError::SerializeFailed(1024);
        let host_err: HostError = state_err.into();
        assert!(matches!(host_err, HostError::State(_)));
    }
}
