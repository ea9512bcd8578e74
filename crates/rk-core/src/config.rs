//! Configuration system for the retrokit core host

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HostConfig {
    pub core: CoreConfig,
    pub paths: PathConfig,
    pub audio: AudioConfig,
    pub runner: RunnerConfig,
}

/// Core-module location settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Candidate module paths, tried in order at load time
    pub candidate_paths: Vec<PathBuf>,
}

/// Host-managed directory layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Directory handed to the core for system/BIOS files
    pub system_dir: PathBuf,
    /// Directory for battery-backed save files
    pub save_dir: PathBuf,
    /// Directory for save-state snapshot files
    pub state_dir: PathBuf,
}

/// Audio pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enable: bool,
    pub volume: f32,
    /// Frames accumulated before a chunk is cut
    pub chunk_frames: usize,
    /// Chunks allowed in the output queue before the producer starts dropping
    pub max_in_flight: usize,
    /// Delay before reconnecting the output after a route change
    pub route_settle_ms: u64,
}

/// Frame-pump settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Consecutive run calls per tick while fast-forward is engaged
    pub fast_forward_multiplier: u32,
}

// Default implementations

impl Default for CoreConfig {
    fn default() -> Self {
        let module = format!("core_libretro.{}", std::env::consts::DLL_EXTENSION);
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("retrokit");

        Self {
            candidate_paths: vec![
                base.join("cores").join(&module),
                PathBuf::from("cores").join(&module),
                PathBuf::from(&module),
            ],
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("retrokit");

        Self {
            system_dir: base.join("system"),
            save_dir: base.join("saves"),
            state_dir: base.join("states"),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enable: true,
            volume: 1.0,
            chunk_frames: 2048,
            max_in_flight: 4,
            route_settle_ms: 500,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            fast_forward_multiplier: 3,
        }
    }
}

impl HostConfig {
    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::config_path();

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("retrokit")
            .join("config.toml")
    }
}
