//! ROM mapping and game-identifier derivation
//!
//! The ROM file is memory-mapped and the mapping is owned for the whole
//! session: the core receives a pointer into it at load-game time and may
//! read from it until the next load or teardown.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

/// Fixed header field holding the short game identifier
const GAME_ID_OFFSET: usize = 0x0C;
const GAME_ID_LEN: usize = 4;

/// Fallback when the ROM is too short or the field is not ASCII
const GAME_ID_UNKNOWN: &str = "UNKN";

/// A memory-mapped ROM with its derived identity
#[derive(Debug)]
pub struct RomImage {
    map: Mmap,
    path: PathBuf,
    game_id: String,
}

impl RomImage {
    pub fn open(path: &Path) -> rk_core::Result<Self> {
        let file = File::open(path)?;
        let map = unsafe { Mmap::map(&file) }?;
        let game_id = derive_game_id(&map);
        tracing::info!(
            "Mapped ROM {} ({} bytes, game id {})",
            path.display(),
            map.len(),
            game_id
        );
        Ok(Self {
            map,
            path: path.to_path_buf(),
            game_id,
        })
    }

    /// The mapped ROM bytes; valid as long as this image lives
    pub fn data(&self) -> &[u8] {
        &self.map
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Short identifier read from the ROM header; keys per-title variable
    /// overrides only, never file names.
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// File stem used to key save files for this ROM
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "rom".to_string())
    }
}

fn derive_game_id(data: &[u8]) -> String {
    let Some(field) = data.get(GAME_ID_OFFSET..GAME_ID_OFFSET + GAME_ID_LEN) else {
        return GAME_ID_UNKNOWN.to_string();
    };
    if field.iter().all(|b| b.is_ascii_alphanumeric()) {
        String::from_utf8_lossy(field).to_ascii_uppercase()
    } else {
        GAME_ID_UNKNOWN.to_string()
    }
}
