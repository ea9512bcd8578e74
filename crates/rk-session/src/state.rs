//! Save states and battery-backed RAM
//!
//! Save states are opaque blobs whose size is authoritative only from the
//! core's size query at the moment of capture. Battery RAM is a raw
//! region the core exposes for the lifetime of a loaded game; it is
//! persisted to a file keyed by ROM identity and must be flushed before
//! unload or a prolonged pause.

use std::ffi::c_void;
use std::fs;
use std::path::PathBuf;

use rk_core::error::StateError;
use rk_loader::CoreSymbols;

/// Battery-RAM file extension written by the host
const BATTERY_EXT: &str = "sav";
/// Legacy extension accepted on load
const BATTERY_EXT_FALLBACK: &str = "srm";

/// Wraps the core's serialize/deserialize and memory-region entry points.
pub struct StateManager {
    symbols: CoreSymbols,
    save_dir: PathBuf,
    state_dir: PathBuf,
}

impl StateManager {
    pub fn new(symbols: CoreSymbols, save_dir: PathBuf, state_dir: PathBuf) -> Self {
        Self {
            symbols,
            save_dir,
            state_dir,
        }
    }

    /// Snapshot the core's full execution state.
    ///
    /// Queries the size, allocates exactly that many bytes, and returns
    /// the buffer only if the core reports success.
    pub fn capture_state(&self) -> Result<Vec<u8>, StateError> {
        let (size_of, serialize) = match (self.symbols.serialize_size, self.symbols.serialize) {
            (Some(size_of), Some(serialize)) => (size_of, serialize),
            _ => return Err(StateError::Unsupported),
        };

        let size = unsafe { size_of() };
        if size == 0 {
            return Err(StateError::EmptyState);
        }

        let mut buffer = vec![0u8; size];
        let ok = unsafe { serialize(buffer.as_mut_ptr() as *mut c_void, size) };
        if ok {
            Ok(buffer)
        } else {
            Err(StateError::SerializeFailed(size))
        }
    }

    /// Apply a previously captured state.
    ///
    /// The core's boolean result is surfaced unmodified; on failure
    /// nothing was partially applied and the running session is left
    /// untouched.
    pub fn restore_state(&self, data: &[u8]) -> Result<(), StateError> {
        let unserialize = self.symbols.unserialize.ok_or(StateError::Unsupported)?;
        let ok = unsafe { unserialize(data.as_ptr() as *const c_void, data.len()) };
        if ok {
            Ok(())
        } else {
            Err(StateError::DeserializeFailed(data.len()))
        }
    }

    /// Capture and persist a snapshot as a length-prefixed blob file.
    pub fn save_state_file(&self, rom_stem: &str, slot: u32) -> rk_core::Result<PathBuf> {
        let data = self.capture_state()?;
        fs::create_dir_all(&self.state_dir)?;

        let path = self.state_path(rom_stem, slot);
        let mut blob = Vec::with_capacity(8 + data.len());
        blob.extend_from_slice(&(data.len() as u64).to_le_bytes());
        blob.extend_from_slice(&data);
        fs::write(&path, blob)?;

        tracing::info!("Save state written ({} bytes) to {}", data.len(), path.display());
        Ok(path)
    }

    /// Load and apply a snapshot written by `save_state_file`.
    pub fn load_state_file(&self, rom_stem: &str, slot: u32) -> rk_core::Result<()> {
        let path = self.state_path(rom_stem, slot);
        let blob = fs::read(&path)?;

        if blob.len() < 8 {
            return Err(StateError::MalformedFile {
                path,
                reason: "missing length prefix".to_string(),
            }
            .into());
        }
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&blob[..8]);
        let expected = u64::from_le_bytes(prefix) as usize;
        if blob.len() - 8 != expected {
            return Err(StateError::MalformedFile {
                path,
                reason: format!(
                    "length prefix {} does not match payload of {} bytes",
                    expected,
                    blob.len() - 8
                ),
            }
            .into());
        }

        self.restore_state(&blob[8..])?;
        Ok(())
    }

    /// The battery region the core currently exposes, if any.
    pub fn battery_region(&self) -> Option<(*mut u8, usize)> {
        let data_of = self.symbols.get_memory_data?;
        let size_of = self.symbols.get_memory_size?;

        let size = unsafe { size_of(rk_abi::MEMORY_SAVE_RAM) };
        let ptr = unsafe { data_of(rk_abi::MEMORY_SAVE_RAM) } as *mut u8;
        if size == 0 || ptr.is_null() {
            return None;
        }
        Some((ptr, size))
    }

    /// Persist the battery region to the save file for this ROM.
    ///
    /// Writes exactly the core-reported region size. No-op when the core
    /// exposes no region.
    pub fn flush_battery(&self, rom_stem: &str) -> rk_core::Result<()> {
        let Some((ptr, size)) = self.battery_region() else {
            return Ok(());
        };

        fs::create_dir_all(&self.save_dir)?;
        let path = self.battery_path(rom_stem, BATTERY_EXT);
        let bytes = unsafe { std::slice::from_raw_parts(ptr as *const u8, size) };
        fs::write(&path, bytes)?;

        tracing::info!("Battery RAM flushed ({} bytes) to {}", size, path.display());
        Ok(())
    }

    /// Restore the battery region from disk, preferring the host's own
    /// extension and falling back to the legacy one.
    ///
    /// A shorter file than the region is copied as far as it goes; the
    /// copy never runs past the region. Returns whether anything was
    /// loaded.
    pub fn load_battery(&self, rom_stem: &str) -> rk_core::Result<bool> {
        let Some((ptr, size)) = self.battery_region() else {
            return Ok(false);
        };

        let path = [
            self.battery_path(rom_stem, BATTERY_EXT),
            self.battery_path(rom_stem, BATTERY_EXT_FALLBACK),
        ]
        .into_iter()
        .find(|p| p.exists());
        let Some(path) = path else {
            return Ok(false);
        };

        let data = fs::read(&path)?;
        let count = data.len().min(size);
        unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, count) };

        tracing::info!("Battery RAM loaded ({} bytes) from {}", count, path.display());
        Ok(true)
    }

    fn battery_path(&self, rom_stem: &str, ext: &str) -> PathBuf {
        self.save_dir.join(format!("{rom_stem}.{ext}"))
    }

    fn state_path(&self, rom_stem: &str, slot: u32) -> PathBuf {
        self.state_dir.join(format!("{rom_stem}.state{slot}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::stub;
    use rk_core::error::HostError;

    fn manager(dir: &std::path::Path) -> StateManager {
        StateManager::new(
            stub::symbols(),
            dir.join("saves"),
            dir.join("states"),
        )
    }

    #[test]
    fn test_capture_matches_reported_size_and_round_trips() {
        let _guard = stub::LOCK.lock().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let states = manager(tmp.path());

        stub::fill_core_state(0x5A);
        let captured = states.capture_state().unwrap();
        assert_eq!(captured.len(), stub::STATE_SIZE);
        assert!(captured.iter().all(|&b| b == 0x5A));

        stub::fill_core_state(0);
        states.restore_state(&captured).unwrap();
        assert!(stub::core_state().iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn test_capture_without_symbols_is_unsupported() {
        let tmp = tempfile::tempdir().unwrap();
        let mut symbols = stub::symbols();
        symbols.serialize_size = None;
        let states = StateManager::new(symbols, tmp.path().to_path_buf(), tmp.path().to_path_buf());

        assert!(matches!(
            states.capture_state(),
            Err(StateError::Unsupported)
        ));
    }

    #[test]
    fn test_state_file_round_trip() {
        let _guard = stub::LOCK.lock().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let states = manager(tmp.path());

        stub::fill_core_state(0x33);
        let path = states.save_state_file("game", 1).unwrap();
        let blob = fs::read(&path).unwrap();
        assert_eq!(blob.len(), 8 + stub::STATE_SIZE);
        assert_eq!(
            u64::from_le_bytes(blob[..8].try_into().unwrap()),
            stub::STATE_SIZE as u64
        );

        stub::fill_core_state(0);
        states.load_state_file("game", 1).unwrap();
        assert!(stub::core_state().iter().all(|&b| b == 0x33));
    }

    #[test]
    fn test_truncated_state_file_is_malformed() {
        let _guard = stub::LOCK.lock().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let states = manager(tmp.path());

        stub::fill_core_state(0x11);
        let path = states.save_state_file("game", 0).unwrap();
        let mut blob = fs::read(&path).unwrap();
        blob.truncate(blob.len() - 1);
        fs::write(&path, blob).unwrap();

        let err = states.load_state_file("game", 0).unwrap_err();
        assert!(matches!(
            err,
            HostError::State(StateError::MalformedFile { .. })
        ));
    }

    #[test]
    fn test_battery_flush_and_reload_identical() {
        let _guard = stub::LOCK.lock().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let states = manager(tmp.path());

        stub::fill_battery(&[7, 6, 5, 4, 3, 2, 1, 0]);
        states.flush_battery("game").unwrap();

        let path = tmp.path().join("saves").join("game.sav");
        let written = fs::read(&path).unwrap();
        assert_eq!(written.len(), stub::BATTERY_SIZE);
        assert_eq!(&written[..8], &[7, 6, 5, 4, 3, 2, 1, 0]);

        stub::fill_battery(&[0; 8]);
        assert!(states.load_battery("game").unwrap());
        assert_eq!(&stub::battery()[..8], &[7, 6, 5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_battery_load_accepts_legacy_extension() {
        let _guard = stub::LOCK.lock().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let states = manager(tmp.path());

        fs::create_dir_all(tmp.path().join("saves")).unwrap();
        fs::write(tmp.path().join("saves").join("game.srm"), [9u8; 4]).unwrap();

        stub::fill_battery(&[0; 8]);
        assert!(states.load_battery("game").unwrap());
        // Shorter file: copied as far as it goes, the rest untouched
        assert_eq!(&stub::battery()[..4], &[9, 9, 9, 9]);
        assert_eq!(&stub::battery()[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_battery_noop_without_region() {
        let tmp = tempfile::tempdir().unwrap();
        let mut symbols = stub::symbols();
        symbols.get_memory_data = None;
        let states = StateManager::new(
            symbols,
            tmp.path().join("saves"),
            tmp.path().join("states"),
        );

        states.flush_battery("game").unwrap();
        assert!(!states.load_battery("game").unwrap());
        assert!(!tmp.path().join("saves").exists());
    }
}
