//! Locating, opening and initializing the core module

use std::path::{Path, PathBuf};

use libloading::Library;

use rk_core::error::LoadError;

use crate::symbols::{CoreSymbols, HostCallbacks, SymbolSource};

/// A loaded, initialized core module.
///
/// Owns the underlying library handle; entry points stay valid exactly as
/// long as this value lives. Dropping it deinitializes the core and unmaps
/// the module, which the host only does at process teardown.
#[derive(Debug)]
pub struct CoreModule {
    symbols: CoreSymbols,
    path: PathBuf,
    // Keeps the module mapped while `symbols` is callable; never used
    // directly after load.
    _library: Library,
}

impl CoreModule {
    /// The resolved entry-point table
    pub fn symbols(&self) -> &CoreSymbols {
        &self.symbols
    }

    /// Path the module was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CoreModule {
    fn drop(&mut self) {
        tracing::info!("Deinitializing core module {}", self.path.display());
        unsafe { (self.symbols.deinit)() };
    }
}

/// Loads the core module and brings it to the initialized state
pub struct CoreLoader;

impl CoreLoader {
    /// Load the core from the first existing candidate path.
    ///
    /// On success the core has its callback set registered and `retro_init`
    /// has been called exactly once. On any failure the core was never
    /// initialized.
    pub fn load(candidates: &[PathBuf], callbacks: HostCallbacks) -> Result<CoreModule, LoadError> {
        let path = Self::locate(candidates)?;
        tracing::info!("Loading core module from {}", path.display());

        let library = unsafe { Library::new(&path) }.map_err(|e| LoadError::OpenFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let symbols = connect(&library, callbacks)?;
        tracing::info!(
            "Core initialized (save states: {}, memory regions: {})",
            symbols.supports_save_states(),
            symbols.supports_memory_regions()
        );

        Ok(CoreModule {
            symbols,
            path,
            _library: library,
        })
    }

    /// Pick the first candidate path that exists on disk.
    fn locate(candidates: &[PathBuf]) -> Result<PathBuf, LoadError> {
        for candidate in candidates {
            if candidate.exists() {
                return Ok(candidate.clone());
            }
            tracing::debug!("Core candidate not present: {}", candidate.display());
        }
        Err(LoadError::module_not_found(candidates))
    }
}

/// Resolve the entry-point table, register the host callbacks, and call
/// `retro_init` once.
///
/// Symbol resolution happens first; a missing required symbol aborts before
/// any core code has run. Registration order matches the interface
/// contract: the environment callback must be in place before the rest, and
/// the full set before init.
pub fn connect(
    source: &dyn SymbolSource,
    callbacks: HostCallbacks,
) -> Result<CoreSymbols, LoadError> {
    let symbols = CoreSymbols::resolve(source)?;

    unsafe {
        (symbols.set_environment)(callbacks.environment);
        (symbols.set_video_refresh)(callbacks.video_refresh);
        (symbols.set_audio_sample)(callbacks.audio_sample);
        (symbols.set_audio_sample_batch)(callbacks.audio_sample_batch);
        (symbols.set_input_poll)(callbacks.input_poll);
        (symbols.set_input_state)(callbacks.input_state);
        (symbols.init)();
    }

    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::stub::{StubSource, INIT_CALLS};
    use std::ffi::c_void;
    use std::sync::atomic::Ordering;

    unsafe extern "C" fn host_environment(_cmd: u32, _data: *mut c_void) -> bool {
        false
    }
    unsafe extern "C" fn host_video(_data: *const c_void, _w: u32, _h: u32, _pitch: usize) {}
    unsafe extern "C" fn host_sample(_l: i16, _r: i16) {}
    unsafe extern "C" fn host_batch(_data: *const i16, frames: usize) -> usize {
        frames
    }
    unsafe extern "C" fn host_poll() {}
    unsafe extern "C" fn host_state(_port: u32, _device: u32, _index: u32, _id: u32) -> i16 {
        0
    }

    fn callbacks() -> HostCallbacks {
        HostCallbacks {
            environment: host_environment,
            video_refresh: host_video,
            audio_sample: host_sample,
            audio_sample_batch: host_batch,
            input_poll: host_poll,
            input_state: host_state,
        }
    }

    #[test]
    fn test_connect_initializes_once() {
        let _guard = crate::symbols::stub::LOCK.lock().unwrap();
        let before = INIT_CALLS.load(Ordering::SeqCst);
        let symbols = connect(&StubSource::complete(), callbacks()).unwrap();
        assert_eq!(INIT_CALLS.load(Ordering::SeqCst), before + 1);
        assert!(!symbols.supports_save_states());
    }

    #[test]
    fn test_missing_symbol_means_no_init() {
        let _guard = crate::symbols::stub::LOCK.lock().unwrap();
        let before = INIT_CALLS.load(Ordering::SeqCst);
        let source = StubSource::complete().without("retro_set_audio_sample");
        let err = connect(&source, callbacks()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingSymbol("retro_set_audio_sample")
        ));
        // The core was never touched
        assert_eq!(INIT_CALLS.load(Ordering::SeqCst), before);
    }

    #[test]
    fn test_locate_reports_all_candidates() {
        let candidates = vec![
            PathBuf::from("/nonexistent/a.so"),
            PathBuf::from("/nonexistent/b.so"),
        ];
        let err = CoreLoader::load(&candidates, callbacks()).unwrap_err();
        let message = format!("{}", err);
        assert!(message.contains("/nonexistent/a.so"));
        assert!(message.contains("/nonexistent/b.so"));
    }
}
