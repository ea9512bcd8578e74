//! Environment command dispatch
//!
//! The environment callback is the core's grab-bag query channel: a
//! command code plus an untyped in/out payload. Capability probes and
//! supported queries are answered here; everything unknown returns false
//! and leaves the payload untouched.

use std::ffi::{c_char, c_void, CStr, CString};
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;

use rk_abi::PixelFormat;

use crate::context::HostContext;

/// Host-managed directories handed to the core on request.
///
/// Directories are created lazily on first query, and the C string for
/// each path is built once and cached so the pointer the core receives
/// stays valid for the lifetime of the context.
pub struct HostDirectories {
    system_dir: PathBuf,
    save_dir: PathBuf,
    system_cstr: OnceCell<CString>,
    save_cstr: OnceCell<CString>,
}

impl HostDirectories {
    pub fn new(system_dir: PathBuf, save_dir: PathBuf) -> Self {
        Self {
            system_dir,
            save_dir,
            system_cstr: OnceCell::new(),
            save_cstr: OnceCell::new(),
        }
    }

    pub fn system_dir(&self) -> &Path {
        &self.system_dir
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    fn system_dir_cstr(&self) -> Option<&CStr> {
        dir_cstr(&self.system_dir, &self.system_cstr)
    }

    fn save_dir_cstr(&self) -> Option<&CStr> {
        dir_cstr(&self.save_dir, &self.save_cstr)
    }
}

fn dir_cstr<'a>(path: &Path, cell: &'a OnceCell<CString>) -> Option<&'a CStr> {
    cell.get_or_try_init(|| {
        std::fs::create_dir_all(path).map_err(|e| {
            tracing::warn!("Failed to create {}: {}", path.display(), e);
        })?;
        let Some(utf8) = path.to_str() else {
            tracing::warn!("Directory path is not valid UTF-8: {}", path.display());
            return Err(());
        };
        CString::new(utf8).map_err(|_| ())
    })
    .ok()
    .map(|c| c.as_c_str())
}

/// Answer one environment command.
///
/// # Safety
///
/// `data` must be the payload pointer the core passed for `cmd`, matching
/// that command's contract (or null, which is rejected per command).
pub(crate) unsafe fn dispatch(ctx: &HostContext, cmd: u32, data: *mut c_void) -> bool {
    match cmd {
        rk_abi::ENV_GET_CAN_DUPE => {
            if data.is_null() {
                return false;
            }
            // Duplicated (null) frames are fine; the video bridge keeps
            // the previous frame current.
            *(data as *mut bool) = true;
            true
        }

        rk_abi::ENV_GET_SYSTEM_DIRECTORY => write_dir(ctx.dirs.system_dir_cstr(), data),
        rk_abi::ENV_GET_SAVE_DIRECTORY => write_dir(ctx.dirs.save_dir_cstr(), data),

        rk_abi::ENV_SET_PIXEL_FORMAT => {
            if data.is_null() {
                return false;
            }
            let raw = *(data as *const u32);
            match PixelFormat::from_raw(raw) {
                Some(format) => {
                    tracing::info!("Pixel format set to {:?}", format);
                    ctx.video.set_format(format);
                    true
                }
                None => {
                    // Rejected; the previously negotiated format stays.
                    tracing::warn!("Core requested unsupported pixel format {}", raw);
                    false
                }
            }
        }

        rk_abi::ENV_GET_VARIABLE => {
            if data.is_null() {
                return false;
            }
            let var = data as *mut rk_abi::Variable;
            if (*var).key.is_null() {
                return false;
            }
            let Ok(key) = CStr::from_ptr((*var).key).to_str() else {
                return false;
            };
            match ctx.variables.resolve(key, &ctx.game_id()) {
                Some(value) => {
                    (*var).value = value.as_ptr();
                    true
                }
                None => {
                    tracing::debug!("Unhandled variable query: {}", key);
                    false
                }
            }
        }

        other => {
            tracing::trace!("Unhandled environment command {}", other);
            false
        }
    }
}

unsafe fn write_dir(dir: Option<&CStr>, data: *mut c_void) -> bool {
    if data.is_null() {
        return false;
    }
    let Some(dir) = dir else {
        return false;
    };
    *(data as *mut *const c_char) = dir.as_ptr();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directories_created_lazily() {
        let tmp = tempfile::tempdir().unwrap();
        let system = tmp.path().join("system");
        let saves = tmp.path().join("saves");
        let dirs = HostDirectories::new(system.clone(), saves.clone());

        assert!(!system.exists());
        let cstr = dirs.system_dir_cstr().unwrap();
        assert!(system.exists());
        assert_eq!(cstr.to_str().unwrap(), system.to_str().unwrap());
        assert!(!saves.exists());
    }

    #[test]
    fn test_directory_pointer_is_stable() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = HostDirectories::new(tmp.path().join("system"), tmp.path().join("saves"));

        let first = dirs.save_dir_cstr().unwrap().as_ptr();
        let second = dirs.save_dir_cstr().unwrap().as_ptr();
        assert_eq!(first, second);
    }
}
