//! The address-stable `extern "C"` callback set registered with the core
//!
//! Each callback resolves the process-wide context on entry and routes to
//! the matching host service. The core invokes all of them synchronously
//! from inside its run entry point, on the execution thread.

use std::ffi::c_void;

use rk_loader::HostCallbacks;

use crate::context;
use crate::environment;

/// The callback table handed to `CoreLoader::load`.
pub fn callbacks() -> HostCallbacks {
    HostCallbacks {
        environment: host_environment,
        video_refresh: host_video_refresh,
        audio_sample: host_audio_sample,
        audio_sample_batch: host_audio_sample_batch,
        input_poll: host_input_poll,
        input_state: host_input_state,
    }
}

unsafe extern "C" fn host_environment(cmd: u32, data: *mut c_void) -> bool {
    context::with(|ctx| unsafe { environment::dispatch(ctx, cmd, data) }).unwrap_or(false)
}

unsafe extern "C" fn host_video_refresh(data: *const c_void, width: u32, height: u32, pitch: usize) {
    // Null means a duplicated frame; the previous one stays current.
    if data.is_null() {
        return;
    }
    context::with(|ctx| unsafe { ctx.video.refresh_raw(data as *const u8, width, height, pitch) });
}

unsafe extern "C" fn host_audio_sample(left: i16, right: i16) {
    context::with(|ctx| ctx.audio.push_frame(left, right));
}

unsafe extern "C" fn host_audio_sample_batch(data: *const i16, frames: usize) -> usize {
    if data.is_null() {
        return 0;
    }
    context::with(|ctx| {
        let samples = unsafe { std::slice::from_raw_parts(data, frames * 2) };
        ctx.audio.push_samples(samples);
        frames
    })
    .unwrap_or(0)
}

unsafe extern "C" fn host_input_poll() {
    context::with(|ctx| ctx.input.poll());
}

unsafe extern "C" fn host_input_state(port: u32, device: u32, index: u32, id: u32) -> i16 {
    context::with(|ctx| ctx.input.state(port, device, index, id)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{c_char, CStr, CString};
    use std::sync::{Arc, Mutex};

    use rk_audio::{AudioPipeline, NullSink};
    use rk_core::config::AudioConfig;
    use rk_input::{InputAggregator, JoypadButtons};
    use rk_video::VideoBridge;

    use crate::context::HostContext;
    use crate::environment::HostDirectories;
    use crate::variables::VariableTable;

    /// Serializes tests that install into the process-wide slot.
    static SLOT: Mutex<()> = Mutex::new(());

    struct Installed {
        ctx: Arc<HostContext>,
        sink: Arc<NullSink>,
        _tmp: tempfile::TempDir,
    }

    impl Drop for Installed {
        fn drop(&mut self) {
            context::clear();
        }
    }

    fn install_test_context() -> Installed {
        let tmp = tempfile::tempdir().unwrap();
        let sink = Arc::new(NullSink::new());
        let audio = Arc::new(AudioPipeline::new(
            &AudioConfig::default(),
            Arc::clone(&sink) as Arc<dyn rk_audio::OutputSink>,
        ));
        audio.start(32768).unwrap();
        let ctx = Arc::new(HostContext::new(
            Arc::new(VideoBridge::new()),
            audio,
            Arc::new(InputAggregator::new()),
            HostDirectories::new(tmp.path().join("system"), tmp.path().join("saves")),
            VariableTable::builtin(),
        ));
        context::install(Arc::clone(&ctx));
        Installed {
            ctx,
            sink,
            _tmp: tmp,
        }
    }

    #[test]
    fn test_callbacks_inert_without_context() {
        let _guard = SLOT.lock().unwrap();
        context::clear();

        let mut can_dupe = false;
        unsafe {
            assert!(!host_environment(
                rk_abi::ENV_GET_CAN_DUPE,
                &mut can_dupe as *mut bool as *mut c_void,
            ));
            host_audio_sample(1, 2);
            host_input_poll();
            assert_eq!(host_input_state(0, rk_abi::DEVICE_JOYPAD, 0, 0), 0);
        }
        assert!(!can_dupe);
    }

    #[test]
    fn test_can_dupe_probe() {
        let _guard = SLOT.lock().unwrap();
        let _installed = install_test_context();

        let mut can_dupe = false;
        let ok = unsafe {
            host_environment(
                rk_abi::ENV_GET_CAN_DUPE,
                &mut can_dupe as *mut bool as *mut c_void,
            )
        };
        assert!(ok);
        assert!(can_dupe);
    }

    #[test]
    fn test_pixel_format_negotiation() {
        let _guard = SLOT.lock().unwrap();
        let installed = install_test_context();

        let mut raw: u32 = 1; // XRGB8888
        let ok = unsafe {
            host_environment(
                rk_abi::ENV_SET_PIXEL_FORMAT,
                &mut raw as *mut u32 as *mut c_void,
            )
        };
        assert!(ok);
        assert_eq!(installed.ctx.video.format(), rk_abi::PixelFormat::Xrgb8888);

        // 0RGB1555 is rejected and the negotiated format is left intact
        let mut rejected: u32 = 0;
        let ok = unsafe {
            host_environment(
                rk_abi::ENV_SET_PIXEL_FORMAT,
                &mut rejected as *mut u32 as *mut c_void,
            )
        };
        assert!(!ok);
        assert_eq!(installed.ctx.video.format(), rk_abi::PixelFormat::Xrgb8888);
    }

    #[test]
    fn test_directory_queries() {
        let _guard = SLOT.lock().unwrap();
        let installed = install_test_context();

        let mut path_ptr: *const c_char = std::ptr::null();
        let ok = unsafe {
            host_environment(
                rk_abi::ENV_GET_SAVE_DIRECTORY,
                &mut path_ptr as *mut *const c_char as *mut c_void,
            )
        };
        assert!(ok);
        assert!(!path_ptr.is_null());

        let reported = unsafe { CStr::from_ptr(path_ptr) }.to_str().unwrap();
        assert_eq!(reported, installed.ctx.dirs.save_dir().to_str().unwrap());
        assert!(installed.ctx.dirs.save_dir().exists());
    }

    #[test]
    fn test_variable_lookup_uses_game_id() {
        let _guard = SLOT.lock().unwrap();
        let installed = install_test_context();
        installed.ctx.set_game_id("IRE0");

        let key = CString::new("jit_enable").unwrap();
        let mut var = rk_abi::Variable {
            key: key.as_ptr(),
            value: std::ptr::null(),
        };
        let ok = unsafe {
            host_environment(
                rk_abi::ENV_GET_VARIABLE,
                &mut var as *mut rk_abi::Variable as *mut c_void,
            )
        };
        assert!(ok);
        let value = unsafe { CStr::from_ptr(var.value) }.to_str().unwrap();
        assert_eq!(value, "enabled");

        // Unknown keys answer false and leave the payload untouched
        let unknown = CString::new("no_such_key").unwrap();
        let mut var = rk_abi::Variable {
            key: unknown.as_ptr(),
            value: std::ptr::null(),
        };
        let ok = unsafe {
            host_environment(
                rk_abi::ENV_GET_VARIABLE,
                &mut var as *mut rk_abi::Variable as *mut c_void,
            )
        };
        assert!(!ok);
        assert!(var.value.is_null());
    }

    #[test]
    fn test_unknown_command_returns_false() {
        let _guard = SLOT.lock().unwrap();
        let _installed = install_test_context();
        assert!(!unsafe { host_environment(9999, std::ptr::null_mut()) });
    }

    #[test]
    fn test_video_refresh_routes_to_bridge() {
        let _guard = SLOT.lock().unwrap();
        let installed = install_test_context();

        let pixels = vec![0xAAu8; 512 * 240];
        unsafe { host_video_refresh(pixels.as_ptr() as *const c_void, 256, 240, 512) };
        let frame = installed.ctx.video.latest().unwrap();
        assert_eq!(frame.width, 256);
        assert_eq!(frame.pixels.len(), 512 * 240);

        // Duplicated frame: null pointer leaves the stored frame alone
        unsafe { host_video_refresh(std::ptr::null(), 256, 240, 512) };
        assert_eq!(installed.ctx.video.frames_received(), 1);
    }

    #[test]
    fn test_audio_batch_routes_to_pipeline() {
        let _guard = SLOT.lock().unwrap();
        let installed = install_test_context();

        let samples = vec![0i16; 2048 * 2];
        let consumed = unsafe { host_audio_sample_batch(samples.as_ptr(), 2048) };
        assert_eq!(consumed, 2048);
        assert_eq!(installed.ctx.audio.in_flight(), 1);
        assert_eq!(installed.sink.pending_chunks(), 1);
    }

    #[test]
    fn test_input_poll_and_state_route() {
        let _guard = SLOT.lock().unwrap();
        let installed = install_test_context();

        installed.ctx.input.set_on_screen(JoypadButtons::START);
        unsafe { host_input_poll() };
        let pressed =
            unsafe { host_input_state(0, rk_abi::DEVICE_JOYPAD, 0, rk_abi::joypad::START) };
        assert_eq!(pressed, 1);
    }
}
