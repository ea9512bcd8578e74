//! Raw plugin interface for loaded emulation cores
//!
//! This crate mirrors the fixed, versioned C-callable interface a loaded
//! core exposes and consumes. Everything here is `#[repr(C)]` or a raw
//! function-pointer type; no host logic lives at this layer.
//!
//! The interface has two halves:
//! - entry points the host resolves from the core module (`retro_init`,
//!   `retro_run`, ...), typed as the `*Fn` aliases below;
//! - callbacks the host registers with the core (environment, video,
//!   audio, input), which the core invokes re-entrantly from `retro_run`.

use std::ffi::{c_char, c_void};

// ---------------------------------------------------------------------------
// Host callbacks registered with the core
// ---------------------------------------------------------------------------

/// Environment query: command code plus an in/out payload pointer.
pub type EnvironmentFn = unsafe extern "C" fn(cmd: u32, data: *mut c_void) -> bool;

/// Video refresh: framebuffer pointer, dimensions, and pitch in bytes.
/// The buffer is only valid for the duration of the call.
pub type VideoRefreshFn =
    unsafe extern "C" fn(data: *const c_void, width: u32, height: u32, pitch: usize);

/// Single interleaved stereo frame.
pub type AudioSampleFn = unsafe extern "C" fn(left: i16, right: i16);

/// Batch of interleaved stereo frames; returns the number of frames consumed.
pub type AudioSampleBatchFn = unsafe extern "C" fn(data: *const i16, frames: usize) -> usize;

/// Input latch point; called once per run invocation before state queries.
pub type InputPollFn = unsafe extern "C" fn();

/// Per-button/per-axis input query against the latched snapshot.
pub type InputStateFn = unsafe extern "C" fn(port: u32, device: u32, index: u32, id: u32) -> i16;

// ---------------------------------------------------------------------------
// Core entry points resolved by the loader
// ---------------------------------------------------------------------------

pub type InitFn = unsafe extern "C" fn();
pub type DeinitFn = unsafe extern "C" fn();
pub type SetEnvironmentFn = unsafe extern "C" fn(EnvironmentFn);
pub type SetVideoRefreshFn = unsafe extern "C" fn(VideoRefreshFn);
pub type SetAudioSampleFn = unsafe extern "C" fn(AudioSampleFn);
pub type SetAudioSampleBatchFn = unsafe extern "C" fn(AudioSampleBatchFn);
pub type SetInputPollFn = unsafe extern "C" fn(InputPollFn);
pub type SetInputStateFn = unsafe extern "C" fn(InputStateFn);
pub type LoadGameFn = unsafe extern "C" fn(info: *const GameInfo) -> bool;
pub type RunFn = unsafe extern "C" fn();
pub type GetSystemAvInfoFn = unsafe extern "C" fn(info: *mut SystemAvInfo);
pub type SerializeSizeFn = unsafe extern "C" fn() -> usize;
pub type SerializeFn = unsafe extern "C" fn(data: *mut c_void, size: usize) -> bool;
pub type UnserializeFn = unsafe extern "C" fn(data: *const c_void, size: usize) -> bool;
pub type GetMemoryDataFn = unsafe extern "C" fn(region: u32) -> *mut c_void;
pub type GetMemorySizeFn = unsafe extern "C" fn(region: u32) -> usize;
pub type SetControllerPortDeviceFn = unsafe extern "C" fn(port: u32, device: u32);

// ---------------------------------------------------------------------------
// Interface structs
// ---------------------------------------------------------------------------

/// Game description passed to `retro_load_game`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GameInfo {
    pub path: *const c_char,
    pub data: *const c_void,
    pub size: usize,
    pub meta: *const c_char,
}

/// Display geometry reported by the core
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct GameGeometry {
    pub base_width: u32,
    pub base_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub aspect_ratio: f32,
}

/// Timing reported by the core
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SystemTiming {
    /// Target frame rate of the emulated system
    pub fps: f64,
    /// Output sample rate in Hz
    pub sample_rate: f64,
}

impl Default for SystemTiming {
    fn default() -> Self {
        Self {
            fps: 60.0,
            sample_rate: 44100.0,
        }
    }
}

/// Audio/video parameters reported by `retro_get_system_av_info`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAvInfo {
    pub geometry: GameGeometry,
    pub timing: SystemTiming,
}

/// Key/value pair used by the `ENV_GET_VARIABLE` environment command.
///
/// The core fills `key`; the host answers by pointing `value` at an
/// address-stable C string it owns.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Variable {
    pub key: *const c_char,
    pub value: *const c_char,
}

// ---------------------------------------------------------------------------
// Environment command codes
// ---------------------------------------------------------------------------

/// Capability probe: can the host accept a duplicated (null) frame?
pub const ENV_GET_CAN_DUPE: u32 = 3;
/// Query the host-managed system/BIOS directory.
pub const ENV_GET_SYSTEM_DIRECTORY: u32 = 9;
/// Negotiate the framebuffer pixel format.
pub const ENV_SET_PIXEL_FORMAT: u32 = 10;
/// Per-title variable lookup.
pub const ENV_GET_VARIABLE: u32 = 16;
/// Query the host-managed save directory.
pub const ENV_GET_SAVE_DIRECTORY: u32 = 31;

// ---------------------------------------------------------------------------
// Pixel formats
// ---------------------------------------------------------------------------

/// Framebuffer pixel format negotiated via `ENV_SET_PIXEL_FORMAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 16-bit 5/6/5
    Rgb565,
    /// 32-bit with unused high byte
    Xrgb8888,
}

impl PixelFormat {
    /// Decode the raw format code from the environment payload.
    /// Returns `None` for formats the host does not support (e.g. 0RGB1555).
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(PixelFormat::Xrgb8888),
            2 => Some(PixelFormat::Rgb565),
            _ => None,
        }
    }

    /// Bytes per pixel in this format
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb565 => 2,
            PixelFormat::Xrgb8888 => 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Devices, buttons, memory regions
// ---------------------------------------------------------------------------

/// Joypad device id
pub const DEVICE_JOYPAD: u32 = 1;
/// Pointer/touch device id
pub const DEVICE_POINTER: u32 = 6;

/// Joypad button bit indices (the `id` argument of input-state queries)
pub mod joypad {
    pub const B: u32 = 0;
    pub const Y: u32 = 1;
    pub const SELECT: u32 = 2;
    pub const START: u32 = 3;
    pub const UP: u32 = 4;
    pub const DOWN: u32 = 5;
    pub const LEFT: u32 = 6;
    pub const RIGHT: u32 = 7;
    pub const A: u32 = 8;
    pub const X: u32 = 9;
    pub const L: u32 = 10;
    pub const R: u32 = 11;
    pub const L2: u32 = 12;
    pub const R2: u32 = 13;
    pub const L3: u32 = 14;
    pub const R3: u32 = 15;
}

/// Pointer device query ids
pub mod pointer {
    pub const X: u32 = 0;
    pub const Y: u32 = 1;
    pub const PRESSED: u32 = 2;
}

/// Battery-backed save RAM region id
pub const MEMORY_SAVE_RAM: u32 = 0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_codes() {
        assert_eq!(PixelFormat::from_raw(1), Some(PixelFormat::Xrgb8888));
        assert_eq!(PixelFormat::from_raw(2), Some(PixelFormat::Rgb565));
        // 0RGB1555 and anything unknown are unsupported
        assert_eq!(PixelFormat::from_raw(0), None);
        assert_eq!(PixelFormat::from_raw(99), None);
    }

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(PixelFormat::Rgb565.bytes_per_pixel(), 2);
        assert_eq!(PixelFormat::Xrgb8888.bytes_per_pixel(), 4);
    }

    #[test]
    fn test_av_info_defaults() {
        let info = SystemAvInfo::default();
        assert_eq!(info.timing.fps, 60.0);
        assert_eq!(info.timing.sample_rate, 44100.0);
        assert_eq!(info.geometry.base_width, 0);
    }
}
