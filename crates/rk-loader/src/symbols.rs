//! Typed entry-point table resolved from the core module
//!
//! The plugin interface is a flat set of C symbols. Rather than looking
//! symbols up ad hoc at call time, the whole table is resolved once at load
//! and stored as typed function pointers: required entry points are plain
//! fields, optional ones are `Option` and checked at their call sites.

use std::ffi::c_void;

use rk_core::error::LoadError;

/// Source of raw symbol addresses.
///
/// Implemented by the dynamic library handle in production and by an
/// in-memory table in tests, so symbol-resolution behavior can be exercised
/// without building a core binary.
pub trait SymbolSource {
    /// Look up a symbol by name; `None` when the symbol is absent.
    fn address_of(&self, name: &str) -> Option<*const c_void>;
}

impl SymbolSource for libloading::Library {
    fn address_of(&self, name: &str) -> Option<*const c_void> {
        unsafe {
            self.get::<unsafe extern "C" fn()>(name.as_bytes())
                .ok()
                .map(|sym| *sym as *const c_void)
        }
    }
}

/// Reinterpret a resolved address as a typed function pointer.
///
/// Safety: the caller must name a symbol whose C signature matches `F`;
/// the interface contract fixes those signatures per symbol name.
unsafe fn cast_entry<F: Copy>(addr: *const c_void) -> F {
    std::mem::transmute_copy(&addr)
}

fn required<F: Copy>(
    source: &dyn SymbolSource,
    name: &'static str,
) -> Result<F, LoadError> {
    match source.address_of(name).filter(|addr| !addr.is_null()) {
        Some(addr) => Ok(unsafe { cast_entry(addr) }),
        None => Err(LoadError::MissingSymbol(name)),
    }
}

fn optional<F: Copy>(source: &dyn SymbolSource, name: &'static str) -> Option<F> {
    let entry = source
        .address_of(name)
        .filter(|addr| !addr.is_null())
        .map(|addr| unsafe { cast_entry(addr) });
    if entry.is_none() {
        tracing::debug!("Optional symbol not exported by core: {}", name);
    }
    entry
}

/// The core's entry points, resolved once at load time
#[derive(Clone, Copy, Debug)]
pub struct CoreSymbols {
    pub init: rk_abi::InitFn,
    pub deinit: rk_abi::DeinitFn,
    pub set_environment: rk_abi::SetEnvironmentFn,
    pub set_video_refresh: rk_abi::SetVideoRefreshFn,
    pub set_audio_sample: rk_abi::SetAudioSampleFn,
    pub set_audio_sample_batch: rk_abi::SetAudioSampleBatchFn,
    pub set_input_poll: rk_abi::SetInputPollFn,
    pub set_input_state: rk_abi::SetInputStateFn,
    pub load_game: rk_abi::LoadGameFn,
    pub run: rk_abi::RunFn,
    pub get_system_av_info: rk_abi::GetSystemAvInfoFn,

    // Optional entry points, individually nullable
    pub serialize_size: Option<rk_abi::SerializeSizeFn>,
    pub serialize: Option<rk_abi::SerializeFn>,
    pub unserialize: Option<rk_abi::UnserializeFn>,
    pub get_memory_data: Option<rk_abi::GetMemoryDataFn>,
    pub get_memory_size: Option<rk_abi::GetMemorySizeFn>,
    pub set_controller_port_device: Option<rk_abi::SetControllerPortDeviceFn>,
}

impl CoreSymbols {
    /// Resolve the full entry-point table.
    ///
    /// Fails on the first missing required symbol; the core is untouched
    /// (in particular, not initialized) when this returns an error.
    pub fn resolve(source: &dyn SymbolSource) -> Result<Self, LoadError> {
        Ok(Self {
            init: required(source, "retro_init")?,
            deinit: required(source, "retro_deinit")?,
            set_environment: required(source, "retro_set_environment")?,
            set_video_refresh: required(source, "retro_set_video_refresh")?,
            set_audio_sample: required(source, "retro_set_audio_sample")?,
            set_audio_sample_batch: required(source, "retro_set_audio_sample_batch")?,
            set_input_poll: required(source, "retro_set_input_poll")?,
            set_input_state: required(source, "retro_set_input_state")?,
            load_game: required(source, "retro_load_game")?,
            run: required(source, "retro_run")?,
            get_system_av_info: required(source, "retro_get_system_av_info")?,

            serialize_size: optional(source, "retro_serialize_size"),
            serialize: optional(source, "retro_serialize"),
            unserialize: optional(source, "retro_unserialize"),
            get_memory_data: optional(source, "retro_get_memory_data"),
            get_memory_size: optional(source, "retro_get_memory_size"),
            set_controller_port_device: optional(source, "retro_set_controller_port_device"),
        })
    }

    /// Whether the core exposes the save-state pair
    pub fn supports_save_states(&self) -> bool {
        self.serialize_size.is_some() && self.serialize.is_some() && self.unserialize.is_some()
    }

    /// Whether the core exposes memory-region access
    pub fn supports_memory_regions(&self) -> bool {
        self.get_memory_data.is_some() && self.get_memory_size.is_some()
    }
}

/// The host callback set registered with the core before init.
///
/// These must be address-stable free functions; the interface offers no way
/// to pass context, so each callback routes through the process-wide
/// dispatch slot on the bridge side.
#[derive(Clone, Copy)]
pub struct HostCallbacks {
    pub environment: rk_abi::EnvironmentFn,
    pub video_refresh: rk_abi::VideoRefreshFn,
    pub audio_sample: rk_abi::AudioSampleFn,
    pub audio_sample_batch: rk_abi::AudioSampleBatchFn,
    pub input_poll: rk_abi::InputPollFn,
    pub input_state: rk_abi::InputStateFn,
}
