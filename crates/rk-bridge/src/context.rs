//! Process-wide dispatch slot shared by the callback set

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};

use rk_audio::AudioPipeline;
use rk_input::InputAggregator;
use rk_video::VideoBridge;

use crate::environment::HostDirectories;
use crate::variables::VariableTable;

/// The slot the `extern "C"` callbacks resolve on every invocation
static HOST_CONTEXT: Lazy<RwLock<Option<Arc<HostContext>>>> = Lazy::new(|| RwLock::new(None));

/// Host services the core's callbacks are routed to.
///
/// Built once per session, installed before the core's init entry point
/// runs, and never replaced mid-session. The directory strings and
/// variable values inside stay address-stable for as long as the context
/// is installed, which is what lets the environment callback hand out raw
/// pointers to them.
pub struct HostContext {
    pub video: Arc<VideoBridge>,
    pub audio: Arc<AudioPipeline>,
    pub input: Arc<InputAggregator>,
    pub dirs: HostDirectories,
    pub variables: VariableTable,
    game_id: Mutex<String>,
}

impl HostContext {
    pub fn new(
        video: Arc<VideoBridge>,
        audio: Arc<AudioPipeline>,
        input: Arc<InputAggregator>,
        dirs: HostDirectories,
        variables: VariableTable,
    ) -> Self {
        Self {
            video,
            audio,
            input,
            dirs,
            variables,
            game_id: Mutex::new(String::from("UNKN")),
        }
    }

    /// Set the short game identifier derived from the loaded ROM header;
    /// keys the per-title variable overrides.
    pub fn set_game_id(&self, id: &str) {
        *self.game_id.lock() = id.to_string();
    }

    pub fn game_id(&self) -> String {
        self.game_id.lock().clone()
    }
}

/// Install the context the callbacks dispatch to.
///
/// Must happen before the core's init entry point is called, so the
/// callback set registered with the core is live from its first use.
pub fn install(ctx: Arc<HostContext>) {
    let mut slot = HOST_CONTEXT.write();
    if slot.is_some() {
        tracing::warn!("Replacing previously installed host context");
    }
    *slot = Some(ctx);
}

/// Remove the installed context; callbacks become inert.
pub fn clear() {
    *HOST_CONTEXT.write() = None;
}

/// Whether a context is currently installed
pub fn installed() -> bool {
    HOST_CONTEXT.read().is_some()
}

/// Run `f` against the installed context, or return `None` when the slot
/// is empty.
pub(crate) fn with<R>(f: impl FnOnce(&HostContext) -> R) -> Option<R> {
    HOST_CONTEXT.read().as_ref().map(|ctx| f(ctx))
}
