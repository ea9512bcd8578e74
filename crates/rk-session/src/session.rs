//! Session lifecycle
//!
//! Orchestrates a loaded game across the host services: maps the ROM,
//! feeds it to the core, restores battery RAM, brings up audio output at
//! the core-reported sample rate, and drives the frame pump at the
//! core-reported frame rate. All state transitions are host-driven; the
//! core never changes the session state on its own.

use std::ffi::{c_void, CString};
use std::path::Path;
use std::sync::Arc;

use rk_audio::{AudioPipeline, OutputSink};
use rk_bridge::{HostContext, HostDirectories, VariableTable};
use rk_core::config::HostConfig;
use rk_core::error::SessionError;
use rk_input::InputAggregator;
use rk_loader::CoreSymbols;
use rk_video::VideoBridge;

use crate::rom::RomImage;
use crate::scheduler::ExecutionScheduler;
use crate::state::StateManager;

/// Lifecycle state of the session, host-driven only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No game loaded
    Unloaded,
    /// Game loaded, frame pump and audio torn down
    Loaded,
    /// Frame pump and audio active
    Running,
    /// Game loaded, pump suspended without teardown
    Paused,
}

/// Build the host services the core's callbacks route to.
///
/// The returned context must be installed into the bridge before the core
/// module is loaded, so the callback set registered with the core is live
/// from its first use.
pub fn build_context(config: &HostConfig, sink: Arc<dyn OutputSink>) -> Arc<HostContext> {
    Arc::new(HostContext::new(
        Arc::new(VideoBridge::new()),
        Arc::new(AudioPipeline::new(&config.audio, sink)),
        Arc::new(InputAggregator::new()),
        HostDirectories::new(
            config.paths.system_dir.clone(),
            config.paths.save_dir.clone(),
        ),
        VariableTable::builtin(),
    ))
}

/// One loaded game driven against a loaded core.
///
/// Holds the mapped ROM for the whole session; the core reads from the
/// mapping until the next load or teardown. The core module itself is
/// owned elsewhere and outlives every session.
pub struct GameSession {
    symbols: CoreSymbols,
    context: Arc<HostContext>,
    scheduler: ExecutionScheduler,
    states: StateManager,
    rom: Option<RomImage>,
    sample_rate: u32,
    state: SessionState,
}

impl GameSession {
    pub fn new(symbols: CoreSymbols, context: Arc<HostContext>, config: &HostConfig) -> Self {
        Self {
            symbols,
            context,
            scheduler: ExecutionScheduler::new(config.runner.fast_forward_multiplier),
            states: StateManager::new(
                symbols,
                config.paths.save_dir.clone(),
                config.paths.state_dir.clone(),
            ),
            rom: None,
            sample_rate: 0,
            state: SessionState::Unloaded,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Load a game and start running it.
    ///
    /// Any running session is stopped first (with its battery RAM
    /// flushed). The sequencing after the ROM is mapped is fixed: game id
    /// → controller port → core load-game → battery restore → av-info →
    /// audio → frame pump.
    pub fn load_game(&mut self, path: &Path) -> rk_core::Result<()> {
        self.stop()?;

        let rom = RomImage::open(path)?;
        self.context.set_game_id(rom.game_id());

        if let Some(set_port) = self.symbols.set_controller_port_device {
            unsafe { set_port(0, rk_abi::DEVICE_JOYPAD) };
        }

        let c_path = CString::new(path.to_string_lossy().as_bytes()).ok();
        let info = rk_abi::GameInfo {
            path: c_path
                .as_ref()
                .map_or(std::ptr::null(), |p| p.as_ptr()),
            data: rom.data().as_ptr() as *const c_void,
            size: rom.data().len(),
            meta: std::ptr::null(),
        };
        let accepted = unsafe { (self.symbols.load_game)(&info) };
        if !accepted {
            return Err(SessionError::GameRejected(path.to_path_buf()).into());
        }

        self.states.load_battery(&rom.stem())?;

        let mut av = rk_abi::SystemAvInfo::default();
        unsafe { (self.symbols.get_system_av_info)(&mut av) };
        tracing::info!(
            "Core reports {:.2} fps, {} Hz, {}x{}",
            av.timing.fps,
            av.timing.sample_rate,
            av.geometry.base_width,
            av.geometry.base_height
        );

        self.sample_rate = av.timing.sample_rate as u32;
        if let Err(e) = self.context.audio.start(self.sample_rate) {
            // The pipeline retries lazily on the next ready chunk; the
            // session runs on without audio until then.
            tracing::warn!("Audio output failed to start: {}", e);
        }
        self.scheduler.start(av.timing.fps, self.symbols.run);

        self.rom = Some(rom);
        self.state = SessionState::Running;
        Ok(())
    }

    /// Suspend the frame pump and audio output, keeping the core loaded.
    ///
    /// Battery RAM is flushed since the host cannot know how long the
    /// pause will last.
    pub fn pause(&mut self) -> rk_core::Result<()> {
        match self.state {
            SessionState::Unloaded => return Err(SessionError::NoGameLoaded.into()),
            SessionState::Running => {}
            _ => return Ok(()),
        }

        self.states.flush_battery(&self.rom_stem()?)?;
        self.scheduler.pause();
        self.context.audio.stop();
        self.state = SessionState::Paused;
        tracing::info!("Session paused");
        Ok(())
    }

    /// Restart the frame pump and audio output after a pause, without
    /// reloading anything.
    pub fn resume(&mut self) -> rk_core::Result<()> {
        match self.state {
            SessionState::Unloaded => return Err(SessionError::NoGameLoaded.into()),
            SessionState::Paused => {}
            _ => return Ok(()),
        }

        if let Err(e) = self.context.audio.start(self.sample_rate) {
            tracing::warn!("Audio output failed to restart: {}", e);
        }
        self.scheduler.resume();
        self.state = SessionState::Running;
        tracing::info!("Session resumed");
        Ok(())
    }

    /// Tear down the frame pump and audio output, keeping the game and
    /// the core module loaded.
    ///
    /// Battery RAM is flushed before the pump is halted, so persistent
    /// save data survives even an abrupt teardown.
    pub fn stop(&mut self) -> rk_core::Result<()> {
        if !matches!(self.state, SessionState::Running | SessionState::Paused) {
            return Ok(());
        }

        self.states.flush_battery(&self.rom_stem()?)?;
        self.scheduler.stop();
        self.context.audio.stop();
        self.state = SessionState::Loaded;
        tracing::info!("Session stopped");
        Ok(())
    }

    /// Engage or release fast-forward; while engaged each tick issues the
    /// configured multiple of run invocations.
    pub fn set_fast_forward(&self, on: bool) {
        self.scheduler.set_fast_forward(on);
    }

    pub fn is_fast_forward(&self) -> bool {
        self.scheduler.is_fast_forward()
    }

    /// Snapshot the core state into a file slot for this ROM.
    pub fn save_state(&self, slot: u32) -> rk_core::Result<std::path::PathBuf> {
        self.states.save_state_file(&self.rom_stem()?, slot)
    }

    /// Restore the core state from a file slot for this ROM.
    pub fn load_state(&self, slot: u32) -> rk_core::Result<()> {
        self.states.load_state_file(&self.rom_stem()?, slot)
    }

    /// The state manager, for direct capture/restore of in-memory blobs
    pub fn states(&self) -> &StateManager {
        &self.states
    }

    /// Forward an OS audio-route change to the pipeline.
    pub fn handle_audio_route_change(&self) {
        self.context.audio.handle_route_change();
    }

    /// Forward an OS audio interruption to the pipeline.
    pub fn handle_audio_interruption(&self, ended: bool) {
        self.context.audio.handle_interruption(ended);
    }

    fn rom_stem(&self) -> Result<String, SessionError> {
        self.rom
            .as_ref()
            .map(|rom| rom.stem())
            .ok_or(SessionError::NoGameLoaded)
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!("Session teardown failed: {}", e);
        }
    }
}
