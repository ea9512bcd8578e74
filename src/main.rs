//! retrokit - host for dynamically loaded emulation cores
//!
//! Loads the core module, wires its callbacks into the host services, and
//! drives a game session from the command line.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use rk_audio::{CpalSink, NullSink, OutputSink};
use rk_core::HostConfig;
use rk_loader::CoreLoader;
use rk_session::GameSession;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let rom_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: retrokit <rom>")?;

    let config = HostConfig::load()
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;

    let sink: Arc<dyn OutputSink> = if config.audio.enable {
        Arc::new(CpalSink::new())
    } else {
        Arc::new(NullSink::new())
    };

    // The callback context must be live before the core is initialized
    let context = rk_session::build_context(&config, sink);
    rk_bridge::install(Arc::clone(&context));

    let module = CoreLoader::load(&config.core.candidate_paths, rk_bridge::callbacks())?;
    let mut session = GameSession::new(*module.symbols(), context, &config);
    session.load_game(&rom_path)?;

    tracing::info!("Running {} - p pause, r resume, f fast-forward, s save, l load, q quit", rom_path.display());
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        match line?.trim() {
            "p" => session.pause()?,
            "r" => session.resume()?,
            "f" => session.set_fast_forward(!session.is_fast_forward()),
            "s" => match session.save_state(0) {
                Ok(path) => tracing::info!("State saved to {}", path.display()),
                Err(e) => tracing::error!("Save state failed: {}", e),
            },
            "l" => {
                if let Err(e) = session.load_state(0) {
                    tracing::error!("Load state failed: {}", e);
                }
            }
            "q" => break,
            "" => {}
            other => tracing::warn!("Unknown command: {}", other),
        }
    }

    session.stop()?;
    Ok(())
}
