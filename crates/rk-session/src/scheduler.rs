//! The frame pump
//!
//! A single dedicated thread drives the core's run entry point once per
//! tick, paced to the core-reported frame rate. The core's reentrant
//! callbacks (video, audio producer, input) all execute on this thread,
//! which is what serializes them without any further locking.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
    Paused,
}

struct PumpShared {
    stop: AtomicBool,
    paused: AtomicBool,
    fast_forward: AtomicBool,
    ticks: AtomicU64,
}

/// Drives the core at real-time cadence with an integer fast-forward
/// multiplier.
pub struct ExecutionScheduler {
    multiplier: u32,
    shared: Arc<PumpShared>,
    thread: Option<JoinHandle<()>>,
}

impl ExecutionScheduler {
    pub fn new(fast_forward_multiplier: u32) -> Self {
        Self {
            multiplier: fast_forward_multiplier.max(1),
            shared: Arc::new(PumpShared {
                stop: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                fast_forward: AtomicBool::new(false),
                ticks: AtomicU64::new(0),
            }),
            thread: None,
        }
    }

    /// Start the pump at the core-reported frame rate.
    ///
    /// Ticks are paced to `target_fps` and never run uncapped, even when
    /// the host could go faster. Each tick issues one run invocation, or
    /// exactly the configured multiple under fast-forward. `run` must stay
    /// callable until `stop` returns, which the session guarantees by
    /// keeping the core module loaded.
    pub fn start(&mut self, target_fps: f64, run: rk_abi::RunFn) {
        if self.thread.is_some() {
            tracing::warn!("Frame pump already running, ignoring start");
            return;
        }

        let fps = if target_fps.is_finite() && target_fps >= 1.0 {
            target_fps
        } else {
            60.0
        };
        let period = Duration::from_secs_f64(1.0 / fps);
        tracing::info!("Starting frame pump at {:.2} fps", fps);

        self.shared.stop.store(false, Ordering::Release);
        self.shared.paused.store(false, Ordering::Release);
        self.shared.ticks.store(0, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let multiplier = self.multiplier;
        let thread = std::thread::Builder::new()
            .name("frame-pump".into())
            .spawn(move || pump_loop(shared, period, multiplier, run));

        match thread {
            Ok(handle) => self.thread = Some(handle),
            Err(e) => tracing::error!("Failed to spawn frame pump: {}", e),
        }
    }

    /// Suspend ticking without tearing the thread down.
    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
    }

    /// Resume ticking after a pause.
    pub fn resume(&self) {
        self.shared.paused.store(false, Ordering::Release);
    }

    /// Halt the pump and join the thread. No run invocation happens after
    /// this returns.
    pub fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::error!("Frame pump thread panicked");
            }
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.thread.is_none() {
            SchedulerState::Stopped
        } else if self.shared.paused.load(Ordering::Acquire) {
            SchedulerState::Paused
        } else {
            SchedulerState::Running
        }
    }

    /// Engage or release fast-forward; takes effect on the next tick.
    pub fn set_fast_forward(&self, on: bool) {
        self.shared.fast_forward.store(on, Ordering::Relaxed);
    }

    pub fn is_fast_forward(&self) -> bool {
        self.shared.fast_forward.load(Ordering::Relaxed)
    }

    /// Ticks completed since the last start
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Acquire)
    }
}

impl Drop for ExecutionScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn pump_loop(shared: Arc<PumpShared>, period: Duration, multiplier: u32, run: rk_abi::RunFn) {
    let mut next_tick = Instant::now();

    while !shared.stop.load(Ordering::Acquire) {
        if shared.paused.load(Ordering::Acquire) {
            std::thread::sleep(period);
            next_tick = Instant::now();
            continue;
        }

        // Fast-forward issues the burst back to back; audio backpressure
        // absorbs it downstream.
        let runs = if shared.fast_forward.load(Ordering::Relaxed) {
            multiplier
        } else {
            1
        };
        for _ in 0..runs {
            unsafe { run() };
        }
        shared.ticks.fetch_add(1, Ordering::Release);

        next_tick += period;
        let now = Instant::now();
        if next_tick > now {
            std::thread::sleep(next_tick - now);
        } else {
            // Fell behind; resynchronize instead of bursting to catch up
            next_tick = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_stopped() {
        let scheduler = ExecutionScheduler::new(3);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert!(!scheduler.is_fast_forward());
        assert_eq!(scheduler.ticks(), 0);
    }

    #[test]
    fn test_multiplier_floor_is_one() {
        let scheduler = ExecutionScheduler::new(0);
        assert_eq!(scheduler.multiplier, 1);
    }
}
