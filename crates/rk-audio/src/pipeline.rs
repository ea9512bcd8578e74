//! Sample accumulation, chunking and backpressure
//!
//! One lock guards the small bookkeeping shared between the producer (the
//! core's execution thread, via the audio callbacks) and the consumer (the
//! output sink's completion path, on a device-owned thread). Everything
//! heavier than bookkeeping happens outside the lock.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use rk_core::config::AudioConfig;
use rk_core::error::AudioError;

use crate::backend::OutputSink;

const PCM_SCALE: f32 = 1.0 / 32768.0;

/// A snapshot drained from the accumulator, converted to the output
/// device's native format. Interleaved stereo `f32`.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub frames: usize,
}

struct Book {
    /// Interleaved stereo i16 samples awaiting the chunk threshold
    accumulator: Vec<i16>,
    /// Chunks enqueued for playback but not yet completed
    in_flight: usize,
}

struct Shared {
    book: Mutex<Book>,
    /// Chunks discarded by backpressure; diagnostic only, never reported
    /// on the producer path
    dropped: AtomicU64,
}

/// Completion handle passed to the sink alongside each chunk.
///
/// The in-flight slot is released when this handle drops, so a sink that
/// discards a chunk (teardown, queue clear) releases it the same way as
/// one that finishes playback. `complete` names the intent at call sites.
pub struct ChunkDone {
    shared: Arc<Shared>,
}

impl ChunkDone {
    pub fn complete(self) {}
}

impl Drop for ChunkDone {
    fn drop(&mut self) {
        let mut book = self.shared.book.lock();
        book.in_flight = book.in_flight.saturating_sub(1);
    }
}

/// The audio pipeline: accumulator, chunking, bounded in-flight queue and
/// route-change recovery. Constructed once per session with its output
/// sink injected.
pub struct AudioPipeline {
    shared: Arc<Shared>,
    sink: Arc<dyn OutputSink>,
    chunk_frames: usize,
    max_in_flight: usize,
    volume: f32,
    settle: Duration,
    /// Output sample rate; 0 until `start` configures it
    sample_rate: AtomicU32,
    /// Coalesces overlapping route-change notifications into one restart
    restart_generation: Arc<AtomicU64>,
}

impl AudioPipeline {
    pub fn new(config: &AudioConfig, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                book: Mutex::new(Book {
                    accumulator: Vec::new(),
                    in_flight: 0,
                }),
                dropped: AtomicU64::new(0),
            }),
            sink,
            chunk_frames: config.chunk_frames.max(1),
            max_in_flight: config.max_in_flight.max(1),
            volume: config.volume.clamp(0.0, 1.0),
            settle: Duration::from_millis(config.route_settle_ms),
            sample_rate: AtomicU32::new(0),
            restart_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start the output device at the given sample rate.
    ///
    /// Resets the accumulator and in-flight bookkeeping so a fresh session
    /// never replays stale audio.
    pub fn start(&self, sample_rate: u32) -> Result<(), AudioError> {
        {
            let mut book = self.shared.book.lock();
            book.accumulator.clear();
            book.in_flight = 0;
        }
        self.sample_rate.store(sample_rate, Ordering::Relaxed);
        self.sink.start(sample_rate)
    }

    /// Stop the output device; accumulated bookkeeping is reset on the
    /// next `start`.
    pub fn stop(&self) {
        self.sink.stop();
    }

    /// Whether the output device is currently running
    pub fn is_active(&self) -> bool {
        self.sink.is_active()
    }

    /// Producer path for the single-frame audio callback
    pub fn push_frame(&self, left: i16, right: i16) {
        self.push_samples(&[left, right]);
    }

    /// Producer path for the batch audio callback.
    ///
    /// Appends under the lock and returns below the chunk threshold. At
    /// the threshold the accumulator is snapshotted and cleared; if the
    /// in-flight bound is already reached the snapshot is discarded, never
    /// enqueued and never waited on. Conversion and enqueue happen outside
    /// the lock.
    pub fn push_samples(&self, samples: &[i16]) {
        if samples.is_empty() {
            return;
        }

        let pending = {
            let mut book = self.shared.book.lock();
            book.accumulator.extend_from_slice(samples);
            if book.accumulator.len() < self.chunk_frames * 2 {
                return;
            }

            let snapshot = book.accumulator.clone();
            book.accumulator.clear();

            if book.in_flight >= self.max_in_flight {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
            book.in_flight += 1;
            snapshot
        };

        let chunk = convert(&pending, self.volume);

        if !self.sink.is_active() {
            let rate = self.sample_rate.load(Ordering::Relaxed);
            let started = rate != 0 && self.sink.start(rate).is_ok();
            if !started {
                // Skip playback for this cycle rather than retry here; the
                // next ready chunk attempts the start again.
                let mut book = self.shared.book.lock();
                book.in_flight = book.in_flight.saturating_sub(1);
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Output sink unavailable, skipping chunk");
                return;
            }
        }

        self.sink.enqueue(
            chunk,
            ChunkDone {
                shared: Arc::clone(&self.shared),
            },
        );
    }

    /// Chunks enqueued but not yet completed
    pub fn in_flight(&self) -> usize {
        self.shared.book.lock().in_flight
    }

    /// Chunks discarded by backpressure since construction
    pub fn dropped_chunks(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// React to an OS audio-route change (device plugged/unplugged,
    /// output category change).
    ///
    /// Idempotent: overlapping notifications coalesce into a single
    /// restart, scheduled after a settling delay so the OS can finish
    /// route negotiation first.
    pub fn handle_route_change(&self) {
        if self.sample_rate.load(Ordering::Relaxed) == 0 {
            return;
        }
        tracing::info!("Audio route change, restarting output after settle delay");
        self.schedule_restart();
    }

    /// React to an OS audio interruption. The device pauses output itself
    /// when the interruption begins; only the end triggers a restart.
    pub fn handle_interruption(&self, ended: bool) {
        if !ended || self.sample_rate.load(Ordering::Relaxed) == 0 {
            return;
        }
        tracing::info!("Audio interruption ended, restarting output");
        self.schedule_restart();
    }

    fn schedule_restart(&self) {
        let generation = self.restart_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generations = Arc::clone(&self.restart_generation);
        let sink = Arc::clone(&self.sink);
        let rate = self.sample_rate.load(Ordering::Relaxed);
        let settle = self.settle;

        std::thread::spawn(move || {
            std::thread::sleep(settle);
            // A newer notification supersedes this one
            if generations.load(Ordering::SeqCst) != generation {
                return;
            }
            sink.stop();
            if let Err(e) = sink.start(rate) {
                tracing::warn!("Output restart after route change failed: {}", e);
            }
        });
    }
}

fn convert(samples: &[i16], volume: f32) -> AudioChunk {
    let gain = PCM_SCALE * volume;
    AudioChunk {
        frames: samples.len() / 2,
        samples: samples.iter().map(|&s| f32::from(s) * gain).collect(),
    }
}
