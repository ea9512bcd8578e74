//! Null output sink
//!
//! Accepts chunks without playing them and lets the caller drive
//! completion manually, which is exactly what the backpressure tests
//! need: a stalled device is simply a sink nobody completes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use parking_lot::Mutex;

use rk_core::error::AudioError;

use crate::backend::OutputSink;
use crate::pipeline::{AudioChunk, ChunkDone};

pub struct NullSink {
    active: AtomicBool,
    fail_start: AtomicBool,
    starts: AtomicUsize,
    last_rate: AtomicU32,
    pending: Mutex<VecDeque<(AudioChunk, ChunkDone)>>,
}

impl NullSink {
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            fail_start: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            last_rate: AtomicU32::new(0),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Make subsequent `start` calls fail, simulating a device owned by
    /// another process.
    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Successful starts since construction
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Sample rate passed to the most recent successful start
    pub fn last_sample_rate(&self) -> u32 {
        self.last_rate.load(Ordering::SeqCst)
    }

    /// Chunks enqueued and not yet completed or discarded
    pub fn pending_chunks(&self) -> usize {
        self.pending.lock().len()
    }

    /// Complete playback of the oldest pending chunk.
    pub fn complete_one(&self) -> bool {
        match self.pending.lock().pop_front() {
            Some((_, done)) => {
                done.complete();
                true
            }
            None => false,
        }
    }

    /// Complete playback of every pending chunk.
    pub fn complete_all(&self) {
        while self.complete_one() {}
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for NullSink {
    fn start(&self, sample_rate: u32) -> Result<(), AudioError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(AudioError::StreamStart("output device unavailable".into()));
        }
        self.active.store(true, Ordering::SeqCst);
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.last_rate.store(sample_rate, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn enqueue(&self, chunk: AudioChunk, done: ChunkDone) {
        self.pending.lock().push_back((chunk, done));
    }
}
