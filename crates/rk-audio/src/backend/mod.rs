//! Output sinks
//!
//! The pipeline streams chunks to an `OutputSink`; the cpal implementation
//! drives a real device, the null implementation gives tests manual
//! control over completion timing.

pub mod cpal_sink;
pub mod null;

use rk_core::error::AudioError;

use crate::pipeline::{AudioChunk, ChunkDone};

/// An audio output device abstraction.
///
/// `enqueue` takes ownership of the chunk together with its completion
/// handle; the sink releases the handle once playback of that chunk is
/// finished (or the chunk is discarded). All methods may be called from
/// the core's execution thread and must not block on playback.
pub trait OutputSink: Send + Sync {
    /// Bring the device up at the given sample rate, tearing down any
    /// previous stream first.
    fn start(&self, sample_rate: u32) -> Result<(), AudioError>;

    /// Stop the device; pending chunks are discarded.
    fn stop(&self);

    /// Whether the device is currently running
    fn is_active(&self) -> bool;

    /// Hand a chunk to the device queue.
    fn enqueue(&self, chunk: AudioChunk, done: ChunkDone);
}

pub use cpal_sink::CpalSink;
pub use null::NullSink;
