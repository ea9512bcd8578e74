//! Audio pipeline for the retrokit core host
//!
//! Accumulates PCM samples pushed from the core's audio callbacks, cuts
//! them into chunks, and streams them to an output device under bounded
//! backpressure. The producer path runs on the core's real-time execution
//! thread and never blocks: when the output queue is full, chunks are
//! dropped instead. That silent loss is the intended tradeoff, since
//! stalling the producer would stall the emulated system clock.

pub mod backend;
pub mod pipeline;

pub use backend::{CpalSink, NullSink, OutputSink};
pub use pipeline::{AudioChunk, AudioPipeline, ChunkDone};
