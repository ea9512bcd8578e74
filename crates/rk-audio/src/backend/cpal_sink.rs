//! cpal output sink
//!
//! The cpal stream handle is not `Send`, so a dedicated control thread
//! owns it for its whole lifetime and is commanded over a channel. The
//! stream's data callback (a cpal-owned thread) drains the shared chunk
//! queue; a chunk's completion handle drops when its last sample has been
//! consumed, which is what releases the in-flight slot in the pipeline.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, Stream, StreamConfig};
use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;

use rk_core::error::AudioError;

use crate::backend::OutputSink;
use crate::pipeline::{AudioChunk, ChunkDone};

struct PendingChunk {
    samples: Vec<f32>,
    cursor: usize,
    // Dropped (and therefore completed) when the chunk is fully consumed
    _done: ChunkDone,
}

type ChunkQueue = Arc<Mutex<VecDeque<PendingChunk>>>;

enum Command {
    Start {
        sample_rate: u32,
        reply: Sender<Result<(), AudioError>>,
    },
    Stop,
    Shutdown,
}

pub struct CpalSink {
    commands: Sender<Command>,
    active: Arc<AtomicBool>,
    queue: ChunkQueue,
    control: Option<JoinHandle<()>>,
}

impl CpalSink {
    pub fn new() -> Self {
        let (commands, command_rx) = unbounded();
        let active = Arc::new(AtomicBool::new(false));
        let queue: ChunkQueue = Arc::new(Mutex::new(VecDeque::new()));

        let thread_active = Arc::clone(&active);
        let thread_queue = Arc::clone(&queue);
        let control = std::thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || control_loop(command_rx, thread_queue, thread_active))
            .ok();

        Self {
            commands,
            active,
            queue,
            control,
        }
    }
}

impl Default for CpalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for CpalSink {
    fn start(&self, sample_rate: u32) -> Result<(), AudioError> {
        let (reply, result) = bounded(1);
        self.commands
            .send(Command::Start { sample_rate, reply })
            .map_err(|_| AudioError::StreamStart("audio control thread gone".into()))?;
        result
            .recv()
            .map_err(|_| AudioError::StreamStart("audio control thread gone".into()))?
    }

    fn stop(&self) {
        let _ = self.commands.send(Command::Stop);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn enqueue(&self, chunk: AudioChunk, done: ChunkDone) {
        self.queue.lock().push_back(PendingChunk {
            samples: chunk.samples,
            cursor: 0,
            _done: done,
        });
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.control.take() {
            let _ = handle.join();
        }
    }
}

fn control_loop(commands: Receiver<Command>, queue: ChunkQueue, active: Arc<AtomicBool>) {
    let mut stream: Option<Stream> = None;

    while let Ok(command) = commands.recv() {
        match command {
            Command::Start { sample_rate, reply } => {
                // Tear down any previous stream before bringing up the new
                // route; exactly one output graph at a time.
                stream = None;
                active.store(false, Ordering::Release);

                match open_stream(sample_rate, Arc::clone(&queue)) {
                    Ok(s) => {
                        stream = Some(s);
                        active.store(true, Ordering::Release);
                        let _ = reply.send(Ok(()));
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                }
            }
            Command::Stop => {
                if stream.take().is_some() {
                    tracing::info!("Audio stream stopped");
                }
                active.store(false, Ordering::Release);
                // Pending completions fire as the queued chunks drop
                queue.lock().clear();
            }
            Command::Shutdown => break,
        }
    }

    drop(stream);
    active.store(false, Ordering::Release);
}

fn open_stream(sample_rate: u32, queue: ChunkQueue) -> Result<Stream, AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::NoOutputDevice)?;
    tracing::info!(
        "Audio device: {}",
        device.name().unwrap_or_else(|_| "unknown".to_string())
    );

    let config = StreamConfig {
        channels: 2,
        sample_rate: SampleRate(sample_rate),
        buffer_size: BufferSize::Default,
    };

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                fill_output(&queue, data);
            },
            |err| {
                tracing::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AudioError::StreamStart(e.to_string()))?;

    tracing::info!("Audio stream started at {} Hz", sample_rate);
    Ok(stream)
}

/// Copy queued samples into the device buffer, padding with silence when
/// the queue runs dry.
fn fill_output(queue: &Mutex<VecDeque<PendingChunk>>, data: &mut [f32]) {
    let mut queue = queue.lock();
    for sample in data.iter_mut() {
        *sample = loop {
            match queue.front_mut() {
                None => break 0.0,
                Some(chunk) if chunk.cursor < chunk.samples.len() => {
                    let s = chunk.samples[chunk.cursor];
                    chunk.cursor += 1;
                    break s;
                }
                // Exhausted; dropping it releases the in-flight slot
                Some(_) => {
                    queue.pop_front();
                }
            }
        };
    }
}
