//! cpal-backed output and capture devices
//!
//! cpal streams are not `Send` on every host, so each stream lives on its own
//! thread for its whole life. The owning handle talks to that thread through
//! a shutdown channel; audio crosses between the threads over rtrb SPSC rings
//! so the real-time callbacks never take a lock.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::mpsc;
use std::sync::Mutex;
use std::thread::JoinHandle;

use super::input::{AudioInput, FrameWindow, InputStream};
use super::output::AudioOutput;
use crate::config::AudioConfig;
use crate::error::AudioError;

/// Bursts that may sound at the same time in the output callback
const MAX_VOICES: usize = 16;

fn open_failed(context: &str, err: impl std::fmt::Display) -> AudioError {
    let details = err.to_string();
    if details.to_lowercase().contains("permission") {
        AudioError::PermissionDenied
    } else {
        AudioError::StreamOpenFailed {
            reason: format!("{}: {}", context, details),
        }
    }
}

/// Thread that owns a running cpal stream until told to stop
struct StreamThread {
    shutdown: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl StreamThread {
    /// Spawn `build` on a new thread and wait for it to report the stream's sample rate.
    fn spawn<F>(name: &str, build: F) -> Result<(Self, u32), AudioError>
    where
        F: FnOnce() -> Result<(cpal::Stream, u32), AudioError> + Send + 'static,
    {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, AudioError>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || match build() {
                Ok((stream, sample_rate)) => {
                    if let Err(e) = stream.play() {
                        let _ = ready_tx.send(Err(AudioError::HardwareError {
                            details: format!("Stream start failed: {}", e),
                        }));
                        return;
                    }
                    let _ = ready_tx.send(Ok(sample_rate));
                    // Blocks until the handle is dropped or signals shutdown
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })?;

        let sample_rate = ready_rx.recv().map_err(|_| AudioError::StreamFailure {
            reason: format!("{} exited before reporting", name),
        })??;

        Ok((
            Self {
                shutdown: shutdown_tx,
                handle: Some(handle),
            },
            sample_rate,
        ))
    }
}

impl Drop for StreamThread {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct Voice {
    samples: Vec<f32>,
    position: usize,
}

struct OutputQueues {
    bursts: Producer<Vec<f32>>,
    spent: Consumer<Vec<f32>>,
}

/// Default output device mixing queued click bursts
pub struct CpalOutput {
    queues: Mutex<OutputQueues>,
    sample_rate: u32,
    _thread: StreamThread,
}

impl CpalOutput {
    pub fn open(config: &AudioConfig) -> Result<Self, AudioError> {
        let (bursts, incoming) = RingBuffer::<Vec<f32>>::new(config.output_queue_len.max(1));
        let (spent_tx, spent) = RingBuffer::<Vec<f32>>::new(config.output_queue_len.max(1));

        let (thread, sample_rate) = StreamThread::spawn("practice-output", move || {
            build_output_stream(incoming, spent_tx)
        })?;

        log::info!("[CpalOutput] Output stream running at {} Hz", sample_rate);
        Ok(Self {
            queues: Mutex::new(OutputQueues { bursts, spent }),
            sample_rate,
            _thread: thread,
        })
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn submit(&self, burst: Vec<f32>) {
        let Ok(mut queues) = self.queues.lock() else {
            return;
        };
        // Finished bursts come back here so the callback never deallocates
        while queues.spent.pop().is_ok() {}
        if queues.bursts.push(burst).is_err() {
            tracing::debug!("[CpalOutput] Burst queue full, dropping click");
        }
    }
}

fn build_output_stream(
    mut incoming: Consumer<Vec<f32>>,
    mut spent: Producer<Vec<f32>>,
) -> Result<(cpal::Stream, u32), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::StreamOpenFailed {
            reason: "No default output device found".to_string(),
        })?;

    let config = device
        .default_output_config()
        .map_err(|e| open_failed("Failed to get default output config", e))?;

    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(AudioError::StreamOpenFailed {
            reason: "Only F32 sample format is currently supported for output".to_string(),
        });
    }

    let stream_config: cpal::StreamConfig = config.into();
    let channels = stream_config.channels as usize;
    let sample_rate = stream_config.sample_rate.0;
    let mut voices: Vec<Voice> = Vec::with_capacity(MAX_VOICES);

    let err_fn = |err| log::error!("[CpalOutput] Output stream error: {}", err);

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                while let Ok(samples) = incoming.pop() {
                    if voices.len() < MAX_VOICES {
                        voices.push(Voice {
                            samples,
                            position: 0,
                        });
                    } else {
                        let _ = spent.push(samples);
                    }
                }

                for frame in data.chunks_mut(channels) {
                    let mut mix = 0.0;
                    for voice in voices.iter_mut() {
                        if let Some(&s) = voice.samples.get(voice.position) {
                            mix += s;
                            voice.position += 1;
                        }
                    }
                    let mix = mix.clamp(-1.0, 1.0);
                    for out in frame.iter_mut() {
                        *out = mix;
                    }
                }

                let mut i = 0;
                while i < voices.len() {
                    if voices[i].position >= voices[i].samples.len() {
                        let voice = voices.swap_remove(i);
                        let _ = spent.push(voice.samples);
                    } else {
                        i += 1;
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| open_failed("Failed to build output stream", e))?;

    Ok((stream, sample_rate))
}

/// Default capture device
pub struct CpalInput {
    ring_len: usize,
    frame_size: usize,
}

impl CpalInput {
    pub fn new(config: &AudioConfig, frame_size: usize) -> Self {
        Self {
            ring_len: config.input_ring_len.max(frame_size),
            frame_size,
        }
    }
}

impl AudioInput for CpalInput {
    fn open(&self) -> Result<Box<dyn InputStream>, AudioError> {
        let (producer, consumer) = RingBuffer::<f32>::new(self.ring_len);
        let (thread, sample_rate) =
            StreamThread::spawn("practice-input", move || build_input_stream(producer))?;

        log::info!("[CpalInput] Capture stream running at {} Hz", sample_rate);
        Ok(Box::new(CpalInputStream {
            consumer,
            window: FrameWindow::new(self.frame_size),
            sample_rate,
            _thread: thread,
        }))
    }
}

struct CpalInputStream {
    consumer: Consumer<f32>,
    window: FrameWindow,
    sample_rate: u32,
    _thread: StreamThread,
}

impl InputStream for CpalInputStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_frame(&mut self, frame: &mut [f32]) -> bool {
        let available = self.consumer.slots();
        if available > 0 {
            if let Ok(chunk) = self.consumer.read_chunk(available) {
                let (first, second) = chunk.as_slices();
                self.window.extend_from_slice(first);
                self.window.extend_from_slice(second);
                chunk.commit_all();
            }
        }
        self.window.copy_latest(frame)
    }
}

fn build_input_stream(mut producer: Producer<f32>) -> Result<(cpal::Stream, u32), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| AudioError::StreamOpenFailed {
            reason: "No default input device found".to_string(),
        })?;

    let config = device
        .default_input_config()
        .map_err(|e| open_failed("Failed to get default input config", e))?;

    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(AudioError::StreamOpenFailed {
            reason: "Only F32 sample format is currently supported for input".to_string(),
        });
    }

    let stream_config: cpal::StreamConfig = config.into();
    let channels = stream_config.channels as usize;
    let sample_rate = stream_config.sample_rate.0;

    let err_fn = |err| log::error!("[CpalInput] Input stream error: {}", err);

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Keep the first channel; a full ring drops the newest samples
                for frame in data.chunks(channels) {
                    if let Some(&s) = frame.first() {
                        let _ = producer.push(s);
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| open_failed("Failed to build input stream", e))?;

    Ok((stream, sample_rate))
}
