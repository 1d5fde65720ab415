//! Test doubles for the audio devices and the wall clock.
//!
//! Used by the unit tests, the integration tests under `tests/`, and by the
//! CLI when no sound card is present.

use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio::{AudioInput, AudioOutput, InputStream};
use crate::error::AudioError;
use crate::presets::WallClock;

/// Output that keeps every submitted burst.
pub struct RecordingOutput {
    sample_rate: u32,
    available: bool,
    bursts: Mutex<Vec<Vec<f32>>>,
}

impl RecordingOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            available: true,
            bursts: Mutex::new(Vec::new()),
        }
    }

    /// An output whose device is closed; nothing is ever recorded.
    pub fn unavailable(sample_rate: u32) -> Self {
        Self {
            available: false,
            ..Self::new(sample_rate)
        }
    }

    pub fn bursts(&self) -> Vec<Vec<f32>> {
        self.bursts.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.bursts.lock().map(|b| b.len()).unwrap_or(0)
    }
}

impl AudioOutput for RecordingOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn submit(&self, burst: Vec<f32>) {
        if let Ok(mut bursts) = self.bursts.lock() {
            bursts.push(burst);
        }
    }
}

#[derive(Clone, Copy)]
enum Signal {
    Sine { frequency_hz: f32, amplitude: f32 },
    Silence,
}

/// Microphone stand-in producing a steady sine or silence.
pub struct SyntheticInput {
    signal: Signal,
    sample_rate: u32,
    denied: AtomicBool,
    open_streams: Arc<AtomicUsize>,
    frames_read: Arc<AtomicU64>,
}

impl SyntheticInput {
    fn with_signal(signal: Signal, sample_rate: u32) -> Self {
        Self {
            signal,
            sample_rate,
            denied: AtomicBool::new(false),
            open_streams: Arc::new(AtomicUsize::new(0)),
            frames_read: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn sine(frequency_hz: f32, amplitude: f32, sample_rate: u32) -> Self {
        Self::with_signal(
            Signal::Sine {
                frequency_hz,
                amplitude,
            },
            sample_rate,
        )
    }

    pub fn silence(sample_rate: u32) -> Self {
        Self::with_signal(Signal::Silence, sample_rate)
    }

    /// Refuses to open until [`grant`](Self::grant) is called.
    pub fn denied() -> Self {
        let input = Self::sine(440.0, 0.5, 48000);
        input.denied.store(true, Ordering::SeqCst);
        input
    }

    pub fn grant(&self) {
        self.denied.store(false, Ordering::SeqCst);
    }

    /// Streams opened and not yet dropped.
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read.load(Ordering::SeqCst)
    }
}

impl AudioInput for SyntheticInput {
    fn open(&self) -> Result<Box<dyn InputStream>, AudioError> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(AudioError::PermissionDenied);
        }
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticStream {
            signal: self.signal,
            sample_rate: self.sample_rate,
            position: 0,
            open_streams: Arc::clone(&self.open_streams),
            frames_read: Arc::clone(&self.frames_read),
        }))
    }
}

struct SyntheticStream {
    signal: Signal,
    sample_rate: u32,
    position: u64,
    open_streams: Arc<AtomicUsize>,
    frames_read: Arc<AtomicU64>,
}

impl InputStream for SyntheticStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_frame(&mut self, frame: &mut [f32]) -> bool {
        for out in frame.iter_mut() {
            *out = match self.signal {
                Signal::Sine {
                    frequency_hz,
                    amplitude,
                } => {
                    let cycles = (self.position as f64 * f64::from(frequency_hz)
                        / f64::from(self.sample_rate))
                    .fract();
                    amplitude * (2.0 * PI * cycles as f32).sin()
                }
                Signal::Silence => 0.0,
            };
            self.position += 1;
        }
        self.frames_read.fetch_add(1, Ordering::SeqCst);
        true
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.open_streams.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Wall clock that only moves when told to.
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl WallClock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
