use crate::error::AudioError;

/// Source of microphone audio for the tuner
pub trait AudioInput: Send + Sync {
    /// Open a capture stream.
    ///
    /// Fails with `PermissionDenied` when microphone access is refused and
    /// `StreamOpenFailed` when no device could be opened. Dropping the
    /// returned stream releases the device.
    fn open(&self) -> Result<Box<dyn InputStream>, AudioError>;
}

/// An open capture stream
pub trait InputStream: Send {
    fn sample_rate(&self) -> u32;

    /// Fill `frame` with the most recent `frame.len()` samples, oldest first.
    ///
    /// Returns `false` while fewer samples than that have been captured.
    fn read_frame(&mut self, frame: &mut [f32]) -> bool;
}

/// Sliding window over the most recent captured samples
///
/// Capture callbacks deliver audio in device-sized chunks; the tuner wants a
/// fixed-size frame. The window keeps the latest `capacity` samples.
pub struct FrameWindow {
    samples: Vec<f32>,
    write_pos: usize,
    filled: usize,
}

impl FrameWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity.max(1)],
            write_pos: 0,
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.samples[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.samples.len();
        self.filled = (self.filled + 1).min(self.samples.len());
    }

    pub fn extend_from_slice(&mut self, samples: &[f32]) {
        for &s in samples {
            self.push(s);
        }
    }

    /// Copy the latest `frame.len()` samples into `frame`, oldest first.
    pub fn copy_latest(&self, frame: &mut [f32]) -> bool {
        let n = frame.len();
        if n > self.filled {
            return false;
        }
        let capacity = self.samples.len();
        let start = (self.write_pos + capacity - n) % capacity;
        for (i, out) in frame.iter_mut().enumerate() {
            *out = self.samples[(start + i) % capacity];
        }
        true
    }
}
