/// Destination for rendered click bursts
///
/// Implementations must not block for long: `submit` is called from the beat
/// ticker while it holds the scheduler lock.
pub trait AudioOutput: Send + Sync {
    /// Sample rate bursts should be rendered at
    fn sample_rate(&self) -> u32;

    /// Whether a device is open. Clicks are skipped when it is not.
    fn is_available(&self) -> bool {
        true
    }

    /// Queue a mono burst for playback, mixed with any burst still sounding
    fn submit(&self, burst: Vec<f32>);
}

/// Output that discards everything, used when no device could be opened
pub struct NullOutput {
    sample_rate: u32,
}

impl NullOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl AudioOutput for NullOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_available(&self) -> bool {
        false
    }

    fn submit(&self, _burst: Vec<f32>) {}
}
