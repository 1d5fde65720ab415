use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::tempo::{MAX_BPM, MIN_BPM};
use crate::config::MetronomeConfig;

/// Tap tempo over a short window of recent taps.
pub struct TapTempo {
    taps: VecDeque<Instant>,
    window: usize,
    reset_after: Duration,
}

impl TapTempo {
    pub fn new(window: usize, reset_after: Duration) -> Self {
        let window = window.max(2);
        Self {
            taps: VecDeque::with_capacity(window),
            window,
            reset_after,
        }
    }

    pub fn from_config(config: &MetronomeConfig) -> Self {
        Self::new(config.tap_window, Duration::from_millis(config.tap_reset_ms))
    }

    /// Register a tap at `now`.
    ///
    /// Returns the tempo from the average interval of the retained taps, or
    /// `None` with fewer than two taps or when the result falls outside
    /// 40..=200 BPM.
    pub fn tap(&mut self, now: Instant) -> Option<u32> {
        if let Some(&last) = self.taps.back() {
            if now.saturating_duration_since(last) > self.reset_after {
                self.taps.clear();
            }
        }
        if self.taps.len() == self.window {
            self.taps.pop_front();
        }
        self.taps.push_back(now);

        let (first, last) = (self.taps.front()?, self.taps.back()?);
        let intervals = self.taps.len() - 1;
        if intervals == 0 {
            return None;
        }

        let avg_ms = last.duration_since(*first).as_secs_f64() * 1000.0 / intervals as f64;
        if avg_ms <= 0.0 {
            return None;
        }
        let bpm = (60000.0 / avg_ms).round();
        if bpm < f64::from(MIN_BPM) || bpm > f64::from(MAX_BPM) {
            tracing::debug!("[TapTempo] Discarding outlier tap tempo {}", bpm);
            return None;
        }
        Some(bpm as u32)
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taps_at(tapper: &mut TapTempo, start: Instant, offsets_ms: &[u64]) -> Vec<Option<u32>> {
        offsets_ms
            .iter()
            .map(|ms| tapper.tap(start + Duration::from_millis(*ms)))
            .collect()
    }

    #[test]
    fn test_half_second_taps_give_120() {
        let mut tapper = TapTempo::new(4, Duration::from_secs(3));
        let results = taps_at(&mut tapper, Instant::now(), &[0, 500, 1000, 1500]);
        assert_eq!(results, vec![None, Some(120), Some(120), Some(120)]);
    }

    #[test]
    fn test_window_keeps_last_four_taps() {
        let mut tapper = TapTempo::new(4, Duration::from_secs(3));
        // Slow taps first, then three fast intervals push them out
        let results = taps_at(&mut tapper, Instant::now(), &[0, 1000, 2000, 2400, 2800, 3200]);
        assert_eq!(results[5], Some(150));
    }

    #[test]
    fn test_outlier_is_discarded() {
        let mut tapper = TapTempo::new(4, Duration::from_secs(3));
        // 2s apart is 30 BPM
        let results = taps_at(&mut tapper, Instant::now(), &[0, 2000]);
        assert_eq!(results, vec![None, None]);

        let mut tapper = TapTempo::new(4, Duration::from_secs(3));
        // 200ms apart is 300 BPM
        let results = taps_at(&mut tapper, Instant::now(), &[0, 200]);
        assert_eq!(results[1], None);
    }

    #[test]
    fn test_pause_resets_window() {
        let mut tapper = TapTempo::new(4, Duration::from_secs(3));
        let results = taps_at(&mut tapper, Instant::now(), &[0, 500, 5000, 5600]);
        assert_eq!(results[2], None, "Tap after a long pause starts over");
        assert_eq!(results[3], Some(100));
    }
}
