//! Loudness gate and autocorrelation pitch estimate.

/// RMS level of a frame in dBFS. Silence is negative infinity.
pub fn level_db(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return f32::NEG_INFINITY;
    }
    let energy: f32 = frame.iter().map(|s| s * s).sum();
    let rms = (energy / frame.len() as f32).sqrt();
    20.0 * rms.log10()
}

/// Lag range searched for a sample rate and frequency band.
pub fn lag_range(sample_rate: u32, min_hz: f32, max_hz: f32) -> (usize, usize) {
    let sr = sample_rate as f32;
    let shortest = (sr / max_hz).floor().max(1.0) as usize;
    let longest = (sr / min_hz).ceil() as usize;
    (shortest, longest.max(shortest))
}

#[inline]
fn correlation(frame: &[f32], lag: usize) -> f32 {
    frame[..frame.len() - lag]
        .iter()
        .zip(&frame[lag..])
        .map(|(a, b)| a * b)
        .sum()
}

/// Estimate the fundamental frequency of `frame`.
///
/// For each lag between `sample_rate / max_hz` and `sample_rate / min_hz`
/// the frame is multiplied with itself shifted by that lag; the lag with the
/// largest dot product wins and the estimate is `sample_rate / lag`.
///
/// Lags still inside the zero-lag lobe (before the correlation first turns
/// negative) are skipped. Otherwise a low note, whose period is close to the
/// longest lag, loses to the shortest lag on overlap length alone.
///
/// Returns `None` when the frame never decorrelates within the searched
/// range or no lag correlates positively.
pub fn detect_pitch(frame: &[f32], sample_rate: u32, min_hz: f32, max_hz: f32) -> Option<f32> {
    let (shortest, longest) = lag_range(sample_rate, min_hz, max_hz);
    let longest = longest.min(frame.len().saturating_sub(1));
    if shortest > longest {
        return None;
    }

    let lobe_end = (1..=longest).find(|&lag| correlation(frame, lag) < 0.0)?;

    let mut best_lag = 0;
    let mut best_corr = 0.0f32;
    for lag in shortest.max(lobe_end)..=longest {
        let corr = correlation(frame, lag);
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    if best_lag == 0 {
        None
    } else {
        Some(sample_rate as f32 / best_lag as f32)
    }
}
