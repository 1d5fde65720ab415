use serde::{Deserialize, Serialize};

use crate::storage::{load_json, store_json, KeyValueStore, CALIBRATION_KEY};

pub const MIN_A4_HZ: f32 = 432.0;
pub const MAX_A4_HZ: f32 = 445.0;
pub const DEFAULT_A4_HZ: f32 = 440.0;

/// Reference pitch for A4, always within 432..=445 Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationState {
    a4_hz: f32,
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self {
            a4_hz: DEFAULT_A4_HZ,
        }
    }
}

impl CalibrationState {
    pub fn with_a4(a4_hz: f32) -> Self {
        let mut state = Self::default();
        state.set_a4_hz(a4_hz);
        state
    }

    pub fn a4_hz(&self) -> f32 {
        self.a4_hz
    }

    /// Clamp and apply a new reference. Non-finite input is ignored.
    pub fn set_a4_hz(&mut self, a4_hz: f32) -> f32 {
        if a4_hz.is_finite() {
            self.a4_hz = a4_hz.clamp(MIN_A4_HZ, MAX_A4_HZ);
        }
        self.a4_hz
    }

    /// Stored reference, or 440 Hz if none was saved.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        load_json::<f32>(store, CALIBRATION_KEY)
            .map(Self::with_a4)
            .unwrap_or_default()
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> std::io::Result<()> {
        store_json(store, CALIBRATION_KEY, &self.a4_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_a4_is_clamped() {
        let mut state = CalibrationState::default();
        assert_eq!(state.set_a4_hz(400.0), 432.0);
        assert_eq!(state.set_a4_hz(460.0), 445.0);
        assert_eq!(state.set_a4_hz(442.0), 442.0);
        assert_eq!(state.set_a4_hz(f32::NAN), 442.0);
    }

    #[test]
    fn test_load_defaults_to_440() {
        let store = MemoryStore::new();
        assert_eq!(CalibrationState::load(&store).a4_hz(), 440.0);
    }

    #[test]
    fn test_save_and_load() {
        let store = MemoryStore::new();
        CalibrationState::with_a4(443.0).save(&store).unwrap();
        assert_eq!(CalibrationState::load(&store).a4_hz(), 443.0);
    }

    #[test]
    fn test_out_of_range_stored_value_is_clamped() {
        let store = MemoryStore::new();
        store.set(CALIBRATION_KEY, "500").unwrap();
        assert_eq!(CalibrationState::load(&store).a4_hz(), 445.0);
    }
}
