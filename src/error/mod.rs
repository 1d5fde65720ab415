// Error types for the practice toolkit
//
// This module defines custom error types for the audio transport, the speed
// trainer and the preset store, each carrying a stable numeric code so the
// rendering layer can map failures to user-facing messages.

mod audio;
mod preset;
mod trainer;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use preset::{log_preset_error, PresetError, PresetErrorCodes};
pub use trainer::{log_trainer_error, TrainerError, TrainerErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the UI boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Failure of a session operation that spans more than one component
///
/// Applying a preset or navigating a playlist touches both the preset store
/// and the live transport, so either error kind can surface.
#[derive(Debug, Clone, PartialEq)]
pub enum PracticeError {
    Audio(AudioError),
    Trainer(TrainerError),
    Preset(PresetError),
}

impl ErrorCode for PracticeError {
    fn code(&self) -> i32 {
        match self {
            PracticeError::Audio(err) => err.code(),
            PracticeError::Trainer(err) => err.code(),
            PracticeError::Preset(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            PracticeError::Audio(err) => err.message(),
            PracticeError::Trainer(err) => err.message(),
            PracticeError::Preset(err) => err.message(),
        }
    }
}

impl std::fmt::Display for PracticeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PracticeError::Audio(err) => err.fmt(f),
            PracticeError::Trainer(err) => err.fmt(f),
            PracticeError::Preset(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for PracticeError {}

impl From<AudioError> for PracticeError {
    fn from(err: AudioError) -> Self {
        PracticeError::Audio(err)
    }
}

impl From<TrainerError> for PracticeError {
    fn from(err: TrainerError) -> Self {
        PracticeError::Trainer(err)
    }
}

impl From<PresetError> for PracticeError {
    fn from(err: PresetError) -> Self {
        PracticeError::Preset(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_practice_error_delegates_code() {
        let err: PracticeError = PresetError::PresetNotFound { id: 9 }.into();
        assert_eq!(err.code(), PresetErrorCodes::PRESET_NOT_FOUND);

        let err: PracticeError = AudioError::TransportLocked.into();
        assert_eq!(err.code(), AudioErrorCodes::TRANSPORT_LOCKED);
        assert!(format!("{}", err).contains("AudioError"));
    }
}
