// Preset and playlist error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Preset error code constants
///
/// Error code range: 3001-3006
pub struct PresetErrorCodes;

impl PresetErrorCodes {
    pub const EMPTY_SELECTION: i32 = 3001;
    pub const PRESET_NOT_FOUND: i32 = 3002;
    pub const PLAYLIST_NOT_FOUND: i32 = 3003;
    pub const NO_ACTIVE_PLAYLIST: i32 = 3004;
    pub const INVALID_NAME: i32 = 3005;
    pub const STORAGE: i32 = 3006;
}

/// Log a preset store error with structured context
pub fn log_preset_error(err: &PresetError, context: &str) {
    error!(
        "Preset error in {}: code={}, component=PresetStore, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Preset store and playlist playback errors
#[derive(Debug, Clone, PartialEq)]
pub enum PresetError {
    /// A playlist needs at least one preset
    EmptySelection,

    /// No preset with this id
    PresetNotFound { id: u64 },

    /// No playlist with this id
    PlaylistNotFound { id: u64 },

    /// Navigation requested without a playlist being played
    NoActivePlaylist,

    /// Name is empty after trimming
    InvalidName,

    /// Writing the collection to the key-value store failed
    Storage { reason: String },
}

impl ErrorCode for PresetError {
    fn code(&self) -> i32 {
        match self {
            PresetError::EmptySelection => PresetErrorCodes::EMPTY_SELECTION,
            PresetError::PresetNotFound { .. } => PresetErrorCodes::PRESET_NOT_FOUND,
            PresetError::PlaylistNotFound { .. } => PresetErrorCodes::PLAYLIST_NOT_FOUND,
            PresetError::NoActivePlaylist => PresetErrorCodes::NO_ACTIVE_PLAYLIST,
            PresetError::InvalidName => PresetErrorCodes::INVALID_NAME,
            PresetError::Storage { .. } => PresetErrorCodes::STORAGE,
        }
    }

    fn message(&self) -> String {
        match self {
            PresetError::EmptySelection => {
                "Select at least one preset to create a playlist".to_string()
            }
            PresetError::PresetNotFound { id } => format!("Preset {} not found", id),
            PresetError::PlaylistNotFound { id } => format!("Playlist {} not found", id),
            PresetError::NoActivePlaylist => "No playlist is playing".to_string(),
            PresetError::InvalidName => "Name must not be empty".to_string(),
            PresetError::Storage { reason } => format!("Could not persist data: {}", reason),
        }
    }
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PresetError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PresetError {}

impl From<std::io::Error> for PresetError {
    fn from(err: std::io::Error) -> Self {
        PresetError::Storage {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_error_codes() {
        assert_eq!(PresetError::EmptySelection.code(), 3001);
        assert_eq!(PresetError::PresetNotFound { id: 7 }.code(), 3002);
        assert_eq!(PresetError::PlaylistNotFound { id: 7 }.code(), 3003);
        assert_eq!(PresetError::NoActivePlaylist.code(), 3004);
        assert_eq!(PresetError::InvalidName.code(), 3005);
        assert_eq!(
            PresetError::Storage {
                reason: "full".to_string()
            }
            .code(),
            3006
        );
    }

    #[test]
    fn test_preset_error_display() {
        let err = PresetError::PresetNotFound { id: 42 };
        let display = format!("{}", err);
        assert!(display.contains("3002"));
        assert!(display.contains("42"));
    }
}
