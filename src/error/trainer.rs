// Speed trainer error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Trainer error code constants
///
/// Error code range: 2001-2005
pub struct TrainerErrorCodes;

impl TrainerErrorCodes {
    /// Increment sign does not move start tempo towards target tempo
    pub const DIRECTION_MISMATCH: i32 = 2001;

    /// A trainer parameter is out of range
    pub const INVALID_CONFIG: i32 = 2002;

    /// A training session is already active
    pub const ALREADY_RUNNING: i32 = 2003;

    /// No training session is active
    pub const NOT_RUNNING: i32 = 2004;

    /// Trainer state lock was poisoned
    pub const STATE_POISONED: i32 = 2005;
}

/// Log a trainer error with structured context
pub fn log_trainer_error(err: &TrainerError, context: &str) {
    error!(
        "Trainer error in {}: code={}, component=SpeedTrainer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Speed trainer errors
///
/// Configuration errors are reported synchronously and leave every piece of
/// session state untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainerError {
    /// Increment direction does not lead from start towards target
    DirectionMismatch {
        start: u32,
        target: u32,
        increment: i32,
    },

    /// A parameter is out of range
    InvalidConfig { reason: String },

    /// A session is already active
    AlreadyRunning,

    /// No session is active
    NotRunning,

    /// Trainer state lock was poisoned
    StatePoisoned,
}

impl ErrorCode for TrainerError {
    fn code(&self) -> i32 {
        match self {
            TrainerError::DirectionMismatch { .. } => TrainerErrorCodes::DIRECTION_MISMATCH,
            TrainerError::InvalidConfig { .. } => TrainerErrorCodes::INVALID_CONFIG,
            TrainerError::AlreadyRunning => TrainerErrorCodes::ALREADY_RUNNING,
            TrainerError::NotRunning => TrainerErrorCodes::NOT_RUNNING,
            TrainerError::StatePoisoned => TrainerErrorCodes::STATE_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            TrainerError::DirectionMismatch {
                start,
                target,
                increment,
            } => {
                if *increment > 0 {
                    format!(
                        "With a positive increment ({}) the start tempo ({}) must be lower than the target ({})",
                        increment, start, target
                    )
                } else {
                    format!(
                        "With a negative increment ({}) the start tempo ({}) must be higher than the target ({})",
                        increment, start, target
                    )
                }
            }
            TrainerError::InvalidConfig { reason } => {
                format!("Invalid trainer configuration: {}", reason)
            }
            TrainerError::AlreadyRunning => "A training session is already running".to_string(),
            TrainerError::NotRunning => "No training session is running".to_string(),
            TrainerError::StatePoisoned => "Trainer state lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for TrainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TrainerError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for TrainerError {}
