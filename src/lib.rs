// String Practice Core - metronome, speed trainer and tuner engine
// Drift-free beat scheduling, click synthesis and autocorrelation pitch detection

// Module declarations
pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod metronome;
pub mod presets;
pub mod session;
pub mod storage;
pub mod testing;
pub mod trainer;
pub mod tuner;

// Re-exports for convenience
pub use config::AppConfig;
pub use error::{AudioError, ErrorCode, PracticeError, PresetError, TrainerError};
pub use events::{EventBus, SessionEvent};
pub use session::{PracticeSession, SessionDeps, SessionSnapshot};

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber, honouring `RUST_LOG` (default `info`).
///
/// `log` records from the library are forwarded to the same subscriber.
/// Calling it twice is harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
