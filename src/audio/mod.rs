// Audio module - click synthesis and device I/O

pub mod dsp;
#[cfg(feature = "cpal_backend")]
pub mod engine_cpal;
pub mod input;
pub mod output;
pub mod synth;
pub mod timbre;
pub mod wav;

// Re-export commonly used types for convenience
#[cfg(feature = "cpal_backend")]
pub use engine_cpal::{CpalInput, CpalOutput};
pub use input::{AudioInput, FrameWindow, InputStream};
pub use output::{AudioOutput, NullOutput};
pub use synth::{render_click, ToneSynthesizer};
pub use timbre::{ClickVoice, Timbre};
