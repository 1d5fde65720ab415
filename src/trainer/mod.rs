// Speed trainer - stepwise tempo ramps driving the beat scheduler

pub mod config;
pub mod driver;
pub mod machine;

pub use config::TrainerConfig;
pub use driver::SpeedTrainer;
pub use machine::{TrainerEffect, TrainerMachine, TrainerPhase, TrainerSession, TrainerSummary};
