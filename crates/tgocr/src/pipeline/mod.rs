pub mod config;
pub mod error;
pub mod progress;
pub mod runner;

pub use config::RunOptions;
pub use error::{ImageError, PipelineError};
pub use progress::{BarProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::{RunController, RunSummary, StopReason};
