pub mod config;
pub mod error;
pub mod pipeline;
pub mod processor;
pub mod records;
pub mod sanitize;
pub mod secrets;
pub mod telegram;

pub use config::{load_settings, validate_settings, Settings, SettingsOverrides};
pub use error::{ConfigError, ProcessError, Result, StorageError, TgocrError};
pub use pipeline::{RunController, RunOptions, RunSummary, StopReason};
pub use processor::{OcrProcessor, TextExtractor};
pub use records::{open_store, ImageRecord, RecordStore};
pub use secrets::{resolve_secret, SecretError};
pub use telegram::{GroupRef, MessageSource, TelegramError, TelegramSession};
