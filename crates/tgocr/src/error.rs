use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::PipelineError;
use crate::secrets::SecretError;
use crate::telegram::TelegramError;

#[derive(Error, Debug)]
pub enum TgocrError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),

    #[error("Telegram error: {0}")]
    Telegram(#[from] TelegramError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Unsupported config file extension: '{0}' (expected .json, .yaml or .yml)")]
    UnsupportedExtension(String),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Not an image: {0}")]
    NotAnImage(String),

    #[error("Failed to process image: {0}")]
    ImageProcessing(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("OCR worker failed: {0}")]
    WorkerFailed(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Unsupported output format '{extension}' for '{path}' (expected .xlsx or .csv)")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("Output file '{path}' is malformed: {reason}")]
    MalformedOutputFile { path: PathBuf, reason: String },

    #[error("Failed to read output file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode output file '{path}': {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("Failed to replace '{to}' with '{from}': {source}")]
    Replace {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn malformed(path: &std::path::Path, reason: impl Into<String>) -> Self {
        StorageError::MalformedOutputFile {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TgocrError>;
