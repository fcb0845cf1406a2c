use thiserror::Error;

use crate::error::{ProcessError, StorageError};
use crate::telegram::TelegramError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Output file error: {0}")]
    Storage(#[from] StorageError),

    #[error("Telegram error: {0}")]
    Source(#[from] TelegramError),

    #[error("Message stream failed after saving {records_written} new records: {source}")]
    StreamFailed {
        records_written: usize,
        #[source]
        source: TelegramError,
    },
}

/// Why a single image produced no record. The scan continues past these.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("download failed: {0}")]
    Fetch(#[from] TelegramError),

    #[error("text extraction failed: {0}")]
    Extract(#[from] ProcessError),
}
