//! Output file handling: the record type, merge logic and spreadsheet stores.

pub mod accumulator;
pub mod csv_store;
pub mod record;
pub mod xlsx_store;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

pub use accumulator::{merge_records, RecordAccumulator};
pub use csv_store::CsvStore;
pub use record::{ImageRecord, DATE_FORMAT, HEADERS};
pub use xlsx_store::XlsxStore;

/// Reads and rewrites one output file.
///
/// A run holds the file for its whole duration: load before scanning, save
/// once at the end. Two runs writing the same file at once are not supported.
pub trait RecordStore: Send + Sync {
    fn path(&self) -> &Path;

    /// Loads all rows. A missing file is an empty table.
    fn load(&self) -> Result<Vec<ImageRecord>, StorageError>;

    /// Replaces the file with `records`.
    fn save(&self, records: &[ImageRecord]) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Xlsx,
    Csv,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, StorageError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "xlsx" => Ok(OutputFormat::Xlsx),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(StorageError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

/// Picks the store for `path` from its extension.
pub fn open_store(path: &Path) -> Result<Box<dyn RecordStore>, StorageError> {
    Ok(match OutputFormat::from_path(path)? {
        OutputFormat::Xlsx => Box::new(XlsxStore::new(path)),
        OutputFormat::Csv => Box::new(CsvStore::new(path)),
    })
}

/// Writes a sibling temp file through `write`, then moves it over `path`.
///
/// A crash mid-write leaves the previous file intact.
pub(crate) fn write_replacing<F>(path: &Path, write: F) -> Result<(), StorageError>
where
    F: FnOnce(&mut File) -> Result<(), StorageError>,
{
    let temp_path = temp_sibling(path);

    let result = (|| {
        let mut file = File::create(&temp_path).map_err(|e| StorageError::WriteFile {
            path: temp_path.clone(),
            source: e,
        })?;
        write(&mut file)?;
        file.flush()
            .and_then(|_| file.sync_all())
            .map_err(|e| StorageError::WriteFile {
                path: temp_path.clone(),
                source: e,
            })?;
        move_file(&temp_path, path)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

/// `rename` first; copy + delete when rename fails (e.g. across devices).
fn move_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    std::fs::copy(src, dst).map_err(|e| StorageError::Replace {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    std::fs::remove_file(src).map_err(|e| StorageError::Replace {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    Ok(())
}
