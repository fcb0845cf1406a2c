//! `.csv` output, UTF-8 with a byte order mark so spreadsheet apps pick the right encoding.

use std::io::Write;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};

use crate::error::StorageError;

use super::record::{Cell, ColumnMap, ImageRecord, HEADERS};
use super::{write_replacing, RecordStore};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn malformed(&self, err: csv::Error) -> StorageError {
        StorageError::malformed(&self.path, err.to_string())
    }
}

impl RecordStore for CsvStore {
    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<ImageRecord>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let bytes = std::fs::read(&self.path).map_err(|e| StorageError::ReadFile {
            path: self.path.clone(),
            source: e,
        })?;
        let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| self.malformed(e))?
            .iter()
            .map(str::to_string)
            .collect();
        let columns = ColumnMap::from_headers(&self.path, &headers)?;

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row = row.map_err(|e| self.malformed(e))?;
            let cells: Vec<Cell> = row
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect();
            if let Some(record) = columns.parse_row(&self.path, index + 2, &cells)? {
                records.push(record);
            }
        }

        Ok(records)
    }

    fn save(&self, records: &[ImageRecord]) -> Result<(), StorageError> {
        let encode = |e: csv::Error| StorageError::Encode {
            path: self.path.clone(),
            reason: e.to_string(),
        };

        write_replacing(&self.path, |file| {
            file.write_all(UTF8_BOM).map_err(|e| StorageError::WriteFile {
                path: self.path.clone(),
                source: e,
            })?;

            let mut writer = WriterBuilder::new().from_writer(&mut *file);
            writer.write_record(HEADERS).map_err(encode)?;
            for record in records {
                writer
                    .write_record([
                        record.message_id().to_string(),
                        record.date_cell(),
                        record.image_link().to_string(),
                        record.extracted_text().to_string(),
                    ])
                    .map_err(encode)?;
            }
            writer.flush().map_err(|e| StorageError::WriteFile {
                path: self.path.clone(),
                source: e,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path().join("out.csv"));
        let date = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();

        let records = vec![
            ImageRecord::new(12, Some(date), "https://t.me/g/12", "line one, \"quoted\"\nline two"),
            ImageRecord::new(11, None, "", ""),
        ];
        store.save(&records).unwrap();

        let raw = std::fs::read(store.path()).unwrap();
        assert!(raw.starts_with(UTF8_BOM));

        assert_eq!(store.load().unwrap(), records);
    }

    #[test]
    fn test_missing_and_empty_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let store = CsvStore::new(&path);
        assert!(store.load().unwrap().is_empty());

        std::fs::write(&path, b"\xEF\xBB\xBF\n").unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_written_by_hand() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "message_id,image_link,extracted_text\n5,,текст\n\n6,l,\n").unwrap();

        let loaded = CsvStore::new(&path).load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].message_id(), 5);
        assert_eq!(loaded[0].extracted_text(), "текст");
        assert_eq!(loaded[1].image_link(), "l");
    }

    #[test]
    fn test_bad_id_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "Message ID,Date,Image Link,Extracted Text\nabc,,,\n").unwrap();

        let err = CsvStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StorageError::MalformedOutputFile { .. }));
    }

    #[test]
    fn test_extra_columns_are_not_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let store = CsvStore::new(&path);

        for content in [
            "Message ID,Date,Image Link,Extracted Text,\n1,,l,t,keep me\n",
            "Message ID,Date,Image Link,Extracted Text\n1,,l,t,stray note\n",
            ",Message ID,Date,Image Link,Extracted Text\n0,1,,l,t\n",
        ] {
            std::fs::write(&path, content).unwrap();
            let err = store.load().unwrap_err();
            assert!(
                matches!(err, StorageError::MalformedOutputFile { .. }),
                "{:?}: {}",
                content,
                err
            );
            assert_eq!(std::fs::read_to_string(&path).unwrap(), content);
        }
    }

    #[test]
    fn test_empty_trailing_column_is_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "Message ID,Date,Image Link,Extracted Text,\n1,,l,t,\n").unwrap();

        let loaded = CsvStore::new(&path).load().unwrap();
        assert_eq!(loaded, vec![ImageRecord::new(1, None, "l", "t")]);
    }
}
