//! The output row type and its tabular layout.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::error::StorageError;
use crate::telegram::MessageId;

/// Format of the `Date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header row written to every output file, in column order.
pub const HEADERS: [&str; 4] = ["Message ID", "Date", "Image Link", "Extracted Text"];

/// One processed image. Fields are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    message_id: MessageId,
    date: Option<NaiveDateTime>,
    image_link: String,
    extracted_text: String,
}

impl ImageRecord {
    pub fn new(
        message_id: MessageId,
        date: Option<DateTime<Utc>>,
        image_link: impl Into<String>,
        extracted_text: impl Into<String>,
    ) -> Self {
        Self {
            message_id,
            date: date.map(|d| d.naive_utc()),
            image_link: image_link.into(),
            extracted_text: extracted_text.into(),
        }
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn date(&self) -> Option<NaiveDateTime> {
        self.date
    }

    pub fn image_link(&self) -> &str {
        &self.image_link
    }

    pub fn extracted_text(&self) -> &str {
        &self.extracted_text
    }

    /// The `Date` cell value; empty when the date is unknown.
    pub fn date_cell(&self) -> String {
        self.date
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
    }
}

/// A cell as read back from an output file.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    MessageId,
    Date,
    ImageLink,
    ExtractedText,
}

impl Column {
    fn from_header(header: &str) -> Option<Self> {
        let key: String = header
            .trim()
            .trim_start_matches('\u{feff}')
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == ' ' { '_' } else { c })
            .collect();

        match key.as_str() {
            "message_id" => Some(Column::MessageId),
            "date" => Some(Column::Date),
            "image_link" => Some(Column::ImageLink),
            "extracted_text" => Some(Column::ExtractedText),
            _ => None,
        }
    }
}

/// Column positions found in an existing file's header row.
#[derive(Debug, Clone)]
pub(crate) struct ColumnMap {
    message_id: usize,
    date: Option<usize>,
    image_link: usize,
    extracted_text: usize,
}

impl ColumnMap {
    /// Maps header cells to columns. Unknown or repeated headers are rejected
    /// because rewriting the file would otherwise drop their data. Blank
    /// headers are allowed here; `parse_row` rejects any value under them.
    pub(crate) fn from_headers<S: AsRef<str>>(path: &Path, headers: &[S]) -> Result<Self, StorageError> {
        let mut message_id = None;
        let mut date = None;
        let mut image_link = None;
        let mut extracted_text = None;

        for (index, header) in headers.iter().enumerate() {
            let header = header.as_ref();
            if header.trim().is_empty() {
                continue;
            }
            let column = Column::from_header(header).ok_or_else(|| {
                StorageError::malformed(path, format!("unexpected column '{}'", header.trim()))
            })?;
            let slot = match column {
                Column::MessageId => &mut message_id,
                Column::Date => &mut date,
                Column::ImageLink => &mut image_link,
                Column::ExtractedText => &mut extracted_text,
            };
            if slot.replace(index).is_some() {
                return Err(StorageError::malformed(
                    path,
                    format!("column '{}' appears more than once", header.trim()),
                ));
            }
        }

        let require = |slot: Option<usize>, name: &str| {
            slot.ok_or_else(|| StorageError::malformed(path, format!("missing column '{}'", name)))
        };

        Ok(Self {
            message_id: require(message_id, HEADERS[0])?,
            date,
            image_link: require(image_link, HEADERS[2])?,
            extracted_text: require(extracted_text, HEADERS[3])?,
        })
    }

    /// Parses one data row. Returns `Ok(None)` for an entirely blank row.
    /// `row_number` is 1-based and counts the header row.
    pub(crate) fn parse_row(
        &self,
        path: &Path,
        row_number: usize,
        cells: &[Cell],
    ) -> Result<Option<ImageRecord>, StorageError> {
        if cells.iter().all(Cell::is_blank) {
            return Ok(None);
        }

        if let Some((index, stray)) = cells
            .iter()
            .enumerate()
            .find(|(index, c)| !c.is_blank() && !self.is_mapped(*index))
        {
            return Err(StorageError::malformed(
                path,
                format!(
                    "row {}: value '{}' in column {} has no header",
                    row_number,
                    stray.as_text(),
                    index + 1
                ),
            ));
        }

        let cell = |index: usize| cells.get(index).cloned().unwrap_or(Cell::Empty);

        let message_id = parse_message_id(&cell(self.message_id)).ok_or_else(|| {
            StorageError::malformed(
                path,
                format!(
                    "row {}: message id '{}' is not an integer",
                    row_number,
                    cell(self.message_id).as_text()
                ),
            )
        })?;

        let date = match self.date.map(cell) {
            None => None,
            Some(c) if c.is_blank() => None,
            Some(c) => {
                let text = c.as_text();
                let parsed = NaiveDateTime::parse_from_str(text.trim(), DATE_FORMAT)
                    .or_else(|_| NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%dT%H:%M:%S"));
                match parsed {
                    Ok(date) => Some(date),
                    Err(_) => {
                        return Err(StorageError::malformed(
                            path,
                            format!("row {}: date '{}' is not '{}'", row_number, text, DATE_FORMAT),
                        ))
                    }
                }
            }
        };

        Ok(Some(ImageRecord {
            message_id,
            date,
            image_link: cell(self.image_link).as_text(),
            extracted_text: cell(self.extracted_text).as_text(),
        }))
    }

    fn is_mapped(&self, index: usize) -> bool {
        index == self.message_id
            || index == self.image_link
            || index == self.extracted_text
            || self.date == Some(index)
    }
}

fn parse_message_id(cell: &Cell) -> Option<MessageId> {
    match cell {
        Cell::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= MessageId::MAX as f64 => {
            Some(*n as MessageId)
        }
        Cell::Text(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<MessageId>()
                .ok()
                .or_else(|| trimmed.strip_suffix(".0")?.parse::<MessageId>().ok())
                .filter(|id| *id >= 0)
        }
        _ => None,
    }
}
