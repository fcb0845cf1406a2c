use std::collections::HashSet;

use crate::telegram::MessageId;

use super::record::ImageRecord;

/// Collects new records on top of the rows already in the output file.
///
/// Existing rows keep their order and are never touched, even if the file
/// already holds duplicates written by some other tool. A new record is
/// appended only if its message id has not been seen yet.
#[derive(Debug, Default)]
pub struct RecordAccumulator {
    records: Vec<ImageRecord>,
    seen: HashSet<MessageId>,
    existing: usize,
    skipped_duplicates: usize,
}

impl RecordAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the rows loaded from the output file.
    pub fn with_existing(existing: Vec<ImageRecord>) -> Self {
        let seen = existing.iter().map(ImageRecord::message_id).collect();
        Self {
            existing: existing.len(),
            records: existing,
            seen,
            skipped_duplicates: 0,
        }
    }

    pub fn contains(&self, message_id: MessageId) -> bool {
        self.seen.contains(&message_id)
    }

    /// Appends `record` unless its id is already present. Returns whether it was added.
    pub fn push(&mut self, record: ImageRecord) -> bool {
        if !self.seen.insert(record.message_id()) {
            self.skipped_duplicates += 1;
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn extend<I: IntoIterator<Item = ImageRecord>>(&mut self, records: I) {
        for record in records {
            self.push(record);
        }
    }

    pub fn existing_count(&self) -> usize {
        self.existing
    }

    pub fn added_count(&self) -> usize {
        self.records.len() - self.existing
    }

    pub fn skipped_duplicates(&self) -> usize {
        self.skipped_duplicates
    }

    pub fn has_new_records(&self) -> bool {
        self.added_count() > 0
    }

    /// Only the records added in this run.
    pub fn new_records(&self) -> &[ImageRecord] {
        &self.records[self.existing..]
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ImageRecord> {
        self.records
    }
}

/// Merges `new` into `existing` without duplicating message ids.
pub fn merge_records(existing: Vec<ImageRecord>, new: Vec<ImageRecord>) -> Vec<ImageRecord> {
    let mut accumulator = RecordAccumulator::with_existing(existing);
    accumulator.extend(new);
    accumulator.into_records()
}
