use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::ProcessError;
use crate::processor::TextExtractor;
use crate::records::{ImageRecord, RecordAccumulator, RecordStore};
use crate::sanitize::redact_path;
use crate::telegram::{Attachment, ChatInfo, IncomingMessage, MessageId, MessageSource};

use super::config::RunOptions;
use super::error::{ImageError, PipelineError};
use super::progress::{ProgressEvent, ProgressReporter};

/// Why the scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    LimitReached,
    ReachedStartId,
    Exhausted,
    Interrupted,
    StreamFailed,
}

/// Counters for one run, printed by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub chat: String,
    pub existing_records: usize,
    pub messages_examined: usize,
    pub images_found: usize,
    pub images_processed: usize,
    pub skipped_present: usize,
    pub failed_ids: Vec<MessageId>,
    pub records_written: usize,
    pub stop_reason: StopReason,
}

impl RunSummary {
    fn new(chat: &ChatInfo, existing_records: usize) -> Self {
        Self {
            chat: chat.title.clone(),
            existing_records,
            messages_examined: 0,
            images_found: 0,
            images_processed: 0,
            skipped_present: 0,
            failed_ids: Vec::new(),
            records_written: 0,
            stop_reason: StopReason::Exhausted,
        }
    }
}

/// Drives one scan: stream messages, OCR images, merge and save rows.
pub struct RunController<E> {
    extractor: Arc<E>,
    options: RunOptions,
    interrupted: Arc<AtomicBool>,
}

impl<E: TextExtractor + 'static> RunController<E> {
    pub fn new(extractor: Arc<E>, options: RunOptions) -> Self {
        Self {
            extractor,
            options,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Uses an externally owned flag, e.g. one set from a Ctrl-C handler.
    pub fn with_interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Runs the scan against `source` and saves new rows through `store`.
    ///
    /// The output file is loaded before the first message is requested, so a
    /// malformed file fails the run before any download. Rows are written
    /// once at the end, and only if at least one record was added. When the
    /// message stream fails mid-scan, collected rows are still written before
    /// the error is returned.
    pub async fn run<S: MessageSource>(
        &self,
        source: &mut S,
        store: &dyn RecordStore,
        progress: &dyn ProgressReporter,
    ) -> Result<RunSummary, PipelineError> {
        let existing = store.load()?;
        self.run_with_existing(source, store, existing, progress).await
    }

    /// Like [`run`](Self::run), with the rows of `store` already loaded by the caller.
    pub async fn run_with_existing<S: MessageSource>(
        &self,
        source: &mut S,
        store: &dyn RecordStore,
        existing: Vec<ImageRecord>,
        progress: &dyn ProgressReporter,
    ) -> Result<RunSummary, PipelineError> {
        let span = info_span!(
            "run",
            chat = %source.chat().title,
            output = %redact_path(store.path()),
        );
        self.run_inner(source, store, existing, progress)
            .instrument(span)
            .await
    }

    async fn run_inner<S: MessageSource>(
        &self,
        source: &mut S,
        store: &dyn RecordStore,
        existing: Vec<ImageRecord>,
        progress: &dyn ProgressReporter,
    ) -> Result<RunSummary, PipelineError> {
        let mut accumulator = RecordAccumulator::with_existing(existing);
        let chat = source.chat().clone();
        let mut summary = RunSummary::new(&chat, accumulator.existing_count());

        info!(
            existing = accumulator.existing_count(),
            limit = ?self.options.cap(),
            start_from_id = ?self.options.start_from_id,
            "Starting scan"
        );
        progress.report(ProgressEvent::Started {
            chat: chat.title.clone(),
        });

        let mut stream_error = None;
        loop {
            if self.interrupted.load(Ordering::SeqCst) {
                info!("Interrupted, saving collected records");
                summary.stop_reason = StopReason::Interrupted;
                break;
            }
            if self
                .options
                .cap()
                .is_some_and(|cap| summary.images_processed >= cap)
            {
                summary.stop_reason = StopReason::LimitReached;
                break;
            }

            let message = match source.next_message().await {
                Ok(Some(message)) => message,
                Ok(None) => {
                    summary.stop_reason = StopReason::Exhausted;
                    break;
                }
                Err(e) => {
                    error!("Message stream failed: {}", e);
                    summary.stop_reason = StopReason::StreamFailed;
                    stream_error = Some(e);
                    break;
                }
            };

            if self.options.is_before_start(message.id) {
                debug!(message_id = message.id, "Reached start id");
                summary.stop_reason = StopReason::ReachedStartId;
                break;
            }

            summary.messages_examined += 1;
            progress.report(ProgressEvent::MessageExamined {
                message_id: message.id,
            });

            let Some(attachment) = message.image() else {
                debug!(message_id = message.id, "No image attachment");
                continue;
            };
            summary.images_found += 1;

            if accumulator.contains(message.id) {
                debug!(message_id = message.id, "Already in output, skipping");
                summary.skipped_present += 1;
                continue;
            }

            let result = self
                .process_image(source, &chat, &message, attachment)
                .instrument(info_span!("image", message_id = message.id))
                .await;

            match result {
                Ok(record) => {
                    accumulator.push(record);
                    summary.images_processed += 1;
                    progress.report(ProgressEvent::ImageProcessed {
                        message_id: message.id,
                    });
                }
                Err(e) => {
                    warn!("Skipping image in message {}: {}", message.id, e);
                    summary.failed_ids.push(message.id);
                    progress.report(ProgressEvent::ImageFailed {
                        message_id: message.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        if accumulator.has_new_records() {
            store.save(accumulator.records())?;
            summary.records_written = accumulator.added_count();
            info!(
                written = summary.records_written,
                total = accumulator.records().len(),
                "Saved output file"
            );
        } else {
            info!("No new records, output file left unchanged");
        }
        progress.report(ProgressEvent::Finished {
            records_written: summary.records_written,
        });

        match stream_error {
            Some(source) => Err(PipelineError::StreamFailed {
                records_written: summary.records_written,
                source,
            }),
            None => Ok(summary),
        }
    }

    async fn process_image<S: MessageSource>(
        &self,
        source: &mut S,
        chat: &ChatInfo,
        message: &IncomingMessage<S::Handle>,
        attachment: &Attachment<S::Handle>,
    ) -> Result<ImageRecord, ImageError> {
        let bytes = source.fetch_attachment(message.id, &attachment.handle).await?;
        debug!(bytes = bytes.len(), kind = ?attachment.kind, "Downloaded image");

        let extractor = Arc::clone(&self.extractor);
        let text = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .map_err(|e| ProcessError::WorkerFailed(e.to_string()))??;

        debug!(chars = text.chars().count(), "Extracted text");
        Ok(ImageRecord::new(
            message.id,
            message.date,
            chat.message_link(message.id),
            text,
        ))
    }
}
