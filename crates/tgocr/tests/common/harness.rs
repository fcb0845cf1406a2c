//! Test harness for scan runs.
//!
//! `TestHarness` owns a temporary directory holding the output file and runs
//! the [`RunController`] against a scripted [`MockSource`] and a
//! [`FakeExtractor`] that treats image bytes as their own OCR text.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use tgocr::error::ProcessError;
use tgocr::pipeline::{
    PipelineError, ProgressEvent, ProgressReporter, RunController, RunOptions, RunSummary,
};
use tgocr::processor::TextExtractor;
use tgocr::records::{open_store, ImageRecord, RecordStore};
use tgocr::telegram::{ChatInfo, IncomingMessage, MessageId, MessageSource, TelegramError};

use super::builders::{Download, MockHandle, ScriptedMessage, UNREADABLE_IMAGE};

/// Scripted chat history served newest first.
pub struct MockSource {
    chat: ChatInfo,
    messages: VecDeque<ScriptedMessage>,
    downloads: Vec<(MessageId, Download)>,
    served: usize,
    fail_after: Option<usize>,
    fetched: Arc<Mutex<Vec<MessageId>>>,
}

impl MockSource {
    pub fn new(chat: ChatInfo, messages: Vec<ScriptedMessage>, fail_after: Option<usize>) -> Self {
        let downloads = messages
            .iter()
            .filter_map(|m| m.download.clone().map(|d| (m.message.id, d)))
            .collect();
        Self {
            chat,
            messages: messages.into(),
            downloads,
            served: 0,
            fail_after,
            fetched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Message ids whose attachment was downloaded, in call order.
    pub fn fetched(&self) -> Vec<MessageId> {
        self.fetched.lock().unwrap().clone()
    }

    /// Number of messages handed out so far.
    pub fn served(&self) -> usize {
        self.served
    }
}

#[async_trait]
impl MessageSource for MockSource {
    type Handle = MockHandle;

    fn chat(&self) -> &ChatInfo {
        &self.chat
    }

    async fn next_message(&mut self) -> Result<Option<IncomingMessage<MockHandle>>, TelegramError> {
        if self.fail_after.is_some_and(|n| self.served >= n) {
            return Err(TelegramError::FloodWait { seconds: 30 });
        }
        let next = self.messages.pop_front().map(|m| m.message);
        if next.is_some() {
            self.served += 1;
        }
        Ok(next)
    }

    async fn fetch_attachment(
        &mut self,
        message_id: MessageId,
        handle: &MockHandle,
    ) -> Result<Vec<u8>, TelegramError> {
        self.fetched.lock().unwrap().push(message_id);
        match self.downloads.iter().find(|(id, _)| id == handle) {
            Some((_, Download::Bytes(bytes))) => Ok(bytes.clone()),
            Some((_, Download::Fails(reason))) => Err(TelegramError::Download {
                message_id,
                reason: reason.clone(),
            }),
            None => Err(TelegramError::Download {
                message_id,
                reason: "no such attachment".to_string(),
            }),
        }
    }
}

/// Reads image bytes back as UTF-8 "OCR" text.
#[derive(Default)]
pub struct FakeExtractor {
    calls: AtomicUsize,
    interrupt_after: Option<(usize, Arc<AtomicBool>)>,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `flag` once `calls` extractions have happened, as a Ctrl-C would.
    pub fn interrupting_after(calls: usize, flag: Arc<AtomicBool>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            interrupt_after: Some((calls, flag)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextExtractor for FakeExtractor {
    fn extract(&self, image_data: &[u8]) -> Result<String, ProcessError> {
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, flag)) = &self.interrupt_after {
            if calls >= *after {
                flag.store(true, Ordering::SeqCst);
            }
        }

        if image_data == UNREADABLE_IMAGE {
            return Err(ProcessError::NotAnImage("unrecognized format".to_string()));
        }
        Ok(String::from_utf8_lossy(image_data).trim().to_string())
    }
}

/// Collects progress events.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn examined(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::MessageExamined { .. }))
            .count()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Isolated output location plus helpers to run scans into it.
pub struct TestHarness {
    temp_dir: TempDir,
    pub output_path: PathBuf,
    pub progress: RecordingProgress,
}

impl TestHarness {
    /// Harness writing `parsed_data.xlsx`.
    pub fn new() -> Self {
        Self::with_output("parsed_data.xlsx")
    }

    pub fn with_output(file_name: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let output_path = temp_dir.path().join(file_name);
        Self {
            temp_dir,
            output_path,
            progress: RecordingProgress::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn store(&self) -> Box<dyn RecordStore> {
        open_store(&self.output_path).expect("supported output extension")
    }

    /// Writes rows directly, as a previous run would have.
    pub fn seed(&self, records: &[ImageRecord]) {
        self.store().save(records).expect("Failed to seed output file");
    }

    /// Rows currently in the output file.
    pub fn rows(&self) -> Vec<ImageRecord> {
        self.store().load().expect("Failed to load output file")
    }

    pub fn row_ids(&self) -> Vec<MessageId> {
        self.rows().iter().map(ImageRecord::message_id).collect()
    }

    pub async fn run(
        &self,
        source: &mut MockSource,
        options: RunOptions,
    ) -> Result<RunSummary, PipelineError> {
        self.run_with(source, FakeExtractor::new(), options, None).await
    }

    pub async fn run_with(
        &self,
        source: &mut MockSource,
        extractor: FakeExtractor,
        options: RunOptions,
        interrupt: Option<Arc<AtomicBool>>,
    ) -> Result<RunSummary, PipelineError> {
        let mut controller = RunController::new(Arc::new(extractor), options);
        if let Some(flag) = interrupt {
            controller = controller.with_interrupt_flag(flag);
        }
        let store = self.store();
        controller
            .run(source, store.as_ref(), &self.progress)
            .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Options with only a cap.
pub fn limit(n: usize) -> RunOptions {
    RunOptions {
        limit: Some(n),
        ..Default::default()
    }
}

/// Options resuming above `id`.
pub fn start_from(id: MessageId) -> RunOptions {
    RunOptions {
        start_from_id: Some(id),
        ..Default::default()
    }
}
