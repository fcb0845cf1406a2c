use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::telegram::MessageId;

/// Events emitted by the run controller while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Started { chat: String },
    /// One message was taken from the stream, whatever it contained.
    MessageExamined { message_id: MessageId },
    ImageProcessed { message_id: MessageId },
    ImageFailed { message_id: MessageId, error: String },
    Finished { records_written: usize },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for tests and `--no-progress`.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Terminal spinner counting examined messages.
///
/// indicatif hides the bar on its own when stderr is not a terminal.
pub struct BarProgress {
    bar: ProgressBar,
    processed: AtomicUsize,
    failed: AtomicUsize,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template(
            "{spinner:.green} {prefix:.bold} [{elapsed_precise}] {pos} messages {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            bar,
            processed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    fn refresh_message(&self) {
        let processed = self.processed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        if failed > 0 {
            self.bar
                .set_message(format!("| {} images, {} failed", processed, failed));
        } else {
            self.bar.set_message(format!("| {} images", processed));
        }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for BarProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { chat } => {
                self.bar.set_prefix(chat);
                self.refresh_message();
            }
            ProgressEvent::MessageExamined { .. } => self.bar.inc(1),
            ProgressEvent::ImageProcessed { .. } => {
                self.processed.fetch_add(1, Ordering::Relaxed);
                self.refresh_message();
            }
            ProgressEvent::ImageFailed { .. } => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.refresh_message();
            }
            ProgressEvent::Finished { records_written } => {
                self.bar
                    .finish_with_message(format!("| {} new rows saved", records_written));
            }
        }
    }
}
