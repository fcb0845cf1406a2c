use crate::config::Settings;
use crate::telegram::MessageId;

/// Scan bounds for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum number of images to process. `None` scans everything.
    pub limit: Option<usize>,
    /// Stop at the first message with an id at or below this one.
    pub start_from_id: Option<MessageId>,
    /// Only scan messages strictly older than this id.
    pub before_id: Option<MessageId>,
}

impl RunOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            limit: settings.scan.effective_limit(),
            start_from_id: settings.scan.start_from_id,
            before_id: settings.scan.before_id,
        }
    }

    /// The image cap; a limit of zero means no cap.
    pub fn cap(&self) -> Option<usize> {
        self.limit.filter(|n| *n > 0)
    }

    /// Whether `message_id` lies at or below the resume point.
    pub fn is_before_start(&self, message_id: MessageId) -> bool {
        self.start_from_id.is_some_and(|start| message_id <= start)
    }
}
