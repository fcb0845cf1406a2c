use async_trait::async_trait;

use super::error::Result;
use super::message::{ChatInfo, IncomingMessage, MessageId};

/// A newest-first stream of messages from one chat, plus attachment download.
///
/// Implementations must yield messages in strictly descending id order; the
/// run controller relies on this to stop at the resume point.
#[async_trait]
pub trait MessageSource: Send {
    /// Opaque handle used to download an attachment later.
    type Handle: Send + Sync;

    /// The chat being scanned.
    fn chat(&self) -> &ChatInfo;

    /// Returns the next older message, or `None` once history is exhausted.
    async fn next_message(&mut self) -> Result<Option<IncomingMessage<Self::Handle>>>;

    /// Downloads an attachment fully into memory.
    async fn fetch_attachment(
        &mut self,
        message_id: MessageId,
        handle: &Self::Handle,
    ) -> Result<Vec<u8>>;
}
