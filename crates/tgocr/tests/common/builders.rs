//! Builders for scripted chats.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};

use tgocr::telegram::{Attachment, AttachmentKind, ChatInfo, ChatKind, IncomingMessage, MessageId};

use super::harness::MockSource;

/// Download handle used by [`MockSource`]: the id of the message it belongs to.
pub type MockHandle = MessageId;

/// What a scripted download returns.
#[derive(Debug, Clone)]
pub enum Download {
    Bytes(Vec<u8>),
    Fails(String),
}

/// One scripted message.
#[derive(Debug, Clone)]
pub struct ScriptedMessage {
    pub message: IncomingMessage<MockHandle>,
    pub download: Option<Download>,
}

/// Builds a chat history. Messages may be added in any order; the source
/// serves them newest first.
pub struct ChatBuilder {
    chat: ChatInfo,
    messages: Vec<ScriptedMessage>,
    fail_after: Option<usize>,
}

impl ChatBuilder {
    /// A public supergroup named `testgroup`.
    pub fn new() -> Self {
        Self {
            chat: ChatInfo {
                id: 1_500_000_000,
                title: "Test Group".to_string(),
                username: Some("testgroup".to_string()),
                kind: ChatKind::Supergroup,
            },
            messages: Vec::new(),
            fail_after: None,
        }
    }

    /// A private supergroup without a username.
    pub fn private(mut self) -> Self {
        self.chat.username = None;
        self
    }

    /// Photo whose "pixels" are `text`; the test extractor reads them back as OCR output.
    pub fn photo(self, id: MessageId, text: &str) -> Self {
        self.image(id, AttachmentKind::Photo, Download::Bytes(text.as_bytes().to_vec()))
    }

    /// Photo whose download fails.
    pub fn broken_photo(self, id: MessageId) -> Self {
        self.image(
            id,
            AttachmentKind::Photo,
            Download::Fails("connection reset".to_string()),
        )
    }

    /// Photo the extractor cannot read.
    pub fn unreadable_photo(self, id: MessageId) -> Self {
        self.image(
            id,
            AttachmentKind::Photo,
            Download::Bytes(UNREADABLE_IMAGE.to_vec()),
        )
    }

    /// Image sent as a file.
    pub fn image_document(self, id: MessageId, text: &str) -> Self {
        self.image(
            id,
            AttachmentKind::ImageDocument {
                mime_type: "image/png".to_string(),
            },
            Download::Bytes(text.as_bytes().to_vec()),
        )
    }

    /// Message with a non-image attachment.
    pub fn video(mut self, id: MessageId) -> Self {
        self.messages.push(ScriptedMessage {
            message: IncomingMessage {
                id,
                date: Some(date_for(id)),
                attachment: Some(Attachment {
                    kind: AttachmentKind::Other("video/mp4".to_string()),
                    handle: id,
                }),
            },
            download: Some(Download::Bytes(b"video".to_vec())),
        });
        self
    }

    /// Plain text message.
    pub fn text(mut self, id: MessageId) -> Self {
        self.messages.push(ScriptedMessage {
            message: IncomingMessage {
                id,
                date: Some(date_for(id)),
                attachment: None,
            },
            download: None,
        });
        self
    }

    /// Makes the stream fail once `count` messages have been served.
    pub fn stream_fails_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    fn image(mut self, id: MessageId, kind: AttachmentKind, download: Download) -> Self {
        self.messages.push(ScriptedMessage {
            message: IncomingMessage {
                id,
                date: Some(date_for(id)),
                attachment: Some(Attachment { kind, handle: id }),
            },
            download: Some(download),
        });
        self
    }

    pub fn build(mut self) -> MockSource {
        self.messages.sort_by(|a, b| b.message.id.cmp(&a.message.id));
        MockSource::new(self.chat, self.messages, self.fail_after)
    }
}

impl Default for ChatBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytes the test extractor rejects.
pub const UNREADABLE_IMAGE: &[u8] = b"\x00\x01 not an image";

/// Deterministic message date: one minute per id after 2024-01-01.
pub fn date_for(id: MessageId) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(id as i64)
}
