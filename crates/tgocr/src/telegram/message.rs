//! Library-independent view of scanned messages and their attachments.

use chrono::{DateTime, Utc};

/// Telegram message ids are 32-bit and unique within one chat.
pub type MessageId = i32;

/// What kind of chat the scan runs against; decides how links are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// Legacy small group. Messages have no public link.
    BasicGroup,
    /// Supergroup (megagroup or gigagroup).
    Supergroup,
    /// Broadcast channel.
    Channel,
    /// One-to-one chat with a user or bot.
    User,
}

/// The resolved target chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInfo {
    pub id: i64,
    pub title: String,
    pub username: Option<String>,
    pub kind: ChatKind,
}

impl ChatInfo {
    /// Builds a link to one message in this chat.
    ///
    /// Public chats get `https://t.me/<username>/<id>`, private supergroups
    /// and channels get `https://t.me/c/<chat_id>/<id>`, everything else an
    /// empty string.
    pub fn message_link(&self, message_id: MessageId) -> String {
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            return format!("https://t.me/{}/{}", username, message_id);
        }

        match self.kind {
            ChatKind::Supergroup | ChatKind::Channel => {
                format!("https://t.me/c/{}/{}", self.id, message_id)
            }
            ChatKind::BasicGroup | ChatKind::User => String::new(),
        }
    }
}

/// Classification of a message's media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Compressed photo.
    Photo,
    /// File sent as a document whose type is an image.
    ImageDocument { mime_type: String },
    /// Any other media (video, sticker, audio, poll, non-image file, ...).
    Other(String),
}

impl AttachmentKind {
    pub fn is_image(&self) -> bool {
        matches!(
            self,
            AttachmentKind::Photo | AttachmentKind::ImageDocument { .. }
        )
    }

    /// Classifies a document from its declared MIME type, falling back to
    /// a guess from the file name when Telegram did not send one.
    pub fn for_document(mime_type: Option<&str>, file_name: &str) -> Self {
        let declared = mime_type
            .map(|m| m.trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty() && m != "application/octet-stream");

        let mime = match declared {
            Some(mime) => mime,
            None => match mime_guess::from_path(file_name).first() {
                Some(guess) => guess.essence_str().to_string(),
                None => return AttachmentKind::Other("document".to_string()),
            },
        };

        if mime.starts_with("image/") {
            AttachmentKind::ImageDocument { mime_type: mime }
        } else {
            AttachmentKind::Other(mime)
        }
    }
}

/// A message's media together with the handle needed to download it.
#[derive(Debug, Clone)]
pub struct Attachment<H> {
    pub kind: AttachmentKind,
    pub handle: H,
}

/// One message from the scanned chat.
#[derive(Debug, Clone)]
pub struct IncomingMessage<H> {
    pub id: MessageId,
    pub date: Option<DateTime<Utc>>,
    pub attachment: Option<Attachment<H>>,
}

impl<H> IncomingMessage<H> {
    /// Returns the attachment if it is an image worth processing.
    pub fn image(&self) -> Option<&Attachment<H>> {
        self.attachment.as_ref().filter(|a| a.kind.is_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(username: Option<&str>, kind: ChatKind) -> ChatInfo {
        ChatInfo {
            id: 1234567890,
            title: "Test".to_string(),
            username: username.map(str::to_string),
            kind,
        }
    }

    #[test]
    fn test_public_link() {
        let chat = chat(Some("somegroup"), ChatKind::Supergroup);
        assert_eq!(chat.message_link(42), "https://t.me/somegroup/42");
    }

    #[test]
    fn test_private_supergroup_link() {
        let chat = chat(None, ChatKind::Supergroup);
        assert_eq!(chat.message_link(42), "https://t.me/c/1234567890/42");
    }

    #[test]
    fn test_private_channel_link() {
        let chat = chat(Some(""), ChatKind::Channel);
        assert_eq!(chat.message_link(7), "https://t.me/c/1234567890/7");
    }

    #[test]
    fn test_basic_group_has_no_link() {
        let chat = chat(None, ChatKind::BasicGroup);
        assert_eq!(chat.message_link(42), "");
    }

    #[test]
    fn test_document_with_image_mime() {
        let kind = AttachmentKind::for_document(Some("image/PNG"), "scan.bin");
        assert_eq!(
            kind,
            AttachmentKind::ImageDocument {
                mime_type: "image/png".to_string()
            }
        );
        assert!(kind.is_image());
    }

    #[test]
    fn test_document_guessed_from_name() {
        let kind = AttachmentKind::for_document(None, "receipt.jpg");
        assert!(kind.is_image());

        let kind = AttachmentKind::for_document(Some("application/octet-stream"), "photo.webp");
        assert!(kind.is_image());
    }

    #[test]
    fn test_non_image_document() {
        let kind = AttachmentKind::for_document(Some("application/pdf"), "report.pdf");
        assert_eq!(kind, AttachmentKind::Other("application/pdf".to_string()));
        assert!(!kind.is_image());

        let kind = AttachmentKind::for_document(None, "noextension");
        assert!(!kind.is_image());
    }

    #[test]
    fn test_image_filter_on_message() {
        let with_photo = IncomingMessage {
            id: 1,
            date: None,
            attachment: Some(Attachment {
                kind: AttachmentKind::Photo,
                handle: (),
            }),
        };
        assert!(with_photo.image().is_some());

        let with_video = IncomingMessage {
            id: 2,
            date: None,
            attachment: Some(Attachment {
                kind: AttachmentKind::Other("video/mp4".to_string()),
                handle: (),
            }),
        };
        assert!(with_video.image().is_none());

        let text_only: IncomingMessage<()> = IncomingMessage {
            id: 3,
            date: None,
            attachment: None,
        };
        assert!(text_only.image().is_none());
    }
}
