//! Telegram source: session handling, group resolution and message scanning.

pub mod auth;
pub mod client;
pub mod error;
pub mod group;
pub mod message;
pub mod source;

pub use auth::LoginPrompt;
pub use client::{ResolvedGroup, TelegramCredentials, TelegramMessages, TelegramSession};
pub use error::TelegramError;
pub use group::GroupRef;
pub use message::{Attachment, AttachmentKind, ChatInfo, ChatKind, IncomingMessage, MessageId};
pub use source::MessageSource;
