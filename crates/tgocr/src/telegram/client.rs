//! Telegram user session built on the grammers MTProto client.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use grammers_client::types::{Chat, Downloadable, Media};
use grammers_client::{Client, Config, InitParams, InvocationError};
use grammers_session::{PackedType, Session};
use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};

use crate::sanitize::redact_path;

use super::auth::{classify_auth_failure, ensure_authorized, LoginPrompt};
use super::error::{Result, TelegramError};
use super::group::GroupRef;
use super::message::{Attachment, AttachmentKind, ChatInfo, ChatKind, IncomingMessage, MessageId};
use super::source::MessageSource;

/// What is needed to open a session.
pub struct TelegramCredentials {
    pub api_id: i32,
    pub api_hash: SecretString,
    pub phone: Option<String>,
    pub session_file: PathBuf,
}

/// An authorized Telegram session.
///
/// Open it once per run with [`TelegramSession::open`] and release it with
/// [`TelegramSession::close`]. If it is dropped without `close`, the session
/// file is still saved on a best-effort basis.
pub struct TelegramSession {
    client: Client,
    session_file: PathBuf,
    closed: bool,
}

/// A group resolved to a concrete chat.
pub struct ResolvedGroup {
    chat: Chat,
    info: ChatInfo,
}

impl ResolvedGroup {
    pub fn info(&self) -> &ChatInfo {
        &self.info
    }
}

impl TelegramSession {
    /// Connects, signing in interactively if the session file is new.
    pub async fn open(credentials: &TelegramCredentials, prompt: &dyn LoginPrompt) -> Result<Self> {
        if credentials.api_id <= 0 {
            return Err(TelegramError::MissingApiId);
        }

        let session = Session::load_file_or_create(&credentials.session_file).map_err(|e| {
            TelegramError::ConnectionFailed(format!(
                "cannot load session file '{}': {}",
                redact_path(&credentials.session_file),
                e
            ))
        })?;

        info!("Connecting to Telegram");
        let client = Client::connect(Config {
            session,
            api_id: credentials.api_id,
            api_hash: credentials.api_hash.expose_secret().to_string(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| match classify_auth_failure(e.to_string()) {
            TelegramError::InvalidApiCredentials => TelegramError::InvalidApiCredentials,
            _ => TelegramError::ConnectionFailed(e.to_string()),
        })?;

        let session = Self {
            client,
            session_file: credentials.session_file.clone(),
            closed: false,
        };

        if ensure_authorized(&session.client, credentials.phone.as_deref(), prompt).await? {
            session.save()?;
        }

        Ok(session)
    }

    /// Resolves a group by username or by numeric id among the account's dialogs.
    pub async fn resolve_group(&self, group: &GroupRef) -> Result<ResolvedGroup> {
        let label = group.to_string();

        let chat = match group {
            GroupRef::Username(name) => match self.client.resolve_username(name).await {
                Ok(Some(chat)) => chat,
                Ok(None) => return Err(TelegramError::GroupNotFound(label)),
                Err(e) => return Err(map_group_error(e, &label)),
            },
            GroupRef::Id(id) => self.find_dialog(*id, &label).await?,
        };

        let info = chat_info(&chat);
        if info.kind == ChatKind::User {
            warn!("'{}' resolves to a user, not a group", label);
        }
        info!("Connected to group: {}", info.title);

        Ok(ResolvedGroup { chat, info })
    }

    async fn find_dialog(&self, id: i64, label: &str) -> Result<Chat> {
        let mut dialogs = self.client.iter_dialogs();
        while let Some(dialog) = dialogs.next().await.map_err(|e| map_group_error(e, label))? {
            if dialog.chat().id() == id {
                return Ok(dialog.chat().clone());
            }
        }
        Err(TelegramError::GroupNotFound(label.to_string()))
    }

    /// Starts a newest-first scan of the group, optionally strictly below `before_id`.
    pub fn messages(&self, group: &ResolvedGroup, before_id: Option<MessageId>) -> TelegramMessages {
        let mut iter = self.client.iter_messages(group.chat.pack());
        if let Some(before_id) = before_id {
            iter = iter.offset_id(before_id);
        }

        TelegramMessages {
            client: self.client.clone(),
            iter,
            info: group.info.clone(),
        }
    }

    /// Saves the session file and releases the session.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.save()
    }

    fn save(&self) -> Result<()> {
        save_session(&self.client, &self.session_file)
    }
}

impl Drop for TelegramSession {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.save() {
                warn!("{}", e);
            }
        }
    }
}

fn save_session(client: &Client, path: &Path) -> Result<()> {
    client
        .session()
        .save_to_file(path)
        .map_err(TelegramError::SessionSave)?;
    debug!("Saved session to {}", redact_path(path));
    Ok(())
}

/// Message stream for one resolved group.
pub struct TelegramMessages {
    client: Client,
    iter: grammers_client::client::messages::MessageIter,
    info: ChatInfo,
}

#[async_trait]
impl MessageSource for TelegramMessages {
    type Handle = Media;

    fn chat(&self) -> &ChatInfo {
        &self.info
    }

    async fn next_message(&mut self) -> Result<Option<IncomingMessage<Media>>> {
        let message = match self.iter.next().await {
            Ok(Some(message)) => message,
            Ok(None) => return Ok(None),
            Err(e) => return Err(map_group_error(e, &self.info.title)),
        };

        let attachment = message.media().map(|media| Attachment {
            kind: classify_media(&media),
            handle: media,
        });

        Ok(Some(IncomingMessage {
            id: message.id(),
            date: Some(message.date()),
            attachment,
        }))
    }

    async fn fetch_attachment(&mut self, message_id: MessageId, handle: &Media) -> Result<Vec<u8>> {
        let mut download = self.client.iter_download(&Downloadable::Media(handle.clone()));
        let mut bytes = Vec::new();

        loop {
            match download.next().await {
                Ok(Some(chunk)) => bytes.extend(chunk),
                Ok(None) => break,
                Err(e) => {
                    return Err(TelegramError::Download {
                        message_id,
                        reason: e.to_string(),
                    })
                }
            }
        }

        if bytes.is_empty() {
            return Err(TelegramError::Download {
                message_id,
                reason: "attachment is empty".to_string(),
            });
        }

        debug!("Downloaded {} bytes from message {}", bytes.len(), message_id);
        Ok(bytes)
    }
}

fn classify_media(media: &Media) -> AttachmentKind {
    match media {
        Media::Photo(_) => AttachmentKind::Photo,
        Media::Document(document) => {
            AttachmentKind::for_document(document.mime_type(), document.name())
        }
        Media::Sticker(_) => AttachmentKind::Other("sticker".to_string()),
        _ => AttachmentKind::Other("media".to_string()),
    }
}

fn chat_info(chat: &Chat) -> ChatInfo {
    let kind = match chat.pack().ty {
        PackedType::Chat => ChatKind::BasicGroup,
        PackedType::Megagroup | PackedType::Gigagroup => ChatKind::Supergroup,
        PackedType::Broadcast => ChatKind::Channel,
        _ => ChatKind::User,
    };

    ChatInfo {
        id: chat.id(),
        title: chat.name().to_string(),
        username: chat.username().map(str::to_string),
        kind,
    }
}

/// Maps errors from group lookup and history reads, naming the group.
fn map_group_error(err: InvocationError, label: &str) -> TelegramError {
    if let InvocationError::Rpc(rpc) = &err {
        match rpc.name.as_str() {
            "USERNAME_NOT_OCCUPIED" | "USERNAME_INVALID" | "CHANNEL_INVALID" | "PEER_ID_INVALID" => {
                return TelegramError::GroupNotFound(label.to_string())
            }
            "CHANNEL_PRIVATE" | "CHAT_FORBIDDEN" | "CHAT_ADMIN_REQUIRED" => {
                return TelegramError::GroupInaccessible(label.to_string())
            }
            _ => {}
        }
    }
    TelegramError::from(err)
}
