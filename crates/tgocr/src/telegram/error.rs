//! Telegram session error types.

use thiserror::Error;

use super::message::MessageId;

/// Errors raised while talking to Telegram.
#[derive(Error, Debug)]
pub enum TelegramError {
    /// The API id is missing or not a number.
    #[error("Telegram API id is required (pass --api-id or set TELEGRAM_API_ID)")]
    MissingApiId,

    /// Could not reach Telegram or load the session file.
    #[error("Failed to connect to Telegram: {0}")]
    ConnectionFailed(String),

    /// The API id/hash pair was rejected.
    #[error("Invalid API id or API hash")]
    InvalidApiCredentials,

    /// Sign-in did not succeed.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The session is not authorized and no interactive login is possible.
    #[error("Session is not authorized and no phone number is available for login")]
    NotAuthorized,

    /// Reading an answer from the interactive prompt failed.
    #[error("Failed to read login input: {0}")]
    Prompt(#[source] std::io::Error),

    /// The group identifier could not be parsed.
    #[error("Invalid group identifier '{0}'")]
    InvalidGroup(String),

    /// The group does not exist.
    #[error("The group '{0}' does not exist")]
    GroupNotFound(String),

    /// The group exists but this account cannot read it.
    #[error("The group '{0}' is private or you don't have access")]
    GroupInaccessible(String),

    /// Telegram asked us to slow down.
    #[error("Flood wait: Telegram requires waiting {seconds} seconds")]
    FloodWait { seconds: u32 },

    /// Any other RPC or transport failure.
    #[error("Telegram request failed: {0}")]
    Request(String),

    /// Downloading one attachment failed.
    #[error("Failed to download attachment of message {message_id}: {reason}")]
    Download {
        message_id: MessageId,
        reason: String,
    },

    /// Persisting the session file failed.
    #[error("Failed to save session file: {0}")]
    SessionSave(#[source] std::io::Error),
}

impl From<grammers_client::InvocationError> for TelegramError {
    fn from(err: grammers_client::InvocationError) -> Self {
        use grammers_client::InvocationError;

        match &err {
            InvocationError::Rpc(rpc) => match rpc.name.as_str() {
                "FLOOD_WAIT" | "FLOOD_PREMIUM_WAIT" => TelegramError::FloodWait {
                    seconds: rpc.value.unwrap_or(0),
                },
                "API_ID_INVALID" | "API_ID_PUBLISHED_FLOOD" => {
                    TelegramError::InvalidApiCredentials
                }
                "AUTH_KEY_UNREGISTERED" | "SESSION_REVOKED" | "USER_DEACTIVATED" => {
                    TelegramError::AuthenticationFailed(err.to_string())
                }
                _ => TelegramError::Request(err.to_string()),
            },
            _ => TelegramError::Request(err.to_string()),
        }
    }
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;
