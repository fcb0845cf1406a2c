//! Parsing of user-supplied group identifiers.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::error::{Result, TelegramError};

/// How the user named the group to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupRef {
    /// Public username, without the leading `@`.
    Username(String),
    /// Numeric chat id; resolved by looking through the account's dialogs.
    Id(i64),
}

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:https?://)?(?:t\.me|telegram\.me)/(?:s/)?([A-Za-z0-9_]+)/?(?:\d+)?/?$")
            .expect("valid t.me link pattern")
    })
}

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9_]{3,31}$").expect("valid username pattern")
    })
}

impl GroupRef {
    /// Accepts `@name`, `name`, `https://t.me/name` and numeric ids
    /// (including the `-100...` form used by bots and exports).
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();

        if let Ok(id) = trimmed.parse::<i64>() {
            return Ok(GroupRef::Id(normalize_chat_id(id)));
        }

        let candidate = match link_pattern().captures(trimmed) {
            Some(caps) => caps[1].to_string(),
            None => trimmed.trim_start_matches('@').to_string(),
        };

        if username_pattern().is_match(&candidate) {
            Ok(GroupRef::Username(candidate))
        } else {
            Err(TelegramError::InvalidGroup(input.to_string()))
        }
    }
}

/// Strips the `-100` channel prefix and the `-` basic-group sign so the id
/// can be compared with the bare ids the client library reports.
fn normalize_chat_id(id: i64) -> i64 {
    const CHANNEL_PREFIX: i64 = -1_000_000_000_000;
    if id < CHANNEL_PREFIX {
        CHANNEL_PREFIX - id
    } else {
        id.abs()
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupRef::Username(name) => write!(f, "@{}", name),
            GroupRef::Id(id) => write!(f, "{}", id),
        }
    }
}
