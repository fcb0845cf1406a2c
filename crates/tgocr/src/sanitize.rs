//! Helpers for sanitizing data before it enters log lines and span fields.
//!
//! Logs are meant to be pasteable into bug reports, so phone numbers and full
//! filesystem paths never appear in them verbatim.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Masks all but the leading country-code digits and the last two digits.
///
/// - `+380501234567` → `+380*******67`
/// - `12` → `**`
pub fn redact_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= 5 {
        return "*".repeat(digits.len());
    }

    let head: String = digits[..3].iter().collect();
    let tail: String = digits[digits.len() - 2..].iter().collect();
    let prefix = if phone.trim_start().starts_with('+') {
        "+"
    } else {
        ""
    };
    format!("{}{}{}{}", prefix, head, "*".repeat(digits.len() - 5), tail)
}
