//! Interactive sign-in for a fresh session file.

use grammers_client::{Client, SignInError};
use log::{info, warn};

use crate::sanitize::redact_phone;

use super::error::{Result, TelegramError};

/// Source of the answers a first-time login needs.
///
/// The CLI reads them from the terminal; tests can script them.
pub trait LoginPrompt: Send + Sync {
    /// Phone number in international format, asked only when none was configured.
    fn phone(&self) -> std::io::Result<String>;

    /// The login code Telegram sent to the account's other sessions.
    fn code(&self) -> std::io::Result<String>;

    /// The two-step verification password.
    fn password(&self, hint: Option<&str>) -> std::io::Result<String>;
}

/// Signs the client in if its session is not authorized yet.
///
/// Returns `true` when a new login happened and the session should be saved.
pub(crate) async fn ensure_authorized(
    client: &Client,
    phone: Option<&str>,
    prompt: &dyn LoginPrompt,
) -> Result<bool> {
    if client.is_authorized().await? {
        return Ok(false);
    }

    let phone = match phone.map(str::trim).filter(|p| !p.is_empty()) {
        Some(phone) => phone.to_string(),
        None => {
            let answer = prompt.phone().map_err(TelegramError::Prompt)?;
            let answer = answer.trim().to_string();
            if answer.is_empty() {
                return Err(TelegramError::NotAuthorized);
            }
            answer
        }
    };

    info!("Requesting login code for {}", redact_phone(&phone));
    let token = client
        .request_login_code(&phone)
        .await
        .map_err(|e| classify_auth_failure(e.to_string()))?;

    let code = prompt.code().map_err(TelegramError::Prompt)?;

    match client.sign_in(&token, code.trim()).await {
        Ok(_) => {}
        Err(SignInError::PasswordRequired(password_token)) => {
            let password = prompt
                .password(password_token.hint())
                .map_err(TelegramError::Prompt)?;
            client
                .check_password(password_token, password.trim())
                .await
                .map_err(|e| TelegramError::AuthenticationFailed(e.to_string()))?;
        }
        Err(SignInError::SignUpRequired { .. }) => {
            warn!("Phone number {} has no Telegram account", redact_phone(&phone));
            return Err(TelegramError::AuthenticationFailed(
                "no account is registered for this phone number".to_string(),
            ));
        }
        Err(e) => return Err(TelegramError::AuthenticationFailed(e.to_string())),
    }

    info!("Signed in to Telegram");
    Ok(true)
}

/// Maps an authorization failure message to the closest error variant.
pub(crate) fn classify_auth_failure(message: String) -> TelegramError {
    if message.contains("API_ID_INVALID") || message.contains("API_ID_PUBLISHED_FLOOD") {
        TelegramError::InvalidApiCredentials
    } else {
        TelegramError::AuthenticationFailed(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_invalid_api_id() {
        let err = classify_auth_failure("rpc error 400: API_ID_INVALID caused by auth.sendCode".into());
        assert!(matches!(err, TelegramError::InvalidApiCredentials));
    }

    #[test]
    fn test_classify_other_failure() {
        let err = classify_auth_failure("rpc error 400: PHONE_NUMBER_INVALID".into());
        match err {
            TelegramError::AuthenticationFailed(msg) => assert!(msg.contains("PHONE_NUMBER_INVALID")),
            _ => panic!("Expected AuthenticationFailed"),
        }
    }
}
