use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::secrets::API_HASH_ENV_VAR;

pub const CURRENT_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: String,
    /// `@username`, `username`, `https://t.me/username` or a numeric chat id.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub telegram: TelegramSettings,
    #[serde(default)]
    pub ocr: OcrSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub scan: ScanSettings,
}

fn default_version() -> String {
    CURRENT_VERSION.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            group: None,
            telegram: TelegramSettings::default(),
            ocr: OcrSettings::default(),
            output: OutputSettings::default(),
            scan: ScanSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramSettings {
    #[serde(default)]
    pub api_id: Option<i32>,
    /// Plain-text API hash. Prefer `apiHashFile` or `apiHashEnvVar`.
    #[serde(default)]
    pub api_hash_insecure: Option<String>,
    #[serde(default)]
    pub api_hash_file: Option<String>,
    #[serde(default = "default_api_hash_env_var")]
    pub api_hash_env_var: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
}

fn default_api_hash_env_var() -> Option<String> {
    Some(API_HASH_ENV_VAR.to_string())
}

fn default_session_file() -> PathBuf {
    PathBuf::from("tgocr.session")
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            api_id: None,
            api_hash_insecure: None,
            api_hash_file: None,
            api_hash_env_var: default_api_hash_env_var(),
            phone: None,
            session_file: default_session_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrSettings {
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

fn default_languages() -> Vec<String> {
    vec!["ukr".to_string(), "rus".to_string()]
}

fn default_dpi() -> u32 {
    300
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            dpi: default_dpi(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSettings {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("parsed_data.xlsx")
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSettings {
    /// Maximum number of images to process. `None` or `0` means no cap.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Messages with an id at or below this value are never processed.
    #[serde(default)]
    pub start_from_id: Option<i32>,
    /// Scanning starts strictly below this id instead of at the newest message.
    #[serde(default)]
    pub before_id: Option<i32>,
}

impl ScanSettings {
    /// The image cap with `0` folded into "unlimited".
    pub fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|&n| n > 0)
    }
}

/// Values supplied on the command line. Each `Some` replaces the
/// corresponding settings value.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub group: Option<String>,
    pub api_id: Option<i32>,
    pub api_hash: Option<String>,
    pub api_hash_file: Option<String>,
    pub phone: Option<String>,
    pub session_file: Option<PathBuf>,
    pub languages: Option<Vec<String>>,
    pub dpi: Option<u32>,
    pub output: Option<PathBuf>,
    pub limit: Option<usize>,
    pub start_from_id: Option<i32>,
    pub before_id: Option<i32>,
}

impl Settings {
    pub fn apply(mut self, overrides: SettingsOverrides) -> Self {
        if let Some(group) = overrides.group {
            self.group = Some(group);
        }
        if let Some(api_id) = overrides.api_id {
            self.telegram.api_id = Some(api_id);
        }
        if let Some(hash) = overrides.api_hash {
            self.telegram.api_hash_insecure = Some(hash);
        }
        if let Some(file) = overrides.api_hash_file {
            self.telegram.api_hash_file = Some(file);
        }
        if let Some(phone) = overrides.phone {
            self.telegram.phone = Some(phone);
        }
        if let Some(session_file) = overrides.session_file {
            self.telegram.session_file = session_file;
        }
        if let Some(languages) = overrides.languages {
            if !languages.is_empty() {
                self.ocr.languages = languages;
            }
        }
        if let Some(dpi) = overrides.dpi {
            self.ocr.dpi = dpi;
        }
        if let Some(output) = overrides.output {
            self.output.path = output;
        }
        if let Some(limit) = overrides.limit {
            self.scan.limit = Some(limit);
        }
        if let Some(id) = overrides.start_from_id {
            self.scan.start_from_id = Some(id);
        }
        if let Some(id) = overrides.before_id {
            self.scan.before_id = Some(id);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.ocr.languages, vec!["ukr", "rus"]);
        assert_eq!(settings.ocr.dpi, 300);
        assert_eq!(settings.output.path, PathBuf::from("parsed_data.xlsx"));
        assert_eq!(settings.telegram.session_file, PathBuf::from("tgocr.session"));
        assert_eq!(
            settings.telegram.api_hash_env_var.as_deref(),
            Some("TELEGRAM_API_HASH")
        );
        assert_eq!(settings.scan.effective_limit(), None);
    }

    #[test]
    fn test_zero_limit_is_unlimited() {
        let scan = ScanSettings {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(scan.effective_limit(), None);

        let scan = ScanSettings {
            limit: Some(6),
            ..Default::default()
        };
        assert_eq!(scan.effective_limit(), Some(6));
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut settings = Settings::default();
        settings.group = Some("from_file".to_string());
        settings.scan.limit = Some(10);

        let merged = settings.apply(SettingsOverrides {
            group: Some("from_cli".to_string()),
            languages: Some(vec!["eng".to_string()]),
            ..Default::default()
        });

        assert_eq!(merged.group.as_deref(), Some("from_cli"));
        assert_eq!(merged.ocr.languages, vec!["eng"]);
        assert_eq!(merged.scan.limit, Some(10));
    }

    #[test]
    fn test_empty_language_override_keeps_existing() {
        let merged = Settings::default().apply(SettingsOverrides {
            languages: Some(Vec::new()),
            ..Default::default()
        });
        assert_eq!(merged.ocr.languages, vec!["ukr", "rus"]);
    }
}
