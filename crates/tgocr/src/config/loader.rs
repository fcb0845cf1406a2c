use std::path::{Path, PathBuf};

use regex::Regex;

use crate::config::schema::{Settings, CURRENT_VERSION};
use crate::error::ConfigError;

const CONFIG_FILE_NAMES: &[&str] = &["config.json", "config.yaml", "config.yml"];

pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let settings: Settings = match extension.as_str() {
        "json" => serde_json::from_str(&content)?,
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        other => return Err(ConfigError::UnsupportedExtension(other.to_string())),
    };

    validate_settings(&settings)?;

    Ok(settings)
}

/// Looks for `config.{json,yaml,yml}` under `<config_dir>/tgocr/`.
pub fn default_config_path() -> Option<PathBuf> {
    let dir = dirs::config_dir()?.join("tgocr");
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    if settings.version != CURRENT_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", settings.version),
        });
    }

    if let Some(group) = &settings.group {
        if group.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "group must not be empty".to_string(),
            });
        }
    }

    if let Some(api_id) = settings.telegram.api_id {
        if api_id <= 0 {
            return Err(ConfigError::Validation {
                message: format!("apiId must be positive, got {}", api_id),
            });
        }
    }

    if settings.ocr.languages.is_empty() {
        return Err(ConfigError::Validation {
            message: "at least one OCR language is required".to_string(),
        });
    }

    // Tesseract traineddata names: eng, chi_sim, deu_latf, ...
    let lang_pattern = Regex::new(r"^[A-Za-z]{2,3}(_[A-Za-z]+)*$").map_err(|e| {
        ConfigError::Validation {
            message: format!("Invalid language pattern: {}", e),
        }
    })?;
    for lang in &settings.ocr.languages {
        if !lang_pattern.is_match(lang) {
            return Err(ConfigError::Validation {
                message: format!("Invalid OCR language code '{}'", lang),
            });
        }
    }

    if !(70..=1200).contains(&settings.ocr.dpi) {
        return Err(ConfigError::Validation {
            message: format!("dpi must be between 70 and 1200, got {}", settings.ocr.dpi),
        });
    }

    if settings.output.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation {
            message: "output path must not be empty".to_string(),
        });
    }

    if let (Some(start), Some(before)) = (settings.scan.start_from_id, settings.scan.before_id) {
        if before <= start.saturating_add(1) {
            return Err(ConfigError::Validation {
                message: format!(
                    "beforeId ({}) leaves no messages above startFromId ({})",
                    before, start
                ),
            });
        }
    }

    Ok(())
}
