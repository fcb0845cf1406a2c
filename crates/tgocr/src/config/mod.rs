pub mod loader;
pub mod schema;

pub use loader::{default_config_path, load_settings, validate_settings};
pub use schema::{
    OcrSettings, OutputSettings, ScanSettings, Settings, SettingsOverrides, TelegramSettings,
};
