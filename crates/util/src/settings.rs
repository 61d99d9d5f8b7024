//! Operator settings for the Certloom CLI.
//!
//! A small JSON file holding the preferred message locale, a default log
//! filter and the default host kind. The file lives in the standard
//! configuration directory (`~/.config/certloom/settings.json` on most
//! platforms) unless `CERTLOOM_SETTINGS_PATH` points elsewhere. A missing file
//! yields defaults; a malformed file is logged and also yields defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use certloom_types::{HostKind, Locale};
use dirs_next::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::expand_tilde;

/// Environment variable overriding the settings file path.
pub const SETTINGS_PATH_ENV: &str = "CERTLOOM_SETTINGS_PATH";

/// Environment variable overriding the configured locale.
pub const LOCALE_ENV: &str = "CERTLOOM_LOCALE";

pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persisted settings values.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Locale tag such as `en-US` or `zh`.
    pub locale: Option<String>,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
    pub default_host: Option<HostKind>,
}

impl Settings {
    /// Loads settings from the default location, applying environment overrides.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(&default_settings_path())
    }

    /// Loads settings from `path`, applying environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let mut settings = load_payload(path)?;
        if let Ok(locale) = env::var(LOCALE_ENV)
            && !locale.trim().is_empty()
        {
            settings.locale = Some(locale.trim().to_string());
        }
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// The configured locale; unknown tags fall back to the default with a warning.
    pub fn locale(&self) -> Locale {
        let Some(tag) = self.locale.as_deref() else {
            return Locale::default();
        };
        tag.parse().unwrap_or_else(|error| {
            warn!(locale = %tag, error = %error, "unsupported locale in settings; using default");
            Locale::default()
        })
    }

    pub fn host(&self) -> HostKind {
        self.default_host.unwrap_or(HostKind::Access)
    }
}

/// Settings file path, honouring [`SETTINGS_PATH_ENV`].
pub fn default_settings_path() -> PathBuf {
    if let Ok(path) = env::var(SETTINGS_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return expand_tilde(trimmed);
        }
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("certloom")
        .join(SETTINGS_FILE_NAME)
}

fn load_payload(path: &Path) -> Result<Settings, SettingsError> {
    match fs::read_to_string(path) {
        Ok(data) => match serde_json::from_str(&data) {
            Ok(settings) => Ok(settings),
            Err(error) => {
                warn!(
                    path = %path.display(),
                    error = %error,
                    "Failed to parse settings file; using defaults"
                );
                Ok(Settings::default())
            }
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
        Err(error) => Err(SettingsError::Io(error)),
    }
}
