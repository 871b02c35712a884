//! Audit settings loaded from `~/.config/retro-audit/settings.toml`.
//!
//! Everything lives under an `[audit]` table:
//!
//! ```toml
//! [audit]
//! display_mode = "one_game_one_rom"
//! status_filter = ["have", "miss"]
//!
//! [audit.matching]
//! compare_extension = false
//! use_checksums = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use retro_audit_dat::MatchOptions;

use crate::display::{DisplayMode, StatusFilter};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid settings in {path}: {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Display and matching preferences for an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub display_mode: DisplayMode,
    pub status_filter: StatusFilter,
    pub matching: MatchOptions,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    audit: AuditConfig,
}

impl AuditConfig {
    /// Parse the `[audit]` table of a settings document. Other tables are ignored.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let file: SettingsFile = toml::from_str(contents)?;
        Ok(file.audit)
    }
}

/// Canonical path to the settings file: `~/.config/retro-audit/settings.toml`.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("retro-audit").join("settings.toml")
}

/// Load settings from `path`, or from [`settings_path`] when `None`.
///
/// A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<AuditConfig, ConfigError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(settings_path);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No settings at {}, using defaults", path.display());
            return Ok(AuditConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            });
        }
    };
    AuditConfig::from_toml_str(&contents).map_err(|source| ConfigError::Toml {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
