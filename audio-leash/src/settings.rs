//! Persisted user settings.
//!
//! The pinned device ID is stored as JSON in the settings directory. Loading
//! and saving through [`JsonSelectionStore`] is best-effort: failures are
//! logged and never reach the selection logic.

use crate::bridge::SelectionStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Settings file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Pinned playback device ID
    #[serde(default)]
    pub selected_device_id: Option<String>,
}

/// Settings service error types.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings directory unavailable (APPDATA not set)")]
    NoSettingsDirectory,

    #[error("Settings file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read settings from `path`. A missing file yields defaults.
pub fn load(path: &Path) -> Result<Settings, SettingsError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
        Err(e) => Err(e.into()),
    }
}

/// Write settings to `path`, creating the parent directory.
///
/// The file is written beside the target and renamed over it, so a crash
/// never leaves a truncated file behind.
pub fn save(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(settings)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// [`SelectionStore`] backed by a JSON settings file.
#[derive(Debug, Clone)]
pub struct JsonSelectionStore {
    path: PathBuf,
}

impl JsonSelectionStore {
    /// Store at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `%APPDATA%\AudioLeash\settings.json`.
    pub fn in_settings_dir() -> Result<Self, SettingsError> {
        let dir = crate::config::settings_dir().ok_or(SettingsError::NoSettingsDirectory)?;
        Ok(Self::new(dir.join(crate::config::SETTINGS_FILE_NAME)))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SelectionStore for JsonSelectionStore {
    fn load_selected_device_id(&self) -> Option<String> {
        match load(&self.path) {
            Ok(settings) => settings.selected_device_id,
            Err(e) => {
                warn!(path = %self.path.display(), "Failed to load settings: {e}");
                None
            }
        }
    }

    fn save_selected_device_id(&self, device_id: Option<&str>) {
        let settings = Settings {
            selected_device_id: device_id.map(str::to_string),
        };
        if let Err(e) = save(&self.path, &settings) {
            warn!(path = %self.path.display(), "Failed to save settings: {e}");
        }
    }
}
