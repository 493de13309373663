//! Settings file locations and file I/O.
//!
//! The model crate never touches the disk; this module reads the documents it
//! resolves and writes the first-run settings file.

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use termset_model::{DEFAULTS_JSON, SettingsLoadError, SettingsSources};

/// File name of the user settings document
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// File name of the optional defaults override
pub const DEFAULTS_FILE_NAME: &str = "defaults.json";

/// Get the configuration directory path (using XDG convention)
pub fn config_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("termset")
        } else {
            PathBuf::from(".")
        }
    }
    #[cfg(not(target_os = "windows"))]
    {
        if let Some(home_dir) = dirs::home_dir() {
            home_dir.join(".config").join("termset")
        } else {
            PathBuf::from(".")
        }
    }
}

/// Where a run reads its documents from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsPaths {
    pub settings: PathBuf,
    /// Defaults override. The embedded document is used when this is `None`
    /// or the file does not exist.
    pub defaults: Option<PathBuf>,
}

impl Default for SettingsPaths {
    fn default() -> Self {
        let dir = config_dir();
        Self {
            settings: dir.join(SETTINGS_FILE_NAME),
            defaults: Some(dir.join(DEFAULTS_FILE_NAME)),
        }
    }
}

impl SettingsPaths {
    /// Default locations with command-line overrides applied.
    pub fn with_overrides(settings: Option<PathBuf>, defaults: Option<PathBuf>) -> Self {
        let base = Self::default();
        Self {
            settings: settings.unwrap_or(base.settings),
            defaults: defaults.or(base.defaults),
        }
    }

    /// Read both documents. A missing user file is an empty document.
    pub fn read_sources(&self) -> Result<SettingsSources, SettingsLoadError> {
        self.read(true)
    }

    /// Read the defaults document alone, with an empty user document.
    pub fn read_defaults(&self) -> Result<SettingsSources, SettingsLoadError> {
        self.read(false)
    }

    fn read(&self, include_user: bool) -> Result<SettingsSources, SettingsLoadError> {
        let io_error = |e: anyhow::Error| SettingsLoadError::Unknown(format!("{e:#}"));

        let defaults_text = match &self.defaults {
            Some(path) => read_optional(path).map_err(io_error)?,
            None => None,
        };
        let user_text = if include_user {
            read_optional(&self.settings).map_err(io_error)?
        } else {
            None
        };

        SettingsSources::parse(
            defaults_text.as_deref().unwrap_or(DEFAULTS_JSON),
            user_text.as_deref(),
        )
    }
}

/// Read a file that may legitimately be absent.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Write `contents` to `path` without ever leaving a half-written file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    // Create parent directory if it doesn't exist
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    // Atomic save: write to temp file then rename to prevent corruption on crash
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, contents)
        .with_context(|| format!("Failed to write {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
