//! Shared integration test helpers for termset.
//!
//! Include this module at the top of each test file that needs it:
//!
//! ```ignore
//! mod common;
//! use common::{TestContext, paths_in};
//! ```

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use termset::cli::RuntimeOptions;
use termset::paths::SettingsPaths;

/// Settings and defaults paths inside `dir`. Neither file is created.
pub fn paths_in(dir: &Path) -> SettingsPaths {
    SettingsPaths {
        settings: dir.join("settings.json"),
        defaults: Some(dir.join("defaults.json")),
    }
}

/// A temp directory holding a settings file, kept alive for the test.
pub struct TestContext {
    pub temp_dir: TempDir,
    pub paths: SettingsPaths,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let paths = paths_in(temp_dir.path());
        Self { temp_dir, paths }
    }

    /// Context whose user settings file holds `settings`.
    pub fn with_settings(settings: &str) -> Self {
        let context = Self::new();
        context.write_settings(settings);
        context
    }

    pub fn write_settings(&self, settings: &str) {
        fs::write(&self.paths.settings, settings).expect("Failed to write settings");
    }

    pub fn write_defaults(&self, defaults: &str) {
        let path = self
            .paths
            .defaults
            .clone()
            .expect("defaults path is set");
        fs::write(path, defaults).expect("Failed to write defaults");
    }

    pub fn settings_path(&self) -> PathBuf {
        self.paths.settings.clone()
    }

    /// Options for a run against this context without generators.
    pub fn options(&self) -> RuntimeOptions {
        RuntimeOptions {
            paths: self.paths.clone(),
            generators: false,
            log_level: None,
        }
    }
}
