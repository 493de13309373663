//! Settings model for the termset profile resolver.
//!
//! This crate turns a built-in defaults document and a user settings document
//! into a validated snapshot of terminal profiles. It includes:
//!
//! - Profile and group types, layered from JSON fragments
//! - Multi-parent profile inheritance with cycle detection
//! - Dynamic profile generators
//! - The ordered validation pipeline and its warnings
//! - Color schemes, keybindings and palette commands
//! - Snapshot publication with coalesced hot reload
//! - Settings file watching

pub mod color_scheme;
pub mod commands;
pub mod env_vars;
pub mod error;
pub mod generator;
pub mod globals;
pub mod guid;
pub mod inheritance;
mod json;
mod layering;
pub mod keybindings;
pub mod profile_types;
pub mod settings;
pub mod sources;
pub mod store;
pub mod template;
pub mod validation;
#[cfg(feature = "watcher")]
pub mod watcher;

// Re-export main types for convenience
pub use error::{SettingsLoadError, SettingsLoadWarning};
pub use guid::Guid;
pub use settings::{CascadeSettings, DEFAULTS_JSON, LoadOutcome, SettingsLoader};
pub use sources::SettingsSources;
// Profile model
pub use profile_types::{Profile, ProfileEntry, ProfileGroup, ProfileSettings};
// Generators
pub use generator::{ProfileDraft, ProfileGenerator};
// Globals
pub use color_scheme::{Color, ColorScheme};
pub use commands::Command;
pub use globals::GlobalAppSettings;
pub use keybindings::{ActionAndArgs, KeyChord, KeyMapping, ShortcutAction};
// Publication and reload
pub use store::{RELOAD_QUIESCE, ReloadCoordinator, ReloadReport, SettingsStore};
// First-run template
pub use template::{DEFAULT_PROFILE_GUID, USER_SETTINGS_TEMPLATE, render_settings_template};
#[cfg(feature = "watcher")]
pub use watcher::SettingsWatcher;
