//! Typed errors and warnings produced while loading settings.
//!
//! Two disjoint classes come out of a load:
//!
//! - [`SettingsLoadError`]: fatal. The pipeline stops and the caller keeps the
//!   running configuration (reload) or falls back to the built-in defaults
//!   (first load).
//! - [`SettingsLoadWarning`]: collected in order and returned next to the
//!   resolved settings, which remain usable.

use serde::Serialize;
use thiserror::Error;

/// Fatal conditions that abort a settings load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsLoadError {
    /// Neither document defined a single profile.
    #[error("no profiles were found in the settings")]
    NoProfiles,

    /// Every profile was hidden, leaving nothing to launch.
    #[error("all profiles are hidden")]
    AllProfilesHidden,

    /// A settings document could not be parsed. Carries the diagnostic text.
    #[error("failed to parse settings JSON:\n{0}")]
    JsonParse(String),

    /// Profile inheritance loops back on itself.
    #[error("profile '{profile}' inherits from itself through its parents")]
    CyclicInheritance { profile: String },

    /// Anything unanticipated, wrapped with a description.
    #[error("unexpected failure while loading settings: {0}")]
    Unknown(String),
}

impl SettingsLoadError {
    /// Text shown to the user when this error forced a fallback.
    pub fn message(&self) -> String {
        match self {
            SettingsLoadError::NoProfiles => {
                "Could not find any profiles in your settings.".to_string()
            }
            SettingsLoadError::AllProfilesHidden => {
                "All profiles are hidden in your settings. You must have at least one \
                 non-hidden profile."
                    .to_string()
            }
            SettingsLoadError::JsonParse(diagnostic) => {
                format!("Settings could not be loaded from file:\n{diagnostic}")
            }
            SettingsLoadError::CyclicInheritance { profile } => format!(
                "The parents of profile \"{profile}\" form a cycle. Remove one of the \
                 \"parents\" entries to break it."
            ),
            SettingsLoadError::Unknown(detail) => {
                format!("An unexpected error occurred while loading settings: {detail}")
            }
        }
    }
}

/// Non-fatal problems found while validating settings.
///
/// Order is significant: the pipeline emits these in stage order and
/// [`SettingsLoadWarning::AtLeastOneKeybindingWarning`] acts as a header for the
/// keybinding warnings that follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingsLoadWarning {
    MissingDefaultProfile,
    DuplicateProfile,
    UnknownColorScheme,
    InvalidBackgroundImage,
    InvalidIcon,
    AtLeastOneKeybindingWarning,
    TooManyKeysForChord,
    MissingRequiredParameter,
    InvalidKeyChord,
    InvalidColorSchemeInCmd,
    LegacyGlobalsProperty,
}

impl SettingsLoadWarning {
    /// Whether this warning belongs under the keybinding header.
    pub fn is_keybinding_warning(&self) -> bool {
        matches!(
            self,
            SettingsLoadWarning::TooManyKeysForChord
                | SettingsLoadWarning::MissingRequiredParameter
                | SettingsLoadWarning::InvalidKeyChord
        )
    }
}

impl std::fmt::Display for SettingsLoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SettingsLoadWarning::MissingDefaultProfile => {
                "Could not find your default profile in your list of profiles - using the \
                 first profile. Check to make sure the \"defaultProfile\" matches the GUID \
                 or name of one of your profiles."
            }
            SettingsLoadWarning::DuplicateProfile => {
                "Found multiple profiles with the same GUID in your settings file - ignoring \
                 duplicates. Make sure each profile's GUID is unique."
            }
            SettingsLoadWarning::UnknownColorScheme => {
                "Found a profile with an invalid \"colorScheme\". Defaulting that profile to \
                 the default colors. Make sure that when setting a \"colorScheme\", the value \
                 matches the \"name\" of a color scheme in the \"schemes\" list."
            }
            SettingsLoadWarning::InvalidBackgroundImage => {
                "Found a profile with an invalid \"backgroundImage\". Defaulting that profile \
                 to have no background image. Make sure that when setting a \
                 \"backgroundImage\", the value is a valid file path to an image."
            }
            SettingsLoadWarning::InvalidIcon => {
                "Found a profile with an invalid \"icon\". Defaulting that profile to have no \
                 icon. Make sure that when setting an \"icon\", the value is a valid file path \
                 to an image."
            }
            SettingsLoadWarning::AtLeastOneKeybindingWarning => {
                "Warnings were found while parsing your keybindings:"
            }
            SettingsLoadWarning::TooManyKeysForChord => {
                "Found a keybinding with too many strings for the \"keys\" array. There \
                 should only be one string value in the \"keys\" array."
            }
            SettingsLoadWarning::MissingRequiredParameter => {
                "Found a keybinding that was missing a required parameter value. This \
                 keybinding will be ignored."
            }
            SettingsLoadWarning::InvalidKeyChord => {
                "Found a keybinding whose \"keys\" value could not be parsed as a key chord. \
                 This keybinding will be ignored."
            }
            SettingsLoadWarning::InvalidColorSchemeInCmd => {
                "Found a command with an invalid \"colorScheme\". This command will be \
                 ignored. Make sure that when setting a \"colorScheme\", the value matches \
                 the \"name\" of a color scheme in the \"schemes\" list."
            }
            SettingsLoadWarning::LegacyGlobalsProperty => {
                "The \"globals\" property is deprecated - your settings might need updating."
            }
        };
        f.write_str(text)
    }
}
