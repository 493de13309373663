//! Application-wide settings layered from the top level of each document.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::color_scheme::ColorScheme;
use crate::commands::{self, Command};
use crate::error::SettingsLoadWarning;
use crate::guid::Guid;
use crate::json;
use crate::keybindings::KeyMapping;

/// Deprecated top-level key that once wrapped the global settings
pub const LEGACY_GLOBALS_KEY: &str = "globals";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalAppSettings {
    /// Resolved default profile. Set by the validation pipeline.
    pub default_profile: Option<Guid>,

    /// `"defaultProfile"` as written: a guid string or a profile name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unparsed_default_profile: Option<String>,

    /// Schemes by name
    #[serde(rename = "schemes")]
    pub color_schemes: BTreeMap<String, ColorScheme>,

    #[serde(rename = "keybindings")]
    pub key_map: KeyMapping,

    /// Problems found while parsing `"keybindings"`, in document order
    #[serde(skip)]
    pub keybinding_warnings: Vec<SettingsLoadWarning>,

    pub commands: Vec<Command>,

    /// Generator namespaces that must not run
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disabled_profile_sources: Vec<String>,
}

impl GlobalAppSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer the global keys of a settings document.
    ///
    /// Keys nested under the legacy `"globals"` object are read first, so a
    /// top-level key of the same name wins.
    pub fn layer_json(&mut self, document: &Value) {
        let Some(root) = json::as_object(document) else {
            return;
        };
        if let Some(legacy) = json::get(root, LEGACY_GLOBALS_KEY) {
            self.layer_object(legacy);
        }
        self.layer_object(document);
    }

    fn layer_object(&mut self, value: &Value) {
        let Some(obj) = json::as_object(value) else {
            return;
        };

        json::layer_string(obj, "defaultProfile", &mut self.unparsed_default_profile);

        if let Some(schemes) = json::get_array(obj, "schemes") {
            for entry in schemes {
                let Some(name) = entry.get("name").and_then(Value::as_str) else {
                    log::debug!("Ignoring color scheme without a name");
                    continue;
                };
                match self.color_schemes.get_mut(name) {
                    Some(existing) => existing.layer_json(entry),
                    None => {
                        if let Some(scheme) = ColorScheme::from_json(entry) {
                            self.color_schemes.insert(scheme.name.clone(), scheme);
                        }
                    }
                }
            }
        }

        if let Some(bindings) = json::get_array(obj, "keybindings") {
            let warnings = self.key_map.layer_json(bindings);
            self.keybinding_warnings.extend(warnings);
        }

        if let Some(entries) = json::get_array(obj, "commands") {
            commands::layer_commands(&mut self.commands, entries);
        }

        let mut disabled = None;
        json::layer_string_list(obj, "disabledProfileSources", &mut disabled);
        if let Some(disabled) = disabled {
            self.disabled_profile_sources = disabled;
        }
    }

    pub fn color_scheme(&self, name: &str) -> Option<&ColorScheme> {
        self.color_schemes.get(name)
    }

    pub fn has_color_scheme(&self, name: &str) -> bool {
        self.color_schemes.contains_key(name)
    }

    pub fn is_source_disabled(&self, namespace: &str) -> bool {
        self.disabled_profile_sources.iter().any(|s| s == namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keybindings::{ActionAndArgs, ShortcutAction};
    use serde_json::json;

    #[test]
    fn test_layer_defaults_then_user() {
        let mut globals = GlobalAppSettings::new();
        globals.layer_json(&json!({
            "defaultProfile": "{00000000-0000-0000-0000-000000000001}",
            "schemes": [
                { "name": "Campbell", "foreground": "#CCCCCC" },
                { "name": "Tango Dark", "foreground": "#D3D7CF" }
            ],
            "keybindings": [ { "keys": "ctrl+c", "command": "copy" } ],
            "commands": [ { "name": "Copy", "command": "copy" } ]
        }));
        globals.layer_json(&json!({
            "defaultProfile": "bash",
            "schemes": [ { "name": "Campbell", "background": "#000000" } ],
            "keybindings": [ { "keys": ["a", "b"], "command": "copy" } ],
            "disabledProfileSources": ["Termset.SshHosts"]
        }));

        assert_eq!(globals.unparsed_default_profile.as_deref(), Some("bash"));
        assert_eq!(globals.color_schemes.len(), 2);
        let campbell = globals.color_scheme("Campbell").expect("campbell");
        assert_eq!(campbell.foreground.to_string(), "#CCCCCC");
        assert_eq!(campbell.background.to_string(), "#000000");
        assert_eq!(globals.key_map.len(), 1);
        assert_eq!(
            globals.keybinding_warnings,
            vec![SettingsLoadWarning::TooManyKeysForChord]
        );
        assert_eq!(
            globals.commands[0].action,
            Some(ActionAndArgs::new(ShortcutAction::Copy))
        );
        assert!(globals.is_source_disabled("Termset.SshHosts"));
        assert!(!globals.is_source_disabled("Termset.Shells"));
    }

    #[test]
    fn test_legacy_globals_object_is_read_and_overridden() {
        let mut globals = GlobalAppSettings::new();
        globals.layer_json(&json!({
            "globals": { "defaultProfile": "legacy", "keybindings": [ { "keys": "ctrl+f", "command": "find" } ] },
            "defaultProfile": "modern"
        }));
        assert_eq!(globals.unparsed_default_profile.as_deref(), Some("modern"));
        assert_eq!(globals.key_map.len(), 1);
    }
}
