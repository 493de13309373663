//! Per-layer profile settings and the resolved `Profile`.

use serde::Serialize;
use serde_json::Value;

use crate::guid::Guid;
use crate::json::{self, JsonObject};

/// One layer of profile settings.
///
/// Every field is optional: `Some` means "set on this layer". Layers are
/// stacked with [`ProfileSettings::layer_json`] and collapsed along the
/// inheritance graph with [`ProfileSettings::merged_over`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<Guid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,

    /// Namespace of the generator that produced this profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<String>,

    /// Icon path, URI, or a short emoji/symbol
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub commandline: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_directory: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_title: Option<String>,

    /// Declared parents, each a guid string or a profile name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
}

impl ProfileSettings {
    /// Create a layer with only the name set
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Build a layer from a JSON fragment. Non-objects produce an empty layer.
    pub fn from_json(json: &Value) -> Self {
        let mut settings = Self::default();
        settings.layer_json(json);
        settings
    }

    /// Overwrite every field present in `json`. Fields absent from the
    /// fragment, or set to `null`, keep their current value.
    pub fn layer_json(&mut self, json: &Value) {
        let Some(obj) = json::as_object(json) else {
            log::debug!("Ignoring non-object profile fragment: {json}");
            return;
        };
        self.layer_object(obj);
    }

    pub(crate) fn layer_object(&mut self, obj: &JsonObject) {
        json::layer_string(obj, "name", &mut self.name);
        if let Some(value) = json::get(obj, "guid") {
            match value.as_str().map(str::parse::<Guid>) {
                Some(Ok(guid)) => self.guid = Some(guid),
                _ => log::debug!("Ignoring malformed profile guid: {value}"),
            }
        }
        json::layer_bool(obj, "hidden", &mut self.hidden);
        json::layer_string(obj, "source", &mut self.source);
        json::layer_string(obj, "colorScheme", &mut self.color_scheme);
        json::layer_string(obj, "icon", &mut self.icon);
        json::layer_string(obj, "backgroundImage", &mut self.background_image);
        json::layer_string(obj, "commandline", &mut self.commandline);
        json::layer_string(obj, "startingDirectory", &mut self.starting_directory);
        json::layer_string(obj, "tabTitle", &mut self.tab_title);
        json::layer_string_list(obj, "parents", &mut self.parents);
    }

    /// Guid this layer identifies: the declared one, or one derived from the
    /// name and source. `None` when neither a guid nor a name is set.
    pub fn effective_guid(&self) -> Option<Guid> {
        self.guid.or_else(|| {
            self.name
                .as_deref()
                .map(|name| Guid::for_profile(name, self.source.as_deref()))
        })
    }

    /// Guid of this layer even when it names nothing: an unnamed layer gets
    /// the guid of the empty name.
    pub fn identity(&self) -> Guid {
        self.effective_guid()
            .unwrap_or_else(|| Guid::for_profile("", self.source.as_deref()))
    }

    /// Fill every unset field from `parent`. Identity (`guid`) and the declared
    /// parent list belong to the node itself and are never inherited.
    pub fn merged_over(&self, parent: &ProfileSettings) -> ProfileSettings {
        ProfileSettings {
            name: self.name.clone().or_else(|| parent.name.clone()),
            guid: self.guid,
            hidden: self.hidden.or(parent.hidden),
            source: self.source.clone().or_else(|| parent.source.clone()),
            color_scheme: self
                .color_scheme
                .clone()
                .or_else(|| parent.color_scheme.clone()),
            icon: self.icon.clone().or_else(|| parent.icon.clone()),
            background_image: self
                .background_image
                .clone()
                .or_else(|| parent.background_image.clone()),
            commandline: self
                .commandline
                .clone()
                .or_else(|| parent.commandline.clone()),
            starting_directory: self
                .starting_directory
                .clone()
                .or_else(|| parent.starting_directory.clone()),
            tab_title: self.tab_title.clone().or_else(|| parent.tab_title.clone()),
            parents: self.parents.clone(),
        }
    }
}

/// A fully resolved profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub guid: Guid,
    pub name: String,
    pub hidden: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub commandline: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_directory: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_title: Option<String>,

    /// Guids of the profiles this one inherits from, nearest first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<Guid>,
}

impl Profile {
    /// Create a visible profile with a guid derived from its name
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_settings(ProfileSettings::named(name), Vec::new())
    }

    /// Materialize a resolved settings record.
    pub fn from_settings(settings: ProfileSettings, parents: Vec<Guid>) -> Self {
        let guid = settings.identity();
        Self {
            guid,
            name: settings.name.unwrap_or_default(),
            hidden: settings.hidden.unwrap_or(false),
            source: settings.source,
            color_scheme: settings.color_scheme,
            icon: settings.icon,
            background_image: settings.background_image,
            commandline: settings.commandline,
            starting_directory: settings.starting_directory,
            tab_title: settings.tab_title,
            parents,
        }
    }

    /// Builder method to set the guid
    pub fn with_guid(mut self, guid: Guid) -> Self {
        self.guid = guid;
        self
    }

    /// Builder method to set the hidden flag
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Builder method to set the color scheme name
    pub fn color_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.color_scheme = Some(scheme.into());
        self
    }

    /// Builder method to set the icon
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Builder method to set the background image
    pub fn background_image(mut self, image: impl Into<String>) -> Self {
        self.background_image = Some(image.into());
        self
    }

    /// Title shown on tabs opened with this profile
    pub fn display_title(&self) -> &str {
        self.tab_title.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_layer_json_overrides_only_present_fields() {
        let mut settings = ProfileSettings::from_json(&json!({
            "name": "Base",
            "colorScheme": "Campbell",
            "icon": "/icons/base.png"
        }));
        settings.layer_json(&json!({ "name": "Child", "icon": null }));

        assert_eq!(settings.name.as_deref(), Some("Child"));
        assert_eq!(settings.color_scheme.as_deref(), Some("Campbell"));
        assert_eq!(settings.icon.as_deref(), Some("/icons/base.png"));
    }

    #[test]
    fn test_layer_json_reads_all_keys() {
        let guid = Guid::for_profile("x", None);
        let settings = ProfileSettings::from_json(&json!({
            "name": "x",
            "guid": guid.to_string(),
            "hidden": true,
            "source": "Termset.Shells",
            "colorScheme": "Tango Dark",
            "icon": "ms-appx:///icon.png",
            "backgroundImage": "/tmp/bg.png",
            "commandline": "bash -l",
            "startingDirectory": "~",
            "tabTitle": "shell",
            "parents": ["Base"]
        }));
        assert_eq!(settings.guid, Some(guid));
        assert_eq!(settings.hidden, Some(true));
        assert_eq!(settings.source.as_deref(), Some("Termset.Shells"));
        assert_eq!(settings.background_image.as_deref(), Some("/tmp/bg.png"));
        assert_eq!(settings.commandline.as_deref(), Some("bash -l"));
        assert_eq!(settings.starting_directory.as_deref(), Some("~"));
        assert_eq!(settings.tab_title.as_deref(), Some("shell"));
        assert_eq!(settings.parents, Some(vec!["Base".to_string()]));
    }

    #[test]
    fn test_malformed_guid_is_ignored() {
        let settings = ProfileSettings::from_json(&json!({ "name": "x", "guid": "nope" }));
        assert_eq!(settings.guid, None);
        assert_eq!(settings.effective_guid(), Some(Guid::for_profile("x", None)));
    }

    #[test]
    fn test_merged_over_child_wins_and_guid_not_inherited() {
        let parent = ProfileSettings {
            name: Some("Parent".to_string()),
            guid: Some(Guid::for_profile("Parent", None)),
            color_scheme: Some("Campbell".to_string()),
            hidden: Some(true),
            ..ProfileSettings::default()
        };
        let child = ProfileSettings {
            color_scheme: Some("Tango Dark".to_string()),
            ..ProfileSettings::default()
        };

        let merged = child.merged_over(&parent);
        assert_eq!(merged.name.as_deref(), Some("Parent"));
        assert_eq!(merged.color_scheme.as_deref(), Some("Tango Dark"));
        assert_eq!(merged.hidden, Some(true));
        assert_eq!(merged.guid, None);
    }

    #[test]
    fn test_effective_guid_uses_source_namespace() {
        let mut settings = ProfileSettings::named("bash");
        let plain = settings.effective_guid();
        settings.source = Some("Termset.Shells".to_string());
        assert_ne!(settings.effective_guid(), plain);
        assert_eq!(
            settings.effective_guid(),
            Some(Guid::for_generator("Termset.Shells", "bash"))
        );
        assert_eq!(ProfileSettings::default().effective_guid(), None);
        assert_eq!(
            ProfileSettings::default().identity(),
            Guid::for_profile("", None)
        );
    }

    #[test]
    fn test_profile_from_settings_defaults() {
        let profile = Profile::from_settings(ProfileSettings::named("Shell"), Vec::new());
        assert_eq!(profile.name, "Shell");
        assert!(!profile.hidden);
        assert_eq!(profile.guid, Guid::for_profile("Shell", None));
        assert_eq!(profile.display_title(), "Shell");
    }
}
