//! End-to-end tests for settings loading
//!
//! These tests drive the public loader API with complete documents and cover:
//! - Ordering, hiding and default-profile resolution
//! - Duplicate removal and hidden groups
//! - Profile inheritance and cycle fallback
//! - Warning order across pipeline stages
//! - First-run template rendering

use serde_json::{Value, json};
use termset_model::profile_types::tree;
use termset_model::{
    CascadeSettings, DEFAULTS_JSON, Guid, LoadOutcome, ProfileEntry, SettingsLoadError,
    SettingsLoadWarning, SettingsLoader, SettingsSources, USER_SETTINGS_TEMPLATE,
    render_settings_template,
};

const G1: &str = "{00000000-0000-0000-0000-000000000001}";
const G2: &str = "{00000000-0000-0000-0000-000000000002}";
const G3: &str = "{00000000-0000-0000-0000-000000000003}";

fn guid(text: &str) -> Guid {
    text.parse().expect("valid guid")
}

fn load(defaults: Value, user: Value) -> Result<CascadeSettings, SettingsLoadError> {
    SettingsLoader::new().load(&SettingsSources::from_values(defaults, user))
}

fn load_user(user: Value) -> CascadeSettings {
    let defaults: Value = serde_json::from_str(DEFAULTS_JSON).expect("defaults parse");
    load(defaults, user).expect("settings load")
}

fn active_names(settings: &CascadeSettings) -> Vec<&str> {
    settings
        .active_profiles()
        .iter()
        .map(|p| p.name.as_str())
        .collect()
}

fn abc_defaults() -> Value {
    json!({
        "profiles": [
            { "guid": G1, "name": "A" },
            { "guid": G2, "name": "B", "hidden": true },
            { "guid": G3, "name": "C" }
        ]
    })
}

// ============================================================================
// Ordering and defaults
// ============================================================================

#[test]
fn test_user_order_hidden_and_missing_default() {
    let settings = load(
        abc_defaults(),
        json!({ "profiles": [ { "guid": G3 }, { "guid": G1 } ] }),
    )
    .expect("load");

    assert_eq!(active_names(&settings), vec!["C", "A"]);
    let all: Vec<&str> = settings.all_profiles().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(all, vec!["C", "A", "B"], "hidden profiles stay in the full list");
    assert_eq!(settings.default_profile(), guid(G3));
    assert_eq!(settings.warnings(), &[SettingsLoadWarning::MissingDefaultProfile]);
}

#[test]
fn test_identical_guid_sets_follow_user_order() {
    let settings = load(
        json!({ "profiles": [ { "guid": G1, "name": "A" }, { "guid": G2, "name": "B" }, { "guid": G3, "name": "C" } ] }),
        json!({
            "defaultProfile": G2,
            "profiles": [ { "guid": G2 }, { "guid": G3 }, { "guid": G1 } ]
        }),
    )
    .expect("load");

    assert_eq!(active_names(&settings), vec!["B", "C", "A"]);
    assert_eq!(settings.default_profile(), guid(G2));
    assert!(settings.warnings().is_empty());
}

#[test]
fn test_default_profile_that_is_hidden_falls_back() {
    let settings = load(abc_defaults(), json!({ "defaultProfile": "B" })).expect("load");
    assert_eq!(settings.default_profile(), guid(G1));
    assert_eq!(settings.warnings(), &[SettingsLoadWarning::MissingDefaultProfile]);
}

// ============================================================================
// Duplicates and groups
// ============================================================================

#[test]
fn test_duplicates_removed_with_single_warning() {
    let settings = load_user(json!({
        "profiles": [
            { "guid": G1, "name": "First" },
            { "guid": G1, "name": "Second" },
            { "name": "Tools", "profiles": [ { "guid": G1, "name": "Third" } ] }
        ]
    }));

    assert_eq!(active_names(&settings), vec!["First", "Shell"]);
    let duplicates = settings
        .warnings()
        .iter()
        .filter(|w| **w == SettingsLoadWarning::DuplicateProfile)
        .count();
    assert_eq!(duplicates, 1);
    assert_eq!(
        tree::flatten(settings.profile_tree()).len(),
        settings.active_profiles().len()
    );
}

#[test]
fn test_hidden_group_drops_descendants() {
    let settings = load_user(json!({
        "profiles": [
            { "name": "Servers", "hidden": true, "profiles": [
                { "name": "db", "hidden": false },
                { "name": "Nested", "profiles": [ { "name": "web" } ] }
            ] },
            { "name": "Dev", "profiles": [ { "name": "local" } ] }
        ]
    }));

    assert_eq!(active_names(&settings), vec!["local", "Shell"]);
    assert!(settings.profile_guid_by_name("db").is_some());
    assert!(settings.profile_guid_by_name("web").is_some());

    let ProfileEntry::Group(dev) = &settings.profile_tree()[0] else {
        panic!("first entry should be the Dev group");
    };
    assert_eq!(dev.name, "Dev");
}

#[test]
fn test_same_named_groups_keep_their_own_slots() {
    let settings = load(
        json!({
            "profiles": [
                { "name": "Tools", "profiles": [ { "name": "X" } ] },
                { "name": "A" }
            ]
        }),
        json!({
            "profiles": [ { "name": "Tools", "profiles": [ { "name": "Y" } ] } ]
        }),
    )
    .expect("settings load");

    assert_eq!(active_names(&settings), vec!["Y", "X", "A"]);
    let groups: Vec<&str> = settings
        .profile_tree()
        .iter()
        .filter_map(|entry| match entry {
            ProfileEntry::Group(group) => Some(group.name.as_str()),
            ProfileEntry::Profile(_) => None,
        })
        .collect();
    assert_eq!(groups, vec!["Tools", "Tools"]);
}

// ============================================================================
// Inheritance
// ============================================================================

#[test]
fn test_parents_inherit_in_declared_order() {
    let settings = load_user(json!({
        "profiles": {
            "defaults": { "startingDirectory": "/home" },
            "list": [
                { "name": "Remote", "hidden": true, "commandline": "ssh box", "colorScheme": "Tango Dark" },
                { "name": "Styled", "hidden": true, "colorScheme": "Solarized Dark", "icon": "S" },
                { "name": "Box", "hidden": false, "parents": ["Styled", "Remote"] }
            ]
        }
    }));

    let boxed = settings
        .find_profile(settings.profile_guid_by_name("Box").expect("box"))
        .expect("box profile");
    assert_eq!(boxed.commandline.as_deref(), Some("ssh box"));
    assert_eq!(boxed.color_scheme.as_deref(), Some("Solarized Dark"));
    assert_eq!(boxed.icon.as_deref(), Some("S"));
    assert_eq!(boxed.starting_directory.as_deref(), Some("/home"));
    assert!(!boxed.hidden, "an explicit flag on the child wins over its parents");
}

#[test]
fn test_unnamed_child_keeps_its_own_identity() {
    let settings = load_user(json!({
        "profiles": [
            { "name": "Base" },
            { "parents": ["Base"], "tabTitle": "child" }
        ]
    }));

    assert_eq!(active_names(&settings), vec!["Base", "Base", "Shell"]);
    assert!(
        !settings.warnings().contains(&SettingsLoadWarning::DuplicateProfile),
        "warnings: {:?}",
        settings.warnings()
    );

    let base = Guid::for_profile("Base", None);
    let child = &settings.active_profiles()[1];
    assert_eq!(child.guid, Guid::for_profile("", None));
    assert_ne!(child.guid, base);
    assert_eq!(child.tab_title.as_deref(), Some("child"));
    assert_eq!(settings.active_profiles()[0].guid, base);
}

#[test]
fn test_cycle_falls_back_to_defaults() {
    let sources = SettingsSources::parse(
        DEFAULTS_JSON,
        Some(
            r#"{ "profiles": [
                { "name": "Ping", "parents": ["Pong"] },
                { "name": "Pong", "parents": ["Ping"] }
            ] }"#,
        ),
    );
    let LoadOutcome { settings, error } = SettingsLoader::new().load_or_fallback(sources);

    assert!(
        matches!(error, Some(SettingsLoadError::CyclicInheritance { .. })),
        "got {error:?}"
    );
    assert_eq!(active_names(&settings), vec!["Shell"]);
}

#[test]
fn test_no_profiles_is_fatal() {
    let err = load(json!({}), json!({})).expect_err("no profiles");
    assert_eq!(err, SettingsLoadError::NoProfiles);
}

// ============================================================================
// Warnings
// ============================================================================

#[test]
fn test_warnings_follow_stage_order() {
    let settings = load_user(json!({
        "globals": { "alwaysShowTabs": true },
        "profiles": [
            { "name": "Odd", "colorScheme": "Nope", "icon": "relative/icon.png", "backgroundImage": "bg.png" }
        ],
        "keybindings": [
            { "keys": ["ctrl+a", "ctrl+b"], "command": "copy" },
            { "keys": "ctrl+nonsense", "command": "paste" },
            { "keys": "ctrl+q", "command": { "action": "switchToTab" } }
        ],
        "commands": [
            { "name": "Go dark", "command": { "action": "setColorScheme", "colorScheme": "Missing" } }
        ]
    }));

    assert_eq!(
        settings.warnings(),
        &[
            SettingsLoadWarning::UnknownColorScheme,
            SettingsLoadWarning::InvalidBackgroundImage,
            SettingsLoadWarning::InvalidIcon,
            SettingsLoadWarning::AtLeastOneKeybindingWarning,
            SettingsLoadWarning::TooManyKeysForChord,
            SettingsLoadWarning::InvalidKeyChord,
            SettingsLoadWarning::MissingRequiredParameter,
            SettingsLoadWarning::InvalidColorSchemeInCmd,
            SettingsLoadWarning::LegacyGlobalsProperty,
        ]
    );

    let odd = settings
        .find_profile(settings.profile_guid_by_name("Odd").expect("odd"))
        .expect("odd profile");
    assert_eq!(odd.color_scheme.as_deref(), Some("Campbell"));
    assert_eq!(odd.icon, None);
    assert_eq!(odd.background_image, None);
    assert!(!settings.expanded_commands().iter().any(|c| c.name == "Go dark"));
}

#[test]
fn test_valid_media_is_kept() {
    let settings = load_user(json!({
        "profiles": [
            {
                "name": "Pretty",
                "icon": "https://example.com/icon.png",
                "backgroundImage": "desktopWallpaper"
            },
            { "name": "Local", "backgroundImage": "/usr/share/backgrounds/a.png", "icon": "⚡" }
        ]
    }));
    assert!(settings.warnings().is_empty(), "warnings: {:?}", settings.warnings());
}

#[test]
fn test_empty_media_values_are_not_warnings() {
    let settings = load_user(json!({
        "profiles": [ { "name": "Plain", "backgroundImage": "", "icon": "" } ]
    }));
    assert!(settings.warnings().is_empty(), "warnings: {:?}", settings.warnings());
}

// ============================================================================
// First-run template
// ============================================================================

#[test]
fn test_rendered_template_loads_with_default() {
    let defaults = SettingsLoader::load_defaults();
    let default_guid = defaults.first_run_default_guid(None);
    let rendered = render_settings_template(USER_SETTINGS_TEMPLATE, default_guid, "9.9.9", "termset");

    let settings = SettingsLoader::new()
        .load(&SettingsSources::parse(DEFAULTS_JSON, Some(&rendered)).expect("parse"))
        .expect("load");
    assert_eq!(settings.default_profile(), default_guid);
    assert!(settings.warnings().is_empty());
}

#[test]
fn test_parse_error_names_location() {
    let err = SettingsSources::parse(DEFAULTS_JSON, Some("{\n  \"profiles\": [,]\n}"))
        .expect_err("invalid json");
    let SettingsLoadError::JsonParse(diagnostic) = &err else {
        panic!("expected a parse error, got {err:?}");
    };
    assert!(diagnostic.starts_with("* Line 2, Column "), "{diagnostic}");
    assert!(err.message().contains("(settings)"));
}
