//! The validation pipeline.
//!
//! Stages run in a fixed order over the resolved profile tree and the
//! globals. Each stage returns the warnings it found or a fatal error; the
//! runner collects warnings in stage order and stops at the first error.

use std::collections::HashSet;

use crate::color_scheme::FALLBACK_SCHEME_NAME;
use crate::commands::Command;
use crate::env_vars::expand_env_vars;
use crate::error::{SettingsLoadError, SettingsLoadWarning};
use crate::globals::{GlobalAppSettings, LEGACY_GLOBALS_KEY};
use crate::guid::Guid;
use crate::layering::{OrderSlot, Origin, top_level_order};
use crate::profile_types::{Profile, ProfileEntry, tree};
use crate::sources::SettingsSources;

/// Background-image keyword that selects the desktop wallpaper
pub const DESKTOP_WALLPAPER: &str = "desktopWallpaper";

/// Icons this short (in characters) are emoji or symbols, not paths.
const MAX_GLYPH_ICON_CHARS: usize = 2;

/// Everything the stages read and mutate.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub tree: Vec<ProfileEntry>,
    /// Every profile, hidden ones included. Captured before hiding.
    pub all_profiles: Vec<Profile>,
    /// Visible profiles. Set when the pipeline finishes.
    pub active_profiles: Vec<Profile>,
    pub globals: GlobalAppSettings,
    /// Generated profile guids, in generation order
    pub generated_order: Vec<Guid>,
    /// Document slot of each top-level group of `tree`, in tree order
    pub(crate) group_slots: Vec<OrderSlot>,
}

impl PipelineState {
    pub fn new(tree: Vec<ProfileEntry>, globals: GlobalAppSettings) -> Self {
        Self {
            tree,
            globals,
            ..Self::default()
        }
    }
}

pub type StageResult = Result<Vec<SettingsLoadWarning>, SettingsLoadError>;
pub type Stage = fn(&mut PipelineState, &SettingsSources) -> StageResult;

/// Stages in execution order.
pub const STAGES: &[(&str, Stage)] = &[
    ("profiles_exist", profiles_exist),
    ("reorder_to_match_user_order", reorder_to_match_user_order),
    ("update_active_profiles", update_active_profiles),
    ("no_duplicate_profiles", no_duplicate_profiles),
    ("resolve_default_profile", resolve_default_profile),
    ("default_profile_exists", default_profile_exists),
    ("all_schemes_exist", all_schemes_exist),
    ("media_resources_valid", media_resources_valid),
    ("keybindings_valid", keybindings_valid),
    ("color_schemes_in_commands", color_schemes_in_commands),
    ("no_globals_key_present", no_globals_key_present),
];

/// Run every stage. On success the active list is the flattened tree.
pub fn run_pipeline(
    state: &mut PipelineState,
    sources: &SettingsSources,
) -> Result<Vec<SettingsLoadWarning>, SettingsLoadError> {
    let mut warnings = Vec::new();
    for (name, stage) in STAGES {
        log::debug!("Running settings stage '{name}'");
        let found = stage(state, sources)?;
        if !found.is_empty() {
            log::debug!("Stage '{name}' produced {} warning(s)", found.len());
        }
        warnings.extend(found);
    }
    state.active_profiles = tree::flatten(&state.tree);
    Ok(warnings)
}

/// Stage 1: there is at least one profile.
pub fn profiles_exist(state: &mut PipelineState, _sources: &SettingsSources) -> StageResult {
    if tree::flatten(&state.tree).is_empty() {
        return Err(SettingsLoadError::NoProfiles);
    }
    Ok(Vec::new())
}

/// Stage 2: permute the top level into user-document order, then
/// defaults-document order, then generation order. Entries neither document
/// mentions keep their relative order at the end.
pub fn reorder_to_match_user_order(
    state: &mut PipelineState,
    sources: &SettingsSources,
) -> StageResult {
    let mut order: Vec<OrderSlot> = Vec::new();
    let mut seen: HashSet<Guid> = HashSet::new();
    let slots = top_level_order(&sources.user, Origin::User)
        .into_iter()
        .chain(top_level_order(&sources.defaults, Origin::Defaults))
        .chain(state.generated_order.iter().copied().map(OrderSlot::Profile));
    for slot in slots {
        match slot {
            OrderSlot::Profile(guid) => {
                if seen.insert(guid) {
                    order.push(slot);
                }
            }
            OrderSlot::Group { .. } => order.push(slot),
        }
    }

    let mut group_slots = state.group_slots.iter();
    let mut ranked: Vec<(usize, ProfileEntry)> = std::mem::take(&mut state.tree)
        .into_iter()
        .map(|entry| {
            let slot = match &entry {
                ProfileEntry::Profile(profile) => Some(OrderSlot::Profile(profile.guid)),
                ProfileEntry::Group(_) => group_slots.next().copied(),
            };
            let rank = slot.and_then(|slot| order.iter().position(|s| *s == slot));
            (rank.unwrap_or(usize::MAX), entry)
        })
        .collect();

    // Stable, so equal ranks (duplicates, unmatched entries) keep their order.
    ranked.sort_by_key(|(rank, _)| *rank);
    state.tree = ranked.into_iter().map(|(_, entry)| entry).collect();
    Ok(Vec::new())
}

/// Stage 3: record every profile, then drop hidden ones. Fails when nothing
/// visible remains.
pub fn update_active_profiles(state: &mut PipelineState, _sources: &SettingsSources) -> StageResult {
    state.all_profiles = tree::dedup_by_guid(tree::flatten(&state.tree));
    tree::remove_hidden(&mut state.tree);
    if tree::flatten(&state.tree).is_empty() {
        return Err(SettingsLoadError::AllProfilesHidden);
    }
    Ok(Vec::new())
}

/// Stage 4: one profile per guid.
pub fn no_duplicate_profiles(state: &mut PipelineState, _sources: &SettingsSources) -> StageResult {
    let mut seen = HashSet::new();
    if tree::remove_duplicates(&mut state.tree, &mut seen) {
        return Ok(vec![SettingsLoadWarning::DuplicateProfile]);
    }
    Ok(Vec::new())
}

/// Stage 5: turn `"defaultProfile"` (a guid or a name) into a guid.
pub fn resolve_default_profile(
    state: &mut PipelineState,
    _sources: &SettingsSources,
) -> StageResult {
    let Some(reference) = state.globals.unparsed_default_profile.clone() else {
        return Ok(Vec::new());
    };

    let by_guid = reference
        .parse::<Guid>()
        .ok()
        .filter(|guid| state.all_profiles.iter().any(|p| p.guid == *guid));
    let resolved = by_guid.or_else(|| {
        state
            .all_profiles
            .iter()
            .find(|p| p.name == reference)
            .map(|p| p.guid)
    });

    if resolved.is_none() {
        log::debug!("Default profile '{reference}' does not name any profile");
    }
    state.globals.default_profile = resolved;
    Ok(Vec::new())
}

/// Stage 6: the default profile must be active, else use the first one.
pub fn default_profile_exists(state: &mut PipelineState, _sources: &SettingsSources) -> StageResult {
    let active = tree::flatten(&state.tree);
    let present = state
        .globals
        .default_profile
        .is_some_and(|guid| active.iter().any(|p| p.guid == guid));
    if present {
        return Ok(Vec::new());
    }

    let first = active.first().ok_or(SettingsLoadError::AllProfilesHidden)?;
    log::info!(
        "Default profile not found, falling back to '{}' {}",
        first.name,
        first.guid
    );
    state.globals.default_profile = Some(first.guid);
    Ok(vec![SettingsLoadWarning::MissingDefaultProfile])
}

/// Stage 7: every scheme reference names a known scheme.
pub fn all_schemes_exist(state: &mut PipelineState, _sources: &SettingsSources) -> StageResult {
    let globals = &state.globals;
    let fix = |profile: &mut Profile| -> bool {
        match &profile.color_scheme {
            Some(name) if !globals.has_color_scheme(name) => {
                log::debug!(
                    "Profile '{}' uses unknown scheme '{name}', using {FALLBACK_SCHEME_NAME}",
                    profile.name
                );
                profile.color_scheme = Some(FALLBACK_SCHEME_NAME.to_string());
                true
            }
            _ => false,
        }
    };

    let mut found = false;
    tree::for_each_profile_mut(&mut state.tree, &mut |profile| found |= fix(profile));
    state.all_profiles.iter_mut().for_each(|profile| {
        fix(profile);
    });

    Ok(if found {
        vec![SettingsLoadWarning::UnknownColorScheme]
    } else {
        Vec::new()
    })
}

/// Stage 8: icons and background images must be usable resource references.
pub fn media_resources_valid(state: &mut PipelineState, _sources: &SettingsSources) -> StageResult {
    let mut bad_icon = false;
    let mut bad_background = false;
    tree::for_each_profile_mut(&mut state.tree, &mut |profile| {
        let (icon, background) = repair_media(profile);
        bad_icon |= icon;
        bad_background |= background;
    });
    state.all_profiles.iter_mut().for_each(|profile| {
        repair_media(profile);
    });

    let mut warnings = Vec::new();
    if bad_background {
        warnings.push(SettingsLoadWarning::InvalidBackgroundImage);
    }
    if bad_icon {
        warnings.push(SettingsLoadWarning::InvalidIcon);
    }
    Ok(warnings)
}

/// Clear invalid media fields. Returns (icon cleared, background cleared).
fn repair_media(profile: &mut Profile) -> (bool, bool) {
    // An empty value means "none" and is never an error.
    let icon_bad = profile
        .icon
        .as_deref()
        .is_some_and(|icon| !icon.is_empty() && !is_valid_icon(icon));
    if icon_bad {
        log::debug!("Clearing invalid icon of profile '{}'", profile.name);
        profile.icon = None;
    }

    let background_bad = profile
        .background_image
        .as_deref()
        .is_some_and(|image| {
            !image.is_empty() && image != DESKTOP_WALLPAPER && !is_valid_resource(image)
        });
    if background_bad {
        log::debug!("Clearing invalid background image of profile '{}'", profile.name);
        profile.background_image = None;
    }

    (icon_bad, background_bad)
}

fn is_valid_icon(icon: &str) -> bool {
    icon.chars().count() <= MAX_GLYPH_ICON_CHARS || is_valid_resource(icon)
}

/// A value is a usable resource when, after environment expansion, it is an
/// absolute path or an absolute URI with a scheme.
pub fn is_valid_resource(value: &str) -> bool {
    let expanded = expand_env_vars(value);
    let path = expanded.trim();
    if path.is_empty() {
        return false;
    }
    if is_absolute_path(path) {
        return true;
    }
    url::Url::parse(path).is_ok_and(|uri| uri.scheme().len() > 1)
}

fn is_absolute_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/')
        || path.starts_with(r"\\")
        || (bytes.len() >= 3
            && bytes[0].is_ascii_alphabetic()
            && bytes[1] == b':'
            && (bytes[2] == b'\\' || bytes[2] == b'/'))
}

/// Stage 9: surface keybinding parse problems under a header warning. Every
/// nested warning is kept, one per offending binding.
pub fn keybindings_valid(state: &mut PipelineState, _sources: &SettingsSources) -> StageResult {
    if state.globals.keybinding_warnings.is_empty() {
        return Ok(Vec::new());
    }
    let mut warnings = vec![SettingsLoadWarning::AtLeastOneKeybindingWarning];
    warnings.extend(state.globals.keybinding_warnings.iter().copied());
    Ok(warnings)
}

/// Stage 10: non-iterating `setColorScheme` commands must name a known
/// scheme. Offending commands are removed.
pub fn color_schemes_in_commands(
    state: &mut PipelineState,
    _sources: &SettingsSources,
) -> StageResult {
    fn prune(commands: &mut Vec<Command>, globals: &GlobalAppSettings) -> bool {
        let mut found = false;
        commands.retain_mut(|command| {
            if let Some(scheme) = command.fixed_color_scheme()
                && !globals.has_color_scheme(scheme)
            {
                log::debug!(
                    "Command '{}' references unknown scheme '{scheme}'",
                    command.name
                );
                found = true;
                return false;
            }
            found |= prune(&mut command.nested, globals);
            true
        });
        found
    }

    let mut commands = std::mem::take(&mut state.globals.commands);
    let found = prune(&mut commands, &state.globals);
    state.globals.commands = commands;

    Ok(if found {
        vec![SettingsLoadWarning::InvalidColorSchemeInCmd]
    } else {
        Vec::new()
    })
}

/// Stage 11: flag the deprecated `"globals"` key in the user document.
pub fn no_globals_key_present(_state: &mut PipelineState, sources: &SettingsSources) -> StageResult {
    if sources.user.get(LEGACY_GLOBALS_KEY).is_some() {
        return Ok(vec![SettingsLoadWarning::LegacyGlobalsProperty]);
    }
    Ok(Vec::new())
}
