//! Settings aggregation.
//!
//! [`SettingsLoader`] turns a pair of documents plus the registered
//! generators into a [`CascadeSettings`] snapshot: globals are layered, the
//! profile tree is built and resolved, then the validation pipeline runs.
//! Every failure inside a load, panics included, comes back as a
//! [`SettingsLoadError`].

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::color_scheme::ColorScheme;
use crate::commands::{self, Command};
use crate::error::{SettingsLoadError, SettingsLoadWarning};
use crate::generator::ProfileGenerator;
use crate::globals::GlobalAppSettings;
use crate::guid::Guid;
use crate::layering::{self, GeneratedLayer};
use crate::profile_types::{Profile, ProfileEntry, ProfileSettings, tree};
use crate::sources::SettingsSources;
use crate::template::DEFAULT_PROFILE_GUID;
use crate::validation::{self, PipelineState};

/// Built-in defaults document
pub const DEFAULTS_JSON: &str = include_str!("../assets/defaults.json");

/// A resolved, validated settings snapshot.
#[derive(Debug, Clone)]
pub struct CascadeSettings {
    sources: SettingsSources,
    tree: Vec<ProfileEntry>,
    all_profiles: Vec<Profile>,
    active_profiles: Vec<Profile>,
    globals: GlobalAppSettings,
    profile_defaults: ProfileSettings,
    warnings: Vec<SettingsLoadWarning>,
}

impl CascadeSettings {
    /// Every profile, hidden ones included
    pub fn all_profiles(&self) -> &[Profile] {
        &self.all_profiles
    }

    /// Visible profiles in display order
    pub fn active_profiles(&self) -> &[Profile] {
        &self.active_profiles
    }

    /// Visible profiles with their groups
    pub fn profile_tree(&self) -> &[ProfileEntry] {
        &self.tree
    }

    pub fn globals(&self) -> &GlobalAppSettings {
        &self.globals
    }

    /// Warnings from the load that produced this snapshot, in stage order
    pub fn warnings(&self) -> &[SettingsLoadWarning] {
        &self.warnings
    }

    pub fn sources(&self) -> &SettingsSources {
        &self.sources
    }

    /// The user document's `profiles.defaults` record
    pub fn profile_defaults(&self) -> &ProfileSettings {
        &self.profile_defaults
    }

    /// Resolved default profile. Always set on a successfully loaded snapshot.
    pub fn default_profile(&self) -> Guid {
        self.globals
            .default_profile
            .or_else(|| self.active_profiles.first().map(|p| p.guid))
            .unwrap_or(DEFAULT_PROFILE_GUID)
    }

    /// Look a profile up by guid, hidden profiles included.
    pub fn find_profile(&self, guid: Guid) -> Option<&Profile> {
        self.all_profiles.iter().find(|p| p.guid == guid)
    }

    /// Guid of the first profile named exactly `name`.
    pub fn profile_guid_by_name(&self, name: &str) -> Option<Guid> {
        self.all_profiles
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.guid)
    }

    /// Pick the profile a new tab should use.
    ///
    /// A guid-shaped `name_or_guid` is tried as a guid first, then any
    /// `name_or_guid` as a profile name. Failing both, `index` selects an
    /// active profile. An index past the end, or no index at all, gives the
    /// default profile.
    pub fn profile_for_args(&self, index: Option<usize>, name_or_guid: Option<&str>) -> Guid {
        if let Some(reference) = name_or_guid {
            if Guid::looks_like_guid(reference)
                && let Ok(guid) = reference.parse::<Guid>()
                && self.find_profile(guid).is_some()
            {
                return guid;
            }
            if let Some(guid) = self.profile_guid_by_name(reference) {
                return guid;
            }
            log::debug!("No profile matches '{reference}'");
        }

        if let Some(index) = index {
            match self.active_profiles.get(index) {
                Some(profile) => return profile.guid,
                None => log::debug!("Profile index {index} is out of range, using the default"),
            }
        }
        self.default_profile()
    }

    /// Scheme used by the profile `guid`
    pub fn color_scheme_for_profile(&self, guid: Guid) -> Option<&ColorScheme> {
        let name = self.find_profile(guid)?.color_scheme.as_deref()?;
        self.globals.color_scheme(name)
    }

    /// Point every reference to scheme `old` at `new`, profile defaults
    /// included.
    pub fn update_color_scheme_references(&mut self, old: &str, new: &str) {
        let rename = |profile: &mut Profile| {
            if profile.color_scheme.as_deref() == Some(old) {
                profile.color_scheme = Some(new.to_string());
            }
        };
        tree::for_each_profile_mut(&mut self.tree, &mut |p| rename(p));
        self.all_profiles.iter_mut().for_each(rename);
        self.active_profiles.iter_mut().for_each(rename);
        if self.profile_defaults.color_scheme.as_deref() == Some(old) {
            self.profile_defaults.color_scheme = Some(new.to_string());
        }
    }

    /// Append a fresh profile inheriting from profile defaults.
    ///
    /// Named `"Profile N"` with the smallest N not below the profile count
    /// plus one that is still free. The guid is derived from that name.
    pub fn create_new_profile(&mut self) -> Profile {
        let taken: HashSet<&str> = self.all_profiles.iter().map(|p| p.name.as_str()).collect();
        let mut n = self.all_profiles.len() + 1;
        let name = loop {
            let candidate = format!("Profile {n}");
            if !taken.contains(candidate.as_str()) {
                break candidate;
            }
            n += 1;
        };

        let mut settings = ProfileSettings::named(&name).merged_over(&self.profile_defaults);
        settings.guid = Some(Guid::for_profile(&name, None));
        let profile = Profile::from_settings(settings, Vec::new());
        log::info!("Created profile '{}' {}", profile.name, profile.guid);

        self.tree.push(ProfileEntry::Profile(profile.clone()));
        self.all_profiles.push(profile.clone());
        self.active_profiles.push(profile.clone());
        profile
    }

    /// Commands with iterating entries expanded over the active profiles and
    /// the known schemes.
    pub fn expanded_commands(&self) -> Vec<Command> {
        commands::expand_commands(
            &self.globals.commands,
            &self.active_profiles,
            self.globals.color_schemes.values(),
        )
    }

    /// Default profile to write into a first-run settings file: the first
    /// active profile produced by `preferred_source`, else the built-in one.
    pub fn first_run_default_guid(&self, preferred_source: Option<&str>) -> Guid {
        preferred_source
            .and_then(|source| {
                self.active_profiles
                    .iter()
                    .find(|p| p.source.as_deref() == Some(source))
            })
            .map_or(DEFAULT_PROFILE_GUID, |p| p.guid)
    }

    /// A single-profile snapshot used when even the built-in defaults cannot
    /// be loaded.
    pub fn minimal() -> Self {
        let profile = Profile::new("Shell")
            .with_guid(DEFAULT_PROFILE_GUID)
            .color_scheme(crate::color_scheme::FALLBACK_SCHEME_NAME);
        let mut globals = GlobalAppSettings::new();
        let scheme = ColorScheme::campbell();
        globals.color_schemes.insert(scheme.name.clone(), scheme);
        globals.default_profile = Some(profile.guid);
        Self {
            sources: SettingsSources::default(),
            tree: vec![ProfileEntry::Profile(profile.clone())],
            all_profiles: vec![profile.clone()],
            active_profiles: vec![profile],
            globals,
            profile_defaults: ProfileSettings::default(),
            warnings: Vec::new(),
        }
    }
}

/// Result of a load that always yields usable settings.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub settings: Arc<CascadeSettings>,
    /// The error that forced the built-in defaults, if any
    pub error: Option<SettingsLoadError>,
}

impl LoadOutcome {
    pub fn used_defaults(&self) -> bool {
        self.error.is_some()
    }
}

/// Loads settings from documents and the registered generators.
#[derive(Default)]
pub struct SettingsLoader {
    generators: Vec<Box<dyn ProfileGenerator>>,
}

impl std::fmt::Debug for SettingsLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let namespaces: Vec<&str> = self.generators.iter().map(|g| g.namespace()).collect();
        f.debug_struct("SettingsLoader")
            .field("generators", &namespaces)
            .finish()
    }
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator. Generators run in registration order.
    pub fn with_generator(mut self, generator: impl ProfileGenerator + 'static) -> Self {
        self.generators.push(Box::new(generator));
        self
    }

    /// Resolve and validate `sources`.
    pub fn load(&self, sources: &SettingsSources) -> Result<CascadeSettings, SettingsLoadError> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.load_unchecked(sources))) {
            Ok(result) => result,
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                log::error!("Settings load panicked: {detail}");
                Err(SettingsLoadError::Unknown(detail))
            }
        }
    }

    fn load_unchecked(&self, sources: &SettingsSources) -> Result<CascadeSettings, SettingsLoadError> {
        let mut globals = GlobalAppSettings::new();
        globals.layer_json(&sources.defaults);
        globals.layer_json(&sources.user);

        let generated = self.run_generators(sources, &globals);
        let layered = layering::layer_profiles(sources, &generated)?;

        let mut state = PipelineState::new(layered.tree, globals);
        state.generated_order = layered.generated_order;
        state.group_slots = layered.group_slots;
        let warnings = validation::run_pipeline(&mut state, sources)?;

        log::debug!(
            "Loaded {} profile(s), {} active, {} warning(s)",
            state.all_profiles.len(),
            state.active_profiles.len(),
            warnings.len()
        );

        Ok(CascadeSettings {
            sources: sources.clone(),
            tree: state.tree,
            all_profiles: state.all_profiles,
            active_profiles: state.active_profiles,
            globals: state.globals,
            profile_defaults: layered.profile_defaults,
            warnings,
        })
    }

    fn run_generators(
        &self,
        sources: &SettingsSources,
        globals: &GlobalAppSettings,
    ) -> Vec<GeneratedLayer> {
        let mut existing = layering::declared_guids(&sources.defaults);
        existing.extend(layering::declared_guids(&sources.user));

        let mut layers = Vec::new();
        for generator in &self.generators {
            let namespace = generator.namespace();
            if globals.is_source_disabled(namespace) {
                log::debug!("Profile source '{namespace}' is disabled");
                continue;
            }
            match generator.generate(&existing) {
                Ok(drafts) => {
                    log::debug!("Generator '{namespace}' produced {} profile(s)", drafts.len());
                    layers.push(GeneratedLayer {
                        namespace: namespace.to_string(),
                        drafts,
                    });
                }
                Err(e) => log::warn!("Profile generator '{namespace}' failed: {e:#}"),
            }
        }
        layers
    }

    /// The built-in configuration: the embedded defaults document alone.
    pub fn load_defaults() -> CascadeSettings {
        let loaded = SettingsSources::parse(DEFAULTS_JSON, None)
            .and_then(|sources| SettingsLoader::new().load(&sources));
        match loaded {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Built-in defaults failed to load: {e}");
                CascadeSettings::minimal()
            }
        }
    }

    /// Load `sources`, falling back to the built-in defaults on any fatal
    /// error. The error is returned alongside so it can be shown.
    pub fn load_or_fallback(
        &self,
        sources: Result<SettingsSources, SettingsLoadError>,
    ) -> LoadOutcome {
        match sources.and_then(|sources| self.load(&sources)) {
            Ok(settings) => LoadOutcome {
                settings: Arc::new(settings),
                error: None,
            },
            Err(error) => {
                log::error!("Failed to load settings, using defaults: {error}");
                LoadOutcome {
                    settings: Arc::new(Self::load_defaults()),
                    error: Some(error),
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}
