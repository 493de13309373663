//! Subcommand implementations.
//!
//! Each `*_cli` entry point writes to stdout. The writer-generic variants
//! behind them are what the tests drive.

use anyhow::{Result, bail};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use termset_model::{
    CascadeSettings, Guid, LoadOutcome, Profile, ReloadCoordinator, ReloadReport, SettingsLoadWarning,
    SettingsLoader, SettingsStore, SettingsWatcher, render_settings_template,
};

use super::RuntimeOptions;
use crate::generators::{self, SHELLS_NAMESPACE};
use crate::paths::write_atomic;

/// Debounce applied to file events before a reload is queued
const WATCH_DEBOUNCE: Duration = Duration::from_millis(100);

/// Loader for this run, with or without the built-in generators.
pub fn loader_for(options: &RuntimeOptions) -> SettingsLoader {
    if options.generators {
        generators::default_loader()
    } else {
        SettingsLoader::new()
    }
}

/// Load the configured documents, falling back to the built-in defaults.
pub fn load(options: &RuntimeOptions) -> LoadOutcome {
    loader_for(options).load_or_fallback(options.paths.read_sources())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveReport<'a> {
    default_profile: Guid,
    profiles: &'a [Profile],
    warnings: &'a [SettingsLoadWarning],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn resolve_cli(options: &RuntimeOptions, json: bool) -> Result<()> {
    let stdout = io::stdout();
    resolve(options, json, &mut stdout.lock())
}

/// Print the resolved settings in text or JSON form.
pub fn resolve(options: &RuntimeOptions, json: bool, out: &mut impl Write) -> Result<()> {
    let outcome = load(options);
    if json {
        write_json_report(&outcome, out)
    } else {
        write_text_report(&outcome, out)
    }
}

fn write_json_report(outcome: &LoadOutcome, out: &mut impl Write) -> Result<()> {
    let settings = &outcome.settings;
    let report = ResolveReport {
        default_profile: settings.default_profile(),
        profiles: settings.active_profiles(),
        warnings: settings.warnings(),
        error: outcome.error.as_ref().map(|e| e.message()),
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

fn write_text_report(outcome: &LoadOutcome, out: &mut impl Write) -> Result<()> {
    if let Some(error) = &outcome.error {
        writeln!(out, "{}", error.message())?;
        writeln!(out, "Using the built-in defaults.")?;
        writeln!(out)?;
    }

    let settings = &outcome.settings;
    write_profiles(settings, out)?;

    if !settings.warnings().is_empty() {
        writeln!(out)?;
        writeln!(out, "Warnings:")?;
        for warning in settings.warnings() {
            let indent = if warning.is_keybinding_warning() { "    " } else { "  " };
            writeln!(out, "{indent}- {warning}")?;
        }
    }
    Ok(())
}

fn write_profiles(settings: &CascadeSettings, out: &mut impl Write) -> Result<()> {
    let default_guid = settings.default_profile();
    writeln!(out, "Profiles:")?;
    for (index, profile) in settings.active_profiles().iter().enumerate() {
        let marker = if profile.guid == default_guid { '*' } else { ' ' };
        write!(out, "{marker} {index:>2}  {}  {}", profile.guid, profile.name)?;
        if let Some(scheme) = &profile.color_scheme {
            write!(out, "  [{scheme}]")?;
        }
        if let Some(source) = &profile.source {
            write!(out, "  ({source})")?;
        }
        writeln!(out)?;
    }

    let default_name = settings
        .find_profile(default_guid)
        .map(|p| p.name.as_str())
        .unwrap_or("");
    writeln!(out)?;
    writeln!(out, "Default profile: {default_guid}  {default_name}")?;
    Ok(())
}

pub fn profile_cli(
    options: &RuntimeOptions,
    index: Option<usize>,
    name_or_guid: Option<&str>,
) -> Result<()> {
    let stdout = io::stdout();
    profile(options, index, name_or_guid, &mut stdout.lock())
}

/// Print the guid and name of the profile a new tab would open.
pub fn profile(
    options: &RuntimeOptions,
    index: Option<usize>,
    name_or_guid: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let outcome = load(options);
    if let Some(error) = &outcome.error {
        log::warn!("Resolving against the built-in defaults: {error}");
    }
    let settings = &outcome.settings;
    let guid = settings.profile_for_args(index, name_or_guid);
    let name = settings.find_profile(guid).map(|p| p.name.as_str()).unwrap_or("");
    writeln!(out, "{guid}  {name}")?;
    Ok(())
}

pub fn init_cli(options: &RuntimeOptions, force: bool) -> Result<()> {
    let path = init(options, force)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Write a first-run settings file and return its path.
///
/// The default profile is the first generated shell when one exists, otherwise
/// the default of the defaults document.
pub fn init(options: &RuntimeOptions, force: bool) -> Result<PathBuf> {
    let path = options.paths.settings.clone();
    if path.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite it)",
            path.display()
        );
    }

    let outcome = loader_for(options).load_or_fallback(options.paths.read_defaults());
    let default_guid = outcome
        .settings
        .first_run_default_guid(Some(SHELLS_NAMESPACE));
    let contents = render_settings_template(
        termset_model::USER_SETTINGS_TEMPLATE,
        default_guid,
        crate::VERSION,
        "termset",
    );

    write_atomic(&path, &contents)?;
    log::info!("Wrote first-run settings to {}", path.display());
    Ok(path)
}

/// Watch the settings file and report every reload until interrupted.
pub fn watch_cli(options: &RuntimeOptions) -> Result<()> {
    let loader = Arc::new(loader_for(options));
    let (store, error) = SettingsStore::initial_load(&loader, options.paths.read_sources());
    if let Some(error) = error {
        eprintln!("{}", error.message());
        eprintln!("Using the built-in defaults until the file is fixed.");
    }
    let store = Arc::new(store);
    print_summary(&store.snapshot());

    let provider_paths = options.paths.clone();
    let listener_store = Arc::clone(&store);
    let coordinator = ReloadCoordinator::new(Arc::clone(&store), loader, move || {
        provider_paths.read_sources()
    })
    .with_listener(move |report| match report {
        ReloadReport::Applied { warnings } => {
            crate::debug_info!("RELOAD", "applied with {} warning(s)", warnings.len());
            println!("Reloaded settings ({} warning(s))", warnings.len());
            for warning in warnings {
                println!("  - {warning}");
            }
            print_summary(&listener_store.snapshot());
        }
        ReloadReport::Failed(error) => {
            crate::debug_error!("RELOAD", "reload failed: {}", error);
            eprintln!("{}", error.message());
            eprintln!("Keeping the previous settings.");
        }
    });

    let watcher =
        SettingsWatcher::for_coordinator(&options.paths.settings, WATCH_DEBOUNCE, coordinator)?;
    println!("Watching {} (Ctrl-C to stop)", watcher.path().display());

    loop {
        std::thread::park();
    }
}

fn print_summary(settings: &CascadeSettings) {
    let default_name = settings
        .find_profile(settings.default_profile())
        .map(|p| p.name.clone())
        .unwrap_or_default();
    println!(
        "{} active profile(s), default '{default_name}'",
        settings.active_profiles().len()
    );
}
