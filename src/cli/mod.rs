//! Command-line interface for termset.
//!
//! This module handles argument parsing. Subcommand implementations live in
//! the [`commands`] submodule.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::paths::SettingsPaths;

/// termset - Resolve layered terminal profile settings
#[derive(Parser)]
#[command(name = "termset")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// User settings file (default: ~/.config/termset/settings.json)
    #[arg(long, value_name = "PATH", global = true)]
    pub settings: Option<PathBuf>,

    /// Defaults document overriding the built-in one
    #[arg(long, value_name = "PATH", global = true)]
    pub defaults: Option<PathBuf>,

    /// Do not run the shell and ssh profile generators
    #[arg(long, global = true)]
    pub no_generators: bool,

    /// Set debug log level (overrides RUST_LOG and DEBUG_LEVEL)
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the resolved profiles, default profile and warnings (default)
    Resolve {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the guid a new tab would use
    Profile {
        /// Profile name or braced guid
        name_or_guid: Option<String>,

        /// Index into the visible profiles
        #[arg(long)]
        index: Option<usize>,
    },

    /// Write a first-run settings file
    Init {
        /// Overwrite an existing settings file
        #[arg(short, long)]
        force: bool,
    },

    /// Reload and report whenever the settings file changes
    Watch,
}

/// Options shared by every subcommand
#[derive(Clone, Debug)]
pub struct RuntimeOptions {
    pub paths: SettingsPaths,
    pub generators: bool,
    /// Log level override from CLI
    pub log_level: Option<log::LevelFilter>,
}

impl Cli {
    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            paths: SettingsPaths::with_overrides(self.settings.clone(), self.defaults.clone()),
            generators: !self.no_generators,
            log_level: self.log_level.map(|l| l.to_level_filter()),
        }
    }
}

/// Run the parsed command line and return the process exit code.
pub fn run(cli: Cli, options: &RuntimeOptions) -> i32 {
    use commands::{init_cli, profile_cli, resolve_cli, watch_cli};

    let result = match cli.command {
        None => resolve_cli(options, false),
        Some(Commands::Resolve { json }) => resolve_cli(options, json),
        Some(Commands::Profile {
            name_or_guid,
            index,
        }) => profile_cli(options, index, name_or_guid.as_deref()),
        Some(Commands::Init { force }) => init_cli(options, force),
        Some(Commands::Watch) => watch_cli(options),
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("termset: error: {e:#}");
            log::error!("Command failed: {e:#}");
            1
        }
    }
}
