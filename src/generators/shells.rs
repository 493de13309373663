//! Profiles for the login shells installed on the host.

use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use termset_model::{Guid, ProfileDraft, ProfileGenerator};

use crate::paths::read_optional;

/// Namespace of generated shell profiles
pub const SHELLS_NAMESPACE: &str = "Termset.Shells";

const SHELLS_FILE: &str = "/etc/shells";

/// Emits one profile per shell listed in `/etc/shells`, named after the binary.
#[derive(Debug, Clone)]
pub struct ShellProfileGenerator {
    shells_file: PathBuf,
    /// Injected file contents. Existence checks are skipped for these.
    contents: Option<String>,
}

impl Default for ShellProfileGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellProfileGenerator {
    pub fn new() -> Self {
        Self {
            shells_file: PathBuf::from(SHELLS_FILE),
            contents: None,
        }
    }

    /// Generator over the given `/etc/shells` text.
    pub fn from_contents(contents: impl Into<String>) -> Self {
        Self {
            shells_file: PathBuf::from(SHELLS_FILE),
            contents: Some(contents.into()),
        }
    }

    fn shell_paths(&self) -> Result<Vec<String>> {
        let (contents, check_exists) = match &self.contents {
            Some(text) => (text.clone(), false),
            None => match read_optional(&self.shells_file)? {
                Some(text) => (text, true),
                None => return Ok(Vec::new()),
            },
        };
        Ok(parse_shells(&contents)
            .into_iter()
            .filter(|path| !check_exists || Path::new(path).exists())
            .collect())
    }
}

/// Shell paths from `/etc/shells` text, comments and blank lines skipped.
pub fn parse_shells(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

impl ProfileGenerator for ShellProfileGenerator {
    fn namespace(&self) -> &str {
        SHELLS_NAMESPACE
    }

    fn generate(&self, existing: &HashSet<Guid>) -> Result<Vec<ProfileDraft>> {
        let mut seen_names = HashSet::new();
        let mut drafts = Vec::new();
        for path in self.shell_paths()? {
            let name = Path::new(&path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.clone());
            // /bin/bash and /usr/bin/bash are the same shell to a user.
            if !seen_names.insert(name.clone()) {
                continue;
            }
            crate::debug_log!("GENERATOR", "shell '{}' -> {}", name, path);
            let draft = ProfileDraft::new(SHELLS_NAMESPACE, &name).commandline(&path);
            if draft.guid().is_some_and(|guid| existing.contains(&guid)) {
                log::debug!("Shell profile '{name}' is customised in settings");
            }
            drafts.push(draft);
        }
        Ok(drafts)
    }
}
