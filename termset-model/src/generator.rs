//! Dynamic profile generators.
//!
//! A generator discovers profiles at load time (installed shells, known ssh
//! hosts, ...). Its drafts are layered after the defaults document and before
//! the user document, so users can override or hide them like any other
//! profile.

use std::collections::HashSet;

use crate::guid::Guid;
use crate::profile_types::ProfileSettings;

/// A profile proposed by a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDraft {
    pub settings: ProfileSettings,
}

impl ProfileDraft {
    /// Draft named `name` whose guid is derived from `namespace`, so the same
    /// discovery yields the same guid on every load.
    pub fn new(namespace: &str, name: impl Into<String>) -> Self {
        let name = name.into();
        let guid = Guid::for_generator(namespace, &name);
        Self {
            settings: ProfileSettings {
                guid: Some(guid),
                source: Some(namespace.to_string()),
                name: Some(name),
                ..ProfileSettings::default()
            },
        }
    }

    pub fn guid(&self) -> Option<Guid> {
        self.settings.effective_guid()
    }

    /// Builder method to set the command line
    pub fn commandline(mut self, commandline: impl Into<String>) -> Self {
        self.settings.commandline = Some(commandline.into());
        self
    }

    /// Builder method to set the hidden flag
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.settings.hidden = Some(hidden);
        self
    }
}

/// Source of synthesized profiles.
///
/// `Send + Sync` because generators run on the reload worker thread.
pub trait ProfileGenerator: Send + Sync {
    /// Namespace of this generator. Written to each draft's `source` and
    /// matched against `"disabledProfileSources"`.
    fn namespace(&self) -> &str;

    /// Produce drafts in display order. `existing` holds the guids the
    /// settings documents already define.
    fn generate(&self, existing: &HashSet<Guid>) -> anyhow::Result<Vec<ProfileDraft>>;
}
