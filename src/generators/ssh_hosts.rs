//! Profiles for the hosts named in `~/.ssh/config`.

use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;
use termset_model::{Guid, ProfileDraft, ProfileGenerator};

use crate::paths::read_optional;

/// Namespace of generated ssh profiles
pub const SSH_HOSTS_NAMESPACE: &str = "Termset.SshHosts";

/// Emits one hidden `ssh <alias>` profile per connectable host alias. Users
/// show a host by setting `"hidden": false` on its profile.
#[derive(Debug, Clone)]
pub struct SshHostGenerator {
    config_path: Option<PathBuf>,
    contents: Option<String>,
}

impl Default for SshHostGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SshHostGenerator {
    pub fn new() -> Self {
        Self {
            config_path: dirs::home_dir().map(|home| home.join(".ssh").join("config")),
            contents: None,
        }
    }

    /// Generator over the given ssh config text.
    pub fn from_contents(contents: impl Into<String>) -> Self {
        Self {
            config_path: None,
            contents: Some(contents.into()),
        }
    }
}

/// Host aliases in ssh config text, in file order without repeats.
///
/// Patterns (`*`, `?`) and negations (`!`) are not connectable targets and are
/// skipped. `Host foo bar` yields both aliases.
pub fn parse_host_aliases(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut aliases = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = if let Some(eq_pos) = line.find('=') {
            let (k, v) = line.split_at(eq_pos);
            (k.trim(), v[1..].trim())
        } else if let Some(space_pos) = line.find(char::is_whitespace) {
            let (k, v) = line.split_at(space_pos);
            (k.trim(), v.trim())
        } else {
            continue;
        };

        if !key.eq_ignore_ascii_case("host") {
            continue;
        }
        for alias in value.split_whitespace() {
            if alias.contains(['*', '?', '!']) {
                continue;
            }
            if seen.insert(alias.to_string()) {
                aliases.push(alias.to_string());
            }
        }
    }
    aliases
}

impl ProfileGenerator for SshHostGenerator {
    fn namespace(&self) -> &str {
        SSH_HOSTS_NAMESPACE
    }

    fn generate(&self, _existing: &HashSet<Guid>) -> Result<Vec<ProfileDraft>> {
        let contents = match (&self.contents, &self.config_path) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => match read_optional(path)? {
                Some(text) => text,
                None => return Ok(Vec::new()),
            },
            (None, None) => return Ok(Vec::new()),
        };

        Ok(parse_host_aliases(&contents)
            .into_iter()
            .map(|alias| {
                ProfileDraft::new(SSH_HOSTS_NAMESPACE, &alias)
                    .commandline(format!("ssh {alias}"))
                    .hidden(true)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
# defaults
Host *
    ServerAliveInterval 30

Host web web-staging
    HostName 10.0.0.5
    User deploy

Host=db
    Port 5432

Host build-?? !bastion web
"#;

    #[test]
    fn test_parse_host_aliases() {
        assert_eq!(parse_host_aliases(CONFIG), vec!["web", "web-staging", "db"]);
    }

    #[test]
    fn test_generate_hidden_ssh_profiles() {
        let drafts = SshHostGenerator::from_contents(CONFIG)
            .generate(&HashSet::new())
            .expect("generate");
        assert_eq!(drafts.len(), 3);
        assert_eq!(drafts[2].settings.name.as_deref(), Some("db"));
        assert_eq!(drafts[2].settings.commandline.as_deref(), Some("ssh db"));
        assert_eq!(drafts[2].settings.hidden, Some(true));
        assert_eq!(drafts[2].guid(), Some(Guid::for_generator(SSH_HOSTS_NAMESPACE, "db")));
    }

    #[test]
    fn test_no_config_yields_nothing() {
        let generator = SshHostGenerator {
            config_path: None,
            contents: None,
        };
        assert!(generator.generate(&HashSet::new()).expect("generate").is_empty());
    }
}
