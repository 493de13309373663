//! Dynamic profile generators shipped with the command-line tool.
//!
//! - [`ShellProfileGenerator`]: one profile per login shell in `/etc/shells`
//! - [`SshHostGenerator`]: one hidden profile per `Host` alias in `~/.ssh/config`

pub mod shells;
pub mod ssh_hosts;

pub use shells::{SHELLS_NAMESPACE, ShellProfileGenerator};
pub use ssh_hosts::{SSH_HOSTS_NAMESPACE, SshHostGenerator};

use termset_model::SettingsLoader;

/// Loader with every built-in generator registered, shells first.
pub fn default_loader() -> SettingsLoader {
    SettingsLoader::new()
        .with_generator(ShellProfileGenerator::new())
        .with_generator(SshHostGenerator::new())
}
