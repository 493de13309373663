//! Command palette entries.
//!
//! Commands form a tree: an entry either runs an action or holds nested
//! commands. An entry with `"iterateOn"` is a template that expands into one
//! command per profile or per color scheme, with `${profile.name}` or
//! `${scheme.name}` substituted.

use serde::Serialize;
use serde_json::Value;

use crate::color_scheme::ColorScheme;
use crate::json;
use crate::keybindings::{ActionAndArgs, ActionArgs, ShortcutAction};
use crate::profile_types::Profile;

pub const PROFILE_NAME_TOKEN: &str = "${profile.name}";
pub const SCHEME_NAME_TOKEN: &str = "${scheme.name}";

/// What an iterating command expands over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpandCommandType {
    #[default]
    None,
    Profiles,
    ColorSchemes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionAndArgs>,

    #[serde(skip_serializing_if = "is_not_iterating")]
    pub iterate_on: ExpandCommandType,

    #[serde(rename = "commands", skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<Command>,
}

fn is_not_iterating(kind: &ExpandCommandType) -> bool {
    *kind == ExpandCommandType::None
}

impl Command {
    pub fn new(name: impl Into<String>, action: ActionAndArgs) -> Self {
        Self {
            name: name.into(),
            action: Some(action),
            iterate_on: ExpandCommandType::None,
            nested: Vec::new(),
        }
    }

    /// Parse one `"commands"` entry. Entries with neither a usable action nor
    /// nested commands are dropped.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = json::as_object(value)?;
        let Some(name) = json::get_str(obj, "name") else {
            log::debug!("Ignoring command without a name: {value}");
            return None;
        };

        let action = json::get(obj, "command").and_then(|command| {
            ActionAndArgs::from_json(command)
                .inspect_err(|warning| log::debug!("Command '{name}' has no action: {warning:?}"))
                .ok()
                .flatten()
        });

        let iterate_on = match json::get_str(obj, "iterateOn") {
            Some("profiles") => ExpandCommandType::Profiles,
            Some("schemes") => ExpandCommandType::ColorSchemes,
            Some(other) => {
                log::debug!("Command '{name}' has unknown iterateOn '{other}'");
                ExpandCommandType::None
            }
            None => ExpandCommandType::None,
        };

        let nested: Vec<Command> = json::get_array(obj, "commands")
            .map(|items| items.iter().filter_map(Command::from_json).collect())
            .unwrap_or_default();

        if action.is_none() && nested.is_empty() {
            log::debug!("Ignoring command '{name}' with no action");
            return None;
        }

        Some(Self {
            name: name.to_string(),
            action,
            iterate_on,
            nested,
        })
    }

    /// Color scheme this command switches to, when it is a non-iterating
    /// `setColorScheme` command.
    pub fn fixed_color_scheme(&self) -> Option<&str> {
        if self.iterate_on == ExpandCommandType::ColorSchemes {
            return None;
        }
        match &self.action {
            Some(ActionAndArgs {
                action: ShortcutAction::SetColorScheme,
                args: ActionArgs::SetColorScheme { scheme },
            }) => Some(scheme.as_str()),
            _ => None,
        }
    }

    fn substitute(&self, token: &str, value: &str) -> Self {
        Self {
            name: self.name.replace(token, value),
            action: self.action.as_ref().map(|a| a.substitute(token, value)),
            iterate_on: self.iterate_on,
            nested: self
                .nested
                .iter()
                .map(|child| child.substitute(token, value))
                .collect(),
        }
    }
}

/// Merge a `"commands"` array into `commands`. A command with the same name
/// replaces the existing one in place.
pub fn layer_commands(commands: &mut Vec<Command>, entries: &[Value]) {
    for command in entries.iter().filter_map(Command::from_json) {
        match commands.iter_mut().find(|c| c.name == command.name) {
            Some(existing) => *existing = command,
            None => commands.push(command),
        }
    }
}

/// Expand iterating commands against the given profiles and schemes.
pub fn expand_commands<'a>(
    commands: &[Command],
    profiles: &[Profile],
    schemes: impl Iterator<Item = &'a ColorScheme> + Clone,
) -> Vec<Command> {
    let mut out = Vec::new();
    for command in commands {
        match command.iterate_on {
            ExpandCommandType::None => {
                let mut expanded = command.clone();
                expanded.nested = expand_commands(&command.nested, profiles, schemes.clone());
                out.push(expanded);
            }
            ExpandCommandType::Profiles => {
                for profile in profiles {
                    let mut expanded = command.substitute(PROFILE_NAME_TOKEN, &profile.name);
                    expanded.iterate_on = ExpandCommandType::None;
                    expanded.nested = expand_commands(&expanded.nested, profiles, schemes.clone());
                    out.push(expanded);
                }
            }
            ExpandCommandType::ColorSchemes => {
                for scheme in schemes.clone() {
                    let mut expanded = command.substitute(SCHEME_NAME_TOKEN, &scheme.name);
                    expanded.iterate_on = ExpandCommandType::None;
                    expanded.nested = expand_commands(&expanded.nested, profiles, schemes.clone());
                    out.push(expanded);
                }
            }
        }
    }
    out
}
