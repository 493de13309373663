//! Key chords, actions and the keybinding map.
//!
//! Parses `"keybindings"` entries such as
//! `{ "keys": "ctrl+shift+t", "command": { "action": "newTab", "index": 0 } }`.
//! Problems found while parsing are collected as warnings instead of aborting;
//! the offending binding is skipped.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::SettingsLoadWarning;
use crate::json;

/// Error type for key chord parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseChordError(String);

impl fmt::Display for ParseChordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseChordError {}

/// Set of active modifiers for a key chord.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub win: bool,
}

/// The non-modifier part of a chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A single character, stored lowercase
    Char(char),
    Named(NamedKey),
    /// `f1` through `f24`
    Function(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Tab,
    Enter,
    Escape,
    Space,
    Backspace,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Plus,
    Minus,
}

impl NamedKey {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "tab" => NamedKey::Tab,
            "enter" => NamedKey::Enter,
            "esc" | "escape" => NamedKey::Escape,
            "space" => NamedKey::Space,
            "backspace" => NamedKey::Backspace,
            "delete" => NamedKey::Delete,
            "up" => NamedKey::Up,
            "down" => NamedKey::Down,
            "left" => NamedKey::Left,
            "right" => NamedKey::Right,
            "home" => NamedKey::Home,
            "end" => NamedKey::End,
            "pgup" | "pageup" => NamedKey::PageUp,
            "pgdn" | "pagedown" => NamedKey::PageDown,
            "insert" => NamedKey::Insert,
            "plus" => NamedKey::Plus,
            "minus" => NamedKey::Minus,
            _ => return None,
        })
    }

    fn as_str(&self) -> &'static str {
        match self {
            NamedKey::Tab => "tab",
            NamedKey::Enter => "enter",
            NamedKey::Escape => "esc",
            NamedKey::Space => "space",
            NamedKey::Backspace => "backspace",
            NamedKey::Delete => "delete",
            NamedKey::Up => "up",
            NamedKey::Down => "down",
            NamedKey::Left => "left",
            NamedKey::Right => "right",
            NamedKey::Home => "home",
            NamedKey::End => "end",
            NamedKey::PageUp => "pgup",
            NamedKey::PageDown => "pgdn",
            NamedKey::Insert => "insert",
            NamedKey::Plus => "plus",
            NamedKey::Minus => "minus",
        }
    }
}

/// A parsed key chord (modifiers + key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub modifiers: Modifiers,
    pub key: Key,
}

impl FromStr for KeyChord {
    type Err = ParseChordError;

    /// Parse `"modifier+modifier+key"`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if lower.is_empty() {
            return Err(ParseChordError("Empty key chord".to_string()));
        }

        // A trailing "+" names the plus key itself, as in "ctrl++".
        let (body, trailing_plus) = match lower.strip_suffix("++") {
            Some(rest) => (rest.to_string(), true),
            None => (lower.clone(), false),
        };

        let mut modifiers = Modifiers::default();
        let mut key = trailing_plus.then_some(Key::Named(NamedKey::Plus));

        for part in body.split('+').map(str::trim) {
            match part {
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "win" => modifiers.win = true,
                "" => return Err(ParseChordError(format!("Empty key in chord '{s}'"))),
                other => {
                    if key.is_some() {
                        return Err(ParseChordError(format!(
                            "Multiple keys specified in chord '{s}'"
                        )));
                    }
                    key = Some(parse_key(other)?);
                }
            }
        }

        let key = key.ok_or_else(|| ParseChordError(format!("No key specified in '{s}'")))?;
        Ok(KeyChord { modifiers, key })
    }
}

fn parse_key(s: &str) -> Result<Key, ParseChordError> {
    if let Some(named) = NamedKey::parse(s) {
        return Ok(Key::Named(named));
    }
    if let Some(number) = s.strip_prefix('f')
        && let Ok(n) = number.parse::<u8>()
        && (1..=24).contains(&n)
    {
        return Ok(Key::Function(n));
    }
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Key::Char(c)),
        _ => Err(ParseChordError(format!("Unknown key: '{s}'"))),
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.modifiers.ctrl {
            parts.push("ctrl".to_string());
        }
        if self.modifiers.alt {
            parts.push("alt".to_string());
        }
        if self.modifiers.shift {
            parts.push("shift".to_string());
        }
        if self.modifiers.win {
            parts.push("win".to_string());
        }
        match self.key {
            Key::Char(c) => parts.push(c.to_string()),
            Key::Named(named) => parts.push(named.as_str().to_string()),
            Key::Function(n) => parts.push(format!("f{n}")),
        }
        write!(f, "{}", parts.join("+"))
    }
}

impl Serialize for KeyChord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Actions a keybinding or command can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ShortcutAction {
    NewTab,
    CloseTab,
    NextTab,
    PrevTab,
    SwitchToTab,
    Copy,
    Paste,
    Find,
    OpenSettings,
    SetColorScheme,
}

impl ShortcutAction {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "newTab" => ShortcutAction::NewTab,
            "closeTab" => ShortcutAction::CloseTab,
            "nextTab" => ShortcutAction::NextTab,
            "prevTab" => ShortcutAction::PrevTab,
            "switchToTab" => ShortcutAction::SwitchToTab,
            "copy" => ShortcutAction::Copy,
            "paste" => ShortcutAction::Paste,
            "find" => ShortcutAction::Find,
            "openSettings" => ShortcutAction::OpenSettings,
            "setColorScheme" => ShortcutAction::SetColorScheme,
            _ => return None,
        })
    }
}

/// Arguments carried by an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ActionArgs {
    None,
    NewTab {
        #[serde(skip_serializing_if = "Option::is_none")]
        profile: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    SwitchToTab {
        index: usize,
    },
    SetColorScheme {
        #[serde(rename = "colorScheme")]
        scheme: String,
    },
}

/// An action together with its parsed arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionAndArgs {
    pub action: ShortcutAction,
    #[serde(skip_serializing_if = "ActionArgs::is_none")]
    pub args: ActionArgs,
}

impl ActionArgs {
    pub fn is_none(&self) -> bool {
        matches!(self, ActionArgs::None)
    }
}

impl ActionAndArgs {
    pub fn new(action: ShortcutAction) -> Self {
        Self {
            action,
            args: ActionArgs::None,
        }
    }

    pub fn set_color_scheme(scheme: impl Into<String>) -> Self {
        Self {
            action: ShortcutAction::SetColorScheme,
            args: ActionArgs::SetColorScheme {
                scheme: scheme.into(),
            },
        }
    }

    /// Parse a `"command"` value: an action name or `{ "action": ..., args }`.
    ///
    /// `Ok(None)` means "no action": `"unbound"`, or an action name that is not
    /// recognized. A missing required argument is reported as
    /// [`SettingsLoadWarning::MissingRequiredParameter`].
    pub fn from_json(value: &Value) -> Result<Option<Self>, SettingsLoadWarning> {
        let (name, args) = match value {
            Value::String(name) => (name.as_str(), None),
            Value::Object(obj) => match json::get_str(obj, "action") {
                Some(name) => (name, Some(obj)),
                None => return Err(SettingsLoadWarning::MissingRequiredParameter),
            },
            _ => return Ok(None),
        };

        if name == "unbound" {
            return Ok(None);
        }
        let Some(action) = ShortcutAction::parse(name) else {
            log::debug!("Ignoring unknown action '{name}'");
            return Ok(None);
        };

        let args = match action {
            ShortcutAction::NewTab => ActionArgs::NewTab {
                profile: args.and_then(|a| json::get_str(a, "profile")).map(str::to_string),
                index: args
                    .and_then(|a| json::get(a, "index"))
                    .and_then(Value::as_u64)
                    .and_then(|i| usize::try_from(i).ok()),
            },
            ShortcutAction::SwitchToTab => {
                let index = args
                    .and_then(|a| json::get(a, "index"))
                    .and_then(Value::as_u64)
                    .and_then(|i| usize::try_from(i).ok())
                    .ok_or(SettingsLoadWarning::MissingRequiredParameter)?;
                ActionArgs::SwitchToTab { index }
            }
            ShortcutAction::SetColorScheme => {
                let scheme = args
                    .and_then(|a| json::get_str(a, "colorScheme"))
                    .ok_or(SettingsLoadWarning::MissingRequiredParameter)?;
                ActionArgs::SetColorScheme {
                    scheme: scheme.to_string(),
                }
            }
            _ => ActionArgs::None,
        };

        Ok(Some(Self { action, args }))
    }

    /// Replace `token` with `value` in every string argument.
    pub fn substitute(&self, token: &str, value: &str) -> Self {
        let args = match &self.args {
            ActionArgs::NewTab { profile, index } => ActionArgs::NewTab {
                profile: profile.as_ref().map(|p| p.replace(token, value)),
                index: *index,
            },
            ActionArgs::SetColorScheme { scheme } => ActionArgs::SetColorScheme {
                scheme: scheme.replace(token, value),
            },
            other => other.clone(),
        };
        Self {
            action: self.action,
            args,
        }
    }
}

/// One chord bound to one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyBinding {
    pub keys: KeyChord,
    pub command: ActionAndArgs,
}

/// Ordered chord-to-action map. A later binding for the same chord replaces
/// the earlier one in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeyMapping {
    bindings: Vec<KeyBinding>,
}

impl KeyMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyBinding> {
        self.bindings.iter()
    }

    pub fn get(&self, chord: &KeyChord) -> Option<&ActionAndArgs> {
        self.bindings
            .iter()
            .find(|binding| binding.keys == *chord)
            .map(|binding| &binding.command)
    }

    pub fn bind(&mut self, keys: KeyChord, command: ActionAndArgs) {
        match self.bindings.iter_mut().find(|b| b.keys == keys) {
            Some(existing) => existing.command = command,
            None => self.bindings.push(KeyBinding { keys, command }),
        }
    }

    pub fn unbind(&mut self, keys: &KeyChord) {
        self.bindings.retain(|b| b.keys != *keys);
    }

    /// Layer a `"keybindings"` array, returning one warning per rejected entry.
    pub fn layer_json(&mut self, bindings: &[Value]) -> Vec<SettingsLoadWarning> {
        let mut warnings = Vec::new();
        for entry in bindings {
            if let Err(warning) = self.layer_binding(entry) {
                log::debug!("Skipping keybinding {entry}: {warning:?}");
                warnings.push(warning);
            }
        }
        warnings
    }

    fn layer_binding(&mut self, entry: &Value) -> Result<(), SettingsLoadWarning> {
        let Some(obj) = json::as_object(entry) else {
            return Err(SettingsLoadWarning::InvalidKeyChord);
        };

        let keys_text = match json::get(obj, "keys") {
            Some(Value::String(keys)) => keys.as_str(),
            Some(Value::Array(keys)) => match keys.as_slice() {
                [Value::String(single)] => single.as_str(),
                [] | [_] => return Err(SettingsLoadWarning::InvalidKeyChord),
                _ => return Err(SettingsLoadWarning::TooManyKeysForChord),
            },
            _ => return Err(SettingsLoadWarning::InvalidKeyChord),
        };
        let chord: KeyChord = keys_text
            .parse()
            .map_err(|_| SettingsLoadWarning::InvalidKeyChord)?;

        let command = obj.get("command").unwrap_or(&Value::Null);
        match ActionAndArgs::from_json(command)? {
            Some(action) => self.bind(chord, action),
            None => self.unbind(&chord),
        }
        Ok(())
    }
}
