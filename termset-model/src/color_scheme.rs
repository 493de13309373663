/// Color scheme definitions parsed from the `"schemes"` list
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::json;

/// Scheme substituted for profiles that reference an unknown one. The built-in
/// defaults document always defines it.
pub const FALLBACK_SCHEME_NAME: &str = "Campbell";

/// JSON keys of the 16-entry color table, in ANSI order.
pub const TABLE_KEYS: [&str; 16] = [
    "black",
    "red",
    "green",
    "yellow",
    "blue",
    "purple",
    "cyan",
    "white",
    "brightBlack",
    "brightRed",
    "brightGreen",
    "brightYellow",
    "brightBlue",
    "brightPurple",
    "brightCyan",
    "brightWhite",
];

/// A color in RGB format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn as_array(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl FromStr for Color {
    type Err = String;

    /// Parse `#RRGGBB`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| format!("color '{s}' must start with '#'"))?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("color '{s}' must have the form #RRGGBB"));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|e| format!("color '{s}': {e}"))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Terminal color scheme with 16 ANSI colors plus foreground/background
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorScheme {
    pub name: String,
    pub foreground: Color,
    pub background: Color,
    pub cursor_color: Color,
    pub selection_background: Color,
    pub table: [Color; 16],
}

impl ColorScheme {
    /// A scheme with Campbell's colors under a new name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::campbell()
        }
    }

    /// Parse a `"schemes"` entry. Entries without a name are rejected.
    pub fn from_json(value: &Value) -> Option<Self> {
        let name = json::as_object(value).and_then(|obj| json::get_str(obj, "name"))?;
        let mut scheme = Self::new(name);
        scheme.layer_json(value);
        Some(scheme)
    }

    /// Overwrite every color present in `value`. Malformed colors are skipped.
    pub fn layer_json(&mut self, value: &Value) {
        let Some(obj) = json::as_object(value) else {
            return;
        };
        let apply = |key: &str, target: &mut Color| {
            if let Some(text) = json::get_str(obj, key) {
                match text.parse() {
                    Ok(color) => *target = color,
                    Err(e) => log::debug!("Ignoring scheme color \"{key}\": {e}"),
                }
            }
        };
        apply("foreground", &mut self.foreground);
        apply("background", &mut self.background);
        apply("cursorColor", &mut self.cursor_color);
        apply("selectionBackground", &mut self.selection_background);
        for (key, slot) in TABLE_KEYS.iter().zip(self.table.iter_mut()) {
            apply(*key, slot);
        }
        apply("magenta", &mut self.table[5]);
        apply("brightMagenta", &mut self.table[13]);
    }

    /// Get ANSI color by index (0-15)
    pub fn ansi_color(&self, index: u8) -> Color {
        self.table
            .get(usize::from(index))
            .copied()
            .unwrap_or(self.foreground)
    }

    /// Campbell, the fallback scheme
    pub fn campbell() -> Self {
        Self {
            name: FALLBACK_SCHEME_NAME.to_string(),
            foreground: Color::new(204, 204, 204),
            background: Color::new(12, 12, 12),
            cursor_color: Color::new(255, 255, 255),
            selection_background: Color::new(255, 255, 255),
            table: [
                Color::new(12, 12, 12),
                Color::new(197, 15, 31),
                Color::new(19, 161, 14),
                Color::new(193, 156, 0),
                Color::new(0, 55, 218),
                Color::new(136, 23, 152),
                Color::new(58, 150, 221),
                Color::new(204, 204, 204),
                Color::new(118, 118, 118),
                Color::new(231, 72, 86),
                Color::new(22, 198, 12),
                Color::new(249, 241, 165),
                Color::new(59, 120, 255),
                Color::new(180, 0, 158),
                Color::new(97, 214, 214),
                Color::new(242, 242, 242),
            ],
        }
    }
}
