//! Profile identifiers.
//!
//! Guids render in the 38-character braced form (`{xxxxxxxx-xxxx-...}`) used by
//! settings documents. Profiles that do not declare one get a deterministic
//! UUIDv5 derived from their name and, when present, their source namespace, so
//! the same entry maps to the same guid on every load.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Namespace for guids derived from profile names.
const PROFILE_NAMESPACE: Uuid = Uuid::from_u128(0x2bde_4a90_d05f_401c_9492_e408_84ea_d1d8);

/// Length of a braced guid string.
pub const BRACED_GUID_LEN: usize = 38;

/// Unique identifier of a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid(Uuid);

impl Guid {
    /// The all-zero guid, used as "unset".
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Derive the guid of a profile that did not declare one.
    ///
    /// With a `source`, the name is hashed into a namespace derived from that
    /// source, so two generators can emit the same name without colliding.
    pub fn for_profile(name: &str, source: Option<&str>) -> Self {
        let namespace = match source {
            Some(source) => Uuid::new_v5(&PROFILE_NAMESPACE, source.as_bytes()),
            None => PROFILE_NAMESPACE,
        };
        Self(Uuid::new_v5(&namespace, name.as_bytes()))
    }

    /// Guid of a generated profile. Stable across reloads for the same
    /// generator namespace and profile name.
    pub fn for_generator(namespace_seed: &str, name: &str) -> Self {
        Self::for_profile(name, Some(namespace_seed))
    }

    /// Cheap shape test used before attempting a full parse: exactly 38
    /// characters and an opening brace.
    pub fn looks_like_guid(text: &str) -> bool {
        text.len() == BRACED_GUID_LEN && text.starts_with('{')
    }
}

/// Error for strings that are not guids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseGuidError(String);

impl fmt::Display for ParseGuidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid guid '{}'", self.0)
    }
}

impl std::error::Error for ParseGuidError {}

impl FromStr for Guid {
    type Err = ParseGuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(trimmed);
        Uuid::parse_str(inner)
            .map(Self)
            .map_err(|_| ParseGuidError(s.to_string()))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0.hyphenated())
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
