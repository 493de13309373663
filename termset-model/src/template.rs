//! First-run settings template.

use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::guid::Guid;

/// Guid of the built-in "Shell" profile in the embedded defaults document.
pub const DEFAULT_PROFILE_GUID: Guid =
    Guid::from_uuid(Uuid::from_u128(0x61c5_4bbd_c2c6_5271_96e7_009a_87ff_44bf));

/// Skeleton written as the user's settings file on first run.
pub const USER_SETTINGS_TEMPLATE: &str = include_str!("../assets/user_template.json");

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%([A-Z_]+)%").expect("template token regex is a compile-time constant and must be valid")
});

/// Replace `%DEFAULT_PROFILE%`, `%VERSION%` and `%PRODUCT%`. Unknown tokens
/// are left as written.
pub fn render_settings_template(
    template: &str,
    default_guid: Guid,
    version: &str,
    product: &str,
) -> String {
    let default_guid = default_guid.to_string();
    TOKEN_PATTERN
        .replace_all(template, |caps: &regex::Captures| match &caps[1] {
            "DEFAULT_PROFILE" => default_guid.clone(),
            "VERSION" => version.to_string(),
            "PRODUCT" => product.to_string(),
            _ => caps[0].to_string(),
        })
        .into_owned()
}
