//! Environment variable expansion for media paths.
//!
//! Icon and background-image values may reference the environment as
//! `%VAR%` or `${VAR}` (optionally `${VAR:-default}`). References to unset
//! variables are left as written.

use regex::Regex;
use std::sync::LazyLock;

/// Regex pattern for matching `${VAR_NAME}` or `${VAR_NAME:-default_value}` syntax.
static BRACED_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?}")
        .expect("braced env-var regex is a compile-time constant and must be valid")
});

/// Regex pattern for matching `%VAR_NAME%`.
static PERCENT_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%([A-Za-z_][A-Za-z0-9_()]*)%")
        .expect("percent env-var regex is a compile-time constant and must be valid")
});

/// Expand against the process environment.
pub fn expand_env_vars(input: &str) -> String {
    expand_env_vars_with(input, |name| std::env::var(name).ok())
}

/// Expand with a caller-supplied lookup.
pub fn expand_env_vars_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let braced = BRACED_VAR_PATTERN.replace_all(input, |caps: &regex::Captures| {
        lookup(&caps[1])
            .or_else(|| caps.get(2).map(|m| m.as_str().to_string()))
            .unwrap_or_else(|| caps[0].to_string())
    });
    PERCENT_VAR_PATTERN
        .replace_all(&braced, |caps: &regex::Captures| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
