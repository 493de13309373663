//! Parsed settings documents.

use serde_json::Value;

use crate::error::SettingsLoadError;
use crate::json;

/// The two raw documents a load starts from. Kept alongside the resolved
/// settings so later operations can re-derive from them.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsSources {
    pub defaults: Value,
    pub user: Value,
}

impl Default for SettingsSources {
    fn default() -> Self {
        Self::from_values(Value::Object(Default::default()), Value::Object(Default::default()))
    }
}

impl SettingsSources {
    pub fn from_values(defaults: Value, user: Value) -> Self {
        Self { defaults, user }
    }

    /// Parse both documents. A missing or blank user document is `{}`.
    pub fn parse(defaults_text: &str, user_text: Option<&str>) -> Result<Self, SettingsLoadError> {
        let defaults = parse_document("defaults", defaults_text)?;
        let user = match user_text {
            Some(text) if !text.trim().is_empty() => parse_document("settings", text)?,
            _ => Value::Object(Default::default()),
        };
        Ok(Self { defaults, user })
    }

    /// Profile list entries of `document`: the bare `"profiles"` array, or
    /// `"profiles.list"`.
    pub fn profile_list(document: &Value) -> &[Value] {
        match document.get("profiles") {
            Some(Value::Array(list)) => list.as_slice(),
            Some(Value::Object(obj)) => json::get_array(obj, "list")
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            _ => &[],
        }
    }

    /// The `"profiles.defaults"` fragment of `document`, if any.
    pub fn profile_defaults(document: &Value) -> Option<&Value> {
        document
            .get("profiles")
            .and_then(Value::as_object)
            .and_then(|obj| json::get(obj, "defaults"))
    }
}

/// Parse one document, turning a syntax error into a located diagnostic.
pub fn parse_document(label: &str, text: &str) -> Result<Value, SettingsLoadError> {
    serde_json::from_str(text).map_err(|e| {
        SettingsLoadError::JsonParse(format!(
            "* Line {}, Column {} ({label})\n  {}",
            e.line(),
            e.column(),
            strip_location(&e.to_string())
        ))
    })
}

/// serde_json appends " at line L column C"; the diagnostic already has it.
fn strip_location(message: &str) -> &str {
    message
        .rfind(" at line ")
        .map_or(message, |idx| &message[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_missing_user_is_empty_object() {
        let sources = SettingsSources::parse(r#"{"profiles": []}"#, None).expect("valid");
        assert_eq!(sources.user, json!({}));
        let sources = SettingsSources::parse("{}", Some("   ")).expect("valid");
        assert_eq!(sources.user, json!({}));
    }

    #[test]
    fn test_parse_error_diagnostic() {
        let err = SettingsSources::parse("{}", Some("{\n  \"a\": 1\n  \"b\": 2\n}"))
            .expect_err("missing comma");
        let SettingsLoadError::JsonParse(diagnostic) = err else {
            panic!("expected a JSON parse error");
        };
        assert!(
            diagnostic.starts_with("* Line 3, Column "),
            "unexpected diagnostic: {diagnostic}"
        );
        assert!(diagnostic.contains("(settings)\n  "));
        assert!(!diagnostic.contains(" at line "));
    }

    #[test]
    fn test_profile_list_shapes() {
        let bare = json!({ "profiles": [ { "name": "a" } ] });
        let nested = json!({ "profiles": { "defaults": { "icon": "x" }, "list": [ { "name": "a" }, { "name": "b" } ] } });
        assert_eq!(SettingsSources::profile_list(&bare).len(), 1);
        assert_eq!(SettingsSources::profile_list(&nested).len(), 2);
        assert_eq!(SettingsSources::profile_list(&json!({})).len(), 0);
        assert!(SettingsSources::profile_defaults(&bare).is_none());
        assert_eq!(
            SettingsSources::profile_defaults(&nested),
            Some(&json!({ "icon": "x" }))
        );
    }
}
