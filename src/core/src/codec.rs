//! Stored role value codec
//!
//! Role lists are written as JSON arrays of strings. Older entries hold a
//! bare role name instead, so decoding never fails: anything that is not a
//! JSON list of strings is read as a single role.

use serde_json::Value;
use tracing::warn;

/// Content type attached to role values written by rolegate
pub const ROLE_CONTENT_TYPE: &str = "application/json";

/// Encode a role list as a JSON array
pub fn encode_roles<S: AsRef<str>>(roles: &[S]) -> String {
    let roles: Vec<&str> = roles.iter().map(AsRef::as_ref).collect();
    Value::from(roles).to_string()
}

/// Decode a stored role value
pub fn decode_roles(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) if items.iter().all(Value::is_string) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(role) => Some(role),
                _ => None,
            })
            .collect(),
        Ok(Value::String(role)) => vec![role],
        Ok(other) => {
            warn!(
                "Unexpected role value shape ({}), treating raw value as a single role",
                json_kind(&other)
            );
            vec![raw.to_string()]
        }
        // Legacy entries: bare role name
        Err(_) => vec![raw.to_string()],
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "mixed array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_list() {
        assert_eq!(decode_roles(r#"["Admin","Member"]"#), vec!["Admin", "Member"]);
        assert_eq!(decode_roles("[]"), Vec::<String>::new());
    }

    #[test]
    fn test_decode_bare_string_fallback() {
        assert_eq!(decode_roles("Admin"), vec!["Admin"]);
        assert_eq!(decode_roles("Read Only"), vec!["Read Only"]);
    }

    #[test]
    fn test_decode_json_string() {
        assert_eq!(decode_roles(r#""Member""#), vec!["Member"]);
    }

    #[test]
    fn test_decode_empty_value() {
        assert!(decode_roles("").is_empty());
        assert!(decode_roles("  ").is_empty());
    }

    #[test]
    fn test_decode_other_shapes_use_raw_value() {
        let raw = r#"{"role":"Admin"}"#;
        assert_eq!(decode_roles(raw), vec![raw]);

        assert_eq!(decode_roles("42"), vec!["42"]);

        let mixed = r#"["Admin",1]"#;
        assert_eq!(decode_roles(mixed), vec![mixed]);
    }

    #[test]
    fn test_encode_single_role() {
        assert_eq!(encode_roles(&["Admin"]), r#"["Admin"]"#);
        assert_eq!(decode_roles(&encode_roles(&["Admin"])), vec!["Admin"]);
    }
}
