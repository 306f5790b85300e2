//! Desired-state file loading
//!
//! The file is a JSON array of `{ "name": "<email>", "role": "<role>" }`
//! records. Missing fields read as empty strings and such entries are later
//! skipped; unknown fields are ignored.

use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One user's desired role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredStateEntry {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub role: String,
}

impl DesiredStateEntry {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
        }
    }

    /// Entries with an empty name or role are skipped
    pub fn is_actionable(&self) -> bool {
        !self.name.trim().is_empty() && !self.role.is_empty()
    }
}

/// Parse desired-state JSON. `source` names the input in error messages.
pub fn parse_desired_state(json: &str, source: &str) -> Result<Vec<DesiredStateEntry>, InputError> {
    serde_json::from_str(json).map_err(|e| InputError::InvalidJson {
        path: source.to_string(),
        message: e.to_string(),
    })
}

/// Read and parse the desired-state file at `path`
pub fn load_desired_state(path: &Path) -> Result<Vec<DesiredStateEntry>, InputError> {
    let shown = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => InputError::NotFound(shown.clone()),
        _ => InputError::Io {
            path: shown.clone(),
            source: e,
        },
    })?;

    let entries = parse_desired_state(&contents, &shown)?;
    info!("Successfully loaded {} users from {}", entries.len(), shown);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_extra_fields() {
        let entries = parse_desired_state(
            r#"[{"name":"a@x.com","role":"Admin","team":"ops"},{"name":"b@x.com"},{}]"#,
            "inline",
        )
        .unwrap();

        assert_eq!(entries[0], DesiredStateEntry::new("a@x.com", "Admin"));
        assert_eq!(entries[1], DesiredStateEntry::new("b@x.com", ""));
        assert_eq!(entries[2], DesiredStateEntry::default());
    }

    #[test]
    fn test_actionable_entries() {
        assert!(DesiredStateEntry::new("a@x.com", "Admin").is_actionable());
        assert!(!DesiredStateEntry::new("", "Admin").is_actionable());
        assert!(!DesiredStateEntry::new("  ", "Admin").is_actionable());
        assert!(!DesiredStateEntry::new("b@x.com", "").is_actionable());
    }

    #[test]
    fn test_non_array_is_invalid() {
        let err = parse_desired_state(r#"{"name":"a@x.com","role":"Admin"}"#, "inline").unwrap_err();
        assert!(matches!(err, InputError::InvalidJson { .. }));

        let err = parse_desired_state("not json", "inline").unwrap_err();
        assert!(matches!(err, InputError::InvalidJson { .. }));
    }

    #[test]
    fn test_non_string_fields_are_invalid() {
        let err = parse_desired_state(r#"[{"name":"a@x.com","role":7}]"#, "inline").unwrap_err();
        assert!(matches!(err, InputError::InvalidJson { .. }));
    }
}
