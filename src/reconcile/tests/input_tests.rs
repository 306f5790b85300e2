//! Desired-state file loading and exit code classification

use rolegate_reconcile::{exit, load_desired_state, DesiredStateEntry, InputError};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

fn write_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_loads_records() {
    let file = write_file(
        r#"[
            {"name": "alice@example.com", "role": "Admin"},
            {"name": "bob@example.com", "role": "Member", "department": "sales"}
        ]"#,
    );

    let entries = load_desired_state(file.path()).unwrap();
    assert_eq!(
        entries,
        vec![
            DesiredStateEntry::new("alice@example.com", "Admin"),
            DesiredStateEntry::new("bob@example.com", "Member"),
        ]
    );
}

#[test]
fn test_empty_array_is_valid() {
    let file = write_file("[]");
    assert!(load_desired_state(file.path()).unwrap().is_empty());
}

#[test]
fn test_missing_file_exits_with_2() {
    let dir = tempdir().unwrap();
    let err = load_desired_state(&dir.path().join("users.json")).unwrap_err();

    assert!(matches!(err, InputError::NotFound(_)));
    assert_eq!(exit::for_input_error(&err), exit::FILE_NOT_FOUND);
}

#[test]
fn test_malformed_json_exits_with_3() {
    let file = write_file(r#"[{"name": "alice@example.com", "role": "Admin"}"#);
    let err = load_desired_state(file.path()).unwrap_err();

    assert!(matches!(err, InputError::InvalidJson { .. }));
    assert_eq!(exit::for_input_error(&err), exit::INVALID_JSON);
}

#[test]
fn test_object_instead_of_array_exits_with_3() {
    let file = write_file(r#"{"users": []}"#);
    let err = load_desired_state(file.path()).unwrap_err();
    assert_eq!(exit::for_input_error(&err), exit::INVALID_JSON);
}

#[test]
fn test_directory_is_an_unexpected_error() {
    let dir = tempdir().unwrap();
    let err = load_desired_state(dir.path()).unwrap_err();

    assert!(matches!(err, InputError::Io { .. }));
    assert_eq!(exit::for_input_error(&err), exit::UNEXPECTED);
}
