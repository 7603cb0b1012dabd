#![allow(clippy::unwrap_used, clippy::panic)]

use serde::Serialize;
use toml::Value;

use super::{Snapshot, set_value_at_path};
use crate::ConfigError;

fn sample() -> Snapshot {
    Snapshot::from_toml_str(
        r#"
title = "panel"

[server]
port = 8080
ratio = 0.5
enabled = true
hosts = ["a", "b"]
mixed = ["a", 1]

[[servers]]
name = "primary"
"#,
    )
    .unwrap()
}

#[test]
fn reads_each_kind_by_path() {
    let snapshot = sample();

    assert_eq!(snapshot.string("title"), Some("panel".to_string()));
    assert_eq!(snapshot.int("server.port"), Some(8080));
    assert_eq!(snapshot.double("server.ratio"), Some(0.5));
    assert_eq!(snapshot.bool("server.enabled"), Some(true));
    assert_eq!(
        snapshot.string_array("server.hosts"),
        Some(vec!["a".to_string(), "b".to_string()])
    );
}

#[test]
fn navigates_into_arrays_with_numeric_segments() {
    let snapshot = sample();

    assert_eq!(snapshot.string("servers.0.name"), Some("primary".to_string()));
    assert_eq!(snapshot.string("server.hosts.1"), Some("b".to_string()));
    assert!(snapshot.get("servers.3.name").is_none());
    assert!(snapshot.get("servers.first.name").is_none());
}

#[test]
fn mismatched_kinds_are_absent() {
    let snapshot = sample();

    assert_eq!(snapshot.int("title"), None);
    assert_eq!(snapshot.double("server.port"), None);
    assert_eq!(snapshot.string("server.enabled"), None);
    assert_eq!(snapshot.string_array("server.mixed"), None);
    assert_eq!(snapshot.string_array("title"), None);
}

#[test]
fn missing_and_malformed_paths_are_absent() {
    let snapshot = sample();

    assert!(!snapshot.contains("missing"));
    assert!(!snapshot.contains("title.nested"));
    assert!(!snapshot.contains(""));
}

#[test]
fn rejects_invalid_toml() {
    let result = Snapshot::from_toml_str("this is = = not toml");

    assert!(matches!(result, Err(ConfigError::TomlParseError { .. })));
}

#[test]
fn builds_from_serializable_structs() {
    #[derive(Serialize)]
    struct General {
        log_level: String,
    }

    #[derive(Serialize)]
    struct Root {
        general: General,
    }

    let snapshot = Snapshot::from_serializable(&Root {
        general: General {
            log_level: "debug".to_string(),
        },
    })
    .unwrap();

    assert_eq!(
        snapshot.string("general.log_level"),
        Some("debug".to_string())
    );
}

#[test]
fn set_value_creates_intermediate_tables() {
    let mut root = Value::Table(toml::Table::new());

    set_value_at_path(&mut root, "modules.clock.format", Value::String("%H".into())).unwrap();

    let snapshot = Snapshot::new(root.as_table().cloned().unwrap());
    assert_eq!(
        snapshot.string("modules.clock.format"),
        Some("%H".to_string())
    );
}

#[test]
fn set_value_rejects_scalar_parents() {
    let mut root = Value::Table(toml::Table::new());
    set_value_at_path(&mut root, "title", Value::String("x".into())).unwrap();

    let result = set_value_at_path(&mut root, "title.inner", Value::Boolean(true));

    assert!(matches!(result, Err(ConfigError::InvalidPath(_))));
}
