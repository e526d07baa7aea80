// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Herald configuration system.

use herald_config::diagnostic::ConfigError;
use herald_config::model::HeraldConfig;
use herald_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use herald_core::{State, Status};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[service]
name = "herald-test"
log_level = "debug"
log_format = "json"

[server]
host = "0.0.0.0"
port = 8088
request_timeout_secs = 5

[storage]
database_path = "/tmp/herald-test.db"
migrate_only = true

[bus]
queue_capacity = 16
max_concurrency = 4
max_attempts = 3
initial_backoff_ms = 10
max_backoff_ms = 100
handler_timeout_secs = 2

[ingress]
worker_pool_size = 2
submit_timeout_ms = 50
stream_buffer = 8
default_language = "sw"

[publisher]
request_timeout_secs = 3
mem_topic_capacity = 32

[auth]
jwt_secret = "0123456789abcdef0123"
issuer = "https://auth.example"
audience = "herald"

[profile]
uri = "http://profiles.internal"
bearer_token = "tok"
timeout_secs = 1
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should load");
    assert_eq!(config.service.name, "herald-test");
    assert_eq!(config.service.log_format, "json");
    assert_eq!(config.server.port, 8088);
    assert!(config.storage.migrate_only);
    assert_eq!(config.bus.max_attempts, 3);
    assert_eq!(config.ingress.default_language, "sw");
    assert_eq!(config.publisher.mem_topic_capacity, 32);
    assert_eq!(config.auth.audience.as_deref(), Some("herald"));
    assert_eq!(config.profile.uri.as_deref(), Some("http://profiles.internal"));
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty config is valid");
    let defaults = HeraldConfig::default();
    assert_eq!(config.server.port, defaults.server.port);
    assert_eq!(config.bus.max_attempts, defaults.bus.max_attempts);
    assert_eq!(config.ingress.default_language, "en");
    assert!(config.auth.jwt_secret.is_none());
}

#[test]
fn unknown_key_gets_a_suggestion() {
    let toml = r#"
[bus]
max_atempts = 3
"#;
    let errors = load_and_validate_str(toml).expect_err("unknown key must fail");
    let found = errors.iter().any(|e| match e {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => key == "max_atempts" && suggestion.as_deref() == Some("max_attempts"),
        _ => false,
    });
    assert!(found, "expected UnknownKey with suggestion, got {errors:?}");
}

#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[telegram]
bot_token = "abc"
"#;
    assert!(load_and_validate_str(toml).is_err());
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[server]
port = "eighty"
"#;
    let errors = load_and_validate_str(toml).expect_err("string port must fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. } | ConfigError::Other(_))),
        "got {errors:?}"
    );
}

#[test]
fn semantic_validation_runs_after_parse() {
    let toml = r#"
[bus]
max_concurrency = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("zero concurrency must fail");
    let located = errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { key, span: Some(span), .. }
            if key == "bus.max_concurrency" && span.offset() == toml.find("max_concurrency").unwrap())
    });
    assert!(located, "expected a located bus.max_concurrency error, got {errors:?}");
}

#[test]
fn status_map_entries_extend_defaults() {
    let toml = r#"
[feedback.status_map.READ]
state = "INACTIVE"
status = "SUCCESSFUL"
"#;
    let config = load_and_validate_str(toml).expect("status map entry is valid");
    let read = config.feedback.resolve("read");
    assert_eq!(read.state, State::Inactive);
    assert_eq!(read.status, Status::Successful);
    // Defaults survive the merge.
    assert_eq!(config.feedback.resolve("DELIVRD").status, Status::Successful);
}

#[test]
fn status_map_rejects_unknown_state() {
    let toml = r#"
[feedback.status_map.READ]
state = "FINISHED"
status = "SUCCESSFUL"
"#;
    assert!(load_and_validate_str(toml).is_err());
}

#[test]
fn load_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("herald.toml");
    std::fs::write(&path, "[server]\nport = 9191\n").unwrap();
    let config = load_and_validate_path(&path).expect("file config loads");
    assert_eq!(config.server.port, 9191);
}

#[test]
fn status_map_errors_point_into_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("herald.toml");
    let content = "[feedback.status_map.READ]\nstate = \"CREATED\"\nstatus = \"SUCCESSFUL\"\n\n[feedback.status_map.read]\nstate = \"INACTIVE\"\nstatus = \"SUCCESSFUL\"\n";
    std::fs::write(&path, content).unwrap();

    let errors = load_and_validate_path(&path).expect_err("bad status map must fail");
    let state = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::Validation { key, span, .. } if key == "feedback.status_map.READ.state" => {
                *span
            }
            _ => None,
        })
        .expect("located state error");
    assert_eq!(state.offset(), content.find("state").unwrap());

    let collision = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::StatusMapCollision { second, span, .. } => Some((second.clone(), *span)),
            _ => None,
        })
        .expect("collision reported");
    assert_eq!(collision.0, "read");
    assert_eq!(collision.1.unwrap().offset(), content.find("read]").unwrap());
}

#[test]
fn env_override_reaches_the_auth_section() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("HERALD_AUTH_JWT_SECRET", "0123456789abcdef-env");
        jail.create_file("herald.toml", "[server]\nport = 9292\n")?;
        let path = jail.directory().join("herald.toml");
        let config = load_and_validate_path(&path).expect("env override loads");
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("0123456789abcdef-env"));
        assert_eq!(config.server.port, 9292);
        Ok(())
    });
}
