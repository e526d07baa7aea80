// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use std::collections::BTreeMap;

use herald_core::State;

use crate::diagnostic::ConfigError;
use crate::model::HeraldConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure rather than stopping at the first one. Errors are
/// keyed by their dotted path and carry no span; callers that still have the
/// TOML sources locate them with [`crate::diagnostic::ConfigSources::attach`].
pub fn validate_config(config: &HeraldConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |key: &str, message: String| errors.push(ConfigError::invalid(key, message));

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        fail(
            "service.log_level",
            format!("must be one of {}", LOG_LEVELS.join(", ")),
        );
    }
    if !LOG_FORMATS.contains(&config.service.log_format.as_str()) {
        fail(
            "service.log_format",
            format!("must be one of {}", LOG_FORMATS.join(", ")),
        );
    }

    let host = config.server.host.trim();
    let hostname_like = host
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
    if host.is_empty() {
        fail("server.host", "must not be empty".into());
    } else if host.parse::<std::net::IpAddr>().is_err() && !hostname_like {
        fail(
            "server.host",
            format!("`{host}` is not an IP address or hostname"),
        );
    }
    if config.server.port == 0 {
        fail("server.port", "must be greater than 0".into());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path", "must not be empty".into());
    }

    let bus = &config.bus;
    for (key, value) in [
        ("bus.queue_capacity", bus.queue_capacity as u64),
        ("bus.max_concurrency", bus.max_concurrency as u64),
        ("bus.max_attempts", u64::from(bus.max_attempts)),
        ("bus.handler_timeout_secs", bus.handler_timeout_secs),
        ("ingress.worker_pool_size", config.ingress.worker_pool_size as u64),
        ("ingress.stream_buffer", config.ingress.stream_buffer as u64),
        ("publisher.mem_topic_capacity", config.publisher.mem_topic_capacity as u64),
    ] {
        if value == 0 {
            fail(key, "must be at least 1".into());
        }
    }
    if bus.initial_backoff_ms > bus.max_backoff_ms {
        fail(
            "bus.initial_backoff_ms",
            format!(
                "{}ms is longer than bus.max_backoff_ms ({}ms), so every retry would wait the cap",
                bus.initial_backoff_ms, bus.max_backoff_ms
            ),
        );
    }

    let lang = config.ingress.default_language.trim();
    if lang.is_empty() || lang.len() > 10 {
        fail(
            "ingress.default_language",
            format!("`{lang}` must be 1 to 10 characters"),
        );
    }

    if config.auth.jwt_secret.as_ref().is_some_and(|s| s.len() < 16) {
        fail("auth.jwt_secret", "must be at least 16 bytes".into());
    }

    if let Some(uri) = &config.profile.uri {
        if !(uri.starts_with("http://") || uri.starts_with("https://")) {
            fail("profile.uri", format!("`{uri}` must be an http(s) URL"));
        }
    }

    // Transports report after dispatch; a report must not send a
    // notification back to an ingress-only state.
    for (name, target) in &config.feedback.status_map {
        if matches!(target.state, State::Created | State::Checked) {
            fail(
                &format!("feedback.status_map.{name}.state"),
                format!("{} is set at ingress and cannot come from a transport", target.state),
            );
        }
    }
    errors.extend(status_map_collisions(&config.feedback.status_map));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn status_map_collisions<V>(map: &BTreeMap<String, V>) -> Vec<ConfigError> {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    let mut errors = Vec::new();
    for name in map.keys() {
        let folded = name.to_ascii_uppercase();
        match seen.get(&folded) {
            Some(first) => errors.push(ConfigError::StatusMapCollision {
                first: first.to_string(),
                second: name.clone(),
                span: None,
                src: None,
            }),
            None => {
                seen.insert(folded, name);
            }
        }
    }
    errors
}
