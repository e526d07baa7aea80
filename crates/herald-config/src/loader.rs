// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./herald.toml` > `~/.config/herald/herald.toml` > `/etc/herald/herald.toml`
//! with environment variable overrides via `HERALD_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::HeraldConfig;

/// Top-level sections, used to turn `HERALD_BUS_MAX_ATTEMPTS` into `bus.max_attempts`.
const SECTIONS: &[&str] = &[
    "service",
    "server",
    "storage",
    "bus",
    "ingress",
    "publisher",
    "auth",
    "profile",
    "feedback",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/herald/herald.toml` (system-wide)
/// 3. `~/.config/herald/herald.toml` (user XDG config)
/// 4. `./herald.toml` (local directory)
/// 5. `HERALD_*` environment variables
pub fn load_config() -> Result<HeraldConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<HeraldConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HeraldConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HeraldConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HeraldConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(HeraldConfig::default()))
        .merge(Toml::file("/etc/herald/herald.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("herald/herald.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("herald.toml"))
        .merge(env_provider())
}

/// Environment provider mapping the first `_` after a known section to a dot.
///
/// `Env::split("_")` would break keys that contain underscores, e.g.
/// `HERALD_STORAGE_DATABASE_PATH` must become `storage.database_path`.
/// Figment hands the key over in its original case.
fn env_provider() -> Env {
    Env::prefixed("HERALD_").map(|key| env_key(key.as_str()).into())
}

fn env_key(raw: &str) -> String {
    let key = raw.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("HERALD_STORAGE_DATABASE_PATH", "/tmp/env.db");
            jail.set_env("HERALD_BUS_MAX_ATTEMPTS", "9");
            jail.set_env("HERALD_AUTH_JWT_SECRET", "from-env");
            jail.set_env("HERALD_INGRESS_DEFAULT_LANGUAGE", "fr");
            jail.create_file("herald.toml", "[server]\nport = 9000\n")?;

            let config = load_config()?;
            assert_eq!(config.storage.database_path, "/tmp/env.db");
            assert_eq!(config.bus.max_attempts, 9);
            assert_eq!(config.auth.jwt_secret.as_deref(), Some("from-env"));
            assert_eq!(config.ingress.default_language, "fr");
            assert_eq!(config.server.port, 9000);
            Ok(())
        });
    }

    #[test]
    fn env_keys_map_to_sections_in_any_case() {
        assert_eq!(env_key("AUTH_JWT_SECRET"), "auth.jwt_secret");
        assert_eq!(env_key("storage_database_path"), "storage.database_path");
        assert_eq!(env_key("Bus_Max_Attempts"), "bus.max_attempts");
        assert_eq!(env_key("UNKNOWN_KEY"), "unknown_key");
    }

    #[test]
    fn env_wins_over_local_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("herald.toml", "[server]\nport = 9000\n")?;
            jail.set_env("HERALD_SERVER_PORT", "9100");
            let config = load_config()?;
            assert_eq!(config.server.port, 9100);
            Ok(())
        });
    }
}
