// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Herald notification service.
//!
//! TOML files in the XDG hierarchy plus `HERALD_` environment overrides,
//! strict key checking, semantic validation, and miette diagnostics with
//! typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use herald_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("listening on {}:{}", config.server.host, config.server.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, ConfigSources, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::HeraldConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Both parse and validation failures are located in the TOML file that
/// defined the offending key, when one did.
pub fn load_and_validate() -> Result<HeraldConfig, Vec<ConfigError>> {
    finish(loader::load_config(), ConfigSources::new(collect_toml_sources()))
}

/// Load a specific file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<HeraldConfig, Vec<ConfigError>> {
    let sources = std::fs::read_to_string(path)
        .map(|content| vec![(path.display().to_string(), content)])
        .unwrap_or_default();
    finish(loader::load_config_from_path(path), ConfigSources::new(sources))
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<HeraldConfig, Vec<ConfigError>> {
    let sources = ConfigSources::new(vec![("<inline>".to_string(), toml_content.to_string())]);
    finish(loader::load_config_from_str(toml_content), sources)
}

fn finish(
    loaded: Result<HeraldConfig, figment::Error>,
    sources: ConfigSources,
) -> Result<HeraldConfig, Vec<ConfigError>> {
    let config = loaded.map_err(|err| diagnostic::from_figment(err, &sources))?;
    validation::validate_config(&config).map_err(|mut errors| {
        sources.attach(&mut errors);
        errors
    })?;
    Ok(config)
}

/// Existing config files, lowest precedence first.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut candidates = vec![std::path::PathBuf::from("/etc/herald/herald.toml")];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("herald/herald.toml"));
    }
    if let Ok(dir) = std::env::current_dir() {
        candidates.push(dir.join("herald.toml"));
    }

    candidates
        .into_iter()
        .filter_map(|path| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|content| (path.display().to_string(), content))
        })
        .collect()
}
