// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Herald - multi-tenant notification dispatch.
//!
//! This is the binary entry point for the Herald service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use herald_config::HeraldConfig;

/// Herald - multi-tenant notification dispatch.
#[derive(Parser, Debug)]
#[command(name = "herald", version, about, long_about = None)]
struct Cli {
    /// Read this file instead of the XDG config hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the dispatch pipeline and the HTTP gateway.
    Serve,
    /// Apply database migrations and exit.
    Migrate,
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Validate and print the effective configuration.
    Check,
}

fn load(path: Option<&PathBuf>) -> HeraldConfig {
    let loaded = match path {
        Some(p) => herald_config::load_and_validate_path(p),
        None => herald_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            herald_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => {
            if config.storage.migrate_only {
                serve::run_migrate(config).await
            } else {
                serve::run_serve(config).await
            }
        }
        Some(Commands::Migrate) => serve::run_migrate(config).await,
        Some(Commands::Config {
            action: ConfigAction::Check,
        }) => match effective_config(&config) {
            Ok(text) => {
                println!("{text}");
                Ok(())
            }
            Err(e) => Err(e),
        },
        None => {
            println!("herald: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("herald: {e}");
        std::process::exit(1);
    }
}

/// Effective configuration as TOML with secrets masked.
fn effective_config(config: &HeraldConfig) -> Result<String, herald_core::HeraldError> {
    let mut shown = config.clone();
    if shown.auth.jwt_secret.is_some() {
        shown.auth.jwt_secret = Some("[redacted]".into());
    }
    if shown.profile.bearer_token.is_some() {
        shown.profile.bearer_token = Some("[redacted]".into());
    }
    toml::to_string_pretty(&shown)
        .map_err(|e| herald_core::HeraldError::Config(format!("cannot render config: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_config_check() {
        let cli = Cli::parse_from(["herald", "--config", "/tmp/h.toml", "config", "check"]);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/h.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Check
            })
        ));
    }

    #[test]
    fn effective_config_masks_secrets() {
        let mut config = HeraldConfig::default();
        config.auth.jwt_secret = Some("super-secret".into());
        let text = effective_config(&config).unwrap();
        assert!(!text.contains("super-secret"));
        assert!(text.contains("[redacted]"));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = herald_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.service.name, "herald");
    }
}
