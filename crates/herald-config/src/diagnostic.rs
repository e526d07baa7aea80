// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics rendered with miette.
//!
//! Every error carries the dotted key it is about (`bus.max_attempts`,
//! `feedback.status_map.READ.state`). [`ConfigSources`] resolves that key to
//! a span in whichever `herald.toml` defined it, so both parse failures and
//! semantic validation failures point at the offending line.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a known key needs before it is offered as a fix.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key the model does not define.
    #[error("unknown key `{key}` in {}", table_label(.table))]
    #[diagnostic(
        code(herald::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// The unrecognized key name.
        key: String,
        /// Dotted path of the table holding it; empty for the root.
        table: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a herald setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(herald::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(code(herald::config::missing_key))]
    MissingKey { key: String },

    /// A value that parses but is not usable.
    #[error("invalid `{key}`: {message}")]
    #[diagnostic(code(herald::config::validation))]
    Validation {
        key: String,
        message: String,
        #[label("{message}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// Two `feedback.status_map` entries that differ only in case.
    #[error("`feedback.status_map` defines both `{first}` and `{second}`")]
    #[diagnostic(
        code(herald::config::status_map_collision),
        help("transport statuses match case-insensitively; keep one of the two entries")
    )]
    StatusMapCollision {
        first: String,
        second: String,
        #[label("duplicate of `{first}`")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("configuration error: {0}")]
    #[diagnostic(code(herald::config::other))]
    Other(String),
}

impl ConfigError {
    /// A validation failure for `key`, located later by [`ConfigSources::attach`].
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Validation {
            key: key.into(),
            message: message.into(),
            span: None,
            src: None,
        }
    }

    /// Dotted key the error refers to, if any.
    pub fn key_path(&self) -> Option<String> {
        match self {
            ConfigError::UnknownKey { key, table, .. } if table.is_empty() => Some(key.clone()),
            ConfigError::UnknownKey { key, table, .. } => Some(format!("{table}.{key}")),
            ConfigError::InvalidType { key, .. }
            | ConfigError::MissingKey { key }
            | ConfigError::Validation { key, .. } => Some(key.clone()),
            ConfigError::StatusMapCollision { second, .. } => {
                Some(format!("feedback.status_map.{second}"))
            }
            ConfigError::Other(_) => None,
        }
    }

    fn set_location(&mut self, located: Option<(SourceSpan, NamedSource<String>)>) {
        let Some((at, named)) = located else { return };
        match self {
            ConfigError::UnknownKey { span, src, .. }
            | ConfigError::InvalidType { span, src, .. }
            | ConfigError::Validation { span, src, .. }
            | ConfigError::StatusMapCollision { span, src, .. } => {
                *span = Some(at);
                *src = Some(named);
            }
            ConfigError::MissingKey { .. } | ConfigError::Other(_) => {}
        }
    }
}

fn table_label(table: &str) -> String {
    if table.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{table}]")
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? known keys: {valid_keys}"),
        None => format!("known keys: {valid_keys}"),
    }
}

/// TOML files (or inline strings) that fed a load, keyed by display name.
#[derive(Debug, Default, Clone)]
pub struct ConfigSources {
    files: Vec<(String, String)>,
}

impl ConfigSources {
    pub fn new(files: Vec<(String, String)>) -> Self {
        Self { files }
    }

    /// Locate `path` in the named file, else in the last file that defines it.
    ///
    /// Later files override earlier ones, so the last definition is the one
    /// that took effect.
    pub fn locate(&self, file: Option<&str>, path: &[&str]) -> Option<(SourceSpan, NamedSource<String>)> {
        let named = file.and_then(|f| self.files.iter().find(|(name, _)| name == f));
        let candidates: Vec<&(String, String)> = match named {
            Some(entry) => vec![entry],
            None => self.files.iter().rev().collect(),
        };
        candidates.into_iter().find_map(|(name, content)| {
            key_span(content, path)
                .map(|span| (span, NamedSource::new(name, content.clone())))
        })
    }

    /// Fill in spans for errors that do not have one yet.
    pub fn attach(&self, errors: &mut [ConfigError]) {
        for error in errors.iter_mut() {
            let Some(key) = error.key_path() else { continue };
            let path: Vec<&str> = key.split('.').collect();
            error.set_location(self.locate(None, &path));
        }
    }
}

/// Byte span of the last segment of `path` in TOML `content`.
///
/// Understands `[a.b]` table headers and `key = value` lines. A path that
/// names a table is located at its header.
pub fn key_span(content: &str, path: &[&str]) -> Option<SourceSpan> {
    let (key, table) = path.split_last()?;
    let mut current: Vec<String> = Vec::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();

        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.split(']').next()) {
            current = header
                .trim_matches('[')
                .split('.')
                .map(|s| s.trim().trim_matches('"').to_string())
                .collect();
            if current.iter().map(String::as_str).eq(path.iter().copied()) {
                let name_at = trimmed.find(*key).unwrap_or(1);
                return Some(SourceSpan::new((offset + indent + name_at).into(), key.len()));
            }
        } else if current.iter().map(String::as_str).eq(table.iter().copied()) {
            let bare = trimmed.strip_prefix(*key);
            let quoted = trimmed
                .strip_prefix('"')
                .and_then(|t| t.strip_prefix(*key))
                .and_then(|t| t.strip_prefix('"'));
            let defines = bare
                .or(quoted)
                .is_some_and(|rest| rest.trim_start().starts_with('='));
            if defines {
                let name_at = usize::from(quoted.is_some() && bare.is_none());
                return Some(SourceSpan::new((offset + indent + name_at).into(), key.len()));
            }
        }
        offset += line.len();
    }
    None
}

/// Translate figment failures into diagnostics located in `sources`.
pub fn from_figment(err: figment::Error, sources: &ConfigSources) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let segments: Vec<String> = error.path.clone();
            let file = error
                .metadata
                .as_ref()
                .and_then(|m| m.source.as_ref())
                .and_then(|s| match s {
                    figment::Source::File(path) => Some(path.display().to_string()),
                    _ => None,
                });

            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let mut path: Vec<&str> = segments.iter().map(String::as_str).collect();
                    path.push(field.as_str());
                    let mut diag = ConfigError::UnknownKey {
                        key: field.clone(),
                        table: segments.join("."),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span: None,
                        src: None,
                    };
                    diag.set_location(sources.locate(file.as_deref(), &path));
                    diag
                }
                Kind::MissingField(field) => {
                    let mut key = segments.clone();
                    key.push(field.to_string());
                    ConfigError::MissingKey { key: key.join(".") }
                }
                Kind::InvalidType(actual, expected) => {
                    let path: Vec<&str> = segments.iter().map(String::as_str).collect();
                    let mut diag = ConfigError::InvalidType {
                        key: segments.join("."),
                        found: actual.to_string(),
                        expected: expected.to_string(),
                        span: None,
                        src: None,
                    };
                    diag.set_location(sources.locate(file.as_deref(), &path));
                    diag
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Closest known key to `unknown`, if any is close enough.
pub fn suggest_key(unknown: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|k| (strsim::jaro_winkler(unknown, k), *k))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, k)| k.to_string())
}

/// Print diagnostics to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML: &str = "[server]\nport = 1\n\n[bus]\nmax_atempts = 3\n\n[feedback.status_map.READ]\nstate = \"CREATED\"\n";

    fn text(span: SourceSpan) -> &'static str {
        &TOML[span.offset()..span.offset() + span.len()]
    }

    #[test]
    fn suggestions_pick_the_closest_key() {
        let known = &["queue_capacity", "max_concurrency", "max_attempts"];
        assert_eq!(suggest_key("max_atempts", known).as_deref(), Some("max_attempts"));
        assert_eq!(suggest_key("jwt_secert", &["jwt_secret", "issuer"]).as_deref(), Some("jwt_secret"));
        assert_eq!(suggest_key("zzzzzz", &["host", "port"]), None);
    }

    #[test]
    fn spans_follow_table_headers() {
        let span = key_span(TOML, &["bus", "max_atempts"]).unwrap();
        assert_eq!(text(span), "max_atempts");
        assert_eq!(span.offset(), TOML.find("max_atempts").unwrap());

        let state = key_span(TOML, &["feedback", "status_map", "READ", "state"]).unwrap();
        assert_eq!(state.offset(), TOML.find("state =").unwrap());

        let header = key_span(TOML, &["feedback", "status_map", "READ"]).unwrap();
        assert_eq!(text(header), "READ");

        // `port` exists, but not under [bus].
        assert!(key_span(TOML, &["bus", "port"]).is_none());
    }

    #[test]
    fn quoted_keys_are_found() {
        let toml = "[feedback.status_map]\n\"DELIVRD\" = { state = \"INACTIVE\", status = \"SUCCESSFUL\" }\n";
        let span = key_span(toml, &["feedback", "status_map", "DELIVRD"]).unwrap();
        assert_eq!(&toml[span.offset()..span.offset() + span.len()], "DELIVRD");
    }

    #[test]
    fn attach_locates_validation_errors() {
        let sources = ConfigSources::new(vec![("herald.toml".into(), TOML.into())]);
        let mut errors = vec![
            ConfigError::invalid("feedback.status_map.READ.state", "pre-dispatch state"),
            ConfigError::invalid("publisher.mem_topic_capacity", "must be at least 1"),
        ];
        sources.attach(&mut errors);
        assert!(matches!(&errors[0], ConfigError::Validation { span: Some(_), src: Some(_), .. }));
        assert!(matches!(&errors[1], ConfigError::Validation { span: None, .. }));
    }

    #[test]
    fn later_files_win_when_locating() {
        let sources = ConfigSources::new(vec![
            ("/etc/herald/herald.toml".into(), "[bus]\nmax_attempts = 1\n".into()),
            ("herald.toml".into(), "\n[bus]\nmax_attempts = 0\n".into()),
        ]);
        let (span, named) = sources.locate(None, &["bus", "max_attempts"]).unwrap();
        assert_eq!(named.name(), "herald.toml");
        assert_eq!(span.offset(), 7);
    }
}
