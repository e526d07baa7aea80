// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Herald notification service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use herald_core::{State, Status};
use serde::{Deserialize, Serialize};

/// Top-level Herald configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with `HERALD_`
/// environment variable overrides. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HeraldConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Event bus concurrency and redelivery.
    #[serde(default)]
    pub bus: BusConfig,

    /// Ingress worker pool and defaults.
    #[serde(default)]
    pub ingress: IngressConfig,

    /// Transport publisher settings.
    #[serde(default)]
    pub publisher: PublisherConfig,

    /// Bearer token validation.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Profile service client.
    #[serde(default)]
    pub profile: ProfileConfig,

    /// Delivery report mapping.
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_service_name() -> String {
    "herald".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound for non-streaming requests.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7080
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Run migrations and exit.
    #[serde(default)]
    pub migrate_only: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            migrate_only: false,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("herald").join("herald.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("herald.db"))
        .to_string_lossy()
        .into_owned()
}

/// Event bus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// Capacity of the pending event queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Maximum number of handler invocations running at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Delivery attempts per event, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Deadline for a single handler attempt.
    #[serde(default = "default_handler_timeout_secs")]
    pub handler_timeout_secs: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            max_concurrency: default_max_concurrency(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            handler_timeout_secs: default_handler_timeout_secs(),
        }
    }
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_max_concurrency() -> usize {
    32
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

fn default_handler_timeout_secs() -> u64 {
    30
}

/// Ingress configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngressConfig {
    /// Concurrent per-item workers for bulk calls.
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// How long a submission waits for a free worker before failing.
    #[serde(default = "default_submit_timeout_ms")]
    pub submit_timeout_ms: u64,

    /// Capacity of each streaming response channel.
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,

    /// Language code used when a request carries none.
    #[serde(default = "default_language")]
    pub default_language: String,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: default_worker_pool_size(),
            submit_timeout_ms: default_submit_timeout_ms(),
            stream_buffer: default_stream_buffer(),
            default_language: default_language(),
        }
    }
}

fn default_worker_pool_size() -> usize {
    16
}

fn default_submit_timeout_ms() -> u64 {
    2_000
}

fn default_stream_buffer() -> usize {
    64
}

fn default_language() -> String {
    "en".to_string()
}

/// Transport publisher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PublisherConfig {
    /// Timeout for webhook publishes.
    #[serde(default = "default_publish_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Buffered messages per in-memory topic.
    #[serde(default = "default_mem_topic_capacity")]
    pub mem_topic_capacity: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_publish_timeout_secs(),
            mem_topic_capacity: default_mem_topic_capacity(),
        }
    }
}

fn default_publish_timeout_secs() -> u64 {
    10
}

fn default_mem_topic_capacity() -> usize {
    256
}

/// Bearer JWT validation settings.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// HMAC secret for HS256 tokens. `None` rejects every API request.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    #[serde(default)]
    pub issuer: Option<String>,

    #[serde(default)]
    pub audience: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[REDACTED]"))
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

/// Profile service client settings.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    /// Base URI. `None` treats every recipient as contact type "any".
    #[serde(default)]
    pub uri: Option<String>,

    #[serde(default)]
    pub bearer_token: Option<String>,

    #[serde(default = "default_profile_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            uri: None,
            bearer_token: None,
            timeout_secs: default_profile_timeout_secs(),
        }
    }
}

impl fmt::Debug for ProfileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileConfig")
            .field("uri", &self.uri)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_profile_timeout_secs() -> u64 {
    5
}

/// A `(state, status)` pair a transport status maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StatusTarget {
    pub state: State,
    pub status: Status,
}

/// Delivery report mapping.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackConfig {
    /// Transport status string (matched case-insensitively) to status pair.
    #[serde(default = "default_status_map")]
    pub status_map: BTreeMap<String, StatusTarget>,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            status_map: default_status_map(),
        }
    }
}

impl FeedbackConfig {
    /// Map a transport status; unknown strings land on `(ACTIVE, UNKNOWN)`.
    pub fn resolve(&self, transport_status: &str) -> StatusTarget {
        let key = transport_status.trim().to_ascii_uppercase();
        self.status_map
            .iter()
            .find(|(k, _)| k.to_ascii_uppercase() == key)
            .map(|(_, v)| *v)
            .unwrap_or(StatusTarget {
                state: State::Active,
                status: Status::Unknown,
            })
    }
}

fn default_status_map() -> BTreeMap<String, StatusTarget> {
    let pairs: [(&str, State, Status); 10] = [
        ("DELIVERED", State::Inactive, Status::Successful),
        ("DELIVRD", State::Inactive, Status::Successful),
        ("FAILED", State::Inactive, Status::Failed),
        ("UNDELIV", State::Inactive, Status::Failed),
        ("REJECTD", State::Inactive, Status::Failed),
        ("EXPIRED", State::Inactive, Status::Failed),
        ("SENT", State::Active, Status::InProcess),
        ("ACCEPTD", State::Active, Status::InProcess),
        ("ENROUTE", State::Active, Status::InProcess),
        ("QUEUED", State::Active, Status::Queued),
    ];
    pairs
        .into_iter()
        .map(|(k, state, status)| (k.to_string(), StatusTarget { state, status }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_redacted_in_debug() {
        let auth = AuthConfig {
            jwt_secret: Some("super-secret".into()),
            issuer: Some("issuer".into()),
            audience: None,
        };
        let out = format!("{auth:?}");
        assert!(!out.contains("super-secret"));
        assert!(out.contains("[REDACTED]"));

        let profile = ProfileConfig {
            bearer_token: Some("tok-123".into()),
            ..ProfileConfig::default()
        };
        assert!(!format!("{profile:?}").contains("tok-123"));
    }

    #[test]
    fn feedback_resolve_is_case_insensitive() {
        let fb = FeedbackConfig::default();
        let t = fb.resolve("delivrd");
        assert_eq!(t.state, State::Inactive);
        assert_eq!(t.status, Status::Successful);
        let unknown = fb.resolve("WHATEVER");
        assert_eq!(unknown.state, State::Active);
        assert_eq!(unknown.status, Status::Unknown);
    }
}
