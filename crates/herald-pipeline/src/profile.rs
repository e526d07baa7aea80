// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profile service clients.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info};
use url::Url;

use herald_config::model::ProfileConfig;
use herald_core::{
    AdapterType, HealthStatus, HeraldError, PluginAdapter, Profile, ProfileService, TenantScope,
};

/// Build the profile client configured in `[profile]`.
///
/// Without a `uri` every lookup is NotFound, so recipients dispatch as "any".
pub fn profile_service_from_config(
    config: &ProfileConfig,
) -> Result<Arc<dyn ProfileService>, HeraldError> {
    match config.uri.as_deref().filter(|u| !u.is_empty()) {
        Some(uri) => {
            let base = Url::parse(uri)
                .map_err(|e| HeraldError::Config(format!("invalid profile.uri {uri}: {e}")))?;
            let client = HttpProfileService::new(
                base,
                config.bearer_token.clone(),
                Duration::from_secs(config.timeout_secs),
            )?;
            info!(uri, "profile service client configured");
            Ok(Arc::new(client))
        }
        None => {
            info!("no profile service configured, recipients resolve to type any");
            Ok(Arc::new(NoProfileService))
        }
    }
}

/// Profile lookups over HTTP: `GET {base}/profiles/{id}`.
pub struct HttpProfileService {
    client: reqwest::Client,
    base: Url,
    bearer_token: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpProfileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProfileService")
            .field("base", &self.base.as_str())
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpProfileService {
    pub fn new(
        base: Url,
        bearer_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, HeraldError> {
        if base.cannot_be_a_base() {
            return Err(HeraldError::Config(format!(
                "profile uri {base} cannot carry a path"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HeraldError::TransportUnreachable {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base,
            bearer_token: bearer_token.filter(|t| !t.is_empty()),
            timeout,
        })
    }

    fn profile_url(&self, profile_id: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("profiles").push(profile_id);
        }
        url
    }

    fn classify(&self, e: reqwest::Error) -> HeraldError {
        if e.is_timeout() {
            HeraldError::Timeout {
                duration: self.timeout,
            }
        } else {
            HeraldError::TransportUnreachable {
                message: format!("profile service at {} failed: {e}", self.base),
                source: Some(Box::new(e)),
            }
        }
    }
}

#[async_trait]
impl PluginAdapter for HttpProfileService {
    fn name(&self) -> &str {
        "http-profile"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Profile
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HeraldError> {
        Ok(())
    }
}

#[async_trait]
impl ProfileService for HttpProfileService {
    async fn get_profile(
        &self,
        scope: &TenantScope,
        profile_id: &str,
    ) -> Result<Profile, HeraldError> {
        let url = self.profile_url(profile_id);
        let mut request = self
            .client
            .get(url.clone())
            .header("x-tenant-id", &scope.tenant_id)
            .header("x-partition-id", &scope.partition_id);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        debug!(%url, %status, "profile lookup");
        match status {
            s if s.is_success() => response
                .json::<Profile>()
                .await
                .map_err(|e| HeraldError::Validation(format!("malformed profile {profile_id}: {e}"))),
            StatusCode::NOT_FOUND => Err(HeraldError::not_found("profile", profile_id)),
            StatusCode::TOO_MANY_REQUESTS => Err(HeraldError::RateLimited(format!(
                "profile service returned {status}"
            ))),
            s if s.is_server_error() => Err(HeraldError::unreachable(format!(
                "profile service returned {status}"
            ))),
            _ => Err(HeraldError::PermanentTransport(format!(
                "profile service rejected {profile_id}: {status}"
            ))),
        }
    }
}

/// Profile service stand-in that knows nobody.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProfileService;

#[async_trait]
impl PluginAdapter for NoProfileService {
    fn name(&self) -> &str {
        "no-profile"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Profile
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HeraldError> {
        Ok(())
    }
}

#[async_trait]
impl ProfileService for NoProfileService {
    async fn get_profile(
        &self,
        _scope: &TenantScope,
        profile_id: &str,
    ) -> Result<Profile, HeraldError> {
        Err(HeraldError::not_found("profile", profile_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::ContactType;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scope() -> TenantScope {
        TenantScope::new("tenant-a", "part-1", "acc-1")
    }

    fn client(server: &MockServer, token: Option<&str>) -> HttpProfileService {
        let base = Url::parse(&format!("{}/api/", server.uri())).unwrap();
        HttpProfileService::new(base, token.map(String::from), Duration::from_millis(300)).unwrap()
    }

    #[tokio::test]
    async fn fetches_profile_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/profiles/prof-1"))
            .and(header("authorization", "Bearer s3cret"))
            .and(header("x-tenant-id", "tenant-a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "prof-1",
                "contacts": [{"id": "c-1", "detail": "+15550100", "type": "MSISDN"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let profile = client(&server, Some("s3cret"))
            .get_profile(&scope(), "prof-1")
            .await
            .unwrap();
        assert_eq!(profile.id, "prof-1");
        assert_eq!(
            profile.contact("c-1").unwrap().contact_type,
            ContactType::Msisdn
        );
    }

    #[tokio::test]
    async fn missing_profile_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .get_profile(&scope(), "ghost")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn server_errors_are_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .get_profile(&scope(), "prof-1")
            .await
            .unwrap_err();
        assert!(matches!(err, HeraldError::TransportUnreachable { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "prof-1"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = client(&server, None)
            .get_profile(&scope(), "prof-1")
            .await
            .unwrap_err();
        assert!(matches!(err, HeraldError::Timeout { .. }));
    }

    #[tokio::test]
    async fn no_profile_service_knows_nobody() {
        let err = NoProfileService
            .get_profile(&scope(), "prof-1")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn config_without_uri_uses_no_profile_service() {
        let service = profile_service_from_config(&ProfileConfig::default()).unwrap();
        assert_eq!(service.name(), "no-profile");
    }

    #[test]
    fn debug_redacts_token() {
        let base = Url::parse("http://profiles.local").unwrap();
        let client =
            HttpProfileService::new(base, Some("s3cret".into()), Duration::from_secs(1)).unwrap();
        let shown = format!("{client:?}");
        assert!(!shown.contains("s3cret"));
        assert!(shown.contains("[REDACTED]"));
    }
}
