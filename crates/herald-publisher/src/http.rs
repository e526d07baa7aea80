// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook publisher: POSTs the binary record to an `http(s)://` route.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};
use url::Url;

use herald_core::{AdapterType, HealthStatus, HeraldError, PluginAdapter, TopicPublisher};

/// Media type of the length-delimited record body.
pub const CONTENT_TYPE_PROTOBUF: &str = "application/x-protobuf";

/// Publisher bound to one webhook URL.
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    client: reqwest::Client,
    url: Url,
    uri: String,
    timeout: Duration,
}

impl HttpPublisher {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, HeraldError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HeraldError::TransportUnreachable {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            uri: url.to_string(),
            url,
            timeout,
        })
    }

    fn classify(&self, e: reqwest::Error) -> HeraldError {
        if e.is_timeout() {
            HeraldError::Timeout {
                duration: self.timeout,
            }
        } else {
            HeraldError::TransportUnreachable {
                message: format!("POST {} failed: {e}", self.url),
                source: Some(Box::new(e)),
            }
        }
    }
}

#[async_trait]
impl PluginAdapter for HttpPublisher {
    fn name(&self) -> &str {
        "http"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Publisher
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HeraldError> {
        Ok(())
    }
}

#[async_trait]
impl TopicPublisher for HttpPublisher {
    fn uri(&self) -> &str {
        &self.uri
    }

    async fn publish(&self, payload: Bytes) -> Result<(), HeraldError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, CONTENT_TYPE_PROTOBUF)
            .body(payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        debug!(url = %self.url, status = %status, "webhook response received");
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(url = %self.url, status = %status, body = %body, "webhook rejected payload");
        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => {
                HeraldError::RateLimited(format!("{} returned {status}", self.url))
            }
            s if s.is_server_error() => {
                HeraldError::unreachable(format!("{} returned {status}: {body}", self.url))
            }
            _ => HeraldError::PermanentTransport(format!("{} returned {status}: {body}", self.url)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn publisher(server: &MockServer, timeout: Duration) -> HttpPublisher {
        let url = Url::parse(&format!("{}/hook", server.uri())).unwrap();
        HttpPublisher::new(url, timeout).unwrap()
    }

    #[tokio::test]
    async fn posts_binary_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", CONTENT_TYPE_PROTOBUF))
            .and(body_bytes(b"\x02hi".to_vec()))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        publisher(&server, Duration::from_secs(5))
            .publish(Bytes::from_static(b"\x02hi"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = publisher(&server, Duration::from_secs(5))
            .publish(Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HeraldError::RateLimited(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn server_errors_are_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = publisher(&server, Duration::from_secs(5))
            .publish(Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HeraldError::TransportUnreachable { .. }));
    }

    #[tokio::test]
    async fn client_errors_are_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad record"))
            .mount(&server)
            .await;

        let err = publisher(&server, Duration::from_secs(5))
            .publish(Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HeraldError::PermanentTransport(ref m) if m.contains("bad record")));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn slow_webhook_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let err = publisher(&server, Duration::from_millis(50))
            .publish(Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HeraldError::Timeout { .. }));
    }
}
