// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic pipeline tests.
//!
//! Routes with a `mock://` URI publish into a shared [`MockPublisher`],
//! which captures every payload and can be scripted to fail.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;
use url::Url;

use herald_core::wire::NotificationRecord;
use herald_core::{AdapterType, HealthStatus, HeraldError, PluginAdapter, TopicPublisher};
use herald_publisher::PublisherConnector;

/// A payload captured by [`MockPublisher`].
#[derive(Debug, Clone)]
pub struct Published {
    pub uri: String,
    pub payload: Bytes,
}

/// Captures everything published to `mock://` routes.
///
/// Scripted failures are popped from a FIFO queue before each publish.
/// When the queue is empty the publish succeeds.
#[derive(Default)]
pub struct MockPublisher {
    published: Mutex<Vec<Published>>,
    failures: Mutex<VecDeque<HeraldError>>,
}

impl MockPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next publish fail with `error`.
    pub async fn fail_next(&self, error: HeraldError) {
        self.failures.lock().await.push_back(error);
    }

    pub async fn published(&self) -> Vec<Published> {
        self.published.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.published.lock().await.len()
    }

    /// Decode every captured payload.
    pub async fn records(&self) -> Result<Vec<NotificationRecord>, HeraldError> {
        self.published
            .lock()
            .await
            .iter()
            .map(|p| NotificationRecord::from_bytes(&p.payload))
            .collect()
    }

    /// Connector to register under the `mock` scheme.
    pub fn connector(self: &Arc<Self>) -> Arc<dyn PublisherConnector> {
        Arc::new(MockConnector {
            inner: Arc::clone(self),
        })
    }
}

struct MockConnector {
    inner: Arc<MockPublisher>,
}

impl PublisherConnector for MockConnector {
    fn connect(&self, uri: &Url) -> Result<Arc<dyn TopicPublisher>, HeraldError> {
        Ok(Arc::new(MockTopic {
            uri: uri.to_string(),
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MockTopic {
    uri: String,
    inner: Arc<MockPublisher>,
}

#[async_trait]
impl PluginAdapter for MockTopic {
    fn name(&self) -> &str {
        "mock-publisher"
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
impl TopicPublisher for MockTopic {
    fn uri(&self) -> &str {
        &self.uri
    }

    async fn publish(&self, payload: Bytes) -> Result<(), HeraldError> {
        if let Some(error) = self.inner.failures.lock().await.pop_front() {
            return Err(error);
        }
        self.inner.published.lock().await.push(Published {
            uri: self.uri.clone(),
            payload,
        });
        Ok(())
    }
}
