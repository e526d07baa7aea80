// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process broadcast topics behind `mem://<topic>` routes.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;
use url::Url;

use herald_core::{AdapterType, HealthStatus, HeraldError, PluginAdapter, TopicPublisher};

/// Named broadcast topics. Subscribers receive raw payload bytes published
/// after they subscribed.
pub struct MemoryBroker {
    capacity: usize,
    topics: DashMap<String, broadcast::Sender<Bytes>>,
}

impl MemoryBroker {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: DashMap::new(),
        }
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Bytes> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<Bytes> {
        self.sender(topic).subscribe()
    }

    /// Send to every current subscriber; returns how many received it.
    /// A topic nobody listens to swallows the payload.
    pub fn publish(&self, topic: &str, payload: Bytes) -> usize {
        match self.sender(topic).send(payload) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(topic, "no subscribers on memory topic");
                0
            }
        }
    }

    /// Topic named by a `mem://` URI: host plus any path.
    pub fn topic_for(uri: &Url) -> Result<String, HeraldError> {
        let host = uri.host_str().unwrap_or_default();
        let topic = format!("{host}{}", uri.path())
            .trim_end_matches('/')
            .to_string();
        if topic.is_empty() {
            return Err(HeraldError::Validation(format!(
                "memory route uri has no topic: {uri}"
            )));
        }
        Ok(topic)
    }
}

/// Publisher bound to one memory topic.
pub struct MemoryPublisher {
    broker: Arc<MemoryBroker>,
    topic: String,
    uri: String,
}

impl MemoryPublisher {
    pub fn new(broker: Arc<MemoryBroker>, uri: &Url) -> Result<Self, HeraldError> {
        Ok(Self {
            topic: MemoryBroker::topic_for(uri)?,
            broker,
            uri: uri.to_string(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl PluginAdapter for MemoryPublisher {
    fn name(&self) -> &str {
        "memory"
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
impl TopicPublisher for MemoryPublisher {
    fn uri(&self) -> &str {
        &self.uri
    }

    async fn publish(&self, payload: Bytes) -> Result<(), HeraldError> {
        let receivers = self.broker.publish(&self.topic, payload);
        debug!(topic = %self.topic, receivers, "published to memory topic");
        Ok(())
    }
}
