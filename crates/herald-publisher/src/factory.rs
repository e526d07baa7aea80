// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! URI scheme → publisher construction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use herald_config::model::PublisherConfig;
use herald_core::{HeraldError, TopicPublisher};

use crate::http::HttpPublisher;
use crate::memory::{MemoryBroker, MemoryPublisher};

/// Builds a publisher for a parsed route URI.
pub trait PublisherConnector: Send + Sync {
    fn connect(&self, uri: &Url) -> Result<Arc<dyn TopicPublisher>, HeraldError>;
}

struct MemoryConnector {
    broker: Arc<MemoryBroker>,
}

impl PublisherConnector for MemoryConnector {
    fn connect(&self, uri: &Url) -> Result<Arc<dyn TopicPublisher>, HeraldError> {
        Ok(Arc::new(MemoryPublisher::new(self.broker.clone(), uri)?))
    }
}

struct HttpConnector {
    timeout: Duration,
}

impl PublisherConnector for HttpConnector {
    fn connect(&self, uri: &Url) -> Result<Arc<dyn TopicPublisher>, HeraldError> {
        Ok(Arc::new(HttpPublisher::new(uri.clone(), self.timeout)?))
    }
}

/// Connectors keyed by URI scheme.
#[derive(Clone, Default)]
pub struct PublisherFactory {
    connectors: HashMap<String, Arc<dyn PublisherConnector>>,
}

impl PublisherFactory {
    /// Factory with no schemes; add them with [`PublisherFactory::with_connector`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// `mem://` on `broker`, plus `http://` and `https://` webhooks.
    pub fn standard(broker: Arc<MemoryBroker>, config: &PublisherConfig) -> Self {
        let http: Arc<dyn PublisherConnector> = Arc::new(HttpConnector {
            timeout: Duration::from_secs(config.request_timeout_secs),
        });
        Self::empty()
            .with_connector("mem", Arc::new(MemoryConnector { broker }))
            .with_connector("http", http.clone())
            .with_connector("https", http)
    }

    pub fn with_connector(
        mut self,
        scheme: &str,
        connector: Arc<dyn PublisherConnector>,
    ) -> Self {
        self.connectors.insert(scheme.to_ascii_lowercase(), connector);
        self
    }

    /// Parse `uri` and confirm a connector exists for its scheme.
    pub fn check(&self, uri: &str) -> Result<Url, HeraldError> {
        let url = Url::parse(uri)
            .map_err(|e| HeraldError::Validation(format!("invalid route uri {uri:?}: {e}")))?;
        if !self.connectors.contains_key(url.scheme()) {
            return Err(HeraldError::Validation(format!(
                "unsupported route uri scheme: {}",
                url.scheme()
            )));
        }
        Ok(url)
    }

    pub fn connect(&self, uri: &str) -> Result<Arc<dyn TopicPublisher>, HeraldError> {
        let url = self.check(uri)?;
        match self.connectors.get(url.scheme()) {
            Some(connector) => connector.connect(&url),
            None => Err(HeraldError::Validation(format!(
                "unsupported route uri scheme: {}",
                url.scheme()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> PublisherFactory {
        PublisherFactory::standard(Arc::new(MemoryBroker::new(4)), &PublisherConfig::default())
    }

    #[test]
    fn known_schemes_connect() {
        let f = factory();
        assert_eq!(f.connect("mem://sms").unwrap().uri(), "mem://sms");
        assert_eq!(f.connect("https://hooks.example.com/sms").unwrap().name(), "http");
    }

    #[test]
    fn unknown_scheme_is_validation_error() {
        let err = factory().check("nats://cluster/sms").err().unwrap();
        assert!(matches!(err, HeraldError::Validation(ref m) if m.contains("nats")));
    }

    #[test]
    fn garbage_uri_is_validation_error() {
        assert!(matches!(
            factory().check("not a uri"),
            Err(HeraldError::Validation(_))
        ));
    }
}
