// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide route id → publisher map.
//!
//! Publishing only clones an `Arc` out of the map, so it never waits on a
//! bind. Binding takes a per-route mutex so concurrent binds of one route
//! connect once, while other routes stay unaffected.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use herald_core::{EntityStore, HeraldError, Route, TenantScope, TopicPublisher};

use crate::factory::PublisherFactory;

pub struct PublisherRegistry {
    factory: PublisherFactory,
    publishers: DashMap<String, Arc<dyn TopicPublisher>>,
    bind_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PublisherRegistry {
    pub fn new(factory: PublisherFactory) -> Self {
        Self {
            factory,
            publishers: DashMap::new(),
            bind_locks: DashMap::new(),
        }
    }

    pub fn factory(&self) -> &PublisherFactory {
        &self.factory
    }

    pub fn is_bound(&self, route_id: &str) -> bool {
        self.publishers.contains_key(route_id)
    }

    /// Publish to the route's bound publisher.
    ///
    /// Fails with [`HeraldError::UnknownRoute`] when nothing is bound.
    pub async fn publish(&self, route_id: &str, payload: Bytes) -> Result<(), HeraldError> {
        let publisher = self
            .publishers
            .get(route_id)
            .map(|p| Arc::clone(p.value()))
            .ok_or_else(|| HeraldError::UnknownRoute(route_id.to_string()))?;
        publisher.publish(payload).await?;
        herald_prometheus::record_published();
        Ok(())
    }

    /// Bind `route_id` to `uri`. Rebinding to the same URI does nothing;
    /// a different URI replaces the old publisher.
    pub async fn register(&self, route_id: &str, uri: &str) -> Result<(), HeraldError> {
        let lock = Arc::clone(
            self.bind_locks
                .entry(route_id.to_string())
                .or_default()
                .value(),
        );
        let _guard = lock.lock().await;

        let already_bound = self
            .publishers
            .get(route_id)
            .is_some_and(|p| p.uri() == uri);
        if already_bound {
            debug!(route_id, uri, "route already bound");
            return Ok(());
        }

        let publisher = self.factory.connect(uri)?;
        let replaced = self.publishers.insert(route_id.to_string(), publisher);
        if let Some(old) = replaced {
            if let Err(e) = old.shutdown().await {
                warn!(route_id, error = %e, "failed to shut down replaced publisher");
            }
        }
        info!(route_id, uri, "route publisher bound");
        Ok(())
    }

    /// Drop the binding for `route_id`. Returns whether one existed.
    pub async fn unregister(&self, route_id: &str) -> bool {
        match self.publishers.remove(route_id) {
            Some((_, publisher)) => {
                if let Err(e) = publisher.shutdown().await {
                    warn!(route_id, error = %e, "failed to shut down publisher");
                }
                info!(route_id, "route publisher unbound");
                true
            }
            None => false,
        }
    }

    /// Fetch the route and bind it.
    pub async fn load_route(
        &self,
        store: &dyn EntityStore,
        scope: &TenantScope,
        route_id: &str,
    ) -> Result<Route, HeraldError> {
        let route = store.get_route(scope, route_id).await.map_err(|e| match e {
            HeraldError::NotFound { .. } => HeraldError::NoRoute(route_id.to_string()),
            other => other,
        })?;
        self.register(&route.id, &route.uri).await?;
        Ok(route)
    }

    /// Publish, and on an unknown-route failure load the route and retry
    /// exactly once.
    pub async fn publish_with_reload(
        &self,
        store: &dyn EntityStore,
        scope: &TenantScope,
        route_id: &str,
        payload: Bytes,
    ) -> Result<(), HeraldError> {
        match self.publish(route_id, payload.clone()).await {
            Err(HeraldError::UnknownRoute(_)) if !route_id.is_empty() => {
                debug!(route_id, "route not bound, loading");
                self.load_route(store, scope, route_id).await?;
                self.publish(route_id, payload).await
            }
            other => other,
        }
    }

    /// Shut down every bound publisher.
    pub async fn shutdown(&self) {
        let bound: Vec<(String, Arc<dyn TopicPublisher>)> = self
            .publishers
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        self.publishers.clear();
        for (route_id, publisher) in bound {
            if let Err(e) = publisher.shutdown().await {
                warn!(route_id = %route_id, error = %e, "publisher shutdown failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBroker;
    use herald_config::model::PublisherConfig;

    fn registry() -> (PublisherRegistry, Arc<MemoryBroker>) {
        let broker = Arc::new(MemoryBroker::new(8));
        let factory = PublisherFactory::standard(broker.clone(), &PublisherConfig::default());
        (PublisherRegistry::new(factory), broker)
    }

    #[tokio::test]
    async fn unbound_route_is_unknown() {
        let (reg, _) = registry();
        let err = reg.publish("r1", Bytes::new()).await.unwrap_err();
        assert!(matches!(err, HeraldError::UnknownRoute(id) if id == "r1"));
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let (reg, broker) = registry();
        let mut rx = broker.subscribe("sms");
        reg.register("r1", "mem://sms").await.unwrap();
        reg.register("r1", "mem://sms").await.unwrap();

        reg.publish("r1", Bytes::from_static(b"one")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"one"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn rebinding_moves_the_route() {
        let (reg, broker) = registry();
        let mut old = broker.subscribe("old");
        let mut new = broker.subscribe("new");
        reg.register("r1", "mem://old").await.unwrap();
        reg.register("r1", "mem://new").await.unwrap();

        reg.publish("r1", Bytes::from_static(b"x")).await.unwrap();
        assert!(new.recv().await.is_ok());
        assert!(old.try_recv().is_err());
    }

    #[tokio::test]
    async fn concurrent_binds_of_one_route_succeed() {
        let (reg, _) = registry();
        let reg = Arc::new(reg);
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let reg = reg.clone();
            tasks.push(tokio::spawn(async move {
                reg.register("r1", "mem://sms").await
            }));
        }
        for t in tasks {
            t.await.unwrap().unwrap();
        }
        assert!(reg.is_bound("r1"));
    }

    #[tokio::test]
    async fn unregister_forgets_binding() {
        let (reg, _) = registry();
        reg.register("r1", "mem://sms").await.unwrap();
        assert!(reg.unregister("r1").await);
        assert!(!reg.unregister("r1").await);
        assert!(!reg.is_bound("r1"));
    }
}
