// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full notification stack over a temporary
//! SQLite database: entity store, memory broker, mock transport, profile
//! service, event bus with every pipeline handler, and the ingress service.

use std::sync::Arc;
use std::time::Duration;

use herald_bus::EventBus;
use herald_config::model::{
    BusConfig, FeedbackConfig, IngressConfig, PublisherConfig, StorageConfig,
};
use herald_core::{
    EntityStore, HeraldError, NotificationStatus, NotificationType, RequestContext, Route,
    RouteMode, TenantScope,
};
use herald_ingress::{FeedbackSink, NotificationService, RouteRequest};
use herald_pipeline::PipelineDeps;
use herald_publisher::{MemoryBroker, PublisherFactory, PublisherRegistry};
use herald_storage::SqliteStore;

use crate::mock_profiles::StaticProfiles;
use crate::mock_publisher::MockPublisher;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    bus: BusConfig,
    ingress: IngressConfig,
    feedback: FeedbackConfig,
    scope: TenantScope,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            bus: BusConfig {
                max_attempts: 2,
                initial_backoff_ms: 5,
                max_backoff_ms: 20,
                ..BusConfig::default()
            },
            ingress: IngressConfig::default(),
            feedback: FeedbackConfig::default(),
            scope: TenantScope::new("tenant-test", "partition-test", "access-test"),
        }
    }

    pub fn with_bus(mut self, bus: BusConfig) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_ingress(mut self, ingress: IngressConfig) -> Self {
        self.ingress = ingress;
        self
    }

    pub fn with_feedback(mut self, feedback: FeedbackConfig) -> Self {
        self.feedback = feedback;
        self
    }

    /// Tenant scope of [`TestHarness::ctx`].
    pub fn with_scope(mut self, scope: TenantScope) -> Self {
        self.scope = scope;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, HeraldError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| HeraldError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("herald-test.db");

        let store = Arc::new(
            SqliteStore::open(StorageConfig {
                database_path: db_path.to_string_lossy().to_string(),
                migrate_only: false,
            })
            .await?,
        );

        let broker = Arc::new(MemoryBroker::new(64));
        let mock = MockPublisher::new();
        let factory = PublisherFactory::standard(broker.clone(), &PublisherConfig::default())
            .with_connector("mock", mock.connector());
        let registry = Arc::new(PublisherRegistry::new(factory));
        let profiles = Arc::new(StaticProfiles::new());

        let builder = herald_pipeline::install(
            EventBus::builder(self.bus),
            PipelineDeps {
                store: store.clone(),
                registry: registry.clone(),
                profiles: profiles.clone(),
            },
        );
        let service = NotificationService::new(
            store.clone(),
            builder.emitter(),
            registry.clone(),
            self.ingress,
        );
        let feedback = FeedbackSink::new(service.clone(), self.feedback);
        let bus = builder.build()?;
        let ctx = RequestContext::new(self.scope)?;

        Ok(TestHarness {
            store,
            broker,
            mock,
            profiles,
            registry,
            service,
            feedback,
            bus,
            ctx,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// SQLite entity store (temp DB, cleaned up on drop).
    pub store: Arc<SqliteStore>,
    /// Broker behind `mem://` routes.
    pub broker: Arc<MemoryBroker>,
    /// Capture behind `mock://` routes.
    pub mock: Arc<MockPublisher>,
    pub profiles: Arc<StaticProfiles>,
    pub registry: Arc<PublisherRegistry>,
    pub service: NotificationService,
    pub feedback: FeedbackSink,
    pub bus: EventBus,
    ctx: RequestContext,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn ctx(&self) -> &RequestContext {
        &self.ctx
    }

    pub fn scope(&self) -> &TenantScope {
        self.ctx.scope()
    }

    /// Wait until every emitted event, including follow-ups, is handled.
    pub async fn settle(&self) -> Result<(), HeraldError> {
        if self.bus.wait_idle_timeout(SETTLE_TIMEOUT).await {
            Ok(())
        } else {
            Err(HeraldError::Timeout {
                duration: SETTLE_TIMEOUT,
            })
        }
    }

    /// Save a route through the ingress service.
    pub async fn route(
        &self,
        mode: RouteMode,
        kind: NotificationType,
        uri: &str,
    ) -> Result<Route, HeraldError> {
        self.service
            .route_save(
                &self.ctx,
                RouteRequest {
                    id: None,
                    name: format!("{mode}-{kind}"),
                    description: String::new(),
                    kind,
                    mode,
                    uri: uri.to_string(),
                },
            )
            .await
    }

    /// Every status row of a notification, oldest first.
    pub async fn statuses(
        &self,
        notification_id: &str,
    ) -> Result<Vec<NotificationStatus>, HeraldError> {
        self.store
            .get_statuses_by_notification(self.scope(), notification_id)
            .await
    }

    /// The row the notification's status mirror points at.
    pub async fn latest(&self, notification_id: &str) -> Result<NotificationStatus, HeraldError> {
        let n = self.store.get_notification(self.scope(), notification_id).await?;
        let status_id = n
            .status_id
            .ok_or_else(|| HeraldError::not_found("status", notification_id))?;
        self.store.get_status(self.scope(), &status_id).await
    }

    /// Stop the bus and release publishers.
    pub async fn shutdown(&self) {
        self.service.close();
        self.bus.shutdown().await;
        self.registry.shutdown().await;
    }
}
