// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `herald serve` and `herald migrate` command implementations.
//!
//! `serve` opens storage, builds the publisher registry, the event bus with
//! every pipeline handler, the ingress service, and the HTTP gateway, then
//! serves until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use herald_bus::EventBus;
use herald_config::model::HeraldConfig;
use herald_core::{HeraldError, PluginAdapter, StorageAdapter};
use herald_gateway::{GatewayState, HealthState, JwtAuth};
use herald_ingress::{FeedbackSink, NotificationService};
use herald_pipeline::{PipelineDeps, profile_service_from_config};
use herald_prometheus::PrometheusAdapter;
use herald_publisher::{MemoryBroker, PublisherFactory, PublisherRegistry};
use herald_storage::SqliteStore;

use crate::shutdown;

/// How long in-flight events may drain after the gateway stops.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the `herald serve` command.
pub async fn run_serve(config: HeraldConfig) -> Result<(), HeraldError> {
    init_tracing(&config.service.log_level, &config.service.log_format);
    info!(service = %config.service.name, "starting herald");

    let prometheus = match PrometheusAdapter::new() {
        Ok(adapter) => Some(Arc::new(adapter)),
        Err(e) => {
            warn!(error = %e, "metrics disabled");
            None
        }
    };

    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;

    let broker = Arc::new(MemoryBroker::new(config.publisher.mem_topic_capacity));
    let registry = Arc::new(PublisherRegistry::new(PublisherFactory::standard(
        broker,
        &config.publisher,
    )));
    let profiles = profile_service_from_config(&config.profile)?;

    let builder = herald_pipeline::install(
        EventBus::builder(config.bus.clone()),
        PipelineDeps {
            store: store.clone(),
            registry: registry.clone(),
            profiles,
        },
    );
    let service = NotificationService::new(
        store.clone(),
        builder.emitter(),
        registry.clone(),
        config.ingress.clone(),
    );
    let bus = builder.build()?;

    let auth = JwtAuth::new(&config.auth);
    if !auth.is_enabled() {
        warn!("auth.jwt_secret is not set; every /v1 request will be rejected");
    }
    let prometheus_render = prometheus.map(|p| {
        let render: Arc<dyn Fn() -> String + Send + Sync> = Arc::new(move || p.render());
        render
    });
    let storage: Arc<dyn PluginAdapter> = store.clone();
    let state = GatewayState {
        feedback: FeedbackSink::new(service.clone(), config.feedback.clone()),
        service: service.clone(),
        auth,
        health: HealthState {
            start_time: std::time::Instant::now(),
            storage: Some(storage),
            prometheus_render,
        },
    };

    let cancel = shutdown::install_signal_handler();
    let served = herald_gateway::start_server(&config.server, state, cancel.clone()).await;
    cancel.cancel();

    info!("draining event bus");
    service.close();
    if !bus.wait_idle_timeout(DRAIN_TIMEOUT).await {
        warn!(
            in_flight = bus.in_flight(),
            "events still in flight at shutdown; they will be redelivered from storage state"
        );
    }
    bus.shutdown().await;
    registry.shutdown().await;
    store.close().await?;
    info!("herald stopped");
    served
}

/// Runs the `herald migrate` command.
pub async fn run_migrate(config: HeraldConfig) -> Result<(), HeraldError> {
    init_tracing(&config.service.log_level, &config.service.log_format);
    let store = SqliteStore::open(config.storage.clone()).await?;
    store.close().await?;
    info!(path = %config.storage.database_path, "migrations applied");
    Ok(())
}

/// Initializes the tracing subscriber. `RUST_LOG` wins over the config.
fn init_tracing(log_level: &str, log_format: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("herald={log_level},warn")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false);
    if log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
