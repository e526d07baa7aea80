// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self as axum_middleware, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use herald_config::model::ServerConfig;
use herald_core::{HeraldError, PluginAdapter};
use herald_ingress::{FeedbackSink, NotificationService};

use crate::auth::{JwtAuth, auth_middleware};
use crate::error::ApiError;
use crate::handlers;

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Storage backend checked by `/health`.
    pub storage: Option<Arc<dyn PluginAdapter>>,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub service: NotificationService,
    pub feedback: FeedbackSink,
    pub auth: JwtAuth,
    pub health: HealthState,
}

async fn request_timeout(
    State(limit): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => ApiError(HeraldError::Timeout { duration: limit }).into_response(),
    }
}

/// Build the application router.
///
/// - `GET /health`, `GET /metrics` (no auth)
/// - `/v1/...` (bearer JWT)
pub fn router(state: GatewayState, request_timeout_secs: u64) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/notifications/send", post(handlers::send))
        .route("/v1/notifications/receive", post(handlers::receive))
        .route("/v1/notifications/{id}/status", get(handlers::status))
        .route("/v1/notifications/status", post(handlers::status_update))
        .route("/v1/notifications/release", post(handlers::release))
        .route("/v1/notifications/search", post(handlers::search))
        .route("/v1/templates", post(handlers::template_save))
        .route("/v1/templates/search", post(handlers::template_search))
        .route(
            "/v1/routes",
            post(handlers::route_save).get(handlers::route_list),
        )
        .route("/v1/routes/{id}", delete(handlers::route_delete))
        .route("/v1/feedback", post(handlers::feedback))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    let mut app = Router::new().merge(public_routes).merge(api_routes);
    if request_timeout_secs > 0 {
        app = app.layer(axum_middleware::from_fn_with_state(
            Duration::from_secs(request_timeout_secs),
            request_timeout,
        ));
    }
    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the gateway until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), HeraldError> {
    let app = router(state, config.request_timeout_secs);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| HeraldError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| HeraldError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
