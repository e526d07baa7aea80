// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.
//!
//! Unary operations answer with a JSON body; streaming operations answer
//! with NDJSON (see [`crate::ndjson`]).

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use herald_core::{HealthStatus, RequestContext, Route, RouteMode};
use herald_ingress::{
    BulkRequest, FeedbackAck, FeedbackMessage, ReleaseRequest, RouteRequest, SearchRequest,
    StatusResponse, StatusUpdateRequest, TemplateResponse, TemplateSaveRequest,
    TemplateSearchRequest,
};

use crate::error::ApiError;
use crate::ndjson;
use crate::server::GatewayState;

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub storage: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RouteListQuery {
    #[serde(default)]
    pub mode: Option<RouteMode>,
}

/// POST /v1/notifications/send
pub async fn send(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<BulkRequest>,
) -> Response {
    ndjson::response(state.service.send(&ctx, body.notifications))
}

/// POST /v1/notifications/receive
pub async fn receive(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<BulkRequest>,
) -> Response {
    ndjson::response(state.service.receive(&ctx, body.notifications))
}

/// GET /v1/notifications/{id}/status
pub async fn status(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    Ok(Json(state.service.status(&ctx, &id).await?))
}

/// POST /v1/notifications/status
pub async fn status_update(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    Ok(Json(state.service.status_update(&ctx, body).await?))
}

/// POST /v1/notifications/release
pub async fn release(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<ReleaseRequest>,
) -> Response {
    ndjson::response(state.service.release(&ctx, body).await)
}

/// POST /v1/notifications/search
pub async fn search(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<SearchRequest>,
) -> Response {
    ndjson::response(state.service.search(&ctx, body).await)
}

/// POST /v1/templates
pub async fn template_save(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<TemplateSaveRequest>,
) -> Result<Json<TemplateResponse>, ApiError> {
    Ok(Json(state.service.template_save(&ctx, body).await?))
}

/// POST /v1/templates/search
pub async fn template_search(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<TemplateSearchRequest>,
) -> Response {
    ndjson::response(state.service.template_search(&ctx, body).await)
}

/// POST /v1/routes
pub async fn route_save(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<RouteRequest>,
) -> Result<Json<Route>, ApiError> {
    Ok(Json(state.service.route_save(&ctx, body).await?))
}

/// GET /v1/routes
pub async fn route_list(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<RouteListQuery>,
) -> Result<Json<Vec<Route>>, ApiError> {
    Ok(Json(state.service.route_list(&ctx, query.mode).await?))
}

/// DELETE /v1/routes/{id}
pub async fn route_delete(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.route_delete(&ctx, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/feedback
pub async fn feedback(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<FeedbackMessage>,
) -> Result<(StatusCode, Json<FeedbackAck>), ApiError> {
    let ack = state.feedback.handle(&ctx, body).await?;
    Ok((StatusCode::ACCEPTED, Json(ack)))
}

/// GET /health (unauthenticated)
pub async fn get_public_health(State(state): State<GatewayState>) -> Response {
    let uptime_secs = state.health.start_time.elapsed().as_secs();
    let storage = match &state.health.storage {
        Some(adapter) => match adapter.health_check().await {
            Ok(HealthStatus::Healthy) => Ok("healthy".to_string()),
            Ok(HealthStatus::Degraded(reason)) => Ok(format!("degraded: {reason}")),
            Ok(HealthStatus::Unhealthy(reason)) => Err(format!("unhealthy: {reason}")),
            Err(e) => Err(format!("unhealthy: {e}")),
        },
        None => Ok("unknown".to_string()),
    };
    let (code, status, storage) = match storage {
        Ok(s) => (StatusCode::OK, "ok", s),
        Err(s) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", s),
    };
    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs,
        storage,
    };
    (code, Json(body)).into_response()
}

/// GET /metrics (unauthenticated)
pub async fn get_public_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics not enabled").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_list_query_accepts_missing_mode() {
        let q: RouteListQuery = serde_json::from_str("{}").unwrap();
        assert!(q.mode.is_none());
        let q: RouteListQuery = serde_json::from_str(r#"{"mode":"trx"}"#).unwrap();
        assert_eq!(q.mode, Some(RouteMode::Trx));
    }

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            uptime_secs: 42,
            storage: "healthy".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"uptime_secs\":42"));
        assert!(json.contains("\"storage\":\"healthy\""));
    }
}
