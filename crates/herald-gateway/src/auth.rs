// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer JWT authentication for the `/v1` routes.
//!
//! Tokens are HS256-signed and checked against the configured issuer and
//! audience. The `tenant_id`, `partition_id`, and `access_id` claims become
//! the [`RequestContext`] handed to every handler through request
//! extensions. With no secret configured every request is rejected.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use herald_config::model::AuthConfig;
use herald_core::{HeraldError, RequestContext, TenantScope};

use crate::error::ApiError;

/// Claims carried by caller tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub tenant_id: String,
    pub partition_id: String,
    #[serde(default)]
    pub access_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: u64,
}

struct Verifier {
    key: DecodingKey,
    validation: Validation,
}

/// Token verifier built from [`AuthConfig`].
#[derive(Clone)]
pub struct JwtAuth {
    verifier: Option<Arc<Verifier>>,
}

impl std::fmt::Debug for JwtAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuth")
            .field("secret", &self.verifier.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl JwtAuth {
    pub fn new(config: &AuthConfig) -> Self {
        let verifier = config
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|secret| {
                let mut validation = Validation::new(Algorithm::HS256);
                if let Some(issuer) = config.issuer.as_deref() {
                    validation.set_issuer(&[issuer]);
                }
                match config.audience.as_deref() {
                    Some(audience) => validation.set_audience(&[audience]),
                    None => validation.validate_aud = false,
                }
                Arc::new(Verifier {
                    key: DecodingKey::from_secret(secret.as_bytes()),
                    validation,
                })
            });
        Self { verifier }
    }

    pub fn is_enabled(&self) -> bool {
        self.verifier.is_some()
    }

    /// Verify `token` and build the request context from its claims.
    pub fn authenticate(&self, token: &str) -> Result<RequestContext, HeraldError> {
        let Some(verifier) = self.verifier.as_deref() else {
            return Err(HeraldError::Unauthorized("no token verifier configured".into()));
        };
        let data = decode::<Claims>(token, &verifier.key, &verifier.validation)
            .map_err(|e| HeraldError::Unauthorized(format!("invalid token: {e}")))?;
        let claims = data.claims;
        RequestContext::new(TenantScope::new(
            claims.tenant_id,
            claims.partition_id,
            claims.access_id,
        ))
    }
}

/// Middleware that authenticates the bearer token and stores the
/// resulting [`RequestContext`] in request extensions.
pub async fn auth_middleware(
    State(auth): State<JwtAuth>,
    mut request: Request,
    next: Next,
) -> Response {
    if !auth.is_enabled() {
        tracing::error!("gateway has no jwt secret configured -- rejecting request");
    }
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let Some(token) = token else {
        return ApiError(HeraldError::Unauthorized("missing bearer token".into())).into_response();
    };
    match auth.authenticate(token) {
        Ok(ctx) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "request rejected");
            ApiError(e).into_response()
        }
    }
}
