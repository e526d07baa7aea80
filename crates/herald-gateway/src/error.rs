// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP mapping of [`HeraldError`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use herald_core::{ErrorCode, HeraldError};

/// `{"error":{"code":...,"message":...}}`, the body of every failed call
/// and the last line of a failed stream.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl From<&HeraldError> for ErrorBody {
    fn from(e: &HeraldError) -> Self {
        ErrorBody {
            error: ErrorDetail {
                code: e.code().to_string(),
                message: e.to_string(),
            },
        }
    }
}

/// Handler error wrapper.
#[derive(Debug)]
pub struct ApiError(pub HeraldError);

impl From<HeraldError> for ApiError {
    fn from(e: HeraldError) -> Self {
        ApiError(e)
    }
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Aborted => StatusCode::CONFLICT,
        ErrorCode::FailedPrecondition => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorCode::Cancelled => StatusCode::REQUEST_TIMEOUT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.code());
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "request failed");
        }
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_http_statuses() {
        assert_eq!(
            status_for(HeraldError::not_found("notification", "x").code()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(HeraldError::Overloaded("pool".into()).code()),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_for(HeraldError::Unauthorized("no token".into()).code()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(HeraldError::MissingTemplate.code()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn error_body_shape() {
        let body = ErrorBody::from(&HeraldError::Validation("name is required".into()));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["code"], "invalid_argument");
        assert_eq!(json["error"]["message"], "validation error: name is required");
    }
}
