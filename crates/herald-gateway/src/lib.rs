// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface for the Herald notification service.
//!
//! Every `/v1` route is a thin binding of one ingress operation. Streaming
//! operations answer with newline-delimited JSON; everything else answers
//! with a single JSON body or an `{"error":{code,message}}` document.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod ndjson;
pub mod server;

pub use auth::{Claims, JwtAuth};
pub use error::ApiError;
pub use server::{GatewayState, HealthState, router, start_server};
