// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-facing operations of the Herald notification service.
//!
//! `queue_out`/`queue_in` validate and persist a notification, write its
//! first status row, and hand it to the event pipeline. Bulk calls fan out
//! over a bounded [`WorkerPool`] and stream results back through a
//! [`ResultStream`]. The [`FeedbackSink`] accepts what transport
//! integrations report back.

pub mod api;
pub mod feedback;
pub mod pool;
pub mod service;
pub mod stream;

pub use api::{
    BulkRequest, ContactRef, NotificationRequest, NotificationResponse, ReleaseRequest,
    RouteRequest, SearchRequest, StatusResponse, StatusUpdateRequest, TemplateResponse,
    TemplateSaveRequest, TemplateSearchRequest, TemplateText,
};
pub use feedback::{FeedbackAck, FeedbackMessage, FeedbackSink};
pub use pool::WorkerPool;
pub use service::NotificationService;
pub use stream::{ResultSink, ResultStream, result_channel};
