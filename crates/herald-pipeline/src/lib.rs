// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The notification state machine.
//!
//! Each handler is one edge: it re-reads the notification, does one step,
//! records a status row, and emits the next event. Handlers are idempotent
//! on notification id so bus redelivery is safe. A step that fails for good
//! closes the notification with an `(INACTIVE, FAILED)` row and reports
//! success to the bus.

pub mod handlers;
pub mod pipeline;
pub mod profile;
pub mod record;
pub mod status;

use std::sync::Arc;

use herald_bus::EventBusBuilder;

pub use pipeline::{Pipeline, PipelineDeps};
pub use profile::{HttpProfileService, NoProfileService, profile_service_from_config};
pub use record::build_record;
pub use status::{adopt_external_id, record_status};

/// Register every pipeline handler on `builder`.
pub fn install(builder: EventBusBuilder, deps: PipelineDeps) -> EventBusBuilder {
    let pipeline = Arc::new(Pipeline::new(deps, builder.emitter()));
    builder
        .handler(Arc::new(handlers::SaveNotification::new(pipeline.clone())))
        .handler(Arc::new(handlers::InRoute::new(pipeline.clone())))
        .handler(Arc::new(handlers::InQueue::new(pipeline.clone())))
        .handler(Arc::new(handlers::OutRoute::new(pipeline.clone())))
        .handler(Arc::new(handlers::OutQueue::new(pipeline.clone())))
        .handler(Arc::new(handlers::SaveStatus::new(pipeline.clone())))
        .handler(Arc::new(handlers::UpdateStatus::new(pipeline)))
}
