// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One handler per event kind.

mod inbound;
mod outbound;
mod save;
mod status;

pub use inbound::{InQueue, InRoute};
pub use outbound::{OutQueue, OutRoute};
pub use save::SaveNotification;
pub use status::{SaveStatus, UpdateStatus};

use herald_bus::EventPayload;
use herald_core::HeraldError;

/// Stage hops carry a non-empty notification id.
pub(crate) fn validate_id(payload: &EventPayload) -> Result<(), HeraldError> {
    if payload.expect_id()?.trim().is_empty() {
        return Err(HeraldError::Validation("notification id is required".into()));
    }
    Ok(())
}

/// Failure tags written into the `step` extra.
pub(crate) mod steps {
    pub const IN_ROUTE: &str = "in.route";
    pub const IN_QUEUE: &str = "in.queue";
    pub const OUT_ROUTE: &str = "out.route";
    pub const OUT_QUEUE: &str = "out.queue";
}
