// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handler contract.

use async_trait::async_trait;

use herald_core::{HeraldError, RequestContext};

use crate::event::EventPayload;

/// One edge of the state machine, registered under a stable event name.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Event kind this handler consumes.
    fn name(&self) -> &'static str;

    /// Checked at emit time; a failure is returned to the emitter and the
    /// event is never queued.
    fn validate(&self, payload: &EventPayload) -> Result<(), HeraldError>;

    /// The business step.
    ///
    /// Returning a retryable error asks for redelivery. A handler that
    /// records a permanent failure itself returns `Ok`.
    async fn execute(&self, ctx: &RequestContext, payload: &EventPayload)
    -> Result<(), HeraldError>;
}
