// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use herald_bus::{EventHandler, EventPayload, names};
use herald_core::{HeraldError, RequestContext, State, Status};

use crate::pipeline::Pipeline;

/// `notification.save`: persist, then branch on direction and release.
pub struct SaveNotification {
    pipeline: Arc<Pipeline>,
}

impl SaveNotification {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl EventHandler for SaveNotification {
    fn name(&self) -> &'static str {
        names::NOTIFICATION_SAVE
    }

    fn validate(&self, payload: &EventPayload) -> Result<(), HeraldError> {
        let n = payload.expect_notification()?;
        if n.id.trim().is_empty() {
            return Err(HeraldError::Validation("notification id is required".into()));
        }
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        payload: &EventPayload,
    ) -> Result<(), HeraldError> {
        let p = &self.pipeline;
        let incoming = payload.expect_notification()?;
        let n = ctx
            .run(p.store.save_notification(ctx.scope(), incoming))
            .await?;
        debug!(notification_id = %n.id, out_bound = n.out_bound, "notification saved");

        if n.is_closed() {
            debug!(notification_id = %n.id, state = %n.state, "notification closed, not dispatching");
            return Ok(());
        }
        if !n.out_bound {
            return p.emit_stage(ctx, names::IN_ROUTE, &n.id).await;
        }
        if n.is_released() {
            return p.emit_stage(ctx, names::OUT_ROUTE, &n.id).await;
        }
        info!(notification_id = %n.id, "notification held for release");
        p.emit_status(ctx, p.status(ctx, &n, State::Checked, Status::Queued))
            .await
    }
}
