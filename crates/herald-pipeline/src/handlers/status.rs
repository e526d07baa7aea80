// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use herald_bus::{EventHandler, EventPayload, names};
use herald_core::{HeraldError, NotificationStatus, RequestContext};

use crate::pipeline::Pipeline;
use crate::status::{adopt_external_id, record_status};

/// `notificationStatus.save`: append the row and advance the mirror.
pub struct SaveStatus {
    pipeline: Arc<Pipeline>,
}

impl SaveStatus {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl EventHandler for SaveStatus {
    fn name(&self) -> &'static str {
        names::STATUS_SAVE
    }

    fn validate(&self, payload: &EventPayload) -> Result<(), HeraldError> {
        let status = payload.expect_status()?;
        if status.id.is_empty() || status.notification_id.is_empty() {
            return Err(HeraldError::Validation(
                "status id and notification id are required".into(),
            ));
        }
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        payload: &EventPayload,
    ) -> Result<(), HeraldError> {
        let status = payload.expect_status()?;
        match ctx
            .run(record_status(self.pipeline.store.as_ref(), ctx.scope(), status))
            .await
        {
            Err(e) if e.is_not_found() => {
                warn!(
                    notification_id = %status.notification_id,
                    status_id = %status.id,
                    "status for unknown notification dropped"
                );
                Ok(())
            }
            other => other,
        }
    }
}

/// `notification.status.update`: transport feedback for a notification.
pub struct UpdateStatus {
    pipeline: Arc<Pipeline>,
}

impl UpdateStatus {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl EventHandler for UpdateStatus {
    fn name(&self) -> &'static str {
        names::STATUS_UPDATE
    }

    fn validate(&self, payload: &EventPayload) -> Result<(), HeraldError> {
        let update = payload.expect_status_update()?;
        if update.notification_id.trim().is_empty() {
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
        let update = payload.expect_status_update()?;
        let Some(n) = p.load(ctx, &update.notification_id).await? else {
            return Ok(());
        };
        // A version conflict is retryable; redelivery rereads.
        let n = ctx
            .run(adopt_external_id(
                p.store.as_ref(),
                ctx.scope(),
                n,
                update.external_id.as_deref(),
            ))
            .await?;

        let status = NotificationStatus::new(ctx.scope(), &n.id, update.state, update.status)
            .with_external_id(update.external_id.clone())
            .with_transient_id(update.transient_id.clone())
            .with_extra(update.extras.clone());
        info!(
            notification_id = %n.id,
            state = %status.state,
            status = %status.status,
            "transport feedback received"
        );
        p.emit_status(ctx, status).await
    }
}
