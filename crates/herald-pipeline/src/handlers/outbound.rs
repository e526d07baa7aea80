// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use herald_bus::{EventHandler, EventPayload, names};
use herald_core::{HeraldError, Notification, RequestContext, RouteMode, State, Status};
use herald_router::effective_type;

use super::{steps, validate_id};
use crate::pipeline::Pipeline;
use crate::record::build_record;

/// `notification.out.route`: resolve the recipient and pick a `tx` route.
pub struct OutRoute {
    pipeline: Arc<Pipeline>,
}

impl OutRoute {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    async fn route(
        &self,
        ctx: &RequestContext,
        n: Notification,
    ) -> Result<Notification, HeraldError> {
        let p = &self.pipeline;
        let profile = p.recipient_profile(ctx, &n).await?;
        let route_type = effective_type(profile.as_ref(), &n.recipient.contact_id);
        let decision = p
            .selector
            .select(ctx.scope(), RouteMode::Tx, &n, route_type)
            .await?;
        info!(
            notification_id = %n.id,
            route_id = %decision.route.id,
            %route_type,
            reason = %decision.reason,
            "outbound route assigned"
        );
        p.pin_route(ctx, n, &decision.route.id).await
    }
}

#[async_trait]
impl EventHandler for OutRoute {
    fn name(&self) -> &'static str {
        names::OUT_ROUTE
    }

    fn validate(&self, payload: &EventPayload) -> Result<(), HeraldError> {
        validate_id(payload)
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        payload: &EventPayload,
    ) -> Result<(), HeraldError> {
        let p = &self.pipeline;
        let id = payload.expect_id()?;
        let Some(n) = p.load(ctx, id).await? else {
            return Ok(());
        };
        if !n.is_released() {
            debug!(notification_id = id, "notification not released, holding");
            return Ok(());
        }
        if n.is_closed() || p.already_dispatched(ctx, &n).await? {
            debug!(notification_id = id, "outbound notification already settled");
            return Ok(());
        }

        let n = match self.route(ctx, n).await {
            Ok(n) => n,
            Err(e) => return p.fail(ctx, id, steps::OUT_ROUTE, e).await,
        };
        let queued = p.status(ctx, &n, State::Active, Status::Queued);
        p.emit_status(ctx, queued).await?;
        p.emit_stage(ctx, names::OUT_QUEUE, &n.id).await
    }
}

/// `notification.out.queue`: render, encode, and publish.
pub struct OutQueue {
    pipeline: Arc<Pipeline>,
}

impl OutQueue {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    async fn dispatch(&self, ctx: &RequestContext, n: &Notification) -> Result<(), HeraldError> {
        let p = &self.pipeline;
        let scope = ctx.scope();

        let latest = match n.status_id.as_deref().filter(|s| !s.is_empty()) {
            Some(status_id) => match ctx.run(p.store.get_status(scope, status_id)).await {
                Ok(s) => Some(s),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            },
            None => None,
        };
        let language = match ctx.run(p.store.get_language(scope, &n.language_id)).await {
            Ok(l) => l.code,
            Err(e) if e.is_not_found() => n.language_id.clone(),
            Err(e) => return Err(e),
        };

        let data = ctx.run(p.renderer.render(scope, n)).await?;
        if data.is_empty() {
            return Err(HeraldError::EmptyRendering);
        }

        let record = build_record(n, data, &language, latest.as_ref());
        let route_id = n.route_id().unwrap_or_default();
        ctx.run(
            p.registry
                .publish_with_reload(p.store.as_ref(), scope, route_id, record.to_bytes()),
        )
        .await?;
        info!(notification_id = %n.id, route_id, "notification published");

        ctx.run(p.store.save_notification(scope, n)).await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for OutQueue {
    fn name(&self) -> &'static str {
        names::OUT_QUEUE
    }

    fn validate(&self, payload: &EventPayload) -> Result<(), HeraldError> {
        validate_id(payload)
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        payload: &EventPayload,
    ) -> Result<(), HeraldError> {
        let p = &self.pipeline;
        let id = payload.expect_id()?;
        let Some(n) = p.load(ctx, id).await? else {
            return Ok(());
        };
        if !n.is_released() || n.is_closed() {
            debug!(notification_id = id, state = %n.state, "notification not dispatchable");
            return Ok(());
        }
        if p.already_dispatched(ctx, &n).await? {
            debug!(notification_id = id, "notification already published");
            return Ok(());
        }

        if let Err(e) = self.dispatch(ctx, &n).await {
            return p.fail(ctx, id, steps::OUT_QUEUE, e).await;
        }
        p.emit_status(ctx, p.status(ctx, &n, State::Active, Status::InProcess))
            .await
    }
}
