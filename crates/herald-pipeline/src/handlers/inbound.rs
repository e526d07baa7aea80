// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use herald_bus::{EventHandler, EventPayload, names};
use herald_core::{HeraldError, Notification, RequestContext, RouteMode, State, Status};
use herald_template::{DEFAULT_KEY, RenderedMap};

use super::{steps, validate_id};
use crate::pipeline::Pipeline;
use crate::record::build_record;

/// `notification.in.route`: pick an `rx` route for an inbound notification.
pub struct InRoute {
    pipeline: Arc<Pipeline>,
}

impl InRoute {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl EventHandler for InRoute {
    fn name(&self) -> &'static str {
        names::IN_ROUTE
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
        if n.is_closed() || p.already_dispatched(ctx, &n).await? {
            debug!(notification_id = id, "inbound notification already settled");
            return Ok(());
        }

        let decision = match p
            .selector
            .select(ctx.scope(), RouteMode::Rx, &n, n.notification_type)
            .await
        {
            Ok(d) => d,
            Err(e) => return p.fail(ctx, id, steps::IN_ROUTE, e).await,
        };
        let n = match p.pin_route(ctx, n, &decision.route.id).await {
            Ok(n) => n,
            Err(e) => return p.fail(ctx, id, steps::IN_ROUTE, e).await,
        };
        info!(
            notification_id = %n.id,
            route_id = %decision.route.id,
            reason = %decision.reason,
            "inbound route assigned"
        );

        let queued = p.status(ctx, &n, State::Active, Status::Queued);
        p.emit_status(ctx, queued).await?;
        p.emit_stage(ctx, names::IN_QUEUE, &n.id).await
    }
}

/// `notification.in.queue`: hand an inbound notification to its route.
pub struct InQueue {
    pipeline: Arc<Pipeline>,
}

impl InQueue {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    async fn dispatch(&self, ctx: &RequestContext, n: &Notification) -> Result<(), HeraldError> {
        let p = &self.pipeline;
        let scope = ctx.scope();
        let mut data = RenderedMap::new();
        if !n.message.is_empty() {
            data.insert(DEFAULT_KEY.to_string(), n.message.clone());
        }
        let language = match p.store.get_language(scope, &n.language_id).await {
            Ok(l) => l.code,
            Err(e) if e.is_not_found() => n.language_id.clone(),
            Err(e) => return Err(e),
        };
        let record = build_record(n, data, &language, None);
        let route_id = n.route_id().unwrap_or_default();
        ctx.run(
            p.registry
                .publish_with_reload(p.store.as_ref(), scope, route_id, record.to_bytes()),
        )
        .await
    }
}

#[async_trait]
impl EventHandler for InQueue {
    fn name(&self) -> &'static str {
        names::IN_QUEUE
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
        if n.is_closed() || p.already_dispatched(ctx, &n).await? {
            debug!(notification_id = id, "inbound notification already settled");
            return Ok(());
        }

        if let Err(e) = self.dispatch(ctx, &n).await {
            return p.fail(ctx, id, steps::IN_QUEUE, e).await;
        }
        info!(notification_id = %n.id, route_id = ?n.route_id(), "inbound notification published");
        p.emit_status(ctx, p.status(ctx, &n, State::Active, Status::InProcess))
            .await
    }
}
