// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dependencies and steps shared by the handlers.

use std::sync::Arc;

use tracing::{debug, warn};

use herald_bus::{Emitter, EventPayload, names};
use herald_core::{
    EntityStore, HeraldError, Notification, NotificationStatus, Profile,
    ProfileService, RequestContext, State, Status,
};
use herald_publisher::PublisherRegistry;
use herald_router::RouteSelector;
use herald_template::TemplateRenderer;

/// What the pipeline is built from.
#[derive(Clone)]
pub struct PipelineDeps {
    pub store: Arc<dyn EntityStore>,
    pub registry: Arc<PublisherRegistry>,
    pub profiles: Arc<dyn ProfileService>,
}

/// State shared by all handlers.
pub struct Pipeline {
    pub(crate) store: Arc<dyn EntityStore>,
    pub(crate) registry: Arc<PublisherRegistry>,
    pub(crate) profiles: Arc<dyn ProfileService>,
    pub(crate) renderer: TemplateRenderer,
    pub(crate) selector: RouteSelector,
    pub(crate) emitter: Emitter,
}

impl Pipeline {
    pub fn new(deps: PipelineDeps, emitter: Emitter) -> Self {
        Self {
            renderer: TemplateRenderer::new(deps.store.clone()),
            selector: RouteSelector::new(deps.store.clone()),
            store: deps.store,
            registry: deps.registry,
            profiles: deps.profiles,
            emitter,
        }
    }

    /// Fresh read of a notification. `None` when it no longer exists.
    pub(crate) async fn load(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<Option<Notification>, HeraldError> {
        match ctx.run(self.store.get_notification(ctx.scope(), id)).await {
            Ok(n) => Ok(Some(n)),
            Err(e) if e.is_not_found() => {
                warn!(notification_id = id, "notification vanished, dropping event");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn emit_status(
        &self,
        ctx: &RequestContext,
        status: NotificationStatus,
    ) -> Result<(), HeraldError> {
        self.emitter
            .emit(ctx, names::STATUS_SAVE, EventPayload::Status(Box::new(status)))
            .await
    }

    pub(crate) async fn emit_stage(
        &self,
        ctx: &RequestContext,
        name: &str,
        notification_id: &str,
    ) -> Result<(), HeraldError> {
        self.emitter
            .emit(ctx, name, EventPayload::Id(notification_id.to_string()))
            .await
    }

    /// Status row for `n` in the handler's scope.
    pub(crate) fn status(
        &self,
        ctx: &RequestContext,
        n: &Notification,
        state: State,
        status: Status,
    ) -> NotificationStatus {
        NotificationStatus::new(ctx.scope(), &n.id, state, status)
    }

    /// Settle a failed step.
    ///
    /// Retryable errors go back to the bus while attempts remain. Anything
    /// else closes the notification with an `(INACTIVE, FAILED)` row tagged
    /// with `step` and reports success.
    pub(crate) async fn fail(
        &self,
        ctx: &RequestContext,
        notification_id: &str,
        step: &'static str,
        err: HeraldError,
    ) -> Result<(), HeraldError> {
        if err.is_retryable() && !ctx.is_final_attempt() {
            debug!(
                notification_id,
                step,
                attempt = ctx.attempt(),
                error = %err,
                "step failed, leaving it to redelivery"
            );
            return Err(err);
        }
        warn!(notification_id, step, error = %err, "dispatch failed, closing notification");
        herald_prometheus::record_dispatch_failure(step);
        let status = NotificationStatus::failure(ctx.scope(), notification_id, &err, step);
        self.emit_status(ctx, status).await
    }

    /// Persist the chosen route on `n`, retrying once over a concurrent
    /// status update.
    pub(crate) async fn pin_route(
        &self,
        ctx: &RequestContext,
        mut n: Notification,
        route_id: &str,
    ) -> Result<Notification, HeraldError> {
        if n.route_id() == Some(route_id) {
            return Ok(n);
        }
        let scope = ctx.scope();
        n.route_id = Some(route_id.to_string());
        match ctx.run(self.store.update_notification(scope, &n)).await {
            Err(HeraldError::Conflict(reason)) => {
                debug!(notification_id = %n.id, %reason, "route pin raced, rereading");
                let mut fresh = ctx.run(self.store.get_notification(scope, &n.id)).await?;
                fresh.route_id = Some(route_id.to_string());
                ctx.run(self.store.update_notification(scope, &fresh)).await
            }
            other => other,
        }
    }

    /// The recipient's profile, or `None` when the service does not know it.
    pub(crate) async fn recipient_profile(
        &self,
        ctx: &RequestContext,
        n: &Notification,
    ) -> Result<Option<Profile>, HeraldError> {
        let profile_id = n.recipient.profile_id.as_str();
        if profile_id.is_empty() {
            return Ok(None);
        }
        match ctx
            .run(self.profiles.get_profile(ctx.scope(), profile_id))
            .await
        {
            Ok(p) => Ok(Some(p)),
            Err(e) if e.is_not_found() => {
                debug!(notification_id = %n.id, profile_id, "recipient profile unknown");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// True when the latest status shows the notification was already
    /// handed to its transport.
    pub(crate) async fn already_dispatched(
        &self,
        ctx: &RequestContext,
        n: &Notification,
    ) -> Result<bool, HeraldError> {
        let Some(status_id) = n.status_id.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(false);
        };
        match ctx.run(self.store.get_status(ctx.scope(), status_id)).await {
            Ok(s) => Ok(matches!(s.status, Status::InProcess | Status::Successful)),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
