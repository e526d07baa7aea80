// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronous entry points in front of the event pipeline.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use herald_bus::{Emitter, EventPayload, names};
use herald_config::model::IngressConfig;
use herald_core::id::preserve_or_mint;
use herald_core::{
    EntityStore, HeraldError, Language, Notification, NotificationStatus, NotificationType,
    Party, RequestContext, Route, RouteMode, State, Status, Template, TemplateData, TenantScope,
    now_timestamp,
};
use herald_pipeline::{adopt_external_id, record_status};
use herald_publisher::PublisherRegistry;

use crate::api::{
    NotificationRequest, NotificationResponse, ReleaseRequest, RouteRequest, SearchRequest,
    StatusResponse, StatusUpdateRequest, TemplateResponse, TemplateSaveRequest,
    TemplateSearchRequest,
};
use crate::pool::WorkerPool;
use crate::stream::{ResultStream, result_channel};

/// Direction of an ingested notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Out,
    In,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Out => "out",
            Direction::In => "in",
        }
    }
}

/// The caller-facing notification service.
///
/// Cheap to clone; every clone shares the same worker pool.
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn EntityStore>,
    emitter: Emitter,
    registry: Arc<PublisherRegistry>,
    pool: WorkerPool,
    config: IngressConfig,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        emitter: Emitter,
        registry: Arc<PublisherRegistry>,
        config: IngressConfig,
    ) -> Self {
        let pool = WorkerPool::new(
            config.worker_pool_size,
            Duration::from_millis(config.submit_timeout_ms),
        );
        Self {
            store,
            emitter,
            registry,
            pool,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn config(&self) -> &IngressConfig {
        &self.config
    }

    /// Stop accepting bulk work.
    pub fn close(&self) {
        self.pool.close();
    }

    // --- Notifications ---

    /// Accept one outbound notification.
    #[instrument(skip_all, fields(tenant = %ctx.scope().tenant_id))]
    pub async fn queue_out(
        &self,
        ctx: &RequestContext,
        request: NotificationRequest,
    ) -> Result<StatusResponse, HeraldError> {
        self.queue(ctx, request, Direction::Out).await
    }

    /// Accept one inbound notification.
    #[instrument(skip_all, fields(tenant = %ctx.scope().tenant_id))]
    pub async fn queue_in(
        &self,
        ctx: &RequestContext,
        request: NotificationRequest,
    ) -> Result<StatusResponse, HeraldError> {
        self.queue(ctx, request, Direction::In).await
    }

    /// Bulk [`queue_out`](Self::queue_out); results arrive as items finish.
    pub fn send(
        &self,
        ctx: &RequestContext,
        requests: Vec<NotificationRequest>,
    ) -> ResultStream<StatusResponse> {
        self.bulk(ctx, requests, Direction::Out)
    }

    /// Bulk [`queue_in`](Self::queue_in).
    pub fn receive(
        &self,
        ctx: &RequestContext,
        requests: Vec<NotificationRequest>,
    ) -> ResultStream<StatusResponse> {
        self.bulk(ctx, requests, Direction::In)
    }

    fn bulk(
        &self,
        ctx: &RequestContext,
        requests: Vec<NotificationRequest>,
        direction: Direction,
    ) -> ResultStream<StatusResponse> {
        let (sink, stream) = result_channel(self.config.stream_buffer);
        let service = self.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let total = requests.len();
            for request in requests {
                if sink.is_closed() || ctx.is_cancelled() {
                    debug!(total, "bulk request abandoned by caller");
                    break;
                }
                let worker_sink = sink.clone();
                let worker = service.clone();
                let item_ctx = ctx.clone();
                let submitted = service
                    .pool
                    .submit(async move {
                        let result = worker.queue(&item_ctx, request, direction).await;
                        worker_sink.send(result).await;
                    })
                    .await;
                if let Err(e) = submitted {
                    sink.send(Err(e)).await;
                    break;
                }
            }
        });
        stream
    }

    async fn queue(
        &self,
        ctx: &RequestContext,
        request: NotificationRequest,
        direction: Direction,
    ) -> Result<StatusResponse, HeraldError> {
        let scope = ctx.scope();
        let notification = self.prepare(ctx, request, direction).await?;
        let notification = ctx
            .run(self.store.save_notification(scope, &notification))
            .await?;

        let initial = NotificationStatus::new(
            scope,
            &notification.id,
            State::Created,
            match direction {
                Direction::Out => Status::Queued,
                Direction::In => Status::Unknown,
            },
        );
        ctx.run(record_status(self.store.as_ref(), scope, &initial))
            .await?;

        let id = notification.id.clone();
        self.emitter
            .emit(
                ctx,
                names::NOTIFICATION_SAVE,
                EventPayload::Notification(Box::new(notification)),
            )
            .await?;
        herald_prometheus::record_ingested(direction.label());
        info!(notification_id = %id, direction = direction.label(), "notification accepted");
        Ok(StatusResponse::from(&initial))
    }

    /// Validate a request and turn it into a notification row.
    async fn prepare(
        &self,
        ctx: &RequestContext,
        request: NotificationRequest,
        direction: Direction,
    ) -> Result<Notification, HeraldError> {
        let scope = ctx.scope();
        let recipient: Party = request.recipient.unwrap_or_default().into();
        if recipient.contact_id.trim().is_empty() && recipient.profile_id.trim().is_empty() {
            return Err(HeraldError::Validation(
                "recipient contact_id or profile_id is required".into(),
            ));
        }
        if direction == Direction::Out
            && request.data.trim().is_empty()
            && request.template.trim().is_empty()
        {
            return Err(HeraldError::MissingTemplate);
        }
        let notification_type = NotificationType::parse_lenient(&request.kind)?;

        let code = match request.language.trim() {
            "" => self.config.default_language.as_str(),
            code => code,
        };
        let language = ctx
            .run(self.store.get_or_create_language(scope, code))
            .await?;

        let template_id = match request.template.trim() {
            "" => None,
            name => Some(
                ctx.run(self.store.get_template_by_name(scope, name))
                    .await?
                    .id,
            ),
        };

        let mut n = Notification::new(scope);
        n.id = preserve_or_mint(request.id.as_deref());
        n.parent_id = request.parent_id.filter(|s| !s.is_empty());
        n.transient_id = request.transient_id.filter(|s| !s.is_empty());
        n.sender = request.source.unwrap_or_default().into();
        n.recipient = recipient;
        n.route_id = request.route_id.filter(|s| !s.is_empty());
        n.notification_type = notification_type;
        n.language_id = language.id;
        n.template_id = template_id;
        n.payload = request.payload;
        n.message = request.data;
        n.priority = request.priority;
        match direction {
            Direction::Out => {
                n.out_bound = true;
                if request.auto_release {
                    n.released_at = Some(now_timestamp());
                }
            }
            Direction::In => {
                n.out_bound = false;
                n.released_at = Some(now_timestamp());
            }
        }
        Ok(n)
    }

    /// Latest status of a notification.
    pub async fn status(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<StatusResponse, HeraldError> {
        let n = ctx
            .run(self.store.get_notification(ctx.scope(), id))
            .await?;
        let status = self.latest_status(ctx, &n).await?;
        Ok(StatusResponse::from(&status))
    }

    async fn latest_status(
        &self,
        ctx: &RequestContext,
        n: &Notification,
    ) -> Result<NotificationStatus, HeraldError> {
        let status_id = n
            .status_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| HeraldError::not_found("status", &n.id))?;
        ctx.run(self.store.get_status(ctx.scope(), status_id)).await
    }

    /// Record transport feedback and return the new row.
    #[instrument(skip_all, fields(notification_id = %request.id))]
    pub async fn status_update(
        &self,
        ctx: &RequestContext,
        request: StatusUpdateRequest,
    ) -> Result<StatusResponse, HeraldError> {
        if request.id.trim().is_empty() {
            return Err(HeraldError::Validation("notification id is required".into()));
        }
        let scope = ctx.scope();
        let n = ctx.run(self.store.get_notification(scope, &request.id)).await?;
        let n = match ctx
            .run(adopt_external_id(
                self.store.as_ref(),
                scope,
                n.clone(),
                request.external_id.as_deref(),
            ))
            .await
        {
            Err(HeraldError::Conflict(_)) => {
                let fresh = ctx.run(self.store.get_notification(scope, &n.id)).await?;
                ctx.run(adopt_external_id(
                    self.store.as_ref(),
                    scope,
                    fresh,
                    request.external_id.as_deref(),
                ))
                .await?
            }
            other => other?,
        };

        let status = NotificationStatus::new(scope, &n.id, request.state, request.status)
            .with_external_id(request.external_id)
            .with_transient_id(request.transient_id)
            .with_extra(request.extras);
        ctx.run(record_status(self.store.as_ref(), scope, &status))
            .await?;
        info!(state = %status.state, status = %status.status, "status updated");
        Ok(StatusResponse::from(&status))
    }

    /// Release held outbound notifications.
    ///
    /// Newly released notifications come first, each with its fresh
    /// `(ACTIVE, QUEUED)` row; ids that were already released or are closed
    /// follow with their current status.
    #[instrument(skip_all, fields(count = request.ids.len()))]
    pub async fn release(
        &self,
        ctx: &RequestContext,
        request: ReleaseRequest,
    ) -> ResultStream<StatusResponse> {
        let mut released = Vec::new();
        let mut unchanged = Vec::new();
        let mut seen = BTreeSet::new();
        for id in request.ids {
            if !seen.insert(id.clone()) {
                continue;
            }
            let n = match ctx.run(self.store.get_notification(ctx.scope(), &id)).await {
                Ok(n) => n,
                Err(e) => {
                    released.push(Err(e));
                    continue;
                }
            };
            if n.is_released() || n.is_closed() {
                unchanged.push(
                    self.latest_status(ctx, &n)
                        .await
                        .map(|s| StatusResponse::from(&s)),
                );
                continue;
            }
            released.push(self.release_one(ctx, n, &request.comment).await);
        }
        released.extend(unchanged);
        ResultStream::from_vec(released)
    }

    async fn release_one(
        &self,
        ctx: &RequestContext,
        mut n: Notification,
        comment: &str,
    ) -> Result<StatusResponse, HeraldError> {
        let scope = ctx.scope();
        n.released_at = Some(now_timestamp());
        let n = ctx.run(self.store.save_notification(scope, &n)).await?;

        let mut status = NotificationStatus::new(scope, &n.id, State::Active, Status::Queued);
        if !comment.is_empty() {
            status
                .extra
                .insert("comment".into(), Value::String(comment.to_string()));
        }
        ctx.run(record_status(self.store.as_ref(), scope, &status))
            .await?;
        self.emitter
            .emit(
                ctx,
                names::NOTIFICATION_SAVE,
                EventPayload::Notification(Box::new(n)),
            )
            .await?;
        info!(notification_id = %status.notification_id, "notification released");
        Ok(StatusResponse::from(&status))
    }

    /// Find notifications by id list or free text, joined with language
    /// code and latest status.
    pub async fn search(
        &self,
        ctx: &RequestContext,
        request: SearchRequest,
    ) -> ResultStream<NotificationResponse> {
        match self.search_page(ctx, request).await {
            Ok(items) => ResultStream::from_vec(items.into_iter().map(Ok).collect()),
            Err(e) => ResultStream::from_vec(vec![Err(e)]),
        }
    }

    async fn search_page(
        &self,
        ctx: &RequestContext,
        request: SearchRequest,
    ) -> Result<Vec<NotificationResponse>, HeraldError> {
        let scope = ctx.scope();
        let ids: Vec<String> = request
            .id_query
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect();
        let mut found = if ids.is_empty() {
            ctx.run(
                self.store
                    .search_notifications(scope, &request.query, request.page),
            )
            .await?
        } else {
            ctx.run(self.store.get_notifications(scope, &ids)).await?
        };
        found.retain(|n| {
            request
                .extras
                .iter()
                .all(|(k, v)| n.payload.get(k) == Some(v))
        });

        let language_ids: Vec<String> = unique(found.iter().map(|n| n.language_id.clone()));
        let status_ids: Vec<String> = unique(found.iter().filter_map(|n| n.status_id.clone()));
        let languages = ctx
            .run(self.store.get_languages(scope, &language_ids))
            .await?;
        let statuses = ctx
            .run(self.store.get_statuses(scope, &status_ids))
            .await?;

        Ok(found
            .iter()
            .map(|n| {
                let code = language_code(&languages, &n.language_id);
                let status = n
                    .status_id
                    .as_deref()
                    .and_then(|sid| statuses.iter().find(|s| s.id == sid));
                NotificationResponse::new(n, &code, status)
            })
            .collect())
    }

    // --- Templates ---

    /// Create or update a template by name, then upsert one text per type
    /// for the request's language.
    #[instrument(skip_all, fields(template = %request.name))]
    pub async fn template_save(
        &self,
        ctx: &RequestContext,
        request: TemplateSaveRequest,
    ) -> Result<TemplateResponse, HeraldError> {
        let scope = ctx.scope();
        let name = request.name.trim();
        if name.is_empty() {
            return Err(HeraldError::Validation("template name is required".into()));
        }
        let code = match request.language_code.trim() {
            "" => self.config.default_language.as_str(),
            code => code,
        };
        let language = ctx
            .run(self.store.get_or_create_language(scope, code))
            .await?;

        let template = match ctx.run(self.store.get_template_by_name(scope, name)).await {
            Ok(mut existing) => {
                existing.extra = request.extra;
                existing
            }
            Err(e) if e.is_not_found() => Template::new(scope, name, request.extra),
            Err(e) => return Err(e),
        };
        let template = ctx.run(self.store.save_template(scope, &template)).await?;

        for (kind, detail) in request.data {
            let row = TemplateData::new(scope, &template.id, &language.id, kind, detail);
            ctx.run(self.store.save_template_data(scope, &row)).await?;
        }
        debug!(template_id = %template.id, "template saved");

        let rows = ctx
            .run(
                self.store
                    .get_template_data_by_template_ids(scope, &[template.id.clone()]),
            )
            .await?;
        let languages = self.languages_of(ctx, &rows).await?;
        Ok(TemplateResponse::new(&template, &rows, &languages))
    }

    /// Page through templates, optionally only those with text in one language.
    pub async fn template_search(
        &self,
        ctx: &RequestContext,
        request: TemplateSearchRequest,
    ) -> ResultStream<TemplateResponse> {
        match self.template_page(ctx, request).await {
            Ok(items) => ResultStream::from_vec(items.into_iter().map(Ok).collect()),
            Err(e) => ResultStream::from_vec(vec![Err(e)]),
        }
    }

    async fn template_page(
        &self,
        ctx: &RequestContext,
        request: TemplateSearchRequest,
    ) -> Result<Vec<TemplateResponse>, HeraldError> {
        let scope = ctx.scope();
        let mut templates = ctx
            .run(
                self.store
                    .search_templates(scope, &request.query, request.page),
            )
            .await?;
        let ids: Vec<String> = templates.iter().map(|t| t.id.clone()).collect();

        let code = request
            .language_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let rows = match code {
            Some(code) => {
                let language = match ctx
                    .run(self.store.get_language_by_code(scope, code))
                    .await
                {
                    Ok(l) => l,
                    Err(e) if e.is_not_found() => return Ok(Vec::new()),
                    Err(e) => return Err(e),
                };
                let rows = ctx
                    .run(
                        self.store
                            .get_template_data_by_language(scope, &language.id, &ids),
                    )
                    .await?;
                templates.retain(|t| rows.iter().any(|r| r.template_id == t.id));
                rows
            }
            None => {
                ctx.run(self.store.get_template_data_by_template_ids(scope, &ids))
                    .await?
            }
        };
        let languages = self.languages_of(ctx, &rows).await?;
        Ok(templates
            .iter()
            .map(|t| TemplateResponse::new(t, &rows, &languages))
            .collect())
    }

    async fn languages_of(
        &self,
        ctx: &RequestContext,
        rows: &[TemplateData],
    ) -> Result<Vec<Language>, HeraldError> {
        let ids = unique(rows.iter().map(|r| r.language_id.clone()));
        ctx.run(self.store.get_languages(ctx.scope(), &ids)).await
    }

    // --- Routes ---

    /// Create or update a route. The URI must name a supported transport.
    #[instrument(skip_all, fields(route = %request.name))]
    pub async fn route_save(
        &self,
        ctx: &RequestContext,
        request: RouteRequest,
    ) -> Result<Route, HeraldError> {
        let scope = ctx.scope();
        if request.name.trim().is_empty() {
            return Err(HeraldError::Validation("route name is required".into()));
        }
        self.registry.factory().check(&request.uri)?;

        let existing = match request.id.as_deref().filter(|s| !s.is_empty()) {
            Some(id) => match ctx.run(self.store.get_route(scope, id)).await {
                Ok(route) => Some(route),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            },
            None => None,
        };
        let route = match existing {
            Some(mut route) => {
                request.apply_to(&mut route);
                route
            }
            None => {
                let mut route = Route::new(
                    scope,
                    request.name.clone(),
                    request.kind,
                    request.mode,
                    request.uri.clone(),
                );
                route.id = preserve_or_mint(request.id.as_deref());
                request.apply_to(&mut route);
                route
            }
        };
        let saved = ctx.run(self.store.save_route(scope, &route)).await?;
        // Rebind lazily with the new uri on next publish.
        self.registry.unregister(&saved.id).await;
        info!(route_id = %saved.id, mode = %saved.mode, "route saved");
        Ok(saved)
    }

    /// Routes of one mode, or of every mode.
    pub async fn route_list(
        &self,
        ctx: &RequestContext,
        mode: Option<RouteMode>,
    ) -> Result<Vec<Route>, HeraldError> {
        let scope = ctx.scope();
        let modes = match mode {
            Some(m) => vec![m],
            None => vec![RouteMode::Tx, RouteMode::Rx, RouteMode::Trx],
        };
        let mut routes = Vec::new();
        for m in modes {
            routes.extend(ctx.run(self.store.get_routes_by_mode(scope, m)).await?);
        }
        Ok(routes)
    }

    /// Soft-delete a route and drop its publisher.
    pub async fn route_delete(&self, ctx: &RequestContext, id: &str) -> Result<(), HeraldError> {
        ctx.run(self.store.delete_route(ctx.scope(), id)).await?;
        if self.registry.unregister(id).await {
            debug!(route_id = id, "publisher released with route");
        }
        info!(route_id = id, "route deleted");
        Ok(())
    }

    /// Locate a notification by its id, falling back to the transport's id.
    pub async fn locate(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<Notification, HeraldError> {
        let scope: &TenantScope = ctx.scope();
        match ctx.run(self.store.get_notification(scope, id)).await {
            Err(e) if e.is_not_found() => {
                warn!(id, "no notification with this id, trying external id");
                ctx.run(self.store.get_notification_by_external_id(scope, id))
                    .await
            }
            other => other,
        }
    }

    pub(crate) fn emitter(&self) -> &Emitter {
        &self.emitter
    }
}

fn unique(items: impl Iterator<Item = String>) -> Vec<String> {
    items
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn language_code(languages: &[Language], language_id: &str) -> String {
    languages
        .iter()
        .find(|l| l.id == language_id)
        .map(|l| l.code.clone())
        .unwrap_or_else(|| language_id.to_string())
}
