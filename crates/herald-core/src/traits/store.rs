// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits: lifecycle plus the tenant-scoped entity repository.

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Language, Notification, NotificationStatus, NotificationType, Page, Route, RouteMode,
    Template, TemplateData, TenantScope,
};

/// Lifecycle of a storage backend.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), HeraldError>;

    /// Flushes pending writes and releases connections.
    async fn close(&self) -> Result<(), HeraldError>;
}

/// Typed CRUD over the six persistent entities.
///
/// Every call is scoped to `scope.tenant_id`; rows belonging to other
/// tenants are invisible. Single-entity getters return
/// [`HeraldError::NotFound`] when the row is missing or soft-deleted.
/// List getters silently skip missing ids.
#[async_trait]
pub trait EntityStore: StorageAdapter {
    // --- Languages ---

    async fn create_language(
        &self,
        scope: &TenantScope,
        language: &Language,
    ) -> Result<(), HeraldError>;

    async fn get_language(&self, scope: &TenantScope, id: &str) -> Result<Language, HeraldError>;

    async fn get_languages(
        &self,
        scope: &TenantScope,
        ids: &[String],
    ) -> Result<Vec<Language>, HeraldError>;

    async fn get_language_by_code(
        &self,
        scope: &TenantScope,
        code: &str,
    ) -> Result<Language, HeraldError>;

    async fn get_language_by_name(
        &self,
        scope: &TenantScope,
        name: &str,
    ) -> Result<Language, HeraldError>;

    /// Return the language for `code`, creating a placeholder row on first use.
    async fn get_or_create_language(
        &self,
        scope: &TenantScope,
        code: &str,
    ) -> Result<Language, HeraldError>;

    // --- Templates ---

    /// Insert or update by id; returns the stored row.
    async fn save_template(
        &self,
        scope: &TenantScope,
        template: &Template,
    ) -> Result<Template, HeraldError>;

    async fn get_template(&self, scope: &TenantScope, id: &str) -> Result<Template, HeraldError>;

    async fn get_templates(
        &self,
        scope: &TenantScope,
        ids: &[String],
    ) -> Result<Vec<Template>, HeraldError>;

    async fn get_template_by_name(
        &self,
        scope: &TenantScope,
        name: &str,
    ) -> Result<Template, HeraldError>;

    async fn search_templates(
        &self,
        scope: &TenantScope,
        query: &str,
        page: Page,
    ) -> Result<Vec<Template>, HeraldError>;

    // --- Template data ---

    /// Insert, or update `detail` when `(template_id, language_id, type)` exists.
    async fn save_template_data(
        &self,
        scope: &TenantScope,
        data: &TemplateData,
    ) -> Result<TemplateData, HeraldError>;

    async fn get_template_data(
        &self,
        scope: &TenantScope,
        ids: &[String],
    ) -> Result<Vec<TemplateData>, HeraldError>;

    async fn get_template_data_by_template_ids(
        &self,
        scope: &TenantScope,
        template_ids: &[String],
    ) -> Result<Vec<TemplateData>, HeraldError>;

    async fn get_template_data_by_language(
        &self,
        scope: &TenantScope,
        language_id: &str,
        template_ids: &[String],
    ) -> Result<Vec<TemplateData>, HeraldError>;

    // --- Routes ---

    async fn save_route(&self, scope: &TenantScope, route: &Route) -> Result<Route, HeraldError>;

    async fn get_route(&self, scope: &TenantScope, id: &str) -> Result<Route, HeraldError>;

    async fn get_routes(
        &self,
        scope: &TenantScope,
        ids: &[String],
    ) -> Result<Vec<Route>, HeraldError>;

    async fn get_routes_by_mode(
        &self,
        scope: &TenantScope,
        mode: RouteMode,
    ) -> Result<Vec<Route>, HeraldError>;

    /// Candidates with `partition_id` equal, `route_type` in `{any, requested}`
    /// and `mode` in `{requested, trx}`, in stable creation order.
    async fn get_routes_by_mode_type_partition(
        &self,
        scope: &TenantScope,
        mode: RouteMode,
        route_type: NotificationType,
        partition_id: &str,
    ) -> Result<Vec<Route>, HeraldError>;

    async fn delete_route(&self, scope: &TenantScope, id: &str) -> Result<(), HeraldError>;

    // --- Notifications ---

    /// Insert, or update the mutable fields when the id already exists.
    /// Replaying an identical record changes nothing.
    async fn save_notification(
        &self,
        scope: &TenantScope,
        notification: &Notification,
    ) -> Result<Notification, HeraldError>;

    /// Optimistic update guarded by `notification.audit.version`.
    /// A stale version fails with [`HeraldError::Conflict`].
    async fn update_notification(
        &self,
        scope: &TenantScope,
        notification: &Notification,
    ) -> Result<Notification, HeraldError>;

    async fn get_notification(
        &self,
        scope: &TenantScope,
        id: &str,
    ) -> Result<Notification, HeraldError>;

    async fn get_notifications(
        &self,
        scope: &TenantScope,
        ids: &[String],
    ) -> Result<Vec<Notification>, HeraldError>;

    async fn get_notification_by_external_id(
        &self,
        scope: &TenantScope,
        external_id: &str,
    ) -> Result<Notification, HeraldError>;

    /// Free-text search over id, external id, and transient id, newest first.
    async fn search_notifications(
        &self,
        scope: &TenantScope,
        query: &str,
        page: Page,
    ) -> Result<Vec<Notification>, HeraldError>;

    // --- Notification statuses ---

    /// Append a status row. Re-inserting the same id is a no-op.
    async fn save_status(
        &self,
        scope: &TenantScope,
        status: &NotificationStatus,
    ) -> Result<(), HeraldError>;

    /// Fold `status` into its notification's `status_id`, `state`, and
    /// `transient_id`. Older statuses never move the pointer back, and a
    /// terminal state is never reopened.
    async fn advance_status_mirror(
        &self,
        scope: &TenantScope,
        status: &NotificationStatus,
    ) -> Result<(), HeraldError>;

    async fn get_status(
        &self,
        scope: &TenantScope,
        id: &str,
    ) -> Result<NotificationStatus, HeraldError>;

    async fn get_statuses(
        &self,
        scope: &TenantScope,
        ids: &[String],
    ) -> Result<Vec<NotificationStatus>, HeraldError>;

    /// Status rows for one notification, oldest first.
    async fn get_statuses_by_notification(
        &self,
        scope: &TenantScope,
        notification_id: &str,
    ) -> Result<Vec<NotificationStatus>, HeraldError>;
}
