// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use herald_config::model::StorageConfig;
use herald_core::{
    AdapterType, EntityStore, HealthStatus, HeraldError, Language, Notification,
    NotificationStatus, NotificationType, Page, PluginAdapter, Route, RouteMode, StorageAdapter,
    Template, TemplateData, TenantScope,
};

use crate::database::{Database, map_tr_err};
use crate::queries;
use crate::queries::notifications::UpdateOutcome;

/// SQLite-backed entity store.
///
/// The database is opened lazily by [`StorageAdapter::initialize`]; every
/// other call fails with a storage error until then.
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the store immediately. Convenience for tests and tools.
    pub async fn open(config: StorageConfig) -> Result<Self, HeraldError> {
        let store = Self::new(config);
        store.initialize().await?;
        Ok(store)
    }

    fn db(&self) -> Result<&Database, HeraldError> {
        self.db.get().ok_or_else(|| HeraldError::Storage {
            source: "storage not initialized, call initialize() first".into(),
        })
    }
}

/// Rows may only be written into the caller's own tenant.
fn ensure_tenant(scope: &TenantScope, owner: &str, entity: &str) -> Result<(), HeraldError> {
    if scope.tenant_id == owner {
        Ok(())
    } else {
        Err(HeraldError::Unauthorized(format!(
            "{entity} belongs to another tenant"
        )))
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HeraldError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStore {
    async fn initialize(&self) -> Result<(), HeraldError> {
        let path = self.config.database_path.clone();
        let db = Database::open(&path).await?;
        self.db.set(db).map_err(|_| HeraldError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), HeraldError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl EntityStore for SqliteStore {
    // --- Languages ---

    async fn create_language(
        &self,
        scope: &TenantScope,
        language: &Language,
    ) -> Result<(), HeraldError> {
        ensure_tenant(scope, &language.audit.tenant_id, "language")?;
        queries::languages::create_language(self.db()?, language).await
    }

    async fn get_language(&self, scope: &TenantScope, id: &str) -> Result<Language, HeraldError> {
        queries::languages::get_language(self.db()?, scope, id)
            .await?
            .ok_or_else(|| HeraldError::not_found("language", id))
    }

    async fn get_languages(
        &self,
        scope: &TenantScope,
        ids: &[String],
    ) -> Result<Vec<Language>, HeraldError> {
        queries::languages::get_languages(self.db()?, scope, ids).await
    }

    async fn get_language_by_code(
        &self,
        scope: &TenantScope,
        code: &str,
    ) -> Result<Language, HeraldError> {
        queries::languages::get_language_by_code(self.db()?, scope, code)
            .await?
            .ok_or_else(|| HeraldError::not_found("language", code))
    }

    async fn get_language_by_name(
        &self,
        scope: &TenantScope,
        name: &str,
    ) -> Result<Language, HeraldError> {
        queries::languages::get_language_by_name(self.db()?, scope, name)
            .await?
            .ok_or_else(|| HeraldError::not_found("language", name))
    }

    async fn get_or_create_language(
        &self,
        scope: &TenantScope,
        code: &str,
    ) -> Result<Language, HeraldError> {
        queries::languages::get_or_create_language(self.db()?, scope, code).await
    }

    // --- Templates ---

    async fn save_template(
        &self,
        scope: &TenantScope,
        template: &Template,
    ) -> Result<Template, HeraldError> {
        ensure_tenant(scope, &template.audit.tenant_id, "template")?;
        queries::templates::save_template(self.db()?, template).await
    }

    async fn get_template(&self, scope: &TenantScope, id: &str) -> Result<Template, HeraldError> {
        queries::templates::get_template(self.db()?, scope, id)
            .await?
            .ok_or_else(|| HeraldError::not_found("template", id))
    }

    async fn get_templates(
        &self,
        scope: &TenantScope,
        ids: &[String],
    ) -> Result<Vec<Template>, HeraldError> {
        queries::templates::get_templates(self.db()?, scope, ids).await
    }

    async fn get_template_by_name(
        &self,
        scope: &TenantScope,
        name: &str,
    ) -> Result<Template, HeraldError> {
        queries::templates::get_template_by_name(self.db()?, scope, name)
            .await?
            .ok_or_else(|| HeraldError::not_found("template", name))
    }

    async fn search_templates(
        &self,
        scope: &TenantScope,
        query: &str,
        page: Page,
    ) -> Result<Vec<Template>, HeraldError> {
        queries::templates::search_templates(self.db()?, scope, query, page).await
    }

    // --- Template data ---

    async fn save_template_data(
        &self,
        scope: &TenantScope,
        data: &TemplateData,
    ) -> Result<TemplateData, HeraldError> {
        ensure_tenant(scope, &data.audit.tenant_id, "template data")?;
        queries::template_data::save_template_data(self.db()?, data).await
    }

    async fn get_template_data(
        &self,
        scope: &TenantScope,
        ids: &[String],
    ) -> Result<Vec<TemplateData>, HeraldError> {
        queries::template_data::get_template_data(self.db()?, scope, ids).await
    }

    async fn get_template_data_by_template_ids(
        &self,
        scope: &TenantScope,
        template_ids: &[String],
    ) -> Result<Vec<TemplateData>, HeraldError> {
        queries::template_data::get_by_template_ids(self.db()?, scope, template_ids).await
    }

    async fn get_template_data_by_language(
        &self,
        scope: &TenantScope,
        language_id: &str,
        template_ids: &[String],
    ) -> Result<Vec<TemplateData>, HeraldError> {
        queries::template_data::get_by_language(self.db()?, scope, language_id, template_ids).await
    }

    // --- Routes ---

    async fn save_route(&self, scope: &TenantScope, route: &Route) -> Result<Route, HeraldError> {
        ensure_tenant(scope, &route.audit.tenant_id, "route")?;
        queries::routes::save_route(self.db()?, route).await
    }

    async fn get_route(&self, scope: &TenantScope, id: &str) -> Result<Route, HeraldError> {
        queries::routes::get_route(self.db()?, scope, id)
            .await?
            .ok_or_else(|| HeraldError::not_found("route", id))
    }

    async fn get_routes(
        &self,
        scope: &TenantScope,
        ids: &[String],
    ) -> Result<Vec<Route>, HeraldError> {
        queries::routes::get_routes(self.db()?, scope, ids).await
    }

    async fn get_routes_by_mode(
        &self,
        scope: &TenantScope,
        mode: RouteMode,
    ) -> Result<Vec<Route>, HeraldError> {
        queries::routes::get_routes_by_mode(self.db()?, scope, mode).await
    }

    async fn get_routes_by_mode_type_partition(
        &self,
        scope: &TenantScope,
        mode: RouteMode,
        route_type: NotificationType,
        partition_id: &str,
    ) -> Result<Vec<Route>, HeraldError> {
        queries::routes::get_routes_by_mode_type_partition(
            self.db()?,
            scope,
            mode,
            route_type,
            partition_id,
        )
        .await
    }

    async fn delete_route(&self, scope: &TenantScope, id: &str) -> Result<(), HeraldError> {
        if queries::routes::delete_route(self.db()?, scope, id).await? {
            Ok(())
        } else {
            Err(HeraldError::not_found("route", id))
        }
    }

    // --- Notifications ---

    async fn save_notification(
        &self,
        scope: &TenantScope,
        notification: &Notification,
    ) -> Result<Notification, HeraldError> {
        ensure_tenant(scope, &notification.audit.tenant_id, "notification")?;
        queries::notifications::upsert_notification(self.db()?, notification).await
    }

    async fn update_notification(
        &self,
        scope: &TenantScope,
        notification: &Notification,
    ) -> Result<Notification, HeraldError> {
        match queries::notifications::update_notification(self.db()?, scope, notification).await? {
            UpdateOutcome::Updated(stored) => Ok(stored),
            UpdateOutcome::Stale => Err(HeraldError::Conflict(format!(
                "notification {} changed since version {}",
                notification.id, notification.audit.version
            ))),
            UpdateOutcome::Missing => Err(HeraldError::not_found("notification", &notification.id)),
        }
    }

    async fn get_notification(
        &self,
        scope: &TenantScope,
        id: &str,
    ) -> Result<Notification, HeraldError> {
        queries::notifications::get_notification(self.db()?, scope, id)
            .await?
            .ok_or_else(|| HeraldError::not_found("notification", id))
    }

    async fn get_notifications(
        &self,
        scope: &TenantScope,
        ids: &[String],
    ) -> Result<Vec<Notification>, HeraldError> {
        queries::notifications::get_notifications(self.db()?, scope, ids).await
    }

    async fn get_notification_by_external_id(
        &self,
        scope: &TenantScope,
        external_id: &str,
    ) -> Result<Notification, HeraldError> {
        queries::notifications::get_by_external_id(self.db()?, scope, external_id)
            .await?
            .ok_or_else(|| HeraldError::not_found("notification", external_id))
    }

    async fn search_notifications(
        &self,
        scope: &TenantScope,
        query: &str,
        page: Page,
    ) -> Result<Vec<Notification>, HeraldError> {
        queries::notifications::search_notifications(self.db()?, scope, query, page).await
    }

    // --- Notification statuses ---

    async fn save_status(
        &self,
        scope: &TenantScope,
        status: &NotificationStatus,
    ) -> Result<(), HeraldError> {
        ensure_tenant(scope, &status.audit.tenant_id, "status")?;
        let inserted = queries::statuses::insert_status(self.db()?, status).await?;
        if !inserted {
            debug!(status_id = %status.id, "status already recorded");
        }
        Ok(())
    }

    async fn advance_status_mirror(
        &self,
        scope: &TenantScope,
        status: &NotificationStatus,
    ) -> Result<(), HeraldError> {
        if queries::notifications::advance_status_mirror(self.db()?, scope, status).await? {
            Ok(())
        } else {
            Err(HeraldError::not_found(
                "notification",
                &status.notification_id,
            ))
        }
    }

    async fn get_status(
        &self,
        scope: &TenantScope,
        id: &str,
    ) -> Result<NotificationStatus, HeraldError> {
        queries::statuses::get_status(self.db()?, scope, id)
            .await?
            .ok_or_else(|| HeraldError::not_found("status", id))
    }

    async fn get_statuses(
        &self,
        scope: &TenantScope,
        ids: &[String],
    ) -> Result<Vec<NotificationStatus>, HeraldError> {
        queries::statuses::get_statuses(self.db()?, scope, ids).await
    }

    async fn get_statuses_by_notification(
        &self,
        scope: &TenantScope,
        notification_id: &str,
    ) -> Result<Vec<NotificationStatus>, HeraldError> {
        queries::statuses::get_by_notification(self.db()?, scope, notification_id).await
    }
}
