// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification persistence: upsert, optimistic update, finders, search, and
//! the status mirror.

use herald_core::{
    HeraldError, Notification, NotificationStatus, Page, Party, TenantScope, now_timestamp,
};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

use super::{
    AUDIT_COLUMNS, enum_column, json_column, json_text, like_pattern, non_empty, placeholders,
    read_audit,
};
use crate::database::{Database, map_tr_err};

const COLUMNS: &str = "id, parent_id, transient_id,
    sender_profile_type, sender_profile_id, sender_contact_id,
    recipient_profile_type, recipient_profile_id, recipient_contact_id,
    route_id, notification_type, language_id, template_id, payload, message,
    out_bound, released_at, priority, state, external_id, status_id";

fn select_sql(filter: &str) -> String {
    format!(
        "SELECT {COLUMNS}, {AUDIT_COLUMNS}
         FROM notifications WHERE tenant_id = ?1 AND deleted_at IS NULL AND {filter}"
    )
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        transient_id: row.get(2)?,
        sender: Party {
            profile_type: row.get(3)?,
            profile_id: row.get(4)?,
            contact_id: row.get(5)?,
        },
        recipient: Party {
            profile_type: row.get(6)?,
            profile_id: row.get(7)?,
            contact_id: row.get(8)?,
        },
        route_id: row.get(9)?,
        notification_type: enum_column(row, 10)?,
        language_id: row.get(11)?,
        template_id: row.get(12)?,
        payload: json_column(row, 13)?,
        message: row.get(14)?,
        out_bound: row.get(15)?,
        released_at: row.get(16)?,
        priority: row.get(17)?,
        state: enum_column(row, 18)?,
        external_id: row.get(19)?,
        status_id: row.get(20)?,
        audit: read_audit(row, 21)?,
    })
}

fn read_by_id(
    conn: &rusqlite::Connection,
    tenant: &str,
    id: &str,
) -> rusqlite::Result<Option<Notification>> {
    conn.query_row(&select_sql("id = ?2"), params![tenant, id], from_row)
        .optional()
}

/// Insert a notification, or update its whitelisted fields when the id
/// already exists.
///
/// Whitelist: route, type, language, template, payload, message,
/// released_at, priority, external and transient ids. Identity, parties,
/// direction, and the status mirror are never touched. Optional
/// references are only overwritten by non-null values, and the row
/// (including its version) is left alone when nothing differs.
pub async fn upsert_notification(
    db: &Database,
    notification: &Notification,
) -> Result<Notification, HeraldError> {
    let n = notification.clone();
    let stored = db
        .connection()
        .call(move |conn| -> Result<Option<Notification>, rusqlite::Error> {
            conn.execute(
                "INSERT INTO notifications (id, parent_id, transient_id,
                     sender_profile_type, sender_profile_id, sender_contact_id,
                     recipient_profile_type, recipient_profile_id, recipient_contact_id,
                     route_id, notification_type, language_id, template_id, payload, message,
                     out_bound, released_at, priority, state, external_id, status_id,
                     tenant_id, partition_id, access_id, created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                     ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)
                 ON CONFLICT(id) DO UPDATE SET
                     transient_id = COALESCE(excluded.transient_id, notifications.transient_id),
                     route_id = COALESCE(excluded.route_id, notifications.route_id),
                     notification_type = excluded.notification_type,
                     language_id = excluded.language_id,
                     template_id = excluded.template_id,
                     payload = excluded.payload,
                     message = excluded.message,
                     released_at = COALESCE(excluded.released_at, notifications.released_at),
                     priority = excluded.priority,
                     external_id = COALESCE(excluded.external_id, notifications.external_id),
                     updated_at = excluded.updated_at,
                     deleted_at = NULL,
                     version = notifications.version + 1
                 WHERE notifications.tenant_id = excluded.tenant_id AND (
                     notifications.transient_id IS NOT COALESCE(excluded.transient_id, notifications.transient_id)
                     OR notifications.route_id IS NOT COALESCE(excluded.route_id, notifications.route_id)
                     OR notifications.notification_type IS NOT excluded.notification_type
                     OR notifications.language_id IS NOT excluded.language_id
                     OR notifications.template_id IS NOT excluded.template_id
                     OR notifications.payload IS NOT excluded.payload
                     OR notifications.message IS NOT excluded.message
                     OR notifications.released_at IS NOT COALESCE(excluded.released_at, notifications.released_at)
                     OR notifications.priority IS NOT excluded.priority
                     OR notifications.external_id IS NOT COALESCE(excluded.external_id, notifications.external_id)
                     OR notifications.deleted_at IS NOT NULL)",
                params![
                    n.id,
                    non_empty(&n.parent_id),
                    non_empty(&n.transient_id),
                    n.sender.profile_type,
                    n.sender.profile_id,
                    n.sender.contact_id,
                    n.recipient.profile_type,
                    n.recipient.profile_id,
                    n.recipient.contact_id,
                    non_empty(&n.route_id),
                    n.notification_type.to_string(),
                    n.language_id,
                    non_empty(&n.template_id),
                    json_text(&n.payload),
                    n.message,
                    n.out_bound,
                    non_empty(&n.released_at),
                    n.priority,
                    n.state.to_string(),
                    non_empty(&n.external_id),
                    non_empty(&n.status_id),
                    n.audit.tenant_id,
                    n.audit.partition_id,
                    n.audit.access_id,
                    n.audit.created_at,
                    n.audit.updated_at,
                    n.audit.version,
                ],
            )?;
            read_by_id(conn, &n.audit.tenant_id, &n.id)
        })
        .await
        .map_err(map_tr_err)?;

    stored.ok_or_else(|| {
        HeraldError::Conflict(format!("notification id {} is taken", notification.id))
    })
}

/// Outcome of an optimistic update attempt.
pub enum UpdateOutcome {
    Updated(Notification),
    Stale,
    Missing,
}

/// Write the whitelisted fields if the stored version still matches.
pub async fn update_notification(
    db: &Database,
    scope: &TenantScope,
    notification: &Notification,
) -> Result<UpdateOutcome, HeraldError> {
    let n = notification.clone();
    let tenant = scope.tenant_id.clone();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<UpdateOutcome, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE notifications SET
                     transient_id = ?1,
                     route_id = ?2,
                     notification_type = ?3,
                     language_id = ?4,
                     template_id = ?5,
                     payload = ?6,
                     message = ?7,
                     released_at = ?8,
                     priority = ?9,
                     external_id = ?10,
                     updated_at = ?11,
                     version = version + 1
                 WHERE tenant_id = ?12 AND id = ?13 AND version = ?14 AND deleted_at IS NULL",
                params![
                    non_empty(&n.transient_id),
                    non_empty(&n.route_id),
                    n.notification_type.to_string(),
                    n.language_id,
                    non_empty(&n.template_id),
                    json_text(&n.payload),
                    n.message,
                    non_empty(&n.released_at),
                    n.priority,
                    non_empty(&n.external_id),
                    now,
                    tenant,
                    n.id,
                    n.audit.version,
                ],
            )?;
            match read_by_id(conn, &tenant, &n.id)? {
                Some(stored) if changed == 1 => Ok(UpdateOutcome::Updated(stored)),
                Some(_) => Ok(UpdateOutcome::Stale),
                None => Ok(UpdateOutcome::Missing),
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_notification(
    db: &Database,
    scope: &TenantScope,
    id: &str,
) -> Result<Option<Notification>, HeraldError> {
    let tenant = scope.tenant_id.clone();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Notification>, rusqlite::Error> {
            read_by_id(conn, &tenant, &id)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_notifications(
    db: &Database,
    scope: &TenantScope,
    ids: &[String],
) -> Result<Vec<Notification>, HeraldError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut args = vec![scope.tenant_id.clone()];
    args.extend(ids.iter().cloned());
    let sql = select_sql(&format!(
        "id IN ({}) ORDER BY created_at, id",
        placeholders(2, ids.len())
    ));
    db.connection()
        .call(move |conn| -> Result<Vec<Notification>, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Newest notification carrying `external_id`.
pub async fn get_by_external_id(
    db: &Database,
    scope: &TenantScope,
    external_id: &str,
) -> Result<Option<Notification>, HeraldError> {
    let tenant = scope.tenant_id.clone();
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Notification>, rusqlite::Error> {
            conn.query_row(
                &select_sql("external_id = ?2 ORDER BY created_at DESC, id DESC LIMIT 1"),
                params![tenant, external_id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Substring search over id, external id, and transient id, newest first.
/// An empty query lists everything.
pub async fn search_notifications(
    db: &Database,
    scope: &TenantScope,
    query: &str,
    page: Page,
) -> Result<Vec<Notification>, HeraldError> {
    let tenant = scope.tenant_id.clone();
    let query = query.trim().to_string();
    let pattern = like_pattern(&query);
    let limit = i64::from(page.limit());
    let offset = page.offset() as i64;
    db.connection()
        .call(move |conn| -> Result<Vec<Notification>, rusqlite::Error> {
            let mut stmt = conn.prepare(&select_sql(
                "(?2 = '' OR id LIKE ?3 ESCAPE '\\' OR external_id LIKE ?3 ESCAPE '\\'
                     OR transient_id LIKE ?3 ESCAPE '\\')
                 ORDER BY created_at DESC, id DESC LIMIT ?4 OFFSET ?5",
            ))?;
            let rows = stmt.query_map(params![tenant, query, pattern, limit, offset], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Fold a status row into `status_id`, `state`, and `transient_id` with one
/// focused update.
///
/// `status_id` only moves forward in id order. `state` follows it, except that
/// a terminal state closes an open notification whatever its id, and an open
/// state never reopens a closed one. The transient id is copied only when the
/// notification has none. Returns `false` when the notification does not exist.
pub async fn advance_status_mirror(
    db: &Database,
    scope: &TenantScope,
    status: &NotificationStatus,
) -> Result<bool, HeraldError> {
    let tenant = scope.tenant_id.clone();
    let status_id = status.id.clone();
    let state = status.state.to_string();
    let transient_id = status.transient_id.clone().filter(|s| !s.is_empty());
    let notification_id = status.notification_id.clone();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE notifications SET
                     state = CASE
                         WHEN state IN ('INACTIVE', 'DELETED')
                              AND ?2 NOT IN ('INACTIVE', 'DELETED') THEN state
                         WHEN ?2 IN ('INACTIVE', 'DELETED')
                              AND state NOT IN ('INACTIVE', 'DELETED') THEN ?2
                         WHEN status_id IS NOT NULL AND status_id > ?1 THEN state
                         ELSE ?2 END,
                     status_id = CASE
                         WHEN status_id IS NOT NULL AND status_id > ?1 THEN status_id
                         ELSE ?1 END,
                     transient_id = CASE
                         WHEN (transient_id IS NULL OR transient_id = '') AND ?3 IS NOT NULL THEN ?3
                         ELSE transient_id END,
                     updated_at = ?4,
                     version = version + 1
                 WHERE tenant_id = ?5 AND id = ?6",
                params![status_id, state, transient_id, now, tenant, notification_id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}
