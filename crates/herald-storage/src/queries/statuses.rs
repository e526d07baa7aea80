// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only status history.

use herald_core::{HeraldError, NotificationStatus, TenantScope};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

use super::{AUDIT_COLUMNS, enum_column, json_column, json_text, non_empty, placeholders, read_audit};
use crate::database::{Database, map_tr_err};

fn select_sql(filter: &str) -> String {
    format!(
        "SELECT id, notification_id, state, status, transient_id, external_id, extra,
             {AUDIT_COLUMNS}
         FROM notification_status WHERE tenant_id = ?1 AND deleted_at IS NULL AND {filter}"
    )
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<NotificationStatus> {
    Ok(NotificationStatus {
        id: row.get(0)?,
        notification_id: row.get(1)?,
        state: enum_column(row, 2)?,
        status: enum_column(row, 3)?,
        transient_id: row.get(4)?,
        external_id: row.get(5)?,
        extra: json_column(row, 6)?,
        audit: read_audit(row, 7)?,
    })
}

/// Append a status row. Replaying an id that already exists is a no-op;
/// returns whether a row was written.
pub async fn insert_status(db: &Database, status: &NotificationStatus) -> Result<bool, HeraldError> {
    let s = status.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO notification_status (id, notification_id, state, status,
                     transient_id, external_id, extra,
                     tenant_id, partition_id, access_id, created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    s.id,
                    s.notification_id,
                    s.state.to_string(),
                    s.status.to_string(),
                    non_empty(&s.transient_id),
                    non_empty(&s.external_id),
                    json_text(&s.extra),
                    s.audit.tenant_id,
                    s.audit.partition_id,
                    s.audit.access_id,
                    s.audit.created_at,
                    s.audit.updated_at,
                    s.audit.version,
                ],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_status(
    db: &Database,
    scope: &TenantScope,
    id: &str,
) -> Result<Option<NotificationStatus>, HeraldError> {
    let tenant = scope.tenant_id.clone();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<NotificationStatus>, rusqlite::Error> {
            conn.query_row(&select_sql("id = ?2"), params![tenant, id], from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_statuses(
    db: &Database,
    scope: &TenantScope,
    ids: &[String],
) -> Result<Vec<NotificationStatus>, HeraldError> {
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
        .call(move |conn| -> Result<Vec<NotificationStatus>, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Full history of one notification, oldest first.
pub async fn get_by_notification(
    db: &Database,
    scope: &TenantScope,
    notification_id: &str,
) -> Result<Vec<NotificationStatus>, HeraldError> {
    let tenant = scope.tenant_id.clone();
    let notification_id = notification_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<NotificationStatus>, rusqlite::Error> {
            let mut stmt =
                conn.prepare(&select_sql("notification_id = ?2 ORDER BY created_at, id"))?;
            let rows = stmt.query_map(params![tenant, notification_id], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
