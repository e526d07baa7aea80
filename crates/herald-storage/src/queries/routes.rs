// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route CRUD operations and the candidate matcher.

use herald_core::{HeraldError, NotificationType, Route, RouteMode, TenantScope};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

use super::{AUDIT_COLUMNS, enum_column, placeholders, read_audit};
use crate::database::{Database, map_tr_err};

/// Creation order with id as tie-break keeps candidate lists stable.
const ORDER: &str = "ORDER BY created_at, id";

fn select_sql(filter: &str) -> String {
    format!(
        "SELECT id, name, description, route_type, mode, uri, counter_id, {AUDIT_COLUMNS}
         FROM routes WHERE tenant_id = ?1 AND deleted_at IS NULL AND {filter}"
    )
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Route> {
    Ok(Route {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        route_type: enum_column(row, 3)?,
        mode: enum_column(row, 4)?,
        uri: row.get(5)?,
        counter_id: row.get(6)?,
        audit: read_audit(row, 7)?,
    })
}

/// Insert a route, or update its mutable fields when the id exists.
pub async fn save_route(db: &Database, route: &Route) -> Result<Route, HeraldError> {
    let r = route.clone();
    db.connection()
        .call(move |conn| -> Result<Option<Route>, rusqlite::Error> {
            conn.execute(
                "INSERT INTO routes (id, name, description, route_type, mode, uri, counter_id,
                     tenant_id, partition_id, access_id, created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     description = excluded.description,
                     route_type = excluded.route_type,
                     mode = excluded.mode,
                     uri = excluded.uri,
                     counter_id = excluded.counter_id,
                     updated_at = excluded.updated_at,
                     deleted_at = NULL,
                     version = routes.version + 1
                 WHERE routes.tenant_id = excluded.tenant_id",
                params![
                    r.id,
                    r.name,
                    r.description,
                    r.route_type.to_string(),
                    r.mode.to_string(),
                    r.uri,
                    r.counter_id,
                    r.audit.tenant_id,
                    r.audit.partition_id,
                    r.audit.access_id,
                    r.audit.created_at,
                    r.audit.updated_at,
                    r.audit.version,
                ],
            )?;
            conn.query_row(&select_sql("id = ?2"), params![r.audit.tenant_id, r.id], from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)?
        .ok_or_else(|| HeraldError::Conflict(format!("route id {} is taken", route.id)))
}

pub async fn get_route(
    db: &Database,
    scope: &TenantScope,
    id: &str,
) -> Result<Option<Route>, HeraldError> {
    let tenant = scope.tenant_id.clone();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Route>, rusqlite::Error> {
            conn.query_row(&select_sql("id = ?2"), params![tenant, id], from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

async fn select_list(
    db: &Database,
    sql: String,
    args: Vec<String>,
) -> Result<Vec<Route>, HeraldError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Route>, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_routes(
    db: &Database,
    scope: &TenantScope,
    ids: &[String],
) -> Result<Vec<Route>, HeraldError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut args = vec![scope.tenant_id.clone()];
    args.extend(ids.iter().cloned());
    let sql = select_sql(&format!("id IN ({}) {ORDER}", placeholders(2, ids.len())));
    select_list(db, sql, args).await
}

pub async fn get_routes_by_mode(
    db: &Database,
    scope: &TenantScope,
    mode: RouteMode,
) -> Result<Vec<Route>, HeraldError> {
    let args = vec![scope.tenant_id.clone(), mode.to_string()];
    select_list(db, select_sql(&format!("mode = ?2 {ORDER}")), args).await
}

/// Matcher: `partition_id = ? AND route_type IN ('any', ?) AND mode IN (?, 'trx')`.
pub async fn get_routes_by_mode_type_partition(
    db: &Database,
    scope: &TenantScope,
    mode: RouteMode,
    route_type: NotificationType,
    partition_id: &str,
) -> Result<Vec<Route>, HeraldError> {
    let args = vec![
        scope.tenant_id.clone(),
        partition_id.to_string(),
        route_type.to_string(),
        mode.to_string(),
    ];
    let sql = select_sql(&format!(
        "partition_id = ?2 AND route_type IN ('any', ?3) AND mode IN (?4, 'trx') {ORDER}"
    ));
    select_list(db, sql, args).await
}

/// Soft-delete a route. Returns `false` when no live row matched.
pub async fn delete_route(db: &Database, scope: &TenantScope, id: &str) -> Result<bool, HeraldError> {
    let tenant = scope.tenant_id.clone();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE routes SET
                     deleted_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     version = version + 1
                 WHERE tenant_id = ?1 AND id = ?2 AND deleted_at IS NULL",
                params![tenant, id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}
