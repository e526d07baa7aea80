// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template CRUD operations.

use herald_core::{HeraldError, Page, Template, TenantScope};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

use super::{
    AUDIT_COLUMNS, is_constraint_violation, json_column, json_text, like_pattern, placeholders,
    read_audit,
};
use crate::database::{Database, map_tr_err};

fn select_sql(filter: &str) -> String {
    format!(
        "SELECT id, name, extra, {AUDIT_COLUMNS}
         FROM templates WHERE tenant_id = ?1 AND deleted_at IS NULL AND {filter}"
    )
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Template> {
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        extra: json_column(row, 2)?,
        audit: read_audit(row, 3)?,
    })
}

/// Insert a template, or update name and extra when the id exists.
pub async fn save_template(db: &Database, template: &Template) -> Result<Template, HeraldError> {
    let t = template.clone();
    db.connection()
        .call(move |conn| -> Result<Result<Template, HeraldError>, rusqlite::Error> {
            let res = conn.execute(
                "INSERT INTO templates (id, name, extra, tenant_id, partition_id, access_id,
                     created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     extra = excluded.extra,
                     updated_at = excluded.updated_at,
                     deleted_at = NULL,
                     version = templates.version + 1
                 WHERE templates.tenant_id = excluded.tenant_id",
                params![
                    t.id,
                    t.name,
                    json_text(&t.extra),
                    t.audit.tenant_id,
                    t.audit.partition_id,
                    t.audit.access_id,
                    t.audit.created_at,
                    t.audit.updated_at,
                    t.audit.version,
                ],
            );
            match res {
                Ok(_) => {}
                Err(e) if is_constraint_violation(&e) => {
                    return Ok(Err(HeraldError::Conflict(format!(
                        "template name `{}` already exists",
                        t.name
                    ))));
                }
                Err(e) => return Err(e),
            }
            let stored = conn
                .query_row(
                    &select_sql("id = ?2"),
                    params![t.audit.tenant_id, t.id],
                    from_row,
                )
                .optional()?;
            Ok(stored.ok_or_else(|| HeraldError::Conflict(format!("template id {} is taken", t.id))))
        })
        .await
        .map_err(map_tr_err)?
}

pub async fn get_template(
    db: &Database,
    scope: &TenantScope,
    id: &str,
) -> Result<Option<Template>, HeraldError> {
    let tenant = scope.tenant_id.clone();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Template>, rusqlite::Error> {
            conn.query_row(&select_sql("id = ?2"), params![tenant, id], from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_template_by_name(
    db: &Database,
    scope: &TenantScope,
    name: &str,
) -> Result<Option<Template>, HeraldError> {
    let tenant = scope.tenant_id.clone();
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Template>, rusqlite::Error> {
            conn.query_row(&select_sql("name = ?2"), params![tenant, name], from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_templates(
    db: &Database,
    scope: &TenantScope,
    ids: &[String],
) -> Result<Vec<Template>, HeraldError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut args = vec![scope.tenant_id.clone()];
    args.extend(ids.iter().cloned());
    let sql = select_sql(&format!("id IN ({}) ORDER BY name", placeholders(2, ids.len())));
    db.connection()
        .call(move |conn| -> Result<Vec<Template>, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Templates whose name contains `query`, ordered by name.
pub async fn search_templates(
    db: &Database,
    scope: &TenantScope,
    query: &str,
    page: Page,
) -> Result<Vec<Template>, HeraldError> {
    let tenant = scope.tenant_id.clone();
    let pattern = like_pattern(query.trim());
    let limit = i64::from(page.limit());
    let offset = page.offset() as i64;
    db.connection()
        .call(move |conn| -> Result<Vec<Template>, rusqlite::Error> {
            let mut stmt = conn.prepare(&select_sql(
                "name LIKE ?2 ESCAPE '\\' ORDER BY name LIMIT ?3 OFFSET ?4",
            ))?;
            let rows = stmt.query_map(params![tenant, pattern, limit, offset], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
