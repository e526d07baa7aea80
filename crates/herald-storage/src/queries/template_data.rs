// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template data CRUD operations.

use herald_core::{HeraldError, TemplateData, TenantScope};
use rusqlite::{Row, params, params_from_iter};

use super::{AUDIT_COLUMNS, placeholders, read_audit};
use crate::database::{Database, map_tr_err};

const ORDER: &str = "ORDER BY template_id, language_id, type";

fn select_sql(filter: &str) -> String {
    format!(
        "SELECT id, template_id, language_id, type, detail, {AUDIT_COLUMNS}
         FROM template_data WHERE tenant_id = ?1 AND deleted_at IS NULL AND {filter}"
    )
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<TemplateData> {
    Ok(TemplateData {
        id: row.get(0)?,
        template_id: row.get(1)?,
        language_id: row.get(2)?,
        kind: row.get(3)?,
        detail: row.get(4)?,
        audit: read_audit(row, 5)?,
    })
}

/// Insert a row, or replace `detail` for an existing
/// `(template_id, language_id, type)` triple. Returns the stored row.
pub async fn save_template_data(
    db: &Database,
    data: &TemplateData,
) -> Result<TemplateData, HeraldError> {
    let d = data.clone();
    db.connection()
        .call(move |conn| -> Result<TemplateData, rusqlite::Error> {
            conn.execute(
                "INSERT INTO template_data (id, template_id, language_id, type, detail,
                     tenant_id, partition_id, access_id, created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(template_id, language_id, type) DO UPDATE SET
                     detail = excluded.detail,
                     updated_at = excluded.updated_at,
                     deleted_at = NULL,
                     version = template_data.version + 1
                 WHERE template_data.tenant_id = excluded.tenant_id",
                params![
                    d.id,
                    d.template_id,
                    d.language_id,
                    d.kind,
                    d.detail,
                    d.audit.tenant_id,
                    d.audit.partition_id,
                    d.audit.access_id,
                    d.audit.created_at,
                    d.audit.updated_at,
                    d.audit.version,
                ],
            )?;
            conn.query_row(
                &select_sql("template_id = ?2 AND language_id = ?3 AND type = ?4"),
                params![d.audit.tenant_id, d.template_id, d.language_id, d.kind],
                from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

async fn select_list(
    db: &Database,
    sql: String,
    args: Vec<String>,
) -> Result<Vec<TemplateData>, HeraldError> {
    db.connection()
        .call(move |conn| -> Result<Vec<TemplateData>, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_template_data(
    db: &Database,
    scope: &TenantScope,
    ids: &[String],
) -> Result<Vec<TemplateData>, HeraldError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut args = vec![scope.tenant_id.clone()];
    args.extend(ids.iter().cloned());
    let sql = select_sql(&format!("id IN ({}) {ORDER}", placeholders(2, ids.len())));
    select_list(db, sql, args).await
}

/// All data rows for the given templates, across languages.
pub async fn get_by_template_ids(
    db: &Database,
    scope: &TenantScope,
    template_ids: &[String],
) -> Result<Vec<TemplateData>, HeraldError> {
    if template_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut args = vec![scope.tenant_id.clone()];
    args.extend(template_ids.iter().cloned());
    let sql = select_sql(&format!(
        "template_id IN ({}) {ORDER}",
        placeholders(2, template_ids.len())
    ));
    select_list(db, sql, args).await
}

/// Data rows for the given templates in one language.
pub async fn get_by_language(
    db: &Database,
    scope: &TenantScope,
    language_id: &str,
    template_ids: &[String],
) -> Result<Vec<TemplateData>, HeraldError> {
    if template_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut args = vec![scope.tenant_id.clone(), language_id.to_string()];
    args.extend(template_ids.iter().cloned());
    let sql = select_sql(&format!(
        "language_id = ?2 AND template_id IN ({}) {ORDER}",
        placeholders(3, template_ids.len())
    ));
    select_list(db, sql, args).await
}
