// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Language CRUD operations.

use herald_core::{HeraldError, Language, TenantScope};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

use super::{AUDIT_COLUMNS, placeholders, read_audit};
use crate::database::{Database, map_tr_err};

fn select_sql(filter: &str) -> String {
    format!(
        "SELECT id, code, name, description, {AUDIT_COLUMNS}
         FROM languages WHERE tenant_id = ?1 AND deleted_at IS NULL AND {filter}"
    )
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Language> {
    Ok(Language {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        audit: read_audit(row, 4)?,
    })
}

/// Insert a language.
pub async fn create_language(db: &Database, language: &Language) -> Result<(), HeraldError> {
    let l = language.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO languages (id, code, name, description, tenant_id, partition_id,
                     access_id, created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    l.id,
                    l.code,
                    l.name,
                    l.description,
                    l.audit.tenant_id,
                    l.audit.partition_id,
                    l.audit.access_id,
                    l.audit.created_at,
                    l.audit.updated_at,
                    l.audit.version,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

async fn get_one(
    db: &Database,
    scope: &TenantScope,
    filter: &'static str,
    value: &str,
) -> Result<Option<Language>, HeraldError> {
    let tenant = scope.tenant_id.clone();
    let value = value.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Language>, rusqlite::Error> {
            conn.query_row(&select_sql(filter), params![tenant, value], from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_language(
    db: &Database,
    scope: &TenantScope,
    id: &str,
) -> Result<Option<Language>, HeraldError> {
    get_one(db, scope, "id = ?2", id).await
}

pub async fn get_language_by_code(
    db: &Database,
    scope: &TenantScope,
    code: &str,
) -> Result<Option<Language>, HeraldError> {
    get_one(db, scope, "code = ?2", code).await
}

pub async fn get_language_by_name(
    db: &Database,
    scope: &TenantScope,
    name: &str,
) -> Result<Option<Language>, HeraldError> {
    get_one(db, scope, "name = ?2", name).await
}

pub async fn get_languages(
    db: &Database,
    scope: &TenantScope,
    ids: &[String],
) -> Result<Vec<Language>, HeraldError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut args = vec![scope.tenant_id.clone()];
    args.extend(ids.iter().cloned());
    let sql = select_sql(&format!("id IN ({}) ORDER BY code", placeholders(2, ids.len())));
    db.connection()
        .call(move |conn| -> Result<Vec<Language>, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Return the language for `code`, inserting a placeholder when it is new.
///
/// Concurrent first references race on the `(tenant_id, code)` unique
/// index; `INSERT OR IGNORE` lets the loser read the winner's row.
pub async fn get_or_create_language(
    db: &Database,
    scope: &TenantScope,
    code: &str,
) -> Result<Language, HeraldError> {
    let candidate = Language::new(
        scope,
        code,
        format!("Edit - {code}"),
        "Auto created partition language",
    );
    db.connection()
        .call(move |conn| -> Result<Language, rusqlite::Error> {
            let l = candidate;
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO languages (id, code, name, description, tenant_id,
                     partition_id, access_id, created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    l.id,
                    l.code,
                    l.name,
                    l.description,
                    l.audit.tenant_id,
                    l.audit.partition_id,
                    l.audit.access_id,
                    l.audit.created_at,
                    l.audit.updated_at,
                    l.audit.version,
                ],
            )?;
            if inserted == 1 {
                tracing::info!(code = %l.code, tenant = %l.audit.tenant_id, "auto-created language");
                return Ok(l);
            }
            // Read regardless of deleted_at so a soft-deleted code is reused.
            conn.query_row(
                &format!(
                    "SELECT id, code, name, description, {AUDIT_COLUMNS}
                     FROM languages WHERE tenant_id = ?1 AND code = ?2"
                ),
                params![l.audit.tenant_id, l.code],
                from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}
