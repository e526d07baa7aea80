// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed, tenant-scoped query functions, one module per entity.

pub mod languages;
pub mod notifications;
pub mod routes;
pub mod statuses;
pub mod template_data;
pub mod templates;

use std::str::FromStr;

use herald_core::{Audit, JsonMap};
use rusqlite::Row;
use rusqlite::types::Type;

/// Audit columns, in the order [`read_audit`] expects them.
pub(crate) const AUDIT_COLUMNS: &str =
    "tenant_id, partition_id, access_id, created_at, updated_at, deleted_at, version";

/// Read the audit envelope starting at column `start`.
pub(crate) fn read_audit(row: &Row<'_>, start: usize) -> rusqlite::Result<Audit> {
    Ok(Audit {
        tenant_id: row.get(start)?,
        partition_id: row.get(start + 1)?,
        access_id: row.get(start + 2)?,
        created_at: row.get(start + 3)?,
        updated_at: row.get(start + 4)?,
        deleted_at: row.get(start + 5)?,
        version: row.get(start + 6)?,
    })
}

/// `?{start}, ?{start+1}, …` for `count` parameters.
pub(crate) fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn json_text(map: &JsonMap) -> String {
    serde_json::Value::Object(map.clone()).to_string()
}

/// Parse a JSON object column.
pub(crate) fn json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<JsonMap> {
    let text: String = row.get(idx)?;
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Ok(JsonMap::new()),
        Err(e) => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::new(e),
        )),
    }
}

/// Parse a text column through `FromStr` (used for the strum enums).
pub(crate) fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Treat empty strings as NULL.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

pub(crate) fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Escape `%`, `_` and `\` for use inside a `LIKE … ESCAPE '\'` pattern.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut out = String::with_capacity(query.len() + 2);
    out.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_lists() {
        assert_eq!(placeholders(2, 3), "?2, ?3, ?4");
        assert_eq!(placeholders(1, 0), "");
    }

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(like_pattern("ab"), "%ab%");
        assert_eq!(like_pattern("a_b%"), "%a\\_b\\%%");
    }
}
