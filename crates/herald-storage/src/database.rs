// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All queries are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::Path;

use herald_core::HeraldError;
use tracing::{debug, info};

use crate::migrations;

const PRAGMAS: &str = "PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;";

/// Convert a tokio-rusqlite error into [`HeraldError::Storage`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> HeraldError {
    HeraldError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the single writer connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path`, apply migrations,
    /// and configure the connection.
    pub async fn open(path: &str) -> Result<Self, HeraldError> {
        migrate(path).await?;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), HeraldError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(map_tr_err)
    }

    pub async fn checkpoint(&self) -> Result<(), HeraldError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Apply pending migrations on a short-lived blocking connection.
///
/// Runs before the writer connection exists, so it never competes with it.
pub async fn migrate(path: &str) -> Result<usize, HeraldError> {
    let path = path.to_string();
    let applied = tokio::task::spawn_blocking(move || -> Result<usize, HeraldError> {
        if let Some(parent) = Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| HeraldError::Storage {
                    source: Box::new(e),
                })?;
            }
        }
        let mut conn = rusqlite::Connection::open(&path).map_err(|e| HeraldError::Storage {
            source: Box::new(e),
        })?;
        migrations::run_migrations(&mut conn)
    })
    .await
    .map_err(|e| HeraldError::Internal(format!("migration task failed: {e}")))??;

    if applied > 0 {
        info!(applied, "database migrations applied");
    }
    Ok(applied)
}
