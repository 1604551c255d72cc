//! Ensure-created bootstrap for a finalized model.

use super::{DbError, DbResult};
use crate::schema::{quote_ident, EntitySchema, Model};
use log::{error, info};
use rusqlite::Connection;
use std::time::Instant;

/// Creates missing tables for every kind in `model` and verifies existing
/// ones carry all model columns.
///
/// Tables are created in one transaction; nothing is created if any kind
/// fails. Existing tables are never altered.
///
/// # Errors
/// - `SchemaMismatch` when an existing table lacks a model column, e.g. a
///   table created before its kind became auditable.
/// - `Sqlite` for any storage failure.
pub fn ensure_created(conn: &mut Connection, model: &Model) -> DbResult<()> {
    let started_at = Instant::now();
    match ensure_tables(conn, model) {
        Ok(created) => {
            info!(
                "event=ensure_created module=db status=ok tables_created={} duration_ms={}",
                created,
                started_at.elapsed().as_millis()
            );
            Ok(())
        }
        Err(err) => {
            error!(
                "event=ensure_created module=db status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn ensure_tables(conn: &mut Connection, model: &Model) -> DbResult<usize> {
    let tx = conn.transaction()?;
    let mut created = 0;
    for schema in model.entities() {
        if table_exists(&tx, schema.kind)? {
            verify_columns(&tx, schema)?;
        } else {
            tx.execute_batch(&schema.create_table_sql())?;
            created += 1;
        }
    }
    tx.commit()?;
    Ok(created)
}

fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )
}

fn verify_columns(conn: &Connection, schema: &EntitySchema) -> DbResult<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", quote_ident(schema.kind)))?;
    let existing = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    for column in schema.column_names() {
        if !existing.iter().any(|name| name.eq_ignore_ascii_case(column)) {
            return Err(DbError::SchemaMismatch {
                table: schema.kind,
                missing_column: column,
            });
        }
    }
    Ok(())
}
