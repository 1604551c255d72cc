//! Connection bootstrap for file and in-memory stores.
//!
//! # Invariants
//! - Returned connections have `foreign_keys` set as configured.
//! - Returned connections have the configured busy timeout.

use super::DbResult;
use crate::config::{OpenMode, StoreConfig, StoreLocation};
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::time::Instant;

/// Opens and configures a connection for `config`.
///
/// # Side effects
/// - Creates the database file in `ReadWriteCreate` mode.
/// - Emits `store_open` logging events with duration and status.
pub fn open_store(config: &StoreConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let location = config.location_label();
    let mode = config.mode.as_str();
    info!("event=store_open module=db status=start location={location} mode={mode}");

    let opened = match &config.location {
        StoreLocation::Memory => Connection::open_in_memory(),
        StoreLocation::File(path) => Connection::open_with_flags(path, open_flags(config.mode)),
    };
    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=store_open module=db status=error location={} mode={} duration_ms={} error_code=store_open_failed error={}",
                location,
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match configure_connection(&conn, config) {
        Ok(()) => {
            info!(
                "event=store_open module=db status=ok location={} mode={} duration_ms={}",
                location,
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=store_open module=db status=error location={} mode={} duration_ms={} error_code=store_configure_failed error={}",
                location,
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

fn open_flags(mode: OpenMode) -> OpenFlags {
    let access = match mode {
        OpenMode::ReadWriteCreate => {
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        }
        OpenMode::ReadWrite => OpenFlags::SQLITE_OPEN_READ_WRITE,
        OpenMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
    };
    access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
}

fn configure_connection(conn: &Connection, config: &StoreConfig) -> rusqlite::Result<()> {
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    conn.busy_timeout(config.busy_timeout)?;
    Ok(())
}
