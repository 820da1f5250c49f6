//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections from a `StoreConfig`.
//! - Configure connection pragmas and statement echo.
//! - Bootstrap the entity schema before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::DbResult;
use crate::config::{StoreConfig, StoreLocation};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

pub(crate) const SQL_LOG_TARGET: &str = "ormtour::sql";

/// Opens the store selected by `config` and applies all pending migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
/// - With `config.echo`, every statement run on the connection is logged.
pub fn open_connection(config: &StoreConfig) -> DbResult<Connection> {
    let location = config.parse_location()?;
    open_location(&location, config.echo, config.busy_timeout())
}

/// Opens a SQLite database file without statement echo.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_location(
        &StoreLocation::File(path.as_ref().to_path_buf()),
        false,
        StoreConfig::default().busy_timeout(),
    )
}

/// Opens a fresh in-memory SQLite database without statement echo.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_location(&StoreLocation::Memory, false, StoreConfig::default().busy_timeout())
}

fn open_location(
    location: &StoreLocation,
    echo: bool,
    busy_timeout: Duration,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = match location {
        StoreLocation::Memory => "memory",
        StoreLocation::File(_) => "file",
    };
    info!("event=db_open module=db status=start mode={mode} echo={echo}");

    let opened = match location {
        StoreLocation::Memory => Connection::open_in_memory(),
        StoreLocation::File(path) => Connection::open(path),
    };
    let mut conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, echo, busy_timeout) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(
    conn: &mut Connection,
    echo: bool,
    busy_timeout: Duration,
) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    if echo {
        conn.trace(Some(echo_statement));
    }
    apply_migrations(conn)?;
    Ok(())
}

fn echo_statement(sql: &str) {
    info!(target: SQL_LOG_TARGET, "{sql}");
}
