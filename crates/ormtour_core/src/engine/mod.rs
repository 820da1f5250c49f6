//! Engine handle: owned configuration plus the source of store connections.
//!
//! # Responsibility
//! - Construct and bootstrap the store from an explicit `StoreConfig`.
//! - Hand out raw connections (`Conn`) and units of work (`Session`).
//!
//! # Invariants
//! - File stores open one configured connection per `Conn`/`Session`, so
//!   handles are independent and contention is resolved by SQLite locking.
//! - An in-memory store exists only inside its single connection; handles
//!   take turns on it and give up with `DbError::ConnectionBusy` once
//!   `busy_timeout` has passed.

mod conn;
mod session;

pub use conn::Conn;
pub use session::Session;

use crate::config::{StoreConfig, StoreLocation};
use crate::db::migrations::apply_migrations;
use crate::db::{open_connection, DbError, DbResult};
use crate::result::{ResultSet, Row};
use crate::schema::Metadata;
use crate::sql::{Executable, Statement};
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(5);

enum ConnectionSource {
    Shared(Mutex<Connection>),
    PerHandle,
}

/// Connection owned by one `Conn` or `Session` for its lifetime.
pub(crate) enum StoreHandle<'e> {
    Shared(MutexGuard<'e, Connection>),
    Owned(Connection),
}

impl Deref for StoreHandle<'_> {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Shared(guard) => &**guard,
            Self::Owned(conn) => conn,
        }
    }
}

impl DerefMut for StoreHandle<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Self::Shared(guard) => &mut **guard,
            Self::Owned(conn) => conn,
        }
    }
}

pub struct Engine {
    config: StoreConfig,
    location: StoreLocation,
    source: ConnectionSource,
}

impl Engine {
    /// Opens the configured store and bootstraps the entity schema.
    pub fn new(config: StoreConfig) -> DbResult<Self> {
        let location = config.parse_location()?;
        let conn = open_connection(&config)?;
        let source = match location {
            StoreLocation::Memory => ConnectionSource::Shared(Mutex::new(conn)),
            StoreLocation::File(_) => ConnectionSource::PerHandle,
        };
        Ok(Self {
            config,
            location,
            source,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Raw "commit as you go" connection.
    pub fn connect(&self) -> DbResult<Conn<'_>> {
        Ok(Conn::new(self.acquire()?, self.config.future))
    }

    /// Opens a unit of work; see `Session`.
    pub fn open_session(&self) -> DbResult<Session<'_>> {
        Session::begin(self.acquire()?)
    }

    /// Re-runs the entity schema bootstrap. Idempotent.
    pub fn bootstrap(&self) -> DbResult<()> {
        let mut conn = self.acquire()?;
        apply_migrations(&mut conn)
    }

    /// Emits DDL for caller-declared tables (`CREATE TABLE IF NOT EXISTS`).
    pub fn create_all(&self, metadata: &Metadata) -> DbResult<()> {
        let conn = self.acquire()?;
        metadata.create_all(&conn)
    }

    fn acquire(&self) -> DbResult<StoreHandle<'_>> {
        match &self.source {
            ConnectionSource::Shared(conn) => {
                wait_for(conn, self.config.busy_timeout()).map(StoreHandle::Shared)
            }
            ConnectionSource::PerHandle => Ok(StoreHandle::Owned(open_connection(&self.config)?)),
        }
    }
}

fn wait_for(conn: &Mutex<Connection>, timeout: Duration) -> DbResult<MutexGuard<'_, Connection>> {
    let started_at = Instant::now();
    loop {
        match conn.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::Poisoned(_)) => return Err(DbError::ConnectionPoisoned),
            Err(TryLockError::WouldBlock) => {
                let waited = started_at.elapsed();
                if waited >= timeout {
                    warn!(
                        "event=connection_acquire module=engine status=error error_code=connection_busy waited_ms={}",
                        waited.as_millis()
                    );
                    return Err(DbError::ConnectionBusy {
                        waited_ms: waited.as_millis(),
                    });
                }
                std::thread::sleep(LOCK_RETRY_INTERVAL.min(timeout - waited));
            }
        }
    }
}

/// Compiles and runs one statement, materializing every row.
pub(crate) fn run_statement<S>(conn: &Connection, statement: &S) -> DbResult<ResultSet>
where
    S: Executable + ?Sized,
{
    let statement = statement.compile()?;
    run_compiled(conn, &statement)
}

pub(crate) fn run_compiled(conn: &Connection, statement: &Statement) -> DbResult<ResultSet> {
    debug!(
        "event=statement_run module=engine status=start params={}",
        statement.params().len()
    );
    let mut prepared = conn.prepare(statement.sql())?;
    let names = statement.params().prefixed_names();
    let bindings = statement.params().bindings(&names);

    if prepared.column_count() == 0 {
        let rows_affected = prepared.execute(bindings.as_slice())?;
        let inserted_primary_key = (statement.is_insert() && rows_affected > 0)
            .then(|| conn.last_insert_rowid());
        return Ok(ResultSet::from_write(rows_affected, inserted_primary_key));
    }

    let columns: Arc<[String]> = prepared
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let width = columns.len();
    let mut rows = prepared.query(bindings.as_slice())?;
    let mut materialized = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..width)
            .map(|index| row.get::<_, Value>(index))
            .collect::<Result<Vec<_>, _>>()?;
        materialized.push(Row::new(columns.clone(), values));
    }
    Ok(ResultSet::from_rows(columns, materialized))
}
