//! Unit of work over the store.
//!
//! # Invariants
//! - A session always begins a transaction when opened.
//! - Exactly one of commit/rollback resolves it; dropping an unresolved
//!   session rolls back, so every early return discards staged writes.
//! - Staged writes are invisible to other sessions until commit.

use super::{run_statement, StoreHandle};
use crate::db::{DbError, DbResult};
use crate::model::address::Address;
use crate::model::mapping::Mapped;
use crate::model::user::User;
use crate::result::ResultSet;
use crate::sql::{insert, update, Executable};
use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Active,
    Committed,
    RolledBack,
}

pub struct Session<'e> {
    conn: StoreHandle<'e>,
    state: SessionState,
}

impl<'e> Session<'e> {
    pub(crate) fn begin(conn: StoreHandle<'e>) -> DbResult<Self> {
        conn.execute_batch("BEGIN DEFERRED;")?;
        debug!("event=session_open module=engine status=ok");
        Ok(Self {
            conn,
            state: SessionState::Active,
        })
    }

    pub fn execute<S: Executable + ?Sized>(&mut self, statement: &S) -> DbResult<ResultSet> {
        run_statement(&self.conn, statement)
    }

    /// Runs `statement` and hydrates every row as `E`.
    pub fn query<E: Mapped, S: Executable + ?Sized>(&mut self, statement: &S) -> DbResult<Vec<E>> {
        self.execute(statement)?
            .iter()
            .map(E::from_row)
            .collect()
    }

    /// Stages `user` and every address in its collection.
    ///
    /// Addresses are pointed at the user before they are written. Records
    /// that already carry an id are merged (updated in place) instead of
    /// inserted again.
    pub fn add_user(&mut self, user: &mut User) -> DbResult<()> {
        self.persist(user)?;
        for address in &mut user.addresses {
            address.user_id = user.id;
            self.persist(address)?;
        }
        Ok(())
    }

    /// Stages one address as-is, without touching any user.
    pub fn add_address(&mut self, address: &mut Address) -> DbResult<()> {
        self.persist(address)
    }

    /// Insert-or-merge by identity.
    ///
    /// A record without id is inserted and receives the store-assigned id.
    /// A record with an id updates that row; an id the store does not know
    /// is rejected, since ids are never chosen by callers.
    pub fn persist<E: Mapped>(&mut self, entity: &mut E) -> DbResult<()> {
        let table = E::table();
        let values = entity.column_values();

        if let Some(id) = entity.id() {
            let merged = self.execute(
                &update(table)
                    .values(values)
                    .where_eq(E::PRIMARY_KEY, id),
            )?;
            if merged.rows_affected() == 0 {
                return Err(DbError::UnknownIdentity {
                    table: table.name().to_string(),
                    id,
                });
            }
            return Ok(());
        }

        let inserted = self.execute(&insert(table).values(values))?;
        let id = inserted
            .inserted_primary_key()
            .ok_or_else(|| DbError::MissingPrimaryKey(table.name().to_string()))?;
        entity.set_id(id);
        Ok(())
    }

    pub fn commit(mut self) -> DbResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        self.state = SessionState::Committed;
        debug!("event=session_commit module=engine status=ok");
        Ok(())
    }

    pub fn rollback(mut self) -> DbResult<()> {
        self.state = SessionState::RolledBack;
        self.rollback_in_place()
    }

    /// Ends a read-only session. Nothing staged is kept.
    pub fn close(self) -> DbResult<()> {
        self.rollback()
    }

    fn rollback_in_place(&mut self) -> DbResult<()> {
        // SQLite may already have ended the transaction after a fatal error.
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK;")?;
        }
        Ok(())
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if self.state != SessionState::Active {
            return;
        }
        self.state = SessionState::RolledBack;
        match self.rollback_in_place() {
            Ok(()) => debug!("event=session_release module=engine status=ok action=rollback"),
            Err(err) => {
                warn!("event=session_release module=engine status=error action=rollback error={err}")
            }
        }
    }
}
