//! Raw connection with "commit as you go" semantics.

use super::{run_compiled, run_statement, StoreHandle};
use crate::db::DbResult;
use crate::result::ResultSet;
use crate::sql::{Executable, Params};
use log::warn;

/// Statement-level access to the store.
///
/// With `future` semantics the first statement opens a transaction that
/// stays open until `commit()`/`rollback()`; dropping the `Conn` discards
/// uncommitted work. Otherwise each statement commits on its own.
pub struct Conn<'e> {
    conn: StoreHandle<'e>,
    future: bool,
    in_transaction: bool,
}

impl<'e> Conn<'e> {
    pub(crate) fn new(conn: StoreHandle<'e>, future: bool) -> Self {
        Self {
            conn,
            future,
            in_transaction: false,
        }
    }

    pub fn execute<S: Executable + ?Sized>(&mut self, statement: &S) -> DbResult<ResultSet> {
        self.begin_if_needed()?;
        run_statement(&self.conn, statement)
    }

    /// Runs one statement once per parameter set and returns the summed
    /// row count. Statement-level bindings are overridden by each set.
    pub fn execute_many<S, I>(&mut self, statement: &S, param_sets: I) -> DbResult<usize>
    where
        S: Executable + ?Sized,
        I: IntoIterator<Item = Params>,
    {
        self.begin_if_needed()?;
        let compiled = statement.compile()?;
        let mut rows_affected = 0;
        for params in param_sets {
            let bound = compiled.clone().bind_params(&params);
            rows_affected += run_compiled(&self.conn, &bound)?.rows_affected();
        }
        Ok(rows_affected)
    }

    pub fn commit(&mut self) -> DbResult<()> {
        if self.in_transaction {
            self.conn.execute_batch("COMMIT;")?;
            self.in_transaction = false;
        }
        Ok(())
    }

    pub fn rollback(&mut self) -> DbResult<()> {
        if self.in_transaction {
            self.in_transaction = false;
            if !self.conn.is_autocommit() {
                self.conn.execute_batch("ROLLBACK;")?;
            }
        }
        Ok(())
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn begin_if_needed(&mut self) -> DbResult<()> {
        if self.future && !self.in_transaction {
            self.conn.execute_batch("BEGIN DEFERRED;")?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

impl Drop for Conn<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.rollback() {
            warn!("event=conn_release module=engine status=error action=rollback error={err}");
        }
    }
}
