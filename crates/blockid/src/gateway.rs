use thiserror::Error;

use crate::{BoxError, Connection, CounterRow, Param, Statements, Window};

/// A write statement touched an unexpected number of rows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected to affect exactly one row of `{entity}`, affected {affected}")]
pub struct RowCountMismatch {
    pub entity: String,
    pub affected: usize,
}

/// Reads and writes the durable counter row of an entity over one borrowed
/// connection.
///
/// The gateway owns neither the connection nor the transaction boundaries
/// beyond [`Gateway::transaction`]; it only issues the dialect's statements
/// with bound parameters.
pub struct Gateway<'a, C: Connection> {
    conn: &'a mut C,
    statements: &'a Statements,
}

impl<'a, C: Connection> Gateway<'a, C> {
    pub fn new(conn: &'a mut C, statements: &'a Statements) -> Self {
        Self { conn, statements }
    }

    /// Locking read of the counter row, as a zero-capacity window sitting at
    /// the stored ceiling.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the query fails.
    pub fn fetch_window(&mut self, entity: &str) -> Result<Option<Window>, BoxError> {
        let row = self
            .conn
            .query_counter(&self.statements.select_for_update, &[Param::Text(entity)])?;
        Ok(row.map(|row| window_at_ceiling(entity, row)))
    }

    /// Moves the stored ceiling of an existing row.
    ///
    /// # Errors
    ///
    /// Returns the backend error, or [`RowCountMismatch`] if the row vanished.
    pub fn persist_ceiling(&mut self, entity: &str, ceiling: i64) -> Result<(), BoxError> {
        let affected = self.conn.execute(
            &self.statements.update_ceiling,
            &[Param::Int(ceiling), Param::Text(entity)],
        )?;
        expect_one_row(entity, affected)
    }

    /// Inserts the counter row for a new entity with `initial.max()` as its
    /// ceiling.
    ///
    /// # Errors
    ///
    /// Returns the backend error (for example a duplicate key), or
    /// [`RowCountMismatch`] if nothing was inserted.
    pub fn create_row(&mut self, initial: &Window) -> Result<(), BoxError> {
        let affected = self.conn.execute(
            &self.statements.insert_row,
            &[
                Param::Text(initial.entity_name()),
                Param::Int(initial.max()),
                Param::Int(i64::from(initial.step())),
                Param::Int(initial.block_size()),
            ],
        )?;
        expect_one_row(initial.entity_name(), affected)
    }

    /// Takes the dialect's table-level lock for the rest of the transaction.
    ///
    /// # Errors
    ///
    /// Returns the backend error, e.g. when the lock privilege is missing.
    pub fn lock_table(&mut self) -> Result<(), BoxError> {
        self.conn.execute(&self.statements.lock_table, &[])?;
        Ok(())
    }

    /// Creates the counter table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the DDL fails.
    pub fn create_table(&mut self) -> Result<(), BoxError> {
        self.conn.execute(&self.statements.create_table, &[])?;
        Ok(())
    }

    /// Runs `f` inside one transaction.
    ///
    /// `Ok(Some(_))` commits. `Ok(None)` means the attempt was abandoned and
    /// `Err(_)` means it failed; both roll back. A rollback failure never
    /// masks the error that caused it.
    ///
    /// # Errors
    ///
    /// Returns the error of `begin`, of `f` or of `commit`.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<Option<T>, BoxError>
    where
        F: FnOnce(&mut Self) -> Result<Option<T>, BoxError>,
    {
        self.conn.begin()?;
        match f(self) {
            Ok(Some(value)) => match self.conn.commit() {
                Ok(()) => Ok(Some(value)),
                Err(e) => {
                    self.rollback_quietly();
                    Err(e.into())
                }
            },
            Ok(None) => {
                self.conn.rollback()?;
                Ok(None)
            }
            Err(e) => {
                self.rollback_quietly();
                Err(e)
            }
        }
    }

    fn rollback_quietly(&mut self) {
        if let Err(_e) = self.conn.rollback() {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_e, "rollback failed");
        }
    }
}

fn window_at_ceiling(entity: &str, row: CounterRow) -> Window {
    Window::new(entity, row.ceiling, row.ceiling, row.step, row.block_size)
}

fn expect_one_row(entity: &str, affected: usize) -> Result<(), BoxError> {
    if affected == 1 {
        Ok(())
    } else {
        Err(Box::new(RowCountMismatch {
            entity: entity.to_owned(),
            affected,
        }))
    }
}
