use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::ToSqlOutput;
use rusqlite::{OptionalExtension, ToSql, params_from_iter};

use crate::{Connection, ConnectionFactory, CounterRow, Param};

/// Default busy timeout for `SQLite` connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl ToSql for Param<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match *self {
            Param::Text(text) => ToSqlOutput::from(text),
            Param::Int(int) => ToSqlOutput::from(int),
        })
    }
}

/// A [`Connection`] over one `rusqlite` handle.
///
/// Transactions start with `BEGIN IMMEDIATE`, taking the database write lock
/// up front. Concurrent writers (threads or processes) wait up to the busy
/// timeout for it, which is what makes the plain `SELECT` of
/// [`crate::SqliteDialect`] a locking read.
pub struct SqliteConnection {
    inner: rusqlite::Connection,
}

impl SqliteConnection {
    /// Opens (creating if needed) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns the `rusqlite` error if the file cannot be opened or the
    /// pragmas cannot be applied.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> rusqlite::Result<Self> {
        let inner = rusqlite::Connection::open(path)?;
        inner.busy_timeout(busy_timeout)?;
        inner.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = FULL;")?;
        Ok(Self { inner })
    }

    /// Wraps an existing handle.
    pub fn from_inner(inner: rusqlite::Connection) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &rusqlite::Connection {
        &self.inner
    }
}

impl Connection for SqliteConnection {
    type Error = rusqlite::Error;

    fn begin(&mut self) -> rusqlite::Result<()> {
        self.inner.execute_batch("BEGIN IMMEDIATE")
    }

    fn commit(&mut self) -> rusqlite::Result<()> {
        self.inner.execute_batch("COMMIT")
    }

    fn rollback(&mut self) -> rusqlite::Result<()> {
        self.inner.execute_batch("ROLLBACK")
    }

    fn query_counter(
        &mut self,
        sql: &str,
        params: &[Param<'_>],
    ) -> rusqlite::Result<Option<CounterRow>> {
        self.inner
            .prepare_cached(sql)?
            .query_row(params_from_iter(params), |row| {
                Ok(CounterRow {
                    ceiling: row.get(0)?,
                    step: row.get(1)?,
                    block_size: row.get(2)?,
                })
            })
            .optional()
    }

    fn execute(&mut self, sql: &str, params: &[Param<'_>]) -> rusqlite::Result<usize> {
        self.inner.prepare_cached(sql)?.execute(params_from_iter(params))
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        // `rusqlite` closes the handle; an open transaction must not outlive it
        if !self.inner.is_autocommit() {
            let _ = self.inner.execute_batch("ROLLBACK");
        }
    }
}

/// Opens a new [`SqliteConnection`] to one database file per call.
#[derive(Clone, Debug)]
pub struct SqliteConnectionFactory {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteConnectionFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConnectionFactory for SqliteConnectionFactory {
    type Connection = SqliteConnection;

    fn open(&self) -> rusqlite::Result<SqliteConnection> {
        SqliteConnection::open(&self.path, self.busy_timeout)
    }
}
