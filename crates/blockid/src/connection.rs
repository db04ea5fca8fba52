/// A value bound to a statement placeholder.
///
/// Entity names always travel as bound parameters, never as SQL text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Param<'a> {
    Text(&'a str),
    Int(i64),
}

/// The durable counter row of one entity, as read by the locking select.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterRow {
    /// Highest id ever reserved for the entity.
    pub ceiling: i64,
    pub step: i32,
    pub block_size: i64,
}

/// A single open database connection.
///
/// The allocator drives exactly one transaction per reservation through these
/// methods and drops the connection afterwards. Dropping is closing: an
/// implementation must release the underlying handle (and roll back any
/// transaction still open) in `Drop`.
///
/// Placeholders in the SQL passed here come from a [`crate::Dialect`]; the
/// parameters are bound positionally in the order the dialect documents.
pub trait Connection {
    /// Backend error type.
    type Error: core::error::Error + Send + Sync + 'static;

    /// Starts a transaction. Backends that support it should take a write
    /// intent lock here.
    fn begin(&mut self) -> Result<(), Self::Error>;

    fn commit(&mut self) -> Result<(), Self::Error>;

    fn rollback(&mut self) -> Result<(), Self::Error>;

    /// Runs a query returning `(ceiling, step, block_size)` for at most one
    /// row.
    fn query_counter(
        &mut self,
        sql: &str,
        params: &[Param<'_>],
    ) -> Result<Option<CounterRow>, Self::Error>;

    /// Runs a statement and returns the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Param<'_>]) -> Result<usize, Self::Error>;
}

/// Opens a fresh [`Connection`] for every reservation.
///
/// The allocator never pools or retains connections; pooling, if any, belongs
/// to the factory implementation.
pub trait ConnectionFactory {
    type Connection: Connection;

    /// Opens a connection.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the connection cannot be established.
    fn open(&self) -> Result<Self::Connection, <Self::Connection as Connection>::Error>;
}

impl<F: ConnectionFactory + ?Sized> ConnectionFactory for &F {
    type Connection = F::Connection;

    fn open(&self) -> Result<Self::Connection, <Self::Connection as Connection>::Error> {
        (**self).open()
    }
}

impl<F: ConnectionFactory + ?Sized> ConnectionFactory for std::sync::Arc<F> {
    type Connection = F::Connection;

    fn open(&self) -> Result<Self::Connection, <Self::Connection as Connection>::Error> {
        (**self).open()
    }
}
