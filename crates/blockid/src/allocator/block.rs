#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    AllocatorConfig, BoxError, Connection, ConnectionFactory, Dialect, Error, Gateway, Result,
    SequenceGenerator, Statements, Window, WindowCache, calculate_id_increase,
};

/// A batched, database-backed id allocator.
///
/// Each entity's ids are leased from its durable counter row a block at a
/// time. The lease is cached as a [`Window`]; requests that fit in the window
/// are answered from memory, and only a shortfall opens a connection and runs
/// one short transaction that moves the row's ceiling.
///
/// ## Guarantees
/// - Ids of one entity are unique across every allocator sharing the
///   database, as long as the dialect's locking read really locks.
/// - Ids of one entity are strictly increasing in issuance order.
/// - A failed database call never changes the cached window.
///
/// ## Concurrency
/// Requests for the same entity are serialized by a per-entity mutex held for
/// the whole request, including any database round trip. Requests for
/// different entities never wait on each other.
///
/// The allocator is generic over the [`ConnectionFactory`]; the [`Dialect`]
/// is rendered into [`Statements`] once at construction.
pub struct BlockAllocator<F: ConnectionFactory> {
    factory: F,
    statements: Statements,
    config: AllocatorConfig,
    cache: WindowCache,
}

/// One database top-up: reserve room for `need` ids of `entity`.
///
/// `step` and `block_size` only apply when the row has to be created.
#[derive(Debug)]
struct Reservation<'a> {
    entity: &'a str,
    need: i64,
    step: i32,
    block_size: i64,
}

impl<F: ConnectionFactory> BlockAllocator<F> {
    /// Creates an allocator over the default table layout
    /// ([`AllocatorConfig::default`]).
    pub fn new<D: Dialect + ?Sized>(factory: F, dialect: &D) -> Self {
        let config = AllocatorConfig::default();
        Self {
            statements: Statements::render(dialect, &config.schema),
            factory,
            config,
            cache: WindowCache::new(),
        }
    }

    /// Creates an allocator with explicit table identifiers and defaults.
    ///
    /// Nothing is sent to the database here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if an identifier does not match
    /// `[a-zA-Z_]+` or a default is not positive.
    pub fn with_config<D: Dialect + ?Sized>(
        factory: F,
        dialect: &D,
        config: AllocatorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            statements: Statements::render(dialect, &config.schema),
            factory,
            config,
            cache: WindowCache::new(),
        })
    }

    pub const fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    pub const fn statements(&self) -> &Statements {
        &self.statements
    }

    /// Creates the counter table if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generation`] if the connection or the DDL fails.
    pub fn ensure_schema(&self) -> Result<()> {
        let table = self.config.schema.table();
        let mut conn = self
            .factory
            .open()
            .map_err(|e| Error::generation(table, e))?;
        Gateway::new(&mut conn, &self.statements)
            .create_table()
            .map_err(|e| Error::generation(table, e))
    }

    /// Returns a copy of the window currently cached for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] when a std mutex was poisoned.
    pub fn cached_window(&self, entity: &str) -> Result<Option<Window>> {
        self.cache.get(entity)
    }

    /// Forgets the cached window of `entity`; its unused ids are forfeited and
    /// the next request goes to the database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] when a std mutex was poisoned.
    pub fn evict(&self, entity: &str) -> Result<Option<Window>> {
        self.cache.evict(entity)
    }

    /// Issues the next id of `entity`.
    ///
    /// # Errors
    ///
    /// See [`Self::allocate`].
    pub fn next_id(&self, entity: &str) -> Result<i64> {
        SequenceGenerator::next_id(self, entity)
    }

    /// Issues `count` ids of `entity` using the configured defaults for a new
    /// entity.
    ///
    /// # Errors
    ///
    /// See [`Self::allocate`].
    pub fn next_ids(&self, entity: &str, count: usize) -> Result<Vec<i64>> {
        self.allocate(
            entity,
            count,
            self.config.default_step,
            self.config.default_block_size,
        )
    }

    /// Issues `count` ids of `entity`, seeding a new entity with `step` and
    /// `block_size`.
    ///
    /// # Errors
    ///
    /// See [`Self::allocate`].
    pub fn next_ids_with(
        &self,
        entity: &str,
        count: usize,
        step: i32,
        block_size: i64,
    ) -> Result<Vec<i64>> {
        self.allocate(entity, count, step, block_size)
    }

    /// Issues `count` sorted, distinct ids of `entity`.
    ///
    /// When the cached window covers the request no database access happens.
    /// Otherwise the ids left in the window are issued first and the shortfall
    /// is reserved from the database in one transaction. `default_step` and
    /// `default_block_size` only seed a counter row that does not exist yet.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] for an empty entity name, a non-positive
    ///   step or block size, or a count that does not fit in `i64`.
    /// - [`Error::Generation`] if the reservation transaction failed.
    /// - [`Error::LockEscalationExhausted`] if the retry under a table lock
    ///   failed.
    /// - [`Error::Overflow`] if the ids would not fit in `i64`.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn allocate(
        &self,
        entity: &str,
        count: usize,
        default_step: i32,
        default_block_size: i64,
    ) -> Result<Vec<i64>> {
        if entity.is_empty() {
            return Err(Error::invalid_request("entity name must not be empty"));
        }
        if default_step <= 0 {
            return Err(Error::invalid_request(format!(
                "step must be positive, got {default_step}"
            )));
        }
        if default_block_size <= 0 {
            return Err(Error::invalid_request(format!(
                "block size must be positive, got {default_block_size}"
            )));
        }
        if count == 0 {
            return Ok(Vec::new());
        }
        let count = i64::try_from(count)
            .map_err(|_| Error::invalid_request(format!("count {count} exceeds i64::MAX")))?;

        self.cache.compute(entity, |current| match current {
            Some(window) if window.covers(count) => {
                let mut ids = Vec::with_capacity(count as usize);
                let next = window.issue(count, &mut ids);
                Ok((next, ids))
            }
            Some(window) => self.top_up(window, count),
            None => {
                let reserved = self.reserve(&Reservation {
                    entity,
                    need: count,
                    step: default_step,
                    block_size: default_block_size,
                })?;
                let mut ids = Vec::with_capacity(count as usize);
                let next = reserved.issue(count, &mut ids);
                Ok((next, ids))
            }
        })
    }

    /// Drains `window`, reserves the shortfall and merges both ranges.
    #[cold]
    #[inline(never)]
    fn top_up(&self, window: &Window, count: i64) -> Result<(Window, Vec<i64>)> {
        let served = window.remaining();
        let need = count - served;
        let reserved = self.reserve(&Reservation {
            entity: window.entity_name(),
            need,
            step: window.step(),
            block_size: window.block_size(),
        })?;

        // The drained window is only committed to the cache through `reserved`,
        // so a failed reservation above leaves the cache untouched.
        let mut ids = Vec::with_capacity(count as usize);
        window.issue(served, &mut ids);
        let next = reserved.issue(need, &mut ids);
        Ok((next, ids))
    }

    /// Runs the reservation transaction, escalating to a table lock once when
    /// the row is absent and the dialect asks for it.
    fn reserve(&self, request: &Reservation<'_>) -> Result<Window> {
        let entity = request.entity;
        let mut conn = self
            .factory
            .open()
            .map_err(|e| Error::generation(entity, e))?;
        let mut gateway = Gateway::new(&mut conn, &self.statements);

        let may_escalate = self.statements.needs_table_lock_when_row_absent;
        let first = gateway
            .transaction(|gw| reserve_in(gw, request, may_escalate))
            .map_err(|e| lift(e, |source| Error::generation(entity, source)))?;
        if let Some(window) = first {
            return Ok(window);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(entity, "counter row absent, retrying under table lock");

        gateway
            .transaction(|gw| {
                gw.lock_table()?;
                reserve_in(gw, request, false)
            })
            .map_err(|e| lift(e, |source| escalation_failed(entity, source)))?
            .ok_or_else(|| escalation_failed(entity, "row still absent under table lock".into()))
    }
}

impl<F: ConnectionFactory> SequenceGenerator for BlockAllocator<F> {
    type Err = Error;

    fn next_ids(&self, entity: &str, count: usize) -> Result<Vec<i64>> {
        Self::next_ids(self, entity, count)
    }

    fn next_ids_with(
        &self,
        entity: &str,
        count: usize,
        step: i32,
        block_size: i64,
    ) -> Result<Vec<i64>> {
        self.allocate(entity, count, step, block_size)
    }
}

/// One attempt inside an open transaction.
///
/// Returns `Ok(None)` when the row is absent and `may_escalate` is set; the
/// caller rolls back and retries under a table lock.
fn reserve_in<C: Connection>(
    gw: &mut Gateway<'_, C>,
    request: &Reservation<'_>,
    may_escalate: bool,
) -> Result<Option<Window>, BoxError> {
    let entity = request.entity;
    match gw.fetch_window(entity)? {
        Some(at_ceiling) => {
            let (step, block_size) = (at_ceiling.step(), at_ceiling.block_size());
            let increase = block_increase(entity, request.need, step, block_size)?;
            let ceiling = at_ceiling
                .max()
                .checked_add(increase)
                .ok_or_else(|| Error::overflow(entity))?;
            gw.persist_ceiling(entity, ceiling)?;

            #[cfg(feature = "tracing")]
            tracing::debug!(entity, from = at_ceiling.max(), to = ceiling, "ceiling raised");

            Ok(Some(Window::new(
                entity,
                at_ceiling.max(),
                ceiling,
                step,
                block_size,
            )))
        }
        None if may_escalate => Ok(None),
        None => {
            let ceiling = block_increase(entity, request.need, request.step, request.block_size)?;
            let initial = Window::new(entity, 0, ceiling, request.step, request.block_size);
            gw.create_row(&initial)?;

            #[cfg(feature = "tracing")]
            tracing::debug!(entity, ceiling, "counter row created");

            Ok(Some(initial))
        }
    }
}

/// Ceiling growth needed for `need` ids spaced by `step`.
fn block_increase(entity: &str, need: i64, step: i32, block_size: i64) -> Result<i64> {
    if step <= 0 || block_size <= 0 {
        return Err(Error::invalid_request(format!(
            "counter row of `{entity}` has non-positive step {step} or block size {block_size}"
        )));
    }
    need.checked_mul(i64::from(step))
        .and_then(|span| calculate_id_increase(span, step, block_size))
        .ok_or_else(|| Error::overflow(entity))
}

/// Surfaces our own errors raised inside a transaction as-is and wraps
/// backend errors with `wrap`.
fn lift(err: BoxError, wrap: impl FnOnce(BoxError) -> Error) -> Error {
    match err.downcast::<Error>() {
        Ok(err) => *err,
        Err(source) => wrap(source),
    }
}

fn escalation_failed(entity: &str, source: BoxError) -> Error {
    #[cfg(feature = "tracing")]
    tracing::warn!(entity, error = %source, "table lock escalation failed");
    Error::LockEscalationExhausted {
        entity: entity.to_owned(),
        source,
    }
}
