//! In-memory database double used by the unit tests.
//!
//! Statements are dispatched on the fixed strings rendered by
//! [`MemoryDialect`]. Transactions are serialized through a store-wide lock and
//! staged on a private copy of the rows, so uncommitted writes are never
//! visible and a rollback discards them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::{Connection, ConnectionFactory, CounterRow, Dialect, Param, TableSchema};

const SELECT: &str = "select";
const UPDATE: &str = "update";
const INSERT: &str = "insert";
const LOCK: &str = "lock";
const CREATE: &str = "create";

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct MemoryDialect {
    pub escalate: bool,
}

impl Dialect for MemoryDialect {
    fn select_for_update(&self, _: &TableSchema) -> String {
        SELECT.into()
    }

    fn update_ceiling(&self, _: &TableSchema) -> String {
        UPDATE.into()
    }

    fn insert_row(&self, _: &TableSchema) -> String {
        INSERT.into()
    }

    fn lock_table(&self, _: &TableSchema) -> String {
        LOCK.into()
    }

    fn create_table(&self, _: &TableSchema) -> String {
        CREATE.into()
    }

    fn needs_table_lock_when_row_absent(&self) -> bool {
        self.escalate
    }
}

/// Operations a test can make fail once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FailPoint {
    Open,
    Select,
    Update,
    Insert,
    Lock,
    Commit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub(crate) enum MemoryError {
    #[error("injected failure at {0:?}")]
    Injected(FailPoint),
    #[error("duplicate key `{0}`")]
    DuplicateKey(String),
    #[error("unknown statement `{0}`")]
    UnknownStatement(String),
    #[error("bad parameters for `{0}`")]
    BadParams(&'static str),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Stats {
    pub opens: usize,
    pub selects: usize,
    pub updates: usize,
    pub inserts: usize,
    pub locks: usize,
    pub commits: usize,
    pub rollbacks: usize,
}

#[derive(Default)]
struct Shared {
    rows: Mutex<HashMap<String, CounterRow>>,
    tx_lock: AtomicBool,
    stats: Mutex<Stats>,
    failpoints: Mutex<Vec<FailPoint>>,
    seed_on_lock: Mutex<Option<(String, CounterRow)>>,
}

#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, entity: &str, row: CounterRow) {
        self.shared
            .rows
            .lock()
            .unwrap()
            .insert(entity.to_owned(), row);
    }

    pub fn ceiling(&self, entity: &str) -> Option<i64> {
        self.shared
            .rows
            .lock()
            .unwrap()
            .get(entity)
            .map(|row| row.ceiling)
    }

    pub fn row(&self, entity: &str) -> Option<CounterRow> {
        self.shared.rows.lock().unwrap().get(entity).copied()
    }

    pub fn stats(&self) -> Stats {
        *self.shared.stats.lock().unwrap()
    }

    /// Makes the next `point` operation fail once.
    pub fn fail_next(&self, point: FailPoint) {
        self.shared.failpoints.lock().unwrap().push(point);
    }

    /// Creates `row` as if another process committed it just before the next
    /// table lock was granted.
    pub fn seed_on_next_lock(&self, entity: &str, row: CounterRow) {
        *self.shared.seed_on_lock.lock().unwrap() = Some((entity.to_owned(), row));
    }

    fn trip(&self, point: FailPoint) -> Result<(), MemoryError> {
        let mut failpoints = self.shared.failpoints.lock().unwrap();
        if let Some(pos) = failpoints.iter().position(|p| *p == point) {
            failpoints.remove(pos);
            return Err(MemoryError::Injected(point));
        }
        Ok(())
    }

    fn record(&self, f: impl FnOnce(&mut Stats)) {
        f(&mut self.shared.stats.lock().unwrap());
    }
}

impl ConnectionFactory for MemoryStore {
    type Connection = MemoryConnection;

    fn open(&self) -> Result<MemoryConnection, MemoryError> {
        self.trip(FailPoint::Open)?;
        Ok(MemoryConnection::open(self))
    }
}

pub(crate) struct MemoryConnection {
    store: MemoryStore,
    staged: Option<HashMap<String, CounterRow>>,
}

impl MemoryConnection {
    pub fn open(store: &MemoryStore) -> Self {
        store.record(|s| s.opens += 1);
        Self {
            store: store.clone(),
            staged: None,
        }
    }

    fn release(&mut self) {
        if self.staged.take().is_some() {
            self.store.shared.tx_lock.store(false, Ordering::Release);
        }
    }

    fn with_rows<T>(&mut self, f: impl FnOnce(&mut HashMap<String, CounterRow>) -> T) -> T {
        match self.staged.as_mut() {
            Some(staged) => f(staged),
            None => f(&mut self.store.shared.rows.lock().unwrap()),
        }
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.release();
    }
}

impl Connection for MemoryConnection {
    type Error = MemoryError;

    fn begin(&mut self) -> Result<(), MemoryError> {
        while self
            .store
            .shared
            .tx_lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            std::thread::yield_now();
        }
        self.staged = Some(self.store.shared.rows.lock().unwrap().clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), MemoryError> {
        self.store.trip(FailPoint::Commit)?;
        if let Some(staged) = self.staged.take() {
            *self.store.shared.rows.lock().unwrap() = staged;
            self.store.shared.tx_lock.store(false, Ordering::Release);
        }
        self.store.record(|s| s.commits += 1);
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), MemoryError> {
        self.release();
        self.store.record(|s| s.rollbacks += 1);
        Ok(())
    }

    fn query_counter(
        &mut self,
        sql: &str,
        params: &[Param<'_>],
    ) -> Result<Option<CounterRow>, MemoryError> {
        if sql != SELECT {
            return Err(MemoryError::UnknownStatement(sql.to_owned()));
        }
        self.store.record(|s| s.selects += 1);
        self.store.trip(FailPoint::Select)?;
        let [Param::Text(entity)] = params else {
            return Err(MemoryError::BadParams(SELECT));
        };
        Ok(self.with_rows(|rows| rows.get(*entity).copied()))
    }

    fn execute(&mut self, sql: &str, params: &[Param<'_>]) -> Result<usize, MemoryError> {
        match sql {
            UPDATE => {
                self.store.record(|s| s.updates += 1);
                self.store.trip(FailPoint::Update)?;
                let [Param::Int(ceiling), Param::Text(entity)] = params else {
                    return Err(MemoryError::BadParams(UPDATE));
                };
                Ok(self.with_rows(|rows| match rows.get_mut(*entity) {
                    Some(row) => {
                        row.ceiling = *ceiling;
                        1
                    }
                    None => 0,
                }))
            }
            INSERT => {
                self.store.record(|s| s.inserts += 1);
                self.store.trip(FailPoint::Insert)?;
                let [
                    Param::Text(entity),
                    Param::Int(ceiling),
                    Param::Int(step),
                    Param::Int(block_size),
                ] = params
                else {
                    return Err(MemoryError::BadParams(INSERT));
                };
                let step = i32::try_from(*step).map_err(|_| MemoryError::BadParams(INSERT))?;
                let row = CounterRow {
                    ceiling: *ceiling,
                    step,
                    block_size: *block_size,
                };
                self.with_rows(|rows| {
                    if rows.contains_key(*entity) {
                        return Err(MemoryError::DuplicateKey((*entity).to_owned()));
                    }
                    rows.insert((*entity).to_owned(), row);
                    Ok(1)
                })
            }
            LOCK => {
                self.store.record(|s| s.locks += 1);
                self.store.trip(FailPoint::Lock)?;
                let seeded = self.store.shared.seed_on_lock.lock().unwrap().take();
                if let Some((entity, row)) = seeded {
                    self.with_rows(|rows| rows.insert(entity, row));
                }
                Ok(0)
            }
            CREATE => Ok(0),
            other => Err(MemoryError::UnknownStatement(other.to_owned())),
        }
    }
}
