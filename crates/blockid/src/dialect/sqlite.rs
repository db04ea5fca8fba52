use crate::{Dialect, TableSchema};

/// `SQLite` statements.
///
/// `SQLite` has no row locks. Transactions opened with `BEGIN IMMEDIATE` hold
/// the database write lock from the start, which already serializes the
/// read-then-insert of an absent row, so no escalation is needed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn select_for_update(&self, s: &TableSchema) -> String {
        format!(
            "SELECT {ceiling}, {step}, {block} FROM {table} WHERE {entity} = ?1",
            ceiling = s.ceiling_column(),
            step = s.step_column(),
            block = s.block_size_column(),
            table = s.table(),
            entity = s.entity_column(),
        )
    }

    fn update_ceiling(&self, s: &TableSchema) -> String {
        format!(
            "UPDATE {table} SET {ceiling} = ?1 WHERE {entity} = ?2",
            table = s.table(),
            ceiling = s.ceiling_column(),
            entity = s.entity_column(),
        )
    }

    fn insert_row(&self, s: &TableSchema) -> String {
        format!(
            "INSERT INTO {table} ({entity}, {ceiling}, {step}, {block}) VALUES (?1, ?2, ?3, ?4)",
            table = s.table(),
            entity = s.entity_column(),
            ceiling = s.ceiling_column(),
            step = s.step_column(),
            block = s.block_size_column(),
        )
    }

    // No LOCK TABLE in SQLite; a no-op write takes the RESERVED lock.
    fn lock_table(&self, s: &TableSchema) -> String {
        format!(
            "UPDATE {table} SET {ceiling} = {ceiling} WHERE 0 = 1",
            table = s.table(),
            ceiling = s.ceiling_column(),
        )
    }

    fn create_table(&self, s: &TableSchema) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
             {entity} TEXT NOT NULL PRIMARY KEY, \
             {ceiling} INTEGER NOT NULL, \
             {step} INTEGER NOT NULL, \
             {block} INTEGER NOT NULL)",
            table = s.table(),
            entity = s.entity_column(),
            ceiling = s.ceiling_column(),
            step = s.step_column(),
            block = s.block_size_column(),
        )
    }

    fn needs_table_lock_when_row_absent(&self) -> bool {
        false
    }
}
