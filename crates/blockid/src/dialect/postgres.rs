use crate::{Dialect, TableSchema};

/// PostgreSQL statements.
///
/// `SELECT ... FOR UPDATE` locks nothing when the row is absent, so two
/// transactions can both decide to insert. Absent rows escalate to an
/// `EXCLUSIVE` table lock, which still admits plain readers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn select_for_update(&self, s: &TableSchema) -> String {
        format!(
            "SELECT {ceiling}, {step}, {block} FROM {table} WHERE {entity} = $1 FOR UPDATE",
            ceiling = s.ceiling_column(),
            step = s.step_column(),
            block = s.block_size_column(),
            table = s.table(),
            entity = s.entity_column(),
        )
    }

    fn update_ceiling(&self, s: &TableSchema) -> String {
        format!(
            "UPDATE {table} SET {ceiling} = $1 WHERE {entity} = $2",
            table = s.table(),
            ceiling = s.ceiling_column(),
            entity = s.entity_column(),
        )
    }

    fn insert_row(&self, s: &TableSchema) -> String {
        format!(
            "INSERT INTO {table} ({entity}, {ceiling}, {step}, {block}) VALUES ($1, $2, $3, $4)",
            table = s.table(),
            entity = s.entity_column(),
            ceiling = s.ceiling_column(),
            step = s.step_column(),
            block = s.block_size_column(),
        )
    }

    fn lock_table(&self, s: &TableSchema) -> String {
        format!("LOCK TABLE {} IN EXCLUSIVE MODE", s.table())
    }

    fn create_table(&self, s: &TableSchema) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
             {entity} VARCHAR(255) NOT NULL PRIMARY KEY, \
             {ceiling} BIGINT NOT NULL, \
             {step} INTEGER NOT NULL, \
             {block} BIGINT NOT NULL)",
            table = s.table(),
            entity = s.entity_column(),
            ceiling = s.ceiling_column(),
            step = s.step_column(),
            block = s.block_size_column(),
        )
    }

    fn needs_table_lock_when_row_absent(&self) -> bool {
        true
    }
}
