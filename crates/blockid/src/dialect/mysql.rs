use crate::{Dialect, TableSchema};

/// MySQL / MariaDB (InnoDB) statements.
///
/// Under READ COMMITTED InnoDB takes no gap locks, so a `FOR UPDATE` read of
/// an absent key does not block a concurrent insert of the same key. Absent
/// rows escalate to a `LOCK TABLES ... WRITE`.
///
/// `LOCK TABLES` implicitly commits the transaction opened by `begin`, and the
/// lock outlives `COMMIT` until `UNLOCK TABLES` runs or the session ends. A
/// [`crate::Connection`] serving this dialect must run with `autocommit = 0`
/// and must not go back to a shared pool while holding the lock: either close
/// the session on drop, or issue `UNLOCK TABLES` after the escalated
/// transaction commits or rolls back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn select_for_update(&self, s: &TableSchema) -> String {
        format!(
            "SELECT {ceiling}, {step}, {block} FROM {table} WHERE {entity} = ? FOR UPDATE",
            ceiling = s.ceiling_column(),
            step = s.step_column(),
            block = s.block_size_column(),
            table = s.table(),
            entity = s.entity_column(),
        )
    }

    fn update_ceiling(&self, s: &TableSchema) -> String {
        format!(
            "UPDATE {table} SET {ceiling} = ? WHERE {entity} = ?",
            table = s.table(),
            ceiling = s.ceiling_column(),
            entity = s.entity_column(),
        )
    }

    fn insert_row(&self, s: &TableSchema) -> String {
        format!(
            "INSERT INTO {table} ({entity}, {ceiling}, {step}, {block}) VALUES (?, ?, ?, ?)",
            table = s.table(),
            entity = s.entity_column(),
            ceiling = s.ceiling_column(),
            step = s.step_column(),
            block = s.block_size_column(),
        )
    }

    fn lock_table(&self, s: &TableSchema) -> String {
        format!("LOCK TABLES {} WRITE", s.table())
    }

    fn create_table(&self, s: &TableSchema) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
             {entity} VARCHAR(255) NOT NULL PRIMARY KEY, \
             {ceiling} BIGINT NOT NULL, \
             {step} INT NOT NULL, \
             {block} BIGINT NOT NULL) ENGINE = InnoDB",
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
