use crate::TableSchema;

/// SQL templates for one database backend.
///
/// A dialect is a pure strategy: it renders statements for a validated
/// [`TableSchema`] and never touches a connection. Parameters are bound
/// positionally, in this order:
///
/// | statement           | parameters                                  |
/// |---------------------|---------------------------------------------|
/// | `select_for_update` | entity                                      |
/// | `update_ceiling`    | new ceiling, entity                         |
/// | `insert_row`        | entity, ceiling, step, block size           |
/// | `lock_table`        | none                                        |
/// | `create_table`      | none                                        |
///
/// `select_for_update` must return the columns `(ceiling, step, block_size)`
/// and must lock the row against concurrent writers until the transaction
/// ends.
pub trait Dialect {
    /// Locking read of one counter row.
    fn select_for_update(&self, schema: &TableSchema) -> String;

    fn update_ceiling(&self, schema: &TableSchema) -> String;

    fn insert_row(&self, schema: &TableSchema) -> String;

    /// Table-level lock taken on the escalation path.
    fn lock_table(&self, schema: &TableSchema) -> String;

    /// Idempotent DDL creating the counter table.
    fn create_table(&self, schema: &TableSchema) -> String;

    /// Whether a row lock alone cannot stop two transactions from both seeing
    /// an absent row and racing to insert it.
    ///
    /// When `true`, an absent row sends the allocator down the escalation
    /// path: roll back, take [`Dialect::lock_table`], retry once.
    fn needs_table_lock_when_row_absent(&self) -> bool;
}

impl<D: Dialect + ?Sized> Dialect for &D {
    fn select_for_update(&self, schema: &TableSchema) -> String {
        (**self).select_for_update(schema)
    }

    fn update_ceiling(&self, schema: &TableSchema) -> String {
        (**self).update_ceiling(schema)
    }

    fn insert_row(&self, schema: &TableSchema) -> String {
        (**self).insert_row(schema)
    }

    fn lock_table(&self, schema: &TableSchema) -> String {
        (**self).lock_table(schema)
    }

    fn create_table(&self, schema: &TableSchema) -> String {
        (**self).create_table(schema)
    }

    fn needs_table_lock_when_row_absent(&self) -> bool {
        (**self).needs_table_lock_when_row_absent()
    }
}

/// Statements rendered once from a [`Dialect`] and a [`TableSchema`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statements {
    pub select_for_update: String,
    pub update_ceiling: String,
    pub insert_row: String,
    pub lock_table: String,
    pub create_table: String,
    pub needs_table_lock_when_row_absent: bool,
}

impl Statements {
    pub fn render<D: Dialect + ?Sized>(dialect: &D, schema: &TableSchema) -> Self {
        Self {
            select_for_update: dialect.select_for_update(schema),
            update_ceiling: dialect.update_ceiling(schema),
            insert_row: dialect.insert_row(schema),
            lock_table: dialect.lock_table(schema),
            create_table: dialect.create_table(schema),
            needs_table_lock_when_row_absent: dialect.needs_table_lock_when_row_absent(),
        }
    }
}
