use crate::{Error, Result};

/// Default name of the counter table.
pub const DEFAULT_TABLE: &str = "id_sequence";
/// Default name of the entity key column.
pub const DEFAULT_ENTITY_COLUMN: &str = "entity_name";
/// Default name of the ceiling column.
pub const DEFAULT_CEILING_COLUMN: &str = "ceiling";
/// Default name of the step column.
pub const DEFAULT_STEP_COLUMN: &str = "step";
/// Default name of the block size column.
pub const DEFAULT_BLOCK_SIZE_COLUMN: &str = "block_size";

/// Table and column identifiers of the durable counter table.
///
/// Identifiers are spliced into SQL text (they cannot be bound as parameters),
/// so every one of them must match `[a-zA-Z_]+`. Validation happens when the
/// schema is built and again when an allocator is constructed from it; a bad
/// identifier never reaches the database.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableSchema {
    table: String,
    entity_column: String,
    ceiling_column: String,
    step_column: String,
    block_size_column: String,
}

impl TableSchema {
    /// Builds a schema from explicit identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if any identifier is empty or contains
    /// anything other than ASCII letters and underscores.
    pub fn new(
        table: impl Into<String>,
        entity_column: impl Into<String>,
        ceiling_column: impl Into<String>,
        step_column: impl Into<String>,
        block_size_column: impl Into<String>,
    ) -> Result<Self> {
        let schema = Self {
            table: table.into(),
            entity_column: entity_column.into(),
            ceiling_column: ceiling_column.into(),
            step_column: step_column.into(),
            block_size_column: block_size_column.into(),
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Uses the default column names with a custom table name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `table` is not a valid identifier.
    pub fn with_table(table: impl Into<String>) -> Result<Self> {
        Self::new(
            table,
            DEFAULT_ENTITY_COLUMN,
            DEFAULT_CEILING_COLUMN,
            DEFAULT_STEP_COLUMN,
            DEFAULT_BLOCK_SIZE_COLUMN,
        )
    }

    /// Checks every identifier against `[a-zA-Z_]+`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first offending identifier.
    pub fn validate(&self) -> Result<()> {
        for (role, ident) in [
            ("table", &self.table),
            ("entity column", &self.entity_column),
            ("ceiling column", &self.ceiling_column),
            ("step column", &self.step_column),
            ("block size column", &self.block_size_column),
        ] {
            if !is_identifier(ident) {
                return Err(Error::configuration(format!(
                    "{role} name {ident:?} must match [a-zA-Z_]+"
                )));
            }
        }
        Ok(())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn entity_column(&self) -> &str {
        &self.entity_column
    }

    pub fn ceiling_column(&self) -> &str {
        &self.ceiling_column
    }

    pub fn step_column(&self) -> &str {
        &self.step_column
    }

    pub fn block_size_column(&self) -> &str {
        &self.block_size_column
    }
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_owned(),
            entity_column: DEFAULT_ENTITY_COLUMN.to_owned(),
            ceiling_column: DEFAULT_CEILING_COLUMN.to_owned(),
            step_column: DEFAULT_STEP_COLUMN.to_owned(),
            block_size_column: DEFAULT_BLOCK_SIZE_COLUMN.to_owned(),
        }
    }
}

fn is_identifier(ident: &str) -> bool {
    !ident.is_empty() && ident.bytes().all(|b| b.is_ascii_alphabetic() || b == b'_')
}
