use crate::{Error, Result, TableSchema};

/// Default spacing between consecutive ids of a newly created entity.
pub const DEFAULT_STEP: i32 = 1;

/// Default number of ids reserved per database top-up for a new entity.
pub const DEFAULT_BLOCK_SIZE: i64 = 50;

/// Construction-time settings of a [`crate::BlockAllocator`].
///
/// `default_step` and `default_block_size` only seed counter rows that do not
/// exist yet. Once a row exists, its stored step and block size govern the
/// entity.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AllocatorConfig {
    pub schema: TableSchema,
    pub default_step: i32,
    pub default_block_size: i64,
}

impl AllocatorConfig {
    /// Checks identifiers and defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if an identifier is invalid or a
    /// default is not strictly positive.
    pub fn validate(&self) -> Result<()> {
        self.schema.validate()?;
        if self.default_step <= 0 {
            return Err(Error::configuration(format!(
                "default step must be positive, got {}",
                self.default_step
            )));
        }
        if self.default_block_size <= 0 {
            return Err(Error::configuration(format!(
                "default block size must be positive, got {}",
                self.default_block_size
            )));
        }
        Ok(())
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            schema: TableSchema::default(),
            default_step: DEFAULT_STEP,
            default_block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}
