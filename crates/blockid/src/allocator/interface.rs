use core::fmt;

/// A minimal interface for issuing ids from named sequences.
pub trait SequenceGenerator {
    /// The error type returned by every operation.
    type Err: fmt::Debug;

    /// Issues the next id of `entity`.
    ///
    /// # Errors
    ///
    /// Returns an error if a database top-up was needed and failed.
    fn next_id(&self, entity: &str) -> Result<i64, Self::Err> {
        let ids = self.next_ids(entity, 1)?;
        Ok(ids[0])
    }

    /// Issues `count` ids of `entity`, sorted and distinct, using the
    /// generator's default step and block size for a new entity.
    ///
    /// # Errors
    ///
    /// Returns an error if a database top-up was needed and failed.
    fn next_ids(&self, entity: &str, count: usize) -> Result<Vec<i64>, Self::Err>;

    /// Issues `count` ids of `entity`, seeding a new entity with `step` and
    /// `block_size`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or a database top-up was
    /// needed and failed.
    fn next_ids_with(
        &self,
        entity: &str,
        count: usize,
        step: i32,
        block_size: i64,
    ) -> Result<Vec<i64>, Self::Err>;
}
