use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    Result, Window,
    mutex::{Mutex, lock},
};

type Slot = Arc<Mutex<Option<Window>>>;

/// In-process map from entity name to its current [`Window`].
///
/// Each entity gets its own mutex, created lazily on first use. The outer map
/// lock is only held long enough to find or insert a slot, so callers working
/// on different entities never wait on each other; callers on the same entity
/// are serialized for the whole read-modify-write, including any database
/// round trip it needs.
#[derive(Default)]
pub struct WindowCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl WindowCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replaces the window of `entity` with the one computed by
    /// `f`.
    ///
    /// `f` sees the current window (if any) and returns the replacement along
    /// with a value passed back to the caller. The cached window is only
    /// replaced when `f` succeeds; on error it is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or [`crate::Error::LockPoisoned`] when a std
    /// mutex was poisoned.
    pub fn compute<T, F>(&self, entity: &str, f: F) -> Result<T>
    where
        F: FnOnce(Option<&Window>) -> Result<(Window, T)>,
    {
        let slot = self.slot(entity)?;
        let mut current = lock(&slot)?;
        let (next, value) = f(current.as_ref())?;
        debug_assert!(current.as_ref().is_none_or(|w| next.prev() >= w.prev()));
        *current = Some(next);
        Ok(value)
    }

    /// Returns a copy of the cached window of `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockPoisoned`] when a std mutex was poisoned.
    pub fn get(&self, entity: &str) -> Result<Option<Window>> {
        let slot = lock(&self.slots)?.get(entity).cloned();
        match slot {
            Some(slot) => Ok(lock(&slot)?.clone()),
            None => Ok(None),
        }
    }

    /// Drops the cached window of `entity`, returning it.
    ///
    /// The next request for the entity goes to the database. Waits for any
    /// in-flight request on the entity to finish first. The entity's slot is
    /// released too unless another caller is holding it at that moment.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockPoisoned`] when a std mutex was poisoned.
    pub fn evict(&self, entity: &str) -> Result<Option<Window>> {
        let slot = {
            let mut slots = lock(&self.slots)?;
            let Some(slot) = slots.get(entity).cloned() else {
                return Ok(None);
            };
            // only the map and `slot` hold it: no request is in flight
            if Arc::strong_count(&slot) == 2 {
                slots.remove(entity);
            }
            slot
        };
        Ok(lock(&slot)?.take())
    }

    /// Number of entities that have a slot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockPoisoned`] when a std mutex was poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(lock(&self.slots)?.len())
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::LockPoisoned`] when a std mutex was poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn slot(&self, entity: &str) -> Result<Slot> {
        let mut slots = lock(&self.slots)?;
        if let Some(slot) = slots.get(entity) {
            return Ok(Arc::clone(slot));
        }
        let slot = Slot::default();
        slots.insert(entity.to_owned(), Arc::clone(&slot));
        Ok(slot)
    }
}
