use thiserror::Error;

/// Boxed error produced by a database backend.
///
/// Connections report their own error types; the allocator erases them here so
/// it stays generic over the backend.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Result type used throughout `blockid`.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `blockid` can produce.
///
/// Errors are always surfaced to the caller. None of them leave a partially
/// updated [`crate::Window`] behind: the cached lease is only replaced after a
/// request fully succeeds.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A table or column identifier, or an allocator default, was rejected at
    /// construction time. No database access was attempted.
    #[error("invalid configuration: {reason}")]
    Configuration { reason: String },

    /// The request itself was malformed (empty entity name, non-positive step
    /// or block size, count too large).
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// A statement, transaction or connection failed while reserving ids.
    #[error("failed to reserve ids for entity `{entity}`")]
    Generation {
        entity: String,
        #[source]
        source: BoxError,
    },

    /// The single retry under a table-level lock failed.
    #[error("table lock escalation failed for entity `{entity}`")]
    LockEscalationExhausted {
        entity: String,
        #[source]
        source: BoxError,
    },

    /// Reserving the requested ids would overflow the 64-bit id space.
    #[error("id space exhausted for entity `{entity}`")]
    Overflow { entity: String },

    /// A cache lock was poisoned by a panicking thread.
    ///
    /// `parking_lot` mutexes do not poison, so this variant only exists when
    /// the `parking-lot` feature is disabled.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("window cache lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    pub(crate) fn generation(entity: &str, source: impl Into<BoxError>) -> Self {
        Self::Generation {
            entity: entity.to_owned(),
            source: source.into(),
        }
    }

    pub(crate) fn overflow(entity: &str) -> Self {
        Self::Overflow {
            entity: entity.to_owned(),
        }
    }
}

#[cfg(not(feature = "parking-lot"))]
use crate::mutex::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
// Convert all poisoned lock errors to a simplified `LockPoisoned`
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
