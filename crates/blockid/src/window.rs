/// A process-local lease over a contiguous id range of one entity.
///
/// Windows are immutable values: every request that issues ids produces a new
/// window and the old one is discarded. Nothing about a window is persisted;
/// the durable counter row is the only state that survives a restart.
///
/// - `prev` is the last id already handed out (the next one is `prev + step`).
/// - `max` is the inclusive ceiling this process reserved in the database.
/// - `step` is the spacing between consecutive ids.
/// - `block_size` is the granularity the ceiling grows by.
///
/// Invariant: `prev <= max`. Windows are only built inside the crate; a
/// deserialized window is rejected unless `prev <= max` and both `step` and
/// `block_size` are positive.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "WindowParts"))]
pub struct Window {
    entity_name: String,
    prev: i64,
    max: i64,
    step: i32,
    block_size: i64,
}

impl Window {
    /// Creates a window. `prev` is clamped to `max` so the invariant holds.
    pub(crate) fn new(
        entity_name: impl Into<String>,
        prev: i64,
        max: i64,
        step: i32,
        block_size: i64,
    ) -> Self {
        Self {
            entity_name: entity_name.into(),
            prev: prev.min(max),
            max,
            step,
            block_size,
        }
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub const fn prev(&self) -> i64 {
        self.prev
    }

    pub const fn max(&self) -> i64 {
        self.max
    }

    pub const fn step(&self) -> i32 {
        self.step
    }

    pub const fn block_size(&self) -> i64 {
        self.block_size
    }

    /// Number of ids still issuable from this window without touching the
    /// database.
    ///
    /// A window read from a corrupt row with a non-positive step has none.
    pub const fn remaining(&self) -> i64 {
        if self.step <= 0 {
            return 0;
        }
        (self.max - self.prev) / self.step as i64
    }

    /// Returns `true` if `count` more ids fit under `max`.
    pub const fn covers(&self, count: i64) -> bool {
        if self.step <= 0 {
            return false;
        }
        match count.checked_mul(self.step as i64) {
            Some(span) => match self.prev.checked_add(span) {
                Some(candidate) => candidate <= self.max,
                None => false,
            },
            None => false,
        }
    }

    /// Issues `count` ids into `out` and returns the advanced window.
    ///
    /// The caller must ensure `count <= self.remaining()`.
    pub(crate) fn issue(&self, count: i64, out: &mut Vec<i64>) -> Self {
        debug_assert!(count <= self.remaining());
        let step = i64::from(self.step);
        let mut prev = self.prev;
        for _ in 0..count {
            prev += step;
            out.push(prev);
        }
        Self {
            prev,
            ..self.clone()
        }
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct WindowParts {
    entity_name: String,
    prev: i64,
    max: i64,
    step: i32,
    block_size: i64,
}

#[cfg(feature = "serde")]
impl TryFrom<WindowParts> for Window {
    type Error = crate::Error;

    fn try_from(parts: WindowParts) -> crate::Result<Self> {
        if parts.step <= 0 || parts.block_size <= 0 {
            return Err(crate::Error::configuration(format!(
                "window of `{}` has non-positive step {} or block size {}",
                parts.entity_name, parts.step, parts.block_size
            )));
        }
        if parts.prev > parts.max {
            return Err(crate::Error::configuration(format!(
                "window of `{}` has prev {} above max {}",
                parts.entity_name, parts.prev, parts.max
            )));
        }
        Ok(Self::new(
            parts.entity_name,
            parts.prev,
            parts.max,
            parts.step,
            parts.block_size,
        ))
    }
}
