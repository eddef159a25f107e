use std::num::NonZeroU32;

use crate::BatchError;

/// Identity of a live primitive.
///
/// Stable across sort passes even though the record itself moves. Zero is
/// never issued; a record whose stored id reads 0 has been purged.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PrimitiveId(NonZeroU32);

impl PrimitiveId {
    #[inline]
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

/// Source of strictly increasing primitive identifiers.
///
/// Each batch buffer owns one. Hosts that want a single sequence across
/// several buffers hand each new buffer a counter that starts after the
/// previous buffer's [`IdCounter::last`].
#[derive(Debug, Clone, Default)]
pub struct IdCounter {
    last: u32,
}

impl IdCounter {
    #[inline]
    pub const fn new() -> Self {
        Self { last: 0 }
    }

    /// Counter whose next id is `last + 1`.
    #[inline]
    pub const fn starting_after(last: u32) -> Self {
        Self { last }
    }

    /// The most recently issued raw id (0 if none).
    #[inline]
    pub const fn last(&self) -> u32 {
        self.last
    }

    /// Issues the next id.
    pub fn next_id(&mut self) -> Result<PrimitiveId, BatchError> {
        let next = self.last.checked_add(1).ok_or(BatchError::IdentifierExhausted)?;
        let id = PrimitiveId::new(next).ok_or(BatchError::IdentifierExhausted)?;
        self.last = next;
        Ok(id)
    }
}
