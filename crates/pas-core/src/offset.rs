//! [`Offset`] — a typed handle into a [`crate::Pas`]'s data area.

use bytemuck::{Pod, Zeroable};

/// A byte offset into a [`crate::Pas`]'s data area.
///
/// `Offset` is the Rust stand-in for the original allocator's raw
/// `uintptr_t`: it is meaningless outside the `Pas` it was produced by, and
/// it must be re-resolved (via [`crate::Pas::resolve`]) after any call that
/// may have reallocated the backing buffer. It is never a real pointer, so
/// it stays valid across a `Save`/load round trip.
///
/// `Offset(0)` is reserved as [`Offset::NULL`] — "no object here" — the same
/// convention the allocator uses for its zero-offset sentinel.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
pub struct Offset(pub u64);

impl Offset {
    /// The null offset: "no object", "not found", "allocation failed".
    pub const NULL: Offset = Offset(0);

    /// Returns `true` if this is [`Offset::NULL`].
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The raw byte value of this offset.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn checked_add(self, delta: u64) -> Option<Offset> {
        self.0.checked_add(delta).map(Offset)
    }
}

impl std::fmt::Debug for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "Offset(NULL)")
        } else {
            write!(f, "Offset({})", self.0)
        }
    }
}

impl From<u64> for Offset {
    fn from(value: u64) -> Self {
        Offset(value)
    }
}

impl Default for Offset {
    fn default() -> Self {
        Offset::NULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_zero() {
        assert!(Offset::NULL.is_null());
        assert!(Offset(0).is_null());
        assert!(!Offset(1).is_null());
    }

    #[test]
    fn checked_add_saturates_to_none_on_overflow() {
        assert_eq!(Offset(u64::MAX).checked_add(1), None);
        assert_eq!(Offset(1).checked_add(1), Some(Offset(2)));
    }
}
