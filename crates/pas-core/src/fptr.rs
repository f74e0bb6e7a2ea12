//! [`Fptr`] — a pointer-sized, typed handle usable inside other persistent
//! structures.
//!
//! Where [`crate::Offset`] is the untyped currency every module trades in,
//! `Fptr<T>` pins the type down so a field of a POD struct can declare "an
//! offset that, when resolved, is a `T`" without a separate type tag.
//! Dereferencing always re-queries the owning [`Pas`]; nothing here caches
//! a pointer.

use std::marker::PhantomData;

use bytemuck::Pod;

use crate::offset::Offset;
use crate::pas::Pas;

/// A persistent handle to a `T` (or an array of `T`) living in a [`Pas`].
///
/// `Fptr<T>` is itself `Pod`, so it can be embedded as a field of any other
/// persistent record — this is how containers refer to their backing
/// storage.
#[repr(transparent)]
pub struct Fptr<T> {
    offset: Offset,
    _marker: PhantomData<T>,
}

// `PhantomData<T>` keeps `Fptr` generic without widening its footprint, and
// imposes no bound on `T` for these impls — only the methods that actually
// touch storage require `T: Pod`.
impl<T> Copy for Fptr<T> {}
impl<T> Clone for Fptr<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> PartialEq for Fptr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
    }
}
impl<T> Eq for Fptr<T> {}

impl<T> std::fmt::Debug for Fptr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Fptr").field(&self.offset).finish()
    }
}

impl<T> Default for Fptr<T> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<T> Fptr<T> {
    /// A handle that resolves to nothing.
    pub const NULL: Fptr<T> = Fptr {
        offset: Offset::NULL,
        _marker: PhantomData,
    };

    /// Wraps an already-resolved [`Offset`] — used to load a handle from a
    /// stored offset without going through a name lookup.
    #[must_use]
    pub const fn set_addr(offset: Offset) -> Self {
        Fptr {
            offset,
            _marker: PhantomData,
        }
    }

    /// The underlying offset.
    #[must_use]
    pub const fn offset(self) -> Offset {
        self.offset
    }

    /// `true` if this handle resolves to nothing.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.offset.is_null()
    }
}

impl<T: Pod> Fptr<T> {
    /// Allocates a new `T` and returns a handle to it.
    #[must_use]
    pub fn new(pas: &mut Pas, name: Option<&str>) -> Self {
        Self::set_addr(pas.create::<T>(name))
    }

    /// Allocates a new array of `count` `T`s and returns a handle to its
    /// first element.
    #[must_use]
    pub fn new_array(pas: &mut Pas, count: u64, name: Option<&str>) -> Self {
        Self::set_addr(pas.create_array::<T>(count, name))
    }

    /// Resolves to a shared reference, or `None` if null or out of range.
    #[must_use]
    pub fn get<'a>(self, pas: &'a Pas) -> Option<&'a T> {
        pas.resolve(self.offset)
    }

    /// Resolves to an exclusive reference, or `None` if null or out of
    /// range.
    #[must_use]
    pub fn get_mut<'a>(self, pas: &'a mut Pas) -> Option<&'a mut T> {
        pas.resolve_mut(self.offset)
    }

    /// Frees the slot this handle points to.
    pub fn delete(self, pas: &mut Pas) {
        pas.delete(self.offset);
    }
}

// SAFETY: `Fptr<T>` has the same layout as `Offset` (a `u64`) regardless of
// `T`, and is valid for any bit pattern since `Offset` is.
unsafe impl<T: 'static> Pod for Fptr<T> {}
unsafe impl<T: 'static> bytemuck::Zeroable for Fptr<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_then_get_mut_then_get() {
        let mut pas = Pas::new();
        let handle = Fptr::<u64>::new(&mut pas, Some("h"));
        assert!(!handle.is_null());
        *handle.get_mut(&mut pas).unwrap() = 99;
        assert_eq!(*handle.get(&pas).unwrap(), 99);
    }

    #[test]
    fn null_handle_resolves_to_none() {
        let pas = Pas::new();
        let handle = Fptr::<u64>::NULL;
        assert!(handle.get(&pas).is_none());
    }

    #[test]
    fn set_addr_round_trips_through_offset() {
        let mut pas = Pas::new();
        let off = pas.create::<u32>(None);
        let handle = Fptr::<u32>::set_addr(off);
        assert_eq!(handle.offset(), off);
    }

    #[test]
    fn delete_releases_the_slot() {
        let mut pas = Pas::new();
        let handle = Fptr::<u64>::new(&mut pas, Some("x"));
        handle.delete(&mut pas);
        assert_eq!(pas.find("x"), Offset::NULL);
    }
}
