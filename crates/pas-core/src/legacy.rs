//! A thin, per-type adapter kept only so tests written against the
//! earlier, narrower allocator API (one singleton-per-type, rather than
//! one shared [`Pas`]) still have something to call. New code should use
//! [`Pas`] directly; nothing in this crate builds on top of
//! [`AddressManager`].

use std::marker::PhantomData;

use bytemuck::Pod;

use crate::offset::Offset;
use crate::pas::Pas;

/// Wraps a single [`Pas`] and constrains every operation to one element
/// type `T`, mirroring the original's `AddressManager<T>::GetManager()`
/// singleton-per-type shape.
pub struct AddressManager<T> {
    pas: Pas,
    _marker: PhantomData<T>,
}

impl<T: Pod> Default for AddressManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pod> AddressManager<T> {
    /// Creates a manager backed by a fresh, empty [`Pas`].
    #[must_use]
    pub fn new() -> Self {
        AddressManager {
            pas: Pas::new(),
            _marker: PhantomData,
        }
    }

    /// Allocates a single `T`, optionally named.
    pub fn create(&mut self, name: Option<&str>) -> Offset {
        self.pas.create::<T>(name)
    }

    /// Allocates an array of `count` elements of `T`, optionally named.
    pub fn create_array(&mut self, count: u64, name: Option<&str>) -> Offset {
        self.pas.create_array::<T>(count, name)
    }

    /// Resolves `offset` to a shared reference.
    #[must_use]
    pub fn resolve(&self, offset: Offset) -> Option<&T> {
        self.pas.resolve(offset)
    }

    /// Resolves `offset` to an exclusive reference.
    pub fn resolve_mut(&mut self, offset: Offset) -> Option<&mut T> {
        self.pas.resolve_mut(offset)
    }

    /// Finds a previously named `T` by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Offset {
        self.pas.find_typed::<T>(name)
    }

    /// Releases the slot at `offset`.
    pub fn delete(&mut self, offset: Offset) {
        self.pas.delete(offset);
    }

    /// Borrows the underlying [`Pas`], for callers that need an operation
    /// this adapter does not expose.
    #[must_use]
    pub fn pas(&self) -> &Pas {
        &self.pas
    }

    /// Mutably borrows the underlying [`Pas`].
    pub fn pas_mut(&mut self) -> &mut Pas {
        &mut self.pas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_resolve_and_delete_round_trip() {
        let mut mgr = AddressManager::<u64>::new();
        let off = mgr.create(Some("counter"));
        assert!(!off.is_null());
        *mgr.resolve_mut(off).unwrap() = 42;
        assert_eq!(*mgr.resolve(off).unwrap(), 42);
        assert_eq!(mgr.find("counter"), off);
        mgr.delete(off);
        assert_eq!(mgr.find("counter"), Offset::NULL);
    }

    #[test]
    fn create_array_resolves_each_element() {
        let mut mgr = AddressManager::<u32>::new();
        let off = mgr.create_array(4, None);
        for i in 0..4u64 {
            if let Some(v) = mgr.pas_mut().resolve_element_mut::<u32>(off, i) {
                *v = i as u32;
            }
        }
        for i in 0..4u64 {
            assert_eq!(*mgr.pas().resolve_element::<u32>(off, i).unwrap(), i as u32);
        }
    }
}
