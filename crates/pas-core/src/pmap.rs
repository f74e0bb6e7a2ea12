//! `pmap<K, V>` — a sorted-array associative map kept inside a [`Pas`],
//! built on top of [`crate::parr`]'s sorted insertion.
//!
//! Lookup and insertion are both `O(log n)` to find the slot; insertion and
//! erasure are `O(n)` to shift the tail, the same trade-off a sorted
//! `Vec`-backed map makes in memory. This is the right shape for the small,
//! rarely-mutated key sets (schema fields, named children) this crate's
//! callers actually use it for.

use std::marker::PhantomData;

use bytemuck::Pod;

use crate::offset::Offset;
use crate::pas::{ArrayHeader, Pas};
use crate::parr;

/// A `{key, value}` pair as stored in the backing array. `Pod` requires
/// both `K` and `V` to be `Pod` themselves; `repr(C)` with no padding makes
/// the derive sound for any such pair.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct Pair<K, V> {
    pub key: K,
    pub value: V,
}

// SAFETY: a `#[repr(C)]` struct of two `Pod` fields has no padding bytes
// that could hold an invalid value, and is valid for any bit pattern both
// fields are.
unsafe impl<K: Pod, V: Pod> Pod for Pair<K, V> {}
unsafe impl<K: bytemuck::Zeroable, V: bytemuck::Zeroable> bytemuck::Zeroable for Pair<K, V> {}

/// A handle to a persistent sorted-array map from `K` to `V`.
pub struct PMap<K, V> {
    hdr_off: Offset,
    _marker: PhantomData<(K, V)>,
}

impl<K, V> Copy for PMap<K, V> {}
impl<K, V> Clone for PMap<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> PMap<K, V> {
    /// Wraps an already-allocated header offset without creating anything.
    #[must_use]
    pub const fn from_offset(hdr_off: Offset) -> Self {
        PMap {
            hdr_off,
            _marker: PhantomData,
        }
    }

    /// The header's offset, for storing inside another persistent record.
    #[must_use]
    pub const fn offset(&self) -> Offset {
        self.hdr_off
    }
}

impl<K: Pod + Ord, V: Pod> PMap<K, V> {
    /// Allocates a new, empty map.
    #[must_use]
    pub fn new(pas: &mut Pas, name: Option<&str>) -> Self {
        let hdr_off = pas.create::<ArrayHeader>(name);
        parr::init(pas, hdr_off);
        PMap {
            hdr_off,
            _marker: PhantomData,
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self, pas: &Pas) -> u64 {
        parr::len(pas, self.hdr_off)
    }

    /// `true` if empty.
    #[must_use]
    pub fn is_empty(&self, pas: &Pas) -> bool {
        self.len(pas) == 0
    }

    /// Inserts `value` under `key`, overwriting any existing entry for the
    /// same key. Returns the index the entry now occupies (unspecified,
    /// shifts as the map grows — useful only to confirm success).
    pub fn insert(&self, pas: &mut Pas, key: K, value: V) -> u64 {
        parr::insert_sorted(pas, self.hdr_off, Pair { key, value }, |p: &Pair<K, V>| p.key)
    }

    /// Looks up `key`.
    #[must_use]
    pub fn find(&self, pas: &Pas, key: &K) -> Option<V> {
        parr::find_sorted(pas, self.hdr_off, key, |p: &Pair<K, V>| p.key).map(|p| p.value)
    }

    /// `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, pas: &Pas, key: &K) -> bool {
        self.find(pas, key).is_some()
    }

    /// Removes the entry for `key`, if present. Returns `true` if an entry
    /// was removed.
    pub fn erase(&self, pas: &mut Pas, key: &K) -> bool {
        let hdr = pas.array_header(self.hdr_off.get());
        let mut lo = 0u64;
        let mut hi = hdr.size;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let p: Pair<K, V> = pas.record_at(hdr.data_off, mid);
            if p.key < *key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo >= hdr.size {
            return false;
        }
        let at: Pair<K, V> = pas.record_at(hdr.data_off, lo);
        if at.key != *key {
            return false;
        }
        parr::erase_at::<Pair<K, V>>(pas, self.hdr_off, lo)
    }

    /// Releases the backing buffer and the header slot.
    pub fn free(self, pas: &mut Pas) {
        parr::free::<Pair<K, V>>(pas, self.hdr_off);
        pas.delete(self.hdr_off);
    }
}

impl<K: Pod + Ord, V: Pod + Default> PMap<K, V> {
    /// Returns the value for `key`, inserting `V::default()` first if
    /// absent — the persistent counterpart of `operator[]`.
    pub fn get_or_insert_default(&self, pas: &mut Pas, key: K) -> V {
        if let Some(v) = self.find(pas, &key) {
            return v;
        }
        let value = V::default();
        self.insert(pas, key, value);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pas::Pas;

    #[test]
    fn insert_then_find() {
        let mut pas = Pas::new();
        let m = PMap::<u32, i64>::new(&mut pas, Some("m"));
        m.insert(&mut pas, 1, 100);
        m.insert(&mut pas, 2, 200);
        assert_eq!(m.find(&pas, &1), Some(100));
        assert_eq!(m.find(&pas, &2), Some(200));
        assert_eq!(m.find(&pas, &3), None);
    }

    #[test]
    fn insert_overwrites_existing_key() {
        let mut pas = Pas::new();
        let m = PMap::<u32, i64>::new(&mut pas, None);
        m.insert(&mut pas, 1, 100);
        m.insert(&mut pas, 1, 999);
        assert_eq!(m.len(&pas), 1);
        assert_eq!(m.find(&pas, &1), Some(999));
    }

    #[test]
    fn erase_removes_only_the_matching_key() {
        let mut pas = Pas::new();
        let m = PMap::<u32, i64>::new(&mut pas, None);
        for k in [3u32, 1, 2] {
            m.insert(&mut pas, k, k as i64 * 10);
        }
        assert!(m.erase(&mut pas, &2));
        assert!(!m.contains_key(&pas, &2));
        assert_eq!(m.find(&pas, &1), Some(10));
        assert_eq!(m.find(&pas, &3), Some(30));
        assert!(!m.erase(&mut pas, &2));
    }

    #[test]
    fn get_or_insert_default_only_inserts_once() {
        let mut pas = Pas::new();
        let m = PMap::<u32, i64>::new(&mut pas, None);
        assert_eq!(m.get_or_insert_default(&mut pas, 7), 0);
        m.insert(&mut pas, 7, 42);
        assert_eq!(m.get_or_insert_default(&mut pas, 7), 42);
        assert_eq!(m.len(&pas), 1);
    }

    #[test]
    fn entries_stay_sorted_by_key_across_many_insertions() {
        let mut pas = Pas::new();
        let m = PMap::<i32, i32>::new(&mut pas, None);
        for k in (0..50).rev() {
            m.insert(&mut pas, k, k * 2);
        }
        let hdr = pas.array_header(m.offset().get());
        let mut last = i32::MIN;
        for i in 0..hdr.size {
            let p: Pair<i32, i32> = pas.record_at(hdr.data_off, i);
            assert!(p.key > last);
            last = p.key;
        }
        assert_eq!(hdr.size, 50);
    }
}
