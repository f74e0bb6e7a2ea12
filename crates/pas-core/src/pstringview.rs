//! `pstringview` and its interning dictionary.
//!
//! A [`PStringView`] is a read-only `{length, chars_off}` pair pointing at
//! a NUL-terminated buffer owned by the dictionary, never by the view
//! itself. Interning the same content from unrelated call sites always
//! returns the same `chars_off`, so two views can be compared for equality
//! by comparing offsets rather than bytes. The dictionary is a persistent
//! open-addressing hash table (FNV-1a, linear probing, rehash at load
//! factor 0.5) whose own offset is recorded in the `Pas` header so the
//! singleton survives a save/load round trip.

use bytemuck::{Pod, Zeroable};

use crate::offset::Offset;
use crate::pas::Pas;

const INITIAL_BUCKETS: u64 = 8;
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// A read-only, interned string. `chars_off == 0` denotes the empty
/// string, which is never stored in the dictionary.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct PStringView {
    /// Length in bytes, not counting the NUL terminator.
    pub length: u64,
    /// Offset of the NUL-terminated buffer owned by the dictionary.
    pub chars_off: u64,
}

impl PStringView {
    /// The interned empty string.
    pub const EMPTY: PStringView = PStringView {
        length: 0,
        chars_off: 0,
    };
}

/// Borrows the view's content as a `&str`.
#[must_use]
pub fn resolve<'a>(pas: &'a Pas, view: PStringView) -> &'a str {
    if view.length == 0 || view.chars_off == 0 {
        return "";
    }
    std::str::from_utf8(pas.bytes(view.chars_off, view.length)).unwrap_or("")
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct StringTable {
    bucket_count: u64,
    occupied: u64,
    buckets_off: u64,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Bucket {
    hash: u64,
    chars_off: u64,
    length: u64,
}

impl Bucket {
    const EMPTY: Bucket = Bucket {
        hash: 0,
        chars_off: 0,
        length: 0,
    };

    fn is_empty(self) -> bool {
        self.chars_off == 0
    }
}

fn alloc_bucket_array(pas: &mut Pas, count: u64) -> Offset {
    let off = pas.alloc_region(
        count * std::mem::size_of::<Bucket>() as u64,
        std::mem::align_of::<Bucket>() as u64,
    );
    for i in 0..count {
        pas.set_record_at(off.get(), i, Bucket::EMPTY);
    }
    off
}

/// Returns the dictionary's header offset, creating an empty dictionary on
/// first use and recording its offset in the `Pas` header.
fn get_or_init_table(pas: &mut Pas) -> Offset {
    let existing = pas.string_table_offset();
    if !existing.is_null() {
        return existing;
    }
    let buckets_off = alloc_bucket_array(pas, INITIAL_BUCKETS);
    let table_off = pas.create::<StringTable>(None);
    if let Some(t) = pas.resolve_mut::<StringTable>(table_off) {
        t.bucket_count = INITIAL_BUCKETS;
        t.occupied = 0;
        t.buckets_off = buckets_off.get();
    }
    pas.set_string_table_offset(table_off);
    table_off
}

fn probe(pas: &Pas, buckets_off: u64, bucket_count: u64, hash: u64, bytes: &[u8]) -> (u64, bool) {
    let mut idx = hash % bucket_count;
    loop {
        let bucket: Bucket = pas.record_at(buckets_off, idx);
        if bucket.is_empty() {
            return (idx, false);
        }
        if bucket.hash == hash && pas.bytes(bucket.chars_off, bucket.length) == bytes {
            return (idx, true);
        }
        idx = (idx + 1) % bucket_count;
    }
}

fn rehash(pas: &mut Pas, table_off: Offset, new_bucket_count: u64) {
    let table: StringTable = pas.record_at(table_off.get(), 0);
    let old_buckets_off = table.buckets_off;
    let old_count = table.bucket_count;

    let new_buckets_off = alloc_bucket_array(pas, new_bucket_count);
    for i in 0..old_count {
        let bucket: Bucket = pas.record_at(old_buckets_off, i);
        if bucket.is_empty() {
            continue;
        }
        let hash = bucket.hash;
        let mut idx = hash % new_bucket_count;
        loop {
            let slot: Bucket = pas.record_at(new_buckets_off.get(), idx);
            if slot.is_empty() {
                break;
            }
            idx = (idx + 1) % new_bucket_count;
        }
        pas.set_record_at(new_buckets_off.get(), idx, bucket);
    }

    pas.free_region(
        Offset(old_buckets_off),
        old_count * std::mem::size_of::<Bucket>() as u64,
    );
    if let Some(t) = pas.resolve_mut::<StringTable>(table_off) {
        t.bucket_count = new_bucket_count;
        t.buckets_off = new_buckets_off.get();
    }
}

/// Interns `s`, returning a view shared by every other interning of the
/// same content. The empty string is never stored; [`PStringView::EMPTY`]
/// is returned directly.
pub fn intern(pas: &mut Pas, s: &str) -> PStringView {
    if s.is_empty() {
        return PStringView::EMPTY;
    }
    let table_off = get_or_init_table(pas);
    let bytes = s.as_bytes();
    let hash = fnv1a(bytes);

    let table: StringTable = pas.record_at(table_off.get(), 0);
    let (idx, found) = probe(pas, table.buckets_off, table.bucket_count, hash, bytes);
    if found {
        let bucket: Bucket = pas.record_at(table.buckets_off, idx);
        return PStringView {
            length: bucket.length,
            chars_off: bucket.chars_off,
        };
    }

    let chars_off = pas.alloc_region(bytes.len() as u64 + 1, 1);
    pas.write_bytes(chars_off.get(), bytes);

    // The dictionary may have moved if allocating the characters grew the
    // data area; re-resolve before writing the new bucket.
    let table: StringTable = pas.record_at(table_off.get(), 0);
    let (idx, _) = probe(pas, table.buckets_off, table.bucket_count, hash, bytes);
    let new_bucket = Bucket {
        hash,
        chars_off: chars_off.get(),
        length: bytes.len() as u64,
    };
    pas.set_record_at(table.buckets_off, idx, new_bucket);

    let occupied = table.occupied + 1;
    if let Some(t) = pas.resolve_mut::<StringTable>(table_off) {
        t.occupied = occupied;
    }
    if occupied as f64 / table.bucket_count as f64 > 0.5 {
        rehash(pas, table_off, table.bucket_count * 2);
    }

    PStringView {
        length: bytes.len() as u64,
        chars_off: chars_off.get(),
    }
}

/// Every interned string whose content contains `pattern`.
#[must_use]
pub fn search_strings(pas: &Pas, pattern: &str) -> Vec<PStringView> {
    let table_off = pas.string_table_offset();
    if table_off.is_null() {
        return Vec::new();
    }
    let table: StringTable = pas.record_at(table_off.get(), 0);
    let mut matches = Vec::new();
    for i in 0..table.bucket_count {
        let bucket: Bucket = pas.record_at(table.buckets_off, i);
        if bucket.is_empty() {
            continue;
        }
        let view = PStringView {
            length: bucket.length,
            chars_off: bucket.chars_off,
        };
        if resolve(pas, view).contains(pattern) {
            matches.push(view);
        }
    }
    matches
}

/// Every interned string, in bucket order (unspecified, stable for a given
/// image).
#[must_use]
pub fn all_strings(pas: &Pas) -> Vec<PStringView> {
    let table_off = pas.string_table_offset();
    if table_off.is_null() {
        return Vec::new();
    }
    let table: StringTable = pas.record_at(table_off.get(), 0);
    (0..table.bucket_count)
        .filter_map(|i| {
            let bucket: Bucket = pas.record_at(table.buckets_off, i);
            (!bucket.is_empty()).then_some(PStringView {
                length: bucket.length,
                chars_off: bucket.chars_off,
            })
        })
        .collect()
}

/// Number of distinct strings currently interned.
#[must_use]
pub fn count(pas: &Pas) -> u64 {
    let table_off = pas.string_table_offset();
    if table_off.is_null() {
        return 0;
    }
    pas.record_at::<StringTable>(table_off.get(), 0).occupied
}
