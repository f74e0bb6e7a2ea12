//! `pjson` — a persistent, discriminated JSON value.
//!
//! A [`PJson`] is a 32-byte POD record: a `u32` tag plus three `u64` payload
//! words. Scalars use one word; strings use two (`{length, chars_off}`);
//! arrays and objects store the offset of a [`crate::pas::ArrayHeader`]
//! whose backing buffer holds `PJson` elements (arrays) or [`PJsonEntry`]
//! pairs sorted by key (objects), grown through [`crate::parr`] exactly
//! like a `pvector`/`pmap`.
//!
//! Every operation here addresses its target by [`Offset`] and reads or
//! writes the record by value through `Pas`'s record accessors rather than
//! holding a live reference across an allocating call — the offset itself
//! is never invalidated by a reallocation elsewhere, only a borrowed `&T`
//! would be, so the "re-resolve `self` after every allocation" dance the
//! original implementation needs is unnecessary here: there is no `self`
//! pointer to invalidate in the first place.

mod text;

pub use text::{from_string, to_string};

use std::mem;

use bytemuck::{Pod, Zeroable};

use crate::offset::Offset;
use crate::pas::{ArrayHeader, Pas};
use crate::parr;

/// Discriminant for [`PJson`]'s payload.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PJsonTag {
    Null,
    Bool,
    Int,
    UInt,
    Real,
    String,
    Array,
    Object,
}

impl PJsonTag {
    const fn from_raw(raw: u32) -> PJsonTag {
        match raw {
            1 => PJsonTag::Bool,
            2 => PJsonTag::Int,
            3 => PJsonTag::UInt,
            4 => PJsonTag::Real,
            5 => PJsonTag::String,
            6 => PJsonTag::Array,
            7 => PJsonTag::Object,
            _ => PJsonTag::Null,
        }
    }

    const fn raw(self) -> u32 {
        match self {
            PJsonTag::Null => 0,
            PJsonTag::Bool => 1,
            PJsonTag::Int => 2,
            PJsonTag::UInt => 3,
            PJsonTag::Real => 4,
            PJsonTag::String => 5,
            PJsonTag::Array => 6,
            PJsonTag::Object => 7,
        }
    }
}

/// The on-disk JSON value record. `w2` is unused by `pjson` itself; it
/// exists so the layout matches [`crate::node`]'s `$ref` variant, which
/// needs a third word.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct PJson {
    tag: u32,
    _pad: u32,
    w0: u64,
    w1: u64,
    w2: u64,
}

impl PJson {
    /// A freshly zeroed (null) value.
    pub const NULL: PJson = PJson {
        tag: 0,
        _pad: 0,
        w0: 0,
        w1: 0,
        w2: 0,
    };
}

/// One `{key, value}` pair inside a `pjson` object, the element type of an
/// object's backing array.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct PJsonEntry {
    key_length: u64,
    key_chars_off: u64,
    pub value: PJson,
}

impl PJsonEntry {
    const EMPTY: PJsonEntry = PJsonEntry {
        key_length: 0,
        key_chars_off: 0,
        value: PJson::NULL,
    };

    fn key<'a>(self, pas: &'a Pas) -> &'a str {
        if self.key_chars_off == 0 {
            return "";
        }
        std::str::from_utf8(pas.bytes(self.key_chars_off, self.key_length)).unwrap_or("")
    }
}

fn read(pas: &Pas, off: Offset) -> PJson {
    pas.read_record(off.get())
}

fn write(pas: &mut Pas, off: Offset, value: PJson) {
    pas.write_record(off.get(), value);
}

fn entry_offset(pas: &Pas, header_off: u64, index: u64) -> u64 {
    let entry_off =
        pas.array_header(header_off).data_off + index * mem::size_of::<PJsonEntry>() as u64;
    entry_off + mem::offset_of!(PJsonEntry, value) as u64
}

/// Allocates a new, top-level null value.
#[must_use]
pub fn create(pas: &mut Pas, name: Option<&str>) -> Offset {
    pas.create::<PJson>(name)
}

/// The value's type tag.
#[must_use]
pub fn type_tag(pas: &Pas, off: Offset) -> PJsonTag {
    PJsonTag::from_raw(read(pas, off).tag)
}

macro_rules! is_tag {
    ($name:ident, $tag:ident) => {
        #[must_use]
        pub fn $name(pas: &Pas, off: Offset) -> bool {
            type_tag(pas, off) == PJsonTag::$tag
        }
    };
}

is_tag!(is_null, Null);
is_tag!(is_bool, Bool);
is_tag!(is_int, Int);
is_tag!(is_uint, UInt);
is_tag!(is_real, Real);
is_tag!(is_string, String);
is_tag!(is_array, Array);
is_tag!(is_object, Object);

/// `true` for any numeric tag (int, uint, or real).
#[must_use]
pub fn is_number(pas: &Pas, off: Offset) -> bool {
    matches!(
        type_tag(pas, off),
        PJsonTag::Int | PJsonTag::UInt | PJsonTag::Real
    )
}

/// Element/pair count for array, object, or string length for string;
/// `0` for every other tag.
#[must_use]
pub fn size(pas: &Pas, off: Offset) -> u64 {
    let v = read(pas, off);
    match PJsonTag::from_raw(v.tag) {
        PJsonTag::Array | PJsonTag::Object => {
            if v.w0 == 0 {
                0
            } else {
                pas.array_header(v.w0).size
            }
        }
        PJsonTag::String => v.w0,
        _ => 0,
    }
}

/// `true` if `size(pas, off) == 0`.
#[must_use]
pub fn is_empty(pas: &Pas, off: Offset) -> bool {
    size(pas, off) == 0
}

/// Reads a boolean payload (`false` for a non-bool value).
#[must_use]
pub fn get_bool(pas: &Pas, off: Offset) -> bool {
    read(pas, off).w0 != 0
}

/// Reads a signed integer payload (`0` for a non-int value).
#[must_use]
pub fn get_int(pas: &Pas, off: Offset) -> i64 {
    read(pas, off).w0 as i64
}

/// Reads an unsigned integer payload (`0` for a non-uint value).
#[must_use]
pub fn get_uint(pas: &Pas, off: Offset) -> u64 {
    read(pas, off).w0
}

/// Reads a floating-point payload (`0.0` for a non-real value).
#[must_use]
pub fn get_real(pas: &Pas, off: Offset) -> f64 {
    f64::from_bits(read(pas, off).w0)
}

/// Borrows a string payload (`""` for a non-string value, or an empty
/// string).
#[must_use]
pub fn get_string<'a>(pas: &'a Pas, off: Offset) -> &'a str {
    let v = read(pas, off);
    if v.tag != PJsonTag::String.raw() || v.w1 == 0 {
        return "";
    }
    std::str::from_utf8(pas.bytes(v.w1, v.w0)).unwrap_or("")
}

/// Recursively releases every allocation owned by this value and resets it
/// to null.
pub fn free(pas: &mut Pas, off: Offset) {
    let v = read(pas, off);
    match PJsonTag::from_raw(v.tag) {
        PJsonTag::String => {
            if v.w1 != 0 {
                pas.free_region(Offset(v.w1), v.w0 + 1);
            }
        }
        PJsonTag::Array => {
            if v.w0 != 0 {
                let len = pas.array_header(v.w0).size;
                for i in 0..len {
                    let elem_off = pas.array_header(v.w0).data_off + i * mem::size_of::<PJson>() as u64;
                    free(pas, Offset(elem_off));
                }
                parr::free::<PJson>(pas, Offset(v.w0));
                pas.delete(Offset(v.w0));
            }
        }
        PJsonTag::Object => {
            if v.w0 != 0 {
                let len = pas.array_header(v.w0).size;
                for i in 0..len {
                    let entry: PJsonEntry = pas.record_at(pas.array_header(v.w0).data_off, i);
                    if entry.key_chars_off != 0 {
                        pas.free_region(Offset(entry.key_chars_off), entry.key_length + 1);
                    }
                    free(pas, Offset(entry_offset(pas, v.w0, i)));
                }
                parr::free::<PJsonEntry>(pas, Offset(v.w0));
                pas.delete(Offset(v.w0));
            }
        }
        _ => {}
    }
    write(pas, off, PJson::NULL);
}

/// Resets `off` to null, releasing whatever it held.
pub fn set_null(pas: &mut Pas, off: Offset) {
    free(pas, off);
}

/// Sets a boolean payload, releasing whatever `off` held first.
pub fn set_bool(pas: &mut Pas, off: Offset, value: bool) {
    free(pas, off);
    write(
        pas,
        off,
        PJson {
            tag: PJsonTag::Bool.raw(),
            w0: u64::from(value),
            ..PJson::NULL
        },
    );
}

/// Sets a signed integer payload, releasing whatever `off` held first.
pub fn set_int(pas: &mut Pas, off: Offset, value: i64) {
    free(pas, off);
    write(
        pas,
        off,
        PJson {
            tag: PJsonTag::Int.raw(),
            w0: value as u64,
            ..PJson::NULL
        },
    );
}

/// Sets an unsigned integer payload, releasing whatever `off` held first.
pub fn set_uint(pas: &mut Pas, off: Offset, value: u64) {
    free(pas, off);
    write(
        pas,
        off,
        PJson {
            tag: PJsonTag::UInt.raw(),
            w0: value,
            ..PJson::NULL
        },
    );
}

/// Sets a floating-point payload, releasing whatever `off` held first.
pub fn set_real(pas: &mut Pas, off: Offset, value: f64) {
    free(pas, off);
    write(
        pas,
        off,
        PJson {
            tag: PJsonTag::Real.raw(),
            w0: value.to_bits(),
            ..PJson::NULL
        },
    );
}

/// Sets a string payload, releasing whatever `off` held first. An empty
/// `s` stores no character buffer (`w1` stays `0`).
pub fn set_string(pas: &mut Pas, off: Offset, s: &str) {
    free(pas, off);
    if s.is_empty() {
        write(
            pas,
            off,
            PJson {
                tag: PJsonTag::String.raw(),
                ..PJson::NULL
            },
        );
        return;
    }
    let bytes = s.as_bytes();
    let chars_off = pas.alloc_region(bytes.len() as u64 + 1, 1);
    pas.write_bytes(chars_off.get(), bytes);
    write(
        pas,
        off,
        PJson {
            tag: PJsonTag::String.raw(),
            w0: bytes.len() as u64,
            w1: chars_off.get(),
            ..PJson::NULL
        },
    );
}

/// Turns `off` into an empty array, releasing whatever it held first.
pub fn set_array(pas: &mut Pas, off: Offset) {
    free(pas, off);
    write(
        pas,
        off,
        PJson {
            tag: PJsonTag::Array.raw(),
            ..PJson::NULL
        },
    );
}

/// Turns `off` into an empty object, releasing whatever it held first.
pub fn set_object(pas: &mut Pas, off: Offset) {
    free(pas, off);
    write(
        pas,
        off,
        PJson {
            tag: PJsonTag::Object.raw(),
            ..PJson::NULL
        },
    );
}

/// Appends a new null element to an array value and returns its offset.
/// Assumes `off` already holds an array (call [`set_array`] first).
pub fn push_back(pas: &mut Pas, off: Offset) -> Offset {
    let mut v = read(pas, off);
    if v.w0 == 0 {
        let hdr_off = pas.create::<ArrayHeader>(None);
        parr::init(pas, hdr_off);
        v.w0 = hdr_off.get();
        write(pas, off, v);
    }
    let hdr_off = Offset(v.w0);
    parr::push_back(pas, hdr_off, PJson::NULL);
    let hdr = pas.array_header(hdr_off.get());
    Offset(hdr.data_off + (hdr.size - 1) * mem::size_of::<PJson>() as u64)
}

/// The offset of array element `idx`, or `None` if `off` is not an array
/// or `idx` is out of range.
#[must_use]
pub fn at(pas: &Pas, off: Offset, idx: u64) -> Option<Offset> {
    let v = read(pas, off);
    if v.tag != PJsonTag::Array.raw() || v.w0 == 0 {
        return None;
    }
    let hdr = pas.array_header(v.w0);
    (idx < hdr.size).then(|| Offset(hdr.data_off + idx * mem::size_of::<PJson>() as u64))
}

/// Removes array element `idx`, shifting the tail left. Returns `false` if
/// `off` is not an array or `idx` is out of range.
pub fn array_erase(pas: &mut Pas, off: Offset, idx: u64) -> bool {
    let v = read(pas, off);
    if v.tag != PJsonTag::Array.raw() || v.w0 == 0 {
        return false;
    }
    let hdr_off = Offset(v.w0);
    let hdr = pas.array_header(hdr_off.get());
    if idx >= hdr.size {
        return false;
    }
    free(pas, Offset(hdr.data_off + idx * mem::size_of::<PJson>() as u64));
    parr::erase_at::<PJson>(pas, hdr_off, idx)
}

fn obj_lower_bound(pas: &Pas, pairs_off: u64, len: u64, key: &str) -> u64 {
    let (mut lo, mut hi) = (0u64, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let entry: PJsonEntry = pas.record_at(pairs_off, mid);
        if entry.key(pas) < key {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// The offset of the value stored under `key`, or `None` if `off` is not
/// an object or `key` is absent.
#[must_use]
pub fn obj_find(pas: &Pas, off: Offset, key: &str) -> Option<Offset> {
    let v = read(pas, off);
    if v.tag != PJsonTag::Object.raw() || v.w0 == 0 {
        return None;
    }
    let hdr = pas.array_header(v.w0);
    let idx = obj_lower_bound(pas, hdr.data_off, hdr.size, key);
    if idx >= hdr.size {
        return None;
    }
    let entry: PJsonEntry = pas.record_at(hdr.data_off, idx);
    (entry.key(pas) == key).then(|| Offset(entry_offset(pas, v.w0, idx)))
}

/// Every stored key, in sorted order. Empty if `off` is not an object.
#[must_use]
pub fn obj_keys(pas: &Pas, off: Offset) -> Vec<String> {
    let v = read(pas, off);
    if v.tag != PJsonTag::Object.raw() || v.w0 == 0 {
        return Vec::new();
    }
    let hdr = pas.array_header(v.w0);
    (0..hdr.size)
        .map(|i| {
            let entry: PJsonEntry = pas.record_at(hdr.data_off, i);
            entry.key(pas).to_string()
        })
        .collect()
}

/// Allocates a character buffer for `key` and records it on the entry at
/// `idx`. The entry's key slot must already be zeroed (see `obj_insert`) so
/// a shifted neighbor's buffer is never mistaken for this one's.
fn assign_key(pas: &mut Pas, pairs_data_off: u64, idx: u64, key: &str) {
    if key.is_empty() {
        return;
    }
    let bytes = key.as_bytes();
    let chars_off = pas.alloc_region(bytes.len() as u64 + 1, 1);
    pas.write_bytes(chars_off.get(), bytes);
    let mut entry: PJsonEntry = pas.record_at(pairs_data_off, idx);
    entry.key_length = bytes.len() as u64;
    entry.key_chars_off = chars_off.get();
    pas.set_record_at(pairs_data_off, idx, entry);
}

/// Inserts (or replaces) the entry for `key`, preserving sorted order, and
/// returns the offset of its (freshly null) value slot.
///
/// Mirrors the original's "clear the key slot before assigning" sequence:
/// the new pair's key is zeroed before [`assign_key`] runs, so a later
/// shift never frees a character buffer that now belongs to a neighbor.
pub fn obj_insert(pas: &mut Pas, off: Offset, key: &str) -> Offset {
    let mut v = read(pas, off);
    if v.w0 == 0 {
        let hdr_off = pas.create::<ArrayHeader>(None);
        parr::init(pas, hdr_off);
        v.w0 = hdr_off.get();
        write(pas, off, v);
    }
    let hdr_off = Offset(v.w0);
    let hdr = pas.array_header(hdr_off.get());
    let idx = obj_lower_bound(pas, hdr.data_off, hdr.size, key);

    if idx < hdr.size {
        let existing: PJsonEntry = pas.record_at(hdr.data_off, idx);
        if existing.key(pas) == key {
            let value_off = entry_offset(pas, hdr_off.get(), idx);
            free(pas, Offset(value_off));
            return Offset(value_off);
        }
    }

    parr::push_back(pas, hdr_off, PJsonEntry::EMPTY);
    let hdr = pas.array_header(hdr_off.get());
    let mut i = hdr.size - 1;
    while i > idx {
        let moved: PJsonEntry = pas.record_at(hdr.data_off, i - 1);
        pas.set_record_at(hdr.data_off, i, moved);
        i -= 1;
    }
    // Clear the key slot before assigning so a later reader never sees the
    // shifted neighbor's buffer through this entry.
    pas.set_record_at(hdr.data_off, idx, PJsonEntry::EMPTY);
    assign_key(pas, hdr.data_off, idx, key);

    Offset(entry_offset(pas, hdr_off.get(), idx))
}

/// Removes the entry for `key`, if present. Returns `true` if an entry was
/// removed.
pub fn obj_erase(pas: &mut Pas, off: Offset, key: &str) -> bool {
    let v = read(pas, off);
    if v.tag != PJsonTag::Object.raw() || v.w0 == 0 {
        return false;
    }
    let hdr_off = Offset(v.w0);
    let hdr = pas.array_header(hdr_off.get());
    let idx = obj_lower_bound(pas, hdr.data_off, hdr.size, key);
    if idx >= hdr.size {
        return false;
    }
    let entry: PJsonEntry = pas.record_at(hdr.data_off, idx);
    if entry.key(pas) != key {
        return false;
    }
    if entry.key_chars_off != 0 {
        pas.free_region(Offset(entry.key_chars_off), entry.key_length + 1);
    }
    free(pas, Offset(entry_offset(pas, hdr_off.get(), idx)));
    parr::erase_at::<PJsonEntry>(pas, hdr_off, idx)
}

impl std::fmt::Display for Render<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&to_string(self.0, self.1))
    }
}

/// Borrow-and-offset pair that lets a `pjson` value be written with `{}`
/// via [`to_string`], the way the crate's own error types defer to
/// `thiserror`'s `#[error("{0}")]`.
pub struct Render<'a>(pub &'a Pas, pub Offset);

#[cfg(test)]
mod tests;
