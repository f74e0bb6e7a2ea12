//! `pstring` — a mutable, variable-length string living in a [`Pas`].
//!
//! A [`PString`] is a sixteen-byte POD header `{length, chars_off}`; the
//! characters themselves live in a separately allocated, NUL-terminated
//! byte run. Every `assign` that needs a new buffer re-reads its own
//! header by value before allocating and writes the new header back
//! afterward, so the header offset itself never needs to move even though
//! the character buffer does.

use bytemuck::{Pod, Zeroable};

use crate::offset::Offset;
use crate::pas::Pas;

/// Header for a mutable persistent string. `chars_off == 0` means empty.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct PString {
    /// Length in bytes, not counting the NUL terminator.
    pub length: u64,
    /// Offset of the NUL-terminated character buffer, or 0 if empty.
    pub chars_off: u64,
}

impl PString {
    /// An empty string.
    pub const EMPTY: PString = PString {
        length: 0,
        chars_off: 0,
    };
}

/// Replaces the string's contents with `s`. Frees the previous character
/// buffer (if any) before allocating a new one. Returns `false` if
/// `hdr_off` does not resolve to a live `PString`, or if allocation fails
/// (the header is then left empty rather than partially updated).
pub fn assign(pas: &mut Pas, hdr_off: Offset, s: &str) -> bool {
    let Some(before) = pas.resolve::<PString>(hdr_off).copied() else {
        return false;
    };
    if before.chars_off != 0 {
        pas.free_region(Offset(before.chars_off), before.length + 1);
    }

    if s.is_empty() {
        if let Some(h) = pas.resolve_mut::<PString>(hdr_off) {
            *h = PString::EMPTY;
        }
        return true;
    }

    let bytes = s.as_bytes();
    let len = bytes.len() as u64;
    // +1 for the NUL terminator; the region is zeroed by allocation, so no
    // explicit terminator write is needed.
    let chars_off = pas.alloc_region(len + 1, 1);
    if chars_off.is_null() {
        if let Some(h) = pas.resolve_mut::<PString>(hdr_off) {
            *h = PString::EMPTY;
        }
        return false;
    }
    pas.write_bytes(chars_off.get(), bytes);

    match pas.resolve_mut::<PString>(hdr_off) {
        Some(h) => {
            h.length = len;
            h.chars_off = chars_off.get();
            true
        }
        None => false,
    }
}

/// Borrows the string's contents. Returns `""` if `hdr_off` does not
/// resolve to a live `PString`, or if it is empty.
#[must_use]
pub fn as_str<'a>(pas: &'a Pas, hdr_off: Offset) -> &'a str {
    let Some(h) = pas.resolve::<PString>(hdr_off) else {
        return "";
    };
    if h.length == 0 || h.chars_off == 0 {
        return "";
    }
    std::str::from_utf8(pas.bytes(h.chars_off, h.length)).unwrap_or("")
}

/// Lexicographic comparison of two `PString`s by content (`strcmp`
/// semantics).
#[must_use]
pub fn cmp(pas: &Pas, a: Offset, b: Offset) -> std::cmp::Ordering {
    as_str(pas, a).cmp(as_str(pas, b))
}

/// Releases the character buffer (if any) and zeroes the header.
pub fn free(pas: &mut Pas, hdr_off: Offset) {
    let Some(before) = pas.resolve::<PString>(hdr_off).copied() else {
        return;
    };
    if before.chars_off != 0 {
        pas.free_region(Offset(before.chars_off), before.length + 1);
    }
    if let Some(h) = pas.resolve_mut::<PString>(hdr_off) {
        *h = PString::EMPTY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_handle(pas: &mut Pas) -> Offset {
        pas.create::<PString>(None)
    }

    #[test]
    fn assign_then_read_back() {
        let mut pas = Pas::new();
        let h = new_handle(&mut pas);
        assert!(assign(&mut pas, h, "hello"));
        assert_eq!(as_str(&pas, h), "hello");
    }

    #[test]
    fn reassign_frees_previous_buffer() {
        let mut pas = Pas::new();
        let h = new_handle(&mut pas);
        assign(&mut pas, h, "first value");
        assert_eq!(pas.free_list_len(), 0);
        assign(&mut pas, h, "second");
        assert_eq!(as_str(&pas, h), "second");
        assert_eq!(pas.free_list_len(), 1);
    }

    #[test]
    fn assign_empty_clears_chars_off() {
        let mut pas = Pas::new();
        let h = new_handle(&mut pas);
        assign(&mut pas, h, "not empty");
        assign(&mut pas, h, "");
        assert_eq!(as_str(&pas, h), "");
        assert_eq!(pas.resolve::<PString>(h).unwrap().chars_off, 0);
    }

    #[test]
    fn ordering_is_lexicographic() {
        let mut pas = Pas::new();
        let a = new_handle(&mut pas);
        let b = new_handle(&mut pas);
        assign(&mut pas, a, "apple");
        assign(&mut pas, b, "banana");
        assert_eq!(cmp(&pas, a, b), std::cmp::Ordering::Less);
    }

    #[test]
    fn survives_many_growth_triggering_allocations_elsewhere() {
        let mut pas = Pas::new();
        let h = new_handle(&mut pas);
        assign(&mut pas, h, "stable");
        for i in 0..500 {
            pas.create::<u64>(Some(&format!("filler{i}")));
        }
        assert_eq!(as_str(&pas, h), "stable");
    }
}
