//! On-disk record layouts for the PAS image.
//!
//! Every record here is `bytemuck::Pod`: its byte representation *is* its
//! persisted representation, so loading an image is a single `read` into a
//! `Vec<u8>` followed by a cast, never a per-object deserializer. All
//! width-sensitive fields are fixed at `u64` rather than host pointer width,
//! so an image saved on one platform loads unchanged on another (see
//! `DESIGN.md` for why this departs from the original's `uintptr_t`).

use bytemuck::{Pod, Zeroable};

use crate::config::{NAME_SIZE, TYPE_ID_SIZE};

/// Magic number identifying a PAS image file: `"PAS\0"`.
pub const PAS_MAGIC: u32 = 0x5041_5300;
/// Current on-disk format version.
pub const PAS_VERSION: u32 = 1;
/// Sentinel meaning "no slot" / "no name" in an index field.
pub const INVALID_IDX: u64 = u64::MAX;

/// File header: fixed size, always at offset 0 of the image.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct PasHeader {
    /// [`PAS_MAGIC`].
    pub magic: u32,
    /// [`PAS_VERSION`].
    pub version: u32,
    /// Size of the data area in bytes (includes this header).
    pub data_area_size: u64,
    /// Offset of the type vector's [`ArrayHeader`].
    pub type_vec_offset: u64,
    /// Offset of the slot map's [`ArrayHeader`].
    pub slot_map_offset: u64,
    /// Offset of the name map's [`ArrayHeader`].
    pub name_map_offset: u64,
    /// Offset of the free list's [`ArrayHeader`].
    pub free_list_offset: u64,
    /// Bump-allocator cursor: next free byte in the data area.
    pub bump: u64,
    /// Offset of the string interning dictionary; 0 if never created.
    pub string_table_offset: u64,
}

/// Header shared by every internal growable array (type vector, slot map,
/// name map, free list, and every `parr`/`pvector`/`pmap` built on top).
/// Three words: `[size | capacity | data_off]`.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct ArrayHeader {
    /// Number of elements currently stored.
    pub size: u64,
    /// Number of elements the backing buffer can hold.
    pub capacity: u64,
    /// Offset of the backing buffer; 0 if never allocated.
    pub data_off: u64,
}

impl ArrayHeader {
    pub(crate) const fn empty() -> Self {
        ArrayHeader {
            size: 0,
            capacity: 0,
            data_off: 0,
        }
    }
}

/// One entry in the type vector: the element size and type name are stored
/// once per distinct type, shared by every slot of that type.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct TypeInfoRecord {
    /// Size in bytes of one element of this type.
    pub elem_size: u64,
    /// Type identifier, truncated to [`TYPE_ID_SIZE`] bytes, NUL-padded.
    pub name: [u8; TYPE_ID_SIZE],
}

impl TypeInfoRecord {
    pub(crate) fn new(elem_size: u64, type_name: &str) -> Self {
        let mut name = [0u8; TYPE_ID_SIZE];
        let bytes = type_name.as_bytes();
        let n = bytes.len().min(TYPE_ID_SIZE - 1);
        name[..n].copy_from_slice(&bytes[..n]);
        TypeInfoRecord { elem_size, name }
    }

    pub(crate) fn name_matches(&self, type_name: &str) -> bool {
        let mut want = [0u8; TYPE_ID_SIZE];
        let bytes = type_name.as_bytes();
        let n = bytes.len().min(TYPE_ID_SIZE - 1);
        want[..n].copy_from_slice(&bytes[..n]);
        self.name == want
    }
}

/// Value stored in the slot map: which type a slot holds, how many elements,
/// and (if named) where its name lives in the name map.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct SlotInfoRecord {
    /// Number of elements (> 1 only for arrays created via `create_array`).
    pub count: u64,
    /// Index into the type vector.
    pub type_idx: u64,
    /// Index into the name map, or [`INVALID_IDX`] if unnamed.
    pub name_idx: u64,
}

/// One entry of the slot map: `(offset, SlotInfoRecord)`, kept sorted by
/// `key` for binary search.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct SlotEntryRecord {
    /// Offset of the object in the data area — the sort key.
    pub key: u64,
    /// Slot metadata.
    pub value: SlotInfoRecord,
}

/// A fixed-size, NUL-padded object name — the name map's key type.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Pod, Zeroable)]
pub struct NameKey {
    /// Name bytes, NUL-padded to [`NAME_SIZE`].
    pub name: [u8; NAME_SIZE],
}

impl NameKey {
    pub(crate) fn new(name: &str) -> Self {
        let mut bytes = [0u8; NAME_SIZE];
        let src = name.as_bytes();
        let n = src.len().min(NAME_SIZE - 1);
        bytes[..n].copy_from_slice(&src[..n]);
        NameKey { name: bytes }
    }

    pub(crate) fn as_str(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_SIZE);
        std::str::from_utf8(&self.name[..end]).unwrap_or("")
    }
}

/// One entry of the name map: `(NameKey, slot_offset)`, kept sorted by `key`.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct NameEntryRecord {
    /// The object's name — the sort key.
    pub key: NameKey,
    /// Offset of the named object in the data area.
    pub slot_offset: u64,
}

/// One entry of the free list: an unordered record of a reclaimed region.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct FreeEntryRecord {
    /// Offset of the free region.
    pub offset: u64,
    /// Size of the free region in bytes.
    pub size: u64,
}
