//! [`Pas`] — the persistent address space engine.
//!
//! `Pas` owns a single flat byte buffer (the "data area") that holds a
//! header, four self-describing internal tables (type vector, slot map,
//! name map, free list), and every object ever created in it. Loading an
//! image is one `read` into that buffer; no constructor runs per object.
//! Saving is one `write` of the whole buffer. Every offset handed out by
//! `Pas` is meaningless outside it and must be re-resolved after any call
//! that might grow the buffer — `resolve`/`resolve_mut` enforce this
//! mechanically by borrowing `self`, so a stale reference cannot outlive a
//! reallocating call.

mod layout;

use std::io::Write;
use std::mem;
use std::path::{Path, PathBuf};

use bytemuck::Pod;

use crate::config::PasConfig;
use crate::error::{Error, Result};
use crate::offset::Offset;

pub use layout::{
    ArrayHeader, FreeEntryRecord, NameEntryRecord, NameKey, PasHeader, SlotEntryRecord,
    SlotInfoRecord, TypeInfoRecord, INVALID_IDX, PAS_MAGIC, PAS_VERSION,
};

/// A single-file, offset-addressed heap for strongly-typed persistent
/// values.
///
/// `Pas` is not a singleton — callers own as many instances as they need,
/// each backed by its own buffer and (optionally) its own file. It is
/// intentionally `!Sync` (no internal locking): concurrent access from
/// multiple threads is out of scope, matching the single-threaded
/// allocator this type is modeled on.
pub struct Pas {
    data: Vec<u8>,
    filename: Option<PathBuf>,
    config: PasConfig,
}

fn align_up(value: u64, align: u64) -> u64 {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

// ---------------------------------------------------------------------
// Construction, persistence
// ---------------------------------------------------------------------

impl Pas {
    /// Creates a new, empty, in-memory address space using
    /// [`PasConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PasConfig::default())
    }

    /// Creates a new, empty, in-memory address space with a custom
    /// [`PasConfig`].
    #[must_use]
    pub fn with_config(config: PasConfig) -> Self {
        let mut pas = Pas {
            data: Vec::new(),
            filename: None,
            config,
        };
        pas.init_empty();
        pas
    }

    /// Loads an image from `path`, or creates an empty one if the file does
    /// not exist or is not a recognized image. A missing or unrecognized
    /// file is not an error: it is the expected state the first time an
    /// application runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read for reasons
    /// other than "not found" (permissions, disk failure).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_config(path, PasConfig::default())
    }

    /// Like [`Pas::load`], with a custom [`PasConfig`] applied when an
    /// empty image has to be created.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load_with_config(path: impl AsRef<Path>, config: PasConfig) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no existing image, creating empty one");
                let mut pas = Self::empty_with(Some(path.to_path_buf()), config);
                pas.init_empty();
                return Ok(pas);
            }
            Err(e) => return Err(Error::Io(e)),
        };
        let mut pas = Self::load_bytes_with_config(&bytes, config);
        pas.filename = Some(path.to_path_buf());
        Ok(pas)
    }

    fn empty_with(filename: Option<PathBuf>, config: PasConfig) -> Self {
        Pas {
            data: Vec::new(),
            filename,
            config,
        }
    }

    /// Parses an in-memory image, falling back to an empty one if `bytes`
    /// is too short or does not carry a recognized header. Unlike
    /// [`Pas::load`], this never touches the filesystem — used by the
    /// image-loader fuzz target and any caller that already has the bytes
    /// in hand (received over a socket, read from an embedded asset).
    #[must_use]
    pub fn load_bytes(bytes: &[u8]) -> Self {
        Self::load_bytes_with_config(bytes, PasConfig::default())
    }

    /// Like [`Pas::load_bytes`], with a custom [`PasConfig`] applied when
    /// an empty image has to be created.
    #[must_use]
    pub fn load_bytes_with_config(bytes: &[u8], config: PasConfig) -> Self {
        let header_size = mem::size_of::<PasHeader>();

        if bytes.len() < header_size {
            tracing::warn!("image smaller than header, creating empty one");
            let mut pas = Self::empty_with(None, config);
            pas.init_empty();
            return pas;
        }

        let hdr: PasHeader = bytemuck::pod_read_unaligned(&bytes[..header_size]);
        if hdr.magic != PAS_MAGIC || hdr.version != PAS_VERSION {
            tracing::warn!("unrecognized image, creating empty one");
            let mut pas = Self::empty_with(None, config);
            pas.init_empty();
            return pas;
        }

        let mut data = bytes.to_vec();
        let want = hdr.data_area_size as usize;
        match data.len().cmp(&want) {
            std::cmp::Ordering::Less => data.resize(want, 0),
            std::cmp::Ordering::Greater => data.truncate(want),
            std::cmp::Ordering::Equal => {}
        }

        let mut pas = Self::empty_with(None, config);
        pas.data = data;
        let mut h = pas.header();
        if h.bump < header_size as u64 {
            h.bump = header_size as u64;
            pas.set_header(h);
        }
        pas
    }

    /// Writes the whole image (header and data area) to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.filename = Some(path.to_path_buf());
        let mut file = std::fs::File::create(path)?;
        file.write_all(&self.data)?;
        tracing::debug!(path = %path.display(), bytes = self.data.len(), "saved image");
        Ok(())
    }

    /// Saves to the path most recently passed to [`Pas::save`] or
    /// [`Pas::load`]. A no-op if this instance has never been associated
    /// with a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_in_place(&mut self) -> Result<()> {
        let Some(path) = self.filename.clone() else {
            return Ok(());
        };
        self.save(path)
    }

    /// Resets this instance to a freshly created empty image, discarding
    /// all objects. O(1): no per-object cleanup runs.
    pub fn reset(&mut self) {
        self.data.clear();
        self.init_empty();
    }

    fn init_empty(&mut self) {
        let size = self.config.initial_data_size;
        self.data = vec![0u8; size as usize];

        let header_size = mem::size_of::<PasHeader>() as u64;
        self.set_header(PasHeader {
            magic: PAS_MAGIC,
            version: PAS_VERSION,
            data_area_size: size,
            type_vec_offset: 0,
            slot_map_offset: 0,
            name_map_offset: 0,
            free_list_offset: 0,
            bump: header_size,
            string_table_offset: 0,
        });

        let type_off = self.init_array::<TypeInfoRecord>(self.config.initial_type_capacity);
        let mut h = self.header();
        h.type_vec_offset = type_off.get();
        self.set_header(h);

        let slot_off = self.init_array::<SlotEntryRecord>(self.config.initial_slot_capacity);
        let mut h = self.header();
        h.slot_map_offset = slot_off.get();
        self.set_header(h);

        let name_off = self.init_array::<NameEntryRecord>(self.config.initial_name_capacity);
        let mut h = self.header();
        h.name_map_offset = name_off.get();
        self.set_header(h);

        let free_off = self.init_array::<FreeEntryRecord>(self.config.initial_free_capacity);
        let mut h = self.header();
        h.free_list_offset = free_off.get();
        self.set_header(h);
    }

    fn init_array<T: Pod>(&mut self, initial_cap: u64) -> Offset {
        let hdr_off = self.raw_alloc(
            mem::size_of::<ArrayHeader>() as u64,
            mem::align_of::<ArrayHeader>() as u64,
        );
        self.set_array_header(hdr_off.get(), ArrayHeader::empty());
        self.raw_grow_array::<T>(hdr_off.get(), initial_cap);
        hdr_off
    }
}

impl Default for Pas {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------
// Raw record access — bytemuck casts over the flat buffer
// ---------------------------------------------------------------------

impl Pas {
    pub(crate) fn read_record<T: Pod>(&self, off: u64) -> T {
        let size = mem::size_of::<T>();
        bytemuck::pod_read_unaligned(&self.data[off as usize..off as usize + size])
    }

    pub(crate) fn write_record<T: Pod>(&mut self, off: u64, value: T) {
        let size = mem::size_of::<T>();
        self.data[off as usize..off as usize + size].copy_from_slice(bytemuck::bytes_of(&value));
    }

    pub(crate) fn record_at<T: Pod>(&self, base_off: u64, index: u64) -> T {
        self.read_record(base_off + index * mem::size_of::<T>() as u64)
    }

    pub(crate) fn set_record_at<T: Pod>(&mut self, base_off: u64, index: u64, value: T) {
        self.write_record(base_off + index * mem::size_of::<T>() as u64, value);
    }

    /// Raw byte slice `[off, off+len)` of the data area. Used by string-like
    /// containers (`pstring`, `pstringview`, `pjson` strings) that copy
    /// variable-length byte runs rather than fixed-size records.
    pub(crate) fn bytes(&self, off: u64, len: u64) -> &[u8] {
        &self.data[off as usize..(off + len) as usize]
    }

    /// Writes `bytes` starting at `off`.
    pub(crate) fn write_bytes(&mut self, off: u64, bytes: &[u8]) {
        self.data[off as usize..off as usize + bytes.len()].copy_from_slice(bytes);
    }

    fn header(&self) -> PasHeader {
        self.read_record(0)
    }

    fn set_header(&mut self, h: PasHeader) {
        self.write_record(0, h);
    }

    pub(crate) fn array_header(&self, hdr_off: u64) -> ArrayHeader {
        if hdr_off == 0 {
            return ArrayHeader::empty();
        }
        self.read_record(hdr_off)
    }

    pub(crate) fn set_array_header(&mut self, hdr_off: u64, h: ArrayHeader) {
        self.write_record(hdr_off, h);
    }
}

// ---------------------------------------------------------------------
// Low-level bump allocation and array growth
// ---------------------------------------------------------------------

impl Pas {
    /// Allocates `size` bytes aligned to `align`, growing the data area
    /// (doubling until it fits) if needed. Does not register a slot.
    /// Returns [`Offset::NULL`] if `size` is zero.
    pub(crate) fn raw_alloc(&mut self, size: u64, align: u64) -> Offset {
        if size == 0 {
            return Offset::NULL;
        }
        let h = self.header();
        let mut data_size = h.data_area_size;
        let mut aligned_bump = align_up(h.bump, align);

        if aligned_bump.checked_add(size).map_or(true, |end| end > data_size) {
            let mut new_size = data_size.max(1) * 2;
            while aligned_bump.checked_add(size).map_or(true, |end| end > new_size) {
                new_size *= 2;
            }
            tracing::debug!(old = data_size, new = new_size, "growing data area");
            self.data.resize(new_size as usize, 0);
            data_size = new_size;
            let mut h = self.header();
            h.data_area_size = new_size;
            self.set_header(h);
            aligned_bump = align_up(h.bump, align);
        }

        let offset = aligned_bump;
        let mut h = self.header();
        h.bump = offset + size;
        self.set_header(h);
        Offset(offset)
    }

    /// Grows the array whose header lives at `hdr_off` to hold at least
    /// `new_cap` elements of `T`. The old buffer is left in place — it is
    /// never freed, only abandoned, matching the allocator's policy that
    /// internal tables never shrink.
    pub(crate) fn raw_grow_array<T: Pod>(&mut self, hdr_off: u64, new_cap: u64) -> bool {
        let hdr = self.array_header(hdr_off);
        if new_cap <= hdr.capacity {
            return true;
        }
        let elem_size = mem::size_of::<T>() as u64;
        let old_bytes = (hdr.size * elem_size) as usize;
        let mut tmp = vec![0u8; old_bytes];
        if hdr.data_off != 0 {
            let start = hdr.data_off as usize;
            tmp.copy_from_slice(&self.data[start..start + old_bytes]);
        }

        let new_off = self.raw_alloc(new_cap * elem_size, mem::align_of::<T>() as u64);
        if new_off.is_null() {
            return false;
        }
        if !tmp.is_empty() {
            let start = new_off.get() as usize;
            self.data[start..start + old_bytes].copy_from_slice(&tmp);
        }

        let mut hdr = self.array_header(hdr_off);
        hdr.data_off = new_off.get();
        hdr.capacity = new_cap;
        self.set_array_header(hdr_off, hdr);
        true
    }
}

// ---------------------------------------------------------------------
// Type vector
// ---------------------------------------------------------------------

impl Pas {
    fn type_vec_size(&self) -> u64 {
        self.array_header(self.header().type_vec_offset).size
    }

    fn type_vec_capacity(&self) -> u64 {
        self.array_header(self.header().type_vec_offset).capacity
    }

    fn type_entry(&self, idx: u64) -> TypeInfoRecord {
        let data_off = self.array_header(self.header().type_vec_offset).data_off;
        self.record_at(data_off, idx)
    }

    fn set_type_entry(&mut self, idx: u64, value: TypeInfoRecord) {
        let data_off = self.array_header(self.header().type_vec_offset).data_off;
        self.set_record_at(data_off, idx, value);
    }

    fn ensure_type_vec_capacity(&mut self) -> bool {
        let hdr_off = self.header().type_vec_offset;
        let hdr = self.array_header(hdr_off);
        if hdr.size < hdr.capacity {
            return true;
        }
        let new_cap = (hdr.capacity * 2).max(self.config.initial_type_capacity);
        self.raw_grow_array::<TypeInfoRecord>(hdr_off, new_cap)
    }

    /// Finds the existing type-vector entry matching `(type_name,
    /// elem_size)`, or registers a new one. A type is registered once and
    /// shared by every slot of that type.
    fn find_or_register_type(&mut self, type_name: &str, elem_size: u64) -> Option<u64> {
        let size = self.type_vec_size();
        for i in 0..size {
            let entry = self.type_entry(i);
            if entry.elem_size == elem_size && entry.name_matches(type_name) {
                return Some(i);
            }
        }
        if !self.ensure_type_vec_capacity() {
            return None;
        }
        let new_idx = self.type_vec_size();
        self.set_type_entry(new_idx, TypeInfoRecord::new(elem_size, type_name));
        let hdr_off = self.header().type_vec_offset;
        let mut hdr = self.array_header(hdr_off);
        hdr.size += 1;
        self.set_array_header(hdr_off, hdr);
        Some(new_idx)
    }
}

// ---------------------------------------------------------------------
// Slot map
// ---------------------------------------------------------------------

impl Pas {
    fn slot_map_size(&self) -> u64 {
        self.array_header(self.header().slot_map_offset).size
    }

    fn slot_map_capacity(&self) -> u64 {
        self.array_header(self.header().slot_map_offset).capacity
    }

    fn slot_entry(&self, idx: u64) -> SlotEntryRecord {
        let data_off = self.array_header(self.header().slot_map_offset).data_off;
        self.record_at(data_off, idx)
    }

    fn set_slot_entry(&mut self, idx: u64, value: SlotEntryRecord) {
        let data_off = self.array_header(self.header().slot_map_offset).data_off;
        self.set_record_at(data_off, idx, value);
    }

    /// Index of the first slot-map entry with key `>= offset`.
    fn slot_lower_bound(&self, offset: u64) -> u64 {
        let (mut lo, mut hi) = (0u64, self.slot_map_size());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.slot_entry(mid).key < offset {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    fn ensure_slot_map_capacity(&mut self) -> bool {
        let hdr_off = self.header().slot_map_offset;
        let hdr = self.array_header(hdr_off);
        if hdr.size < hdr.capacity {
            return true;
        }
        let new_cap = (hdr.capacity * 2).max(self.config.initial_slot_capacity);
        self.raw_grow_array::<SlotEntryRecord>(hdr_off, new_cap)
    }

    /// Reserves slot-map capacity for at least `min_slots` entries in a
    /// single growth, instead of the repeated doubling a long run of
    /// `create` calls would otherwise trigger.
    pub fn reserve_slots(&mut self, min_slots: u64) {
        if min_slots > self.slot_map_capacity() {
            let hdr_off = self.header().slot_map_offset;
            self.raw_grow_array::<SlotEntryRecord>(hdr_off, min_slots);
        }
    }

    fn slot_insert(&mut self, offset: u64, info: SlotInfoRecord) -> bool {
        if !self.ensure_slot_map_capacity() {
            return false;
        }
        let idx = self.slot_lower_bound(offset);
        let size = self.slot_map_size();
        let mut i = size;
        while i > idx {
            let v = self.slot_entry(i - 1);
            self.set_slot_entry(i, v);
            i -= 1;
        }
        self.set_slot_entry(
            idx,
            SlotEntryRecord {
                key: offset,
                value: info,
            },
        );
        let hdr_off = self.header().slot_map_offset;
        let mut hdr = self.array_header(hdr_off);
        hdr.size += 1;
        self.set_array_header(hdr_off, hdr);
        true
    }

    fn slot_remove_at(&mut self, idx: u64) {
        let size = self.slot_map_size();
        for i in idx..size.saturating_sub(1) {
            let v = self.slot_entry(i + 1);
            self.set_slot_entry(i, v);
        }
        let hdr_off = self.header().slot_map_offset;
        let mut hdr = self.array_header(hdr_off);
        hdr.size -= 1;
        self.set_array_header(hdr_off, hdr);
    }
}

// ---------------------------------------------------------------------
// Name map
// ---------------------------------------------------------------------

impl Pas {
    fn name_map_size(&self) -> u64 {
        self.array_header(self.header().name_map_offset).size
    }

    fn name_map_capacity(&self) -> u64 {
        self.array_header(self.header().name_map_offset).capacity
    }

    fn name_entry(&self, idx: u64) -> NameEntryRecord {
        let data_off = self.array_header(self.header().name_map_offset).data_off;
        self.record_at(data_off, idx)
    }

    fn set_name_entry(&mut self, idx: u64, value: NameEntryRecord) {
        let data_off = self.array_header(self.header().name_map_offset).data_off;
        self.set_record_at(data_off, idx, value);
    }

    fn name_lower_bound(&self, nk: &NameKey) -> u64 {
        let (mut lo, mut hi) = (0u64, self.name_map_size());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if &self.name_entry(mid).key < nk {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    fn ensure_name_map_capacity(&mut self) -> bool {
        let hdr_off = self.header().name_map_offset;
        let hdr = self.array_header(hdr_off);
        if hdr.size < hdr.capacity {
            return true;
        }
        let new_cap = (hdr.capacity * 2).max(self.config.initial_name_capacity);
        self.raw_grow_array::<NameEntryRecord>(hdr_off, new_cap)
    }

    /// Corrects every slot's `name_idx` after an insertion at `ins_idx`
    /// shifted the name map's tail right by one.
    fn shift_name_indices_after_insert(&mut self, ins_idx: u64) {
        let size = self.slot_map_size();
        for i in 0..size {
            let mut e = self.slot_entry(i);
            if e.value.name_idx != INVALID_IDX && e.value.name_idx >= ins_idx {
                e.value.name_idx += 1;
                self.set_slot_entry(i, e);
            }
        }
    }

    /// Corrects every slot's `name_idx` after a deletion at `del_idx`
    /// shifted the name map's tail left by one.
    fn shift_name_indices_after_delete(&mut self, del_idx: u64) {
        let size = self.slot_map_size();
        for i in 0..size {
            let mut e = self.slot_entry(i);
            if e.value.name_idx != INVALID_IDX && e.value.name_idx > del_idx {
                e.value.name_idx -= 1;
                self.set_slot_entry(i, e);
            }
        }
    }

    /// Inserts `nk -> slot_offset` into the sorted name map. Returns the
    /// new entry's index, or `None` if the name is already taken.
    fn name_insert(&mut self, nk: NameKey, slot_offset: u64) -> Option<u64> {
        if !self.ensure_name_map_capacity() {
            return None;
        }
        let idx = self.name_lower_bound(&nk);
        if idx < self.name_map_size() && self.name_entry(idx).key == nk {
            return None;
        }
        self.shift_name_indices_after_insert(idx);
        let size = self.name_map_size();
        let mut i = size;
        while i > idx {
            let v = self.name_entry(i - 1);
            self.set_name_entry(i, v);
            i -= 1;
        }
        self.set_name_entry(
            idx,
            NameEntryRecord {
                key: nk,
                slot_offset,
            },
        );
        let hdr_off = self.header().name_map_offset;
        let mut hdr = self.array_header(hdr_off);
        hdr.size += 1;
        self.set_array_header(hdr_off, hdr);
        Some(idx)
    }

    fn name_remove_at(&mut self, idx: u64) {
        let size = self.name_map_size();
        for i in idx..size.saturating_sub(1) {
            let v = self.name_entry(i + 1);
            self.set_name_entry(i, v);
        }
        let hdr_off = self.header().name_map_offset;
        let mut hdr = self.array_header(hdr_off);
        hdr.size -= 1;
        self.set_array_header(hdr_off, hdr);
        self.shift_name_indices_after_delete(idx);
    }
}

// ---------------------------------------------------------------------
// Free list
// ---------------------------------------------------------------------

impl Pas {
    fn free_list_size(&self) -> u64 {
        self.array_header(self.header().free_list_offset).size
    }

    fn free_entry(&self, idx: u64) -> FreeEntryRecord {
        let data_off = self.array_header(self.header().free_list_offset).data_off;
        self.record_at(data_off, idx)
    }

    fn set_free_entry(&mut self, idx: u64, value: FreeEntryRecord) {
        let data_off = self.array_header(self.header().free_list_offset).data_off;
        self.set_record_at(data_off, idx, value);
    }

    fn ensure_free_list_capacity(&mut self) -> bool {
        let hdr_off = self.header().free_list_offset;
        let hdr = self.array_header(hdr_off);
        if hdr.size < hdr.capacity {
            return true;
        }
        let new_cap = (hdr.capacity * 2).max(self.config.initial_free_capacity);
        self.raw_grow_array::<FreeEntryRecord>(hdr_off, new_cap)
    }

    /// Records a reclaimed region for reuse. Unsorted, O(1) insertion.
    fn free_insert(&mut self, offset: u64, size: u64) {
        if size == 0 || !self.ensure_free_list_capacity() {
            return;
        }
        let fl_size = self.free_list_size();
        self.set_free_entry(fl_size, FreeEntryRecord { offset, size });
        let hdr_off = self.header().free_list_offset;
        let mut hdr = self.array_header(hdr_off);
        hdr.size += 1;
        self.set_array_header(hdr_off, hdr);
    }

    /// Allocates `size` bytes aligned to `align`, reusing a free-list
    /// region of sufficient size first (first-fit) and bump-allocating
    /// otherwise. Used by `parr`-backed containers, whose backing buffers
    /// are not registered as named slots but must still be reclaimable
    /// across repeated grow/shrink cycles — unlike the four fixed internal
    /// tables, which grow via [`Pas::raw_grow_array`] and never shrink.
    pub(crate) fn alloc_region(&mut self, size: u64, align: u64) -> Offset {
        if size == 0 {
            return Offset::NULL;
        }
        let reused = self.free_find_and_remove(size);
        if !reused.is_null() {
            let start = reused.get() as usize;
            self.data[start..start + size as usize].fill(0);
            return reused;
        }
        self.raw_alloc(size, align)
    }

    /// Returns a region to the free list for reuse by [`Pas::alloc_region`].
    pub(crate) fn free_region(&mut self, offset: Offset, size: u64) {
        if !offset.is_null() {
            self.free_insert(offset.get(), size);
        }
    }

    /// Finds and removes (by swap with the last entry) a free region of at
    /// least `size` bytes. First-fit, not best-fit: the allocator favors
    /// O(1) removal over minimizing fragmentation.
    fn free_find_and_remove(&mut self, size: u64) -> Offset {
        let fl_size = self.free_list_size();
        for i in 0..fl_size {
            let entry = self.free_entry(i);
            if entry.size >= size {
                let off = entry.offset;
                let last = self.free_entry(fl_size - 1);
                self.set_free_entry(i, last);
                let hdr_off = self.header().free_list_offset;
                let mut hdr = self.array_header(hdr_off);
                hdr.size -= 1;
                self.set_array_header(hdr_off, hdr);
                return Offset(off);
            }
        }
        Offset::NULL
    }
}

// ---------------------------------------------------------------------
// Public allocator surface
// ---------------------------------------------------------------------

impl Pas {
    fn alloc(
        &mut self,
        elem_size: u64,
        count: u64,
        type_id: &str,
        name: Option<&str>,
        align: u64,
    ) -> Offset {
        let total_size = elem_size * count;
        let offset = self.alloc_region(total_size, align);
        if offset.is_null() {
            return Offset::NULL;
        }

        let Some(type_idx) = self.find_or_register_type(type_id, elem_size) else {
            return Offset::NULL;
        };

        let named = name.is_some_and(|n| !n.is_empty());
        let mut name_idx = INVALID_IDX;
        if named {
            let nk = NameKey::new(name.unwrap());
            match self.name_insert(nk, offset.get()) {
                Some(idx) => name_idx = idx,
                None => return Offset::NULL, // name already taken
            }
        }

        let info = SlotInfoRecord {
            count,
            type_idx,
            name_idx,
        };
        if !self.slot_insert(offset.get(), info) {
            if named && name_idx != INVALID_IDX {
                self.name_remove_at(name_idx);
            }
            return Offset::NULL;
        }

        offset
    }

    /// Creates a single object of type `T`, optionally named. Returns
    /// [`Offset::NULL`] if the name is already taken or allocation fails.
    pub fn create<T: Pod>(&mut self, name: Option<&str>) -> Offset {
        self.alloc(
            mem::size_of::<T>() as u64,
            1,
            std::any::type_name::<T>(),
            name,
            mem::align_of::<T>() as u64,
        )
    }

    /// Creates an array of `count` objects of type `T`, optionally named.
    /// Returns [`Offset::NULL`] if `count` is zero, the name is taken, or
    /// allocation fails.
    pub fn create_array<T: Pod>(&mut self, count: u64, name: Option<&str>) -> Offset {
        if count == 0 {
            return Offset::NULL;
        }
        self.alloc(
            mem::size_of::<T>() as u64,
            count,
            std::any::type_name::<T>(),
            name,
            mem::align_of::<T>() as u64,
        )
    }

    /// Extends the last block in the bump region in place, from
    /// `old_count` to `new_count` elements of `elem_size` bytes. Returns
    /// `old_offset` on success, or [`Offset::NULL`] if `old_offset` is not
    /// the most recently bump-allocated block (the caller must then
    /// allocate a new block and copy). The slot map is *not* updated; the
    /// caller is responsible for that.
    pub fn realloc(
        &mut self,
        old_offset: Offset,
        old_count: u64,
        new_count: u64,
        elem_size: u64,
    ) -> Offset {
        if old_offset.is_null() || new_count <= old_count {
            return Offset::NULL;
        }
        let old_size = old_count * elem_size;
        let new_size = new_count * elem_size;
        let bump = self.header().bump;
        if old_offset.get() + old_size != bump {
            return Offset::NULL;
        }
        let grow = new_size - old_size;
        let data_size = self.header().data_area_size;
        if bump + grow > data_size {
            let mut new_data_size = data_size * 2;
            while bump + grow > new_data_size {
                new_data_size *= 2;
            }
            self.data.resize(new_data_size as usize, 0);
            let mut h = self.header();
            h.data_area_size = new_data_size;
            self.set_header(h);
        }
        let mut h = self.header();
        h.bump = bump + grow;
        self.set_header(h);
        old_offset
    }

    /// Frees the slot at `offset`. A no-op if no slot is registered there.
    /// Constructors/destructors never run; the reclaimed region is added
    /// to the free list for reuse by a future allocation of equal or
    /// smaller size.
    pub fn delete(&mut self, offset: Offset) {
        if offset.is_null() {
            return;
        }
        let idx = self.slot_lower_bound(offset.get());
        if idx >= self.slot_map_size() || self.slot_entry(idx).key != offset.get() {
            return;
        }
        let info = self.slot_entry(idx).value;

        let mut freed_size = 0u64;
        if info.type_idx < self.type_vec_size() {
            let type_entry = self.type_entry(info.type_idx);
            freed_size = type_entry.elem_size * info.count;
        }

        if info.name_idx != INVALID_IDX && info.name_idx < self.name_map_size() {
            self.name_remove_at(info.name_idx);
        }
        self.slot_remove_at(idx);

        if freed_size > 0 {
            self.free_insert(offset.get(), freed_size);
        }
    }

    /// Finds a named object's offset. Returns [`Offset::NULL`] if `name`
    /// is empty or not found.
    #[must_use]
    pub fn find(&self, name: &str) -> Offset {
        if name.is_empty() {
            return Offset::NULL;
        }
        let nk = NameKey::new(name);
        let idx = self.name_lower_bound(&nk);
        if idx < self.name_map_size() && self.name_entry(idx).key == nk {
            Offset(self.name_entry(idx).slot_offset)
        } else {
            Offset::NULL
        }
    }

    /// Like [`Pas::find`], but also verifies the slot holds a `T`. Returns
    /// [`Offset::NULL`] on a type mismatch.
    #[must_use]
    pub fn find_typed<T: Pod>(&self, name: &str) -> Offset {
        let offset = self.find(name);
        if offset.is_null() {
            return Offset::NULL;
        }
        let idx = self.slot_lower_bound(offset.get());
        if idx >= self.slot_map_size() || self.slot_entry(idx).key != offset.get() {
            return Offset::NULL;
        }
        let type_idx = self.slot_entry(idx).value.type_idx;
        if type_idx < self.type_vec_size()
            && self.type_entry(type_idx).name_matches(std::any::type_name::<T>())
        {
            offset
        } else {
            Offset::NULL
        }
    }

    /// Returns the name of the object at `offset`, or `None` if it is
    /// unnamed or `offset` is not a live slot.
    #[must_use]
    pub fn get_name(&self, offset: Offset) -> Option<String> {
        if offset.is_null() {
            return None;
        }
        let idx = self.slot_lower_bound(offset.get());
        if idx >= self.slot_map_size() || self.slot_entry(idx).key != offset.get() {
            return None;
        }
        let name_idx = self.slot_entry(idx).value.name_idx;
        if name_idx == INVALID_IDX || name_idx >= self.name_map_size() {
            return None;
        }
        Some(self.name_entry(name_idx).key.as_str().to_string())
    }

    /// Returns the element count of the slot at `offset` (1 for a scalar
    /// `create`), or 0 if `offset` is not a live slot.
    #[must_use]
    pub fn get_count(&self, offset: Offset) -> u64 {
        if offset.is_null() {
            return 0;
        }
        let idx = self.slot_lower_bound(offset.get());
        if idx < self.slot_map_size() && self.slot_entry(idx).key == offset.get() {
            self.slot_entry(idx).value.count
        } else {
            0
        }
    }

    /// Returns the per-element size, in bytes, of the slot at `offset`, or
    /// 0 if `offset` is not a live slot.
    #[must_use]
    pub fn get_elem_size(&self, offset: Offset) -> u64 {
        if offset.is_null() {
            return 0;
        }
        let idx = self.slot_lower_bound(offset.get());
        if idx >= self.slot_map_size() || self.slot_entry(idx).key != offset.get() {
            return 0;
        }
        let type_idx = self.slot_entry(idx).value.type_idx;
        if type_idx < self.type_vec_size() {
            self.type_entry(type_idx).elem_size
        } else {
            0
        }
    }

    /// Returns `true` if `[offset, offset + len)` lies within the data
    /// area. Used internally by `resolve`/`resolve_element`, and exposed
    /// for validators built on top of `Pas`.
    #[must_use]
    pub fn contains(&self, offset: Offset, len: u64) -> bool {
        match offset.checked_add(len) {
            Some(end) => end.get() <= self.data.len() as u64,
            None => false,
        }
    }

    /// Resolves `offset` to a shared reference to `T`. Returns `None` if
    /// `offset` is null, out of range, or misaligned for `T`.
    #[must_use]
    pub fn resolve<T: Pod>(&self, offset: Offset) -> Option<&T> {
        if offset.is_null() || !self.contains(offset, mem::size_of::<T>() as u64) {
            return None;
        }
        let start = offset.get() as usize;
        bytemuck::try_from_bytes(&self.data[start..start + mem::size_of::<T>()]).ok()
    }

    /// Resolves `offset` to an exclusive reference to `T`. Because this
    /// borrows `self` mutably, the borrow checker guarantees no other
    /// resolved reference (which could be invalidated by a growing
    /// allocation) is alive at the same time.
    #[must_use]
    pub fn resolve_mut<T: Pod>(&mut self, offset: Offset) -> Option<&mut T> {
        if offset.is_null() || !self.contains(offset, mem::size_of::<T>() as u64) {
            return None;
        }
        let start = offset.get() as usize;
        let size = mem::size_of::<T>();
        bytemuck::try_from_bytes_mut(&mut self.data[start..start + size]).ok()
    }

    /// Resolves element `index` of the array at `offset` to a shared
    /// reference. Returns `None` if out of range.
    #[must_use]
    pub fn resolve_element<T: Pod>(&self, offset: Offset, index: u64) -> Option<&T> {
        let size = mem::size_of::<T>() as u64;
        let elem_off = offset.checked_add(index * size)?;
        self.resolve(elem_off)
    }

    /// Resolves element `index` of the array at `offset` to an exclusive
    /// reference. Returns `None` if out of range.
    #[must_use]
    pub fn resolve_element_mut<T: Pod>(&mut self, offset: Offset, index: u64) -> Option<&mut T> {
        let size = mem::size_of::<T>() as u64;
        let elem_off = offset.checked_add(index * size)?;
        self.resolve_mut(elem_off)
    }

    /// Number of live slots.
    #[must_use]
    pub fn slot_count(&self) -> u64 {
        self.slot_map_size()
    }

    /// Capacity of the slot map.
    #[must_use]
    pub fn slot_capacity(&self) -> u64 {
        self.slot_map_capacity()
    }

    /// Number of named objects.
    #[must_use]
    pub fn named_count(&self) -> u64 {
        self.name_map_size()
    }

    /// Number of distinct types registered.
    #[must_use]
    pub fn type_count(&self) -> u64 {
        self.type_vec_size()
    }

    /// Number of reclaimed regions on the free list.
    #[must_use]
    pub fn free_list_len(&self) -> u64 {
        self.free_list_size()
    }

    /// Current bump-allocator cursor.
    #[must_use]
    pub fn bump(&self) -> u64 {
        self.header().bump
    }

    /// Size of the data area in bytes.
    #[must_use]
    pub fn data_size(&self) -> u64 {
        self.header().data_area_size
    }

    /// Offset of the string interning dictionary, or [`Offset::NULL`] if
    /// none has been created yet.
    #[must_use]
    pub fn string_table_offset(&self) -> Offset {
        Offset(self.header().string_table_offset)
    }

    /// Records the offset of the string interning dictionary in the
    /// header, so it survives a save/load round trip.
    pub fn set_string_table_offset(&mut self, off: Offset) {
        let mut h = self.header();
        h.string_table_offset = off.get();
        self.set_header(h);
    }

    /// Full self-diagnosis of the image: header, internal tables, and the
    /// name-map/slot-map cross-links. Returns `false` on any invariant
    /// violation.
    #[must_use]
    pub fn validate(&self) -> bool {
        if self.data.is_empty() {
            return false;
        }
        let h = self.header();
        if h.magic != PAS_MAGIC || h.version != PAS_VERSION {
            return false;
        }
        let ds = h.data_area_size;
        if h.bump > ds {
            return false;
        }
        let in_range = |o: u64, s: u64| o == 0 || o.saturating_add(s) <= ds;
        let array_header_size = mem::size_of::<ArrayHeader>() as u64;
        if !in_range(h.type_vec_offset, array_header_size)
            || !in_range(h.slot_map_offset, array_header_size)
            || !in_range(h.name_map_offset, array_header_size)
            || !in_range(h.free_list_offset, array_header_size)
            || !in_range(h.string_table_offset, 1)
        {
            return false;
        }

        let (tv_size, tv_cap) = (self.type_vec_size(), self.type_vec_capacity());
        let (sm_size, sm_cap) = (self.slot_map_size(), self.slot_map_capacity());
        let (nm_size, nm_cap) = (self.name_map_size(), self.name_map_capacity());
        if tv_size > tv_cap || sm_size > sm_cap || nm_size > nm_cap {
            return false;
        }

        let tv_data = self.array_header(h.type_vec_offset).data_off;
        let sm_data = self.array_header(h.slot_map_offset).data_off;
        let nm_data = self.array_header(h.name_map_offset).data_off;
        if tv_cap > 0 && !in_range(tv_data, tv_cap * mem::size_of::<TypeInfoRecord>() as u64) {
            return false;
        }
        if sm_cap > 0 && !in_range(sm_data, sm_cap * mem::size_of::<SlotEntryRecord>() as u64) {
            return false;
        }
        if nm_cap > 0 && !in_range(nm_data, nm_cap * mem::size_of::<NameEntryRecord>() as u64) {
            return false;
        }

        for ni in 0..nm_size {
            let name_entry = self.name_entry(ni);
            let si = self.slot_lower_bound(name_entry.slot_offset);
            if si >= sm_size {
                return false;
            }
            let slot_entry = self.slot_entry(si);
            if slot_entry.key != name_entry.slot_offset || slot_entry.value.name_idx != ni {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests;
