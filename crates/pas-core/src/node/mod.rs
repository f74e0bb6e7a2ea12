//! `node` / [`NodeView`] — the node-id-addressed JSON DOM.
//!
//! Where [`crate::pjson`] embeds array elements inline and interns nothing,
//! `node` allocates every array element and object value as its own
//! top-level slot and addresses it by offset (`node_id`): arrays are
//! `parr`s of `node_id`, not of values. Object keys and `$ref` paths are
//! [`crate::pstringview`]s, so the common key comparison is an offset
//! equality check rather than a byte compare, and interned strings are
//! never individually freed — only the entries array that references them
//! is. String *values*, in contrast, are read-write ([`crate::pstring`]
//! style: owned, reallocated on every assignment, freed with the node).

use bytemuck::{Pod, Zeroable};

use crate::offset::Offset;
use crate::pas::{ArrayHeader, Pas};
use crate::parr;
use crate::pstringview;

/// Discriminant for a [`Node`]'s payload.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NodeTag {
    Null,
    Bool,
    Int,
    UInt,
    Real,
    String,
    Binary,
    Array,
    Object,
    Ref,
}

impl NodeTag {
    const fn from_raw(raw: u32) -> NodeTag {
        match raw {
            1 => NodeTag::Bool,
            2 => NodeTag::Int,
            3 => NodeTag::UInt,
            4 => NodeTag::Real,
            5 => NodeTag::String,
            6 => NodeTag::Binary,
            7 => NodeTag::Array,
            8 => NodeTag::Object,
            9 => NodeTag::Ref,
            _ => NodeTag::Null,
        }
    }

    const fn raw(self) -> u32 {
        match self {
            NodeTag::Null => 0,
            NodeTag::Bool => 1,
            NodeTag::Int => 2,
            NodeTag::UInt => 3,
            NodeTag::Real => 4,
            NodeTag::String => 5,
            NodeTag::Binary => 6,
            NodeTag::Array => 7,
            NodeTag::Object => 8,
            NodeTag::Ref => 9,
        }
    }
}

/// The on-disk node record: a tag plus three `u64` payload words, the same
/// 24-byte-payload shape [`crate::pjson::PJson`] uses. `ref` is the only
/// tag that needs all three words (`path_length`, `path_chars_off`,
/// `target`).
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct Node {
    tag: u32,
    _pad: u32,
    w0: u64,
    w1: u64,
    w2: u64,
}

impl Node {
    /// A freshly zeroed (null) node.
    pub const NULL: Node = Node {
        tag: 0,
        _pad: 0,
        w0: 0,
        w1: 0,
        w2: 0,
    };
}

/// One `{key, value}` entry in an object's backing array. Physically
/// identical to [`crate::pjson::PJsonEntry`] except the value is a
/// `node_id` rather than an inline value, and the key is interned
/// (never individually freed).
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct ObjectEntry {
    key_length: u64,
    key_chars_off: u64,
    value: u64,
}

impl ObjectEntry {
    const EMPTY: ObjectEntry = ObjectEntry {
        key_length: 0,
        key_chars_off: 0,
        value: 0,
    };

    fn key<'a>(self, pas: &'a Pas) -> &'a str {
        if self.key_chars_off == 0 {
            return "";
        }
        std::str::from_utf8(pas.bytes(self.key_chars_off, self.key_length)).unwrap_or("")
    }
}

fn read(pas: &Pas, off: Offset) -> Node {
    pas.read_record(off.get())
}

fn write(pas: &mut Pas, off: Offset, value: Node) {
    pas.write_record(off.get(), value);
}

/// Allocates a new, top-level null node.
#[must_use]
pub fn create(pas: &mut Pas, name: Option<&str>) -> Offset {
    pas.create::<Node>(name)
}

/// A safe, read-only accessor over a node-id-addressed tree. Holding a
/// `NodeView` does not borrow the [`Pas`]; every query re-resolves through
/// the id, exactly like the original's own read-only accessor.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct NodeView {
    id: Offset,
}

impl NodeView {
    /// An invalid (null) view.
    pub const NULL: NodeView = NodeView { id: Offset::NULL };

    /// Wraps an existing node id.
    #[must_use]
    pub const fn new(id: Offset) -> Self {
        NodeView { id }
    }

    /// `true` if this view resolves to a real node.
    #[must_use]
    pub const fn valid(self) -> bool {
        !self.id.is_null()
    }

    /// The underlying node id.
    #[must_use]
    pub const fn id(self) -> Offset {
        self.id
    }

    fn resolve(self, pas: &Pas) -> Option<Node> {
        if self.id.is_null() {
            return None;
        }
        Some(read(pas, self.id))
    }

    /// The node's type tag; null for an invalid view.
    #[must_use]
    pub fn tag(self, pas: &Pas) -> NodeTag {
        self.resolve(pas).map_or(NodeTag::Null, |n| NodeTag::from_raw(n.tag))
    }

    #[must_use]
    pub fn is_null(self, pas: &Pas) -> bool {
        self.tag(pas) == NodeTag::Null
    }
    #[must_use]
    pub fn is_boolean(self, pas: &Pas) -> bool {
        self.tag(pas) == NodeTag::Bool
    }
    #[must_use]
    pub fn is_integer(self, pas: &Pas) -> bool {
        self.tag(pas) == NodeTag::Int
    }
    #[must_use]
    pub fn is_uinteger(self, pas: &Pas) -> bool {
        self.tag(pas) == NodeTag::UInt
    }
    #[must_use]
    pub fn is_real(self, pas: &Pas) -> bool {
        self.tag(pas) == NodeTag::Real
    }
    #[must_use]
    pub fn is_number(self, pas: &Pas) -> bool {
        matches!(self.tag(pas), NodeTag::Int | NodeTag::UInt | NodeTag::Real)
    }
    #[must_use]
    pub fn is_string(self, pas: &Pas) -> bool {
        self.tag(pas) == NodeTag::String
    }
    #[must_use]
    pub fn is_binary(self, pas: &Pas) -> bool {
        self.tag(pas) == NodeTag::Binary
    }
    #[must_use]
    pub fn is_array(self, pas: &Pas) -> bool {
        self.tag(pas) == NodeTag::Array
    }
    #[must_use]
    pub fn is_object(self, pas: &Pas) -> bool {
        self.tag(pas) == NodeTag::Object
    }
    #[must_use]
    pub fn is_ref(self, pas: &Pas) -> bool {
        self.tag(pas) == NodeTag::Ref
    }

    /// Boolean value, or `false` if not a bool node.
    #[must_use]
    pub fn as_bool(self, pas: &Pas) -> bool {
        self.resolve(pas).is_some_and(|n| n.tag == NodeTag::Bool.raw() && n.w0 != 0)
    }

    /// Best-effort signed view of a numeric node (`0` otherwise).
    #[must_use]
    pub fn as_int(self, pas: &Pas) -> i64 {
        let Some(n) = self.resolve(pas) else { return 0 };
        match NodeTag::from_raw(n.tag) {
            NodeTag::Int => n.w0 as i64,
            NodeTag::UInt => n.w0 as i64,
            NodeTag::Real => f64::from_bits(n.w0) as i64,
            _ => 0,
        }
    }

    /// Best-effort unsigned view of a numeric node (`0` otherwise).
    #[must_use]
    pub fn as_uint(self, pas: &Pas) -> u64 {
        let Some(n) = self.resolve(pas) else { return 0 };
        match NodeTag::from_raw(n.tag) {
            NodeTag::UInt => n.w0,
            NodeTag::Int => n.w0 as i64 as u64,
            NodeTag::Real => f64::from_bits(n.w0) as u64,
            _ => 0,
        }
    }

    /// Best-effort float view of a numeric node (`0.0` otherwise).
    #[must_use]
    pub fn as_double(self, pas: &Pas) -> f64 {
        let Some(n) = self.resolve(pas) else { return 0.0 };
        match NodeTag::from_raw(n.tag) {
            NodeTag::Real => f64::from_bits(n.w0),
            NodeTag::Int => n.w0 as i64 as f64,
            NodeTag::UInt => n.w0 as f64,
            _ => 0.0,
        }
    }

    /// String payload, or `""` if not a string node or empty.
    #[must_use]
    pub fn as_string<'a>(self, pas: &'a Pas) -> &'a str {
        let Some(n) = self.resolve(pas) else { return "" };
        if n.tag != NodeTag::String.raw() || n.w1 == 0 {
            return "";
        }
        std::str::from_utf8(pas.bytes(n.w1, n.w0)).unwrap_or("")
    }

    /// The `$ref` path, or `""` if not a ref node.
    #[must_use]
    pub fn ref_path<'a>(self, pas: &'a Pas) -> &'a str {
        let Some(n) = self.resolve(pas) else { return "" };
        if n.tag != NodeTag::Ref.raw() || n.w1 == 0 {
            return "";
        }
        std::str::from_utf8(pas.bytes(n.w1, n.w0)).unwrap_or("")
    }

    /// The ref's resolved target, or a null view if unresolved or not a
    /// ref node.
    #[must_use]
    pub fn ref_target(self, pas: &Pas) -> NodeView {
        match self.resolve(pas) {
            Some(n) if n.tag == NodeTag::Ref.raw() && n.w2 != 0 => NodeView::new(Offset(n.w2)),
            _ => NodeView::NULL,
        }
    }

    /// Element/pair count for array, object, binary, or string length for
    /// string; `0` otherwise.
    #[must_use]
    pub fn size(self, pas: &Pas) -> u64 {
        let Some(n) = self.resolve(pas) else { return 0 };
        match NodeTag::from_raw(n.tag) {
            NodeTag::Array | NodeTag::Object | NodeTag::Binary => {
                if n.w0 == 0 {
                    0
                } else {
                    pas.array_header(n.w0).size
                }
            }
            NodeTag::String => n.w0,
            _ => 0,
        }
    }

    #[must_use]
    pub fn is_empty(self, pas: &Pas) -> bool {
        self.size(pas) == 0
    }

    /// Array element `idx`, or a null view if out of range or not an
    /// array.
    #[must_use]
    pub fn at(self, pas: &Pas, idx: u64) -> NodeView {
        let Some(n) = self.resolve(pas) else { return NodeView::NULL };
        if n.tag != NodeTag::Array.raw() || n.w0 == 0 {
            return NodeView::NULL;
        }
        let hdr = pas.array_header(n.w0);
        if idx >= hdr.size {
            return NodeView::NULL;
        }
        let id: u64 = pas.record_at(hdr.data_off, idx);
        NodeView::new(Offset(id))
    }

    /// Object value for `key`, or a null view if absent or not an object.
    #[must_use]
    pub fn at_key(self, pas: &Pas, key: &str) -> NodeView {
        let Some(n) = self.resolve(pas) else { return NodeView::NULL };
        if n.tag != NodeTag::Object.raw() || n.w0 == 0 {
            return NodeView::NULL;
        }
        let hdr = pas.array_header(n.w0);
        let idx = obj_lower_bound(pas, hdr.data_off, hdr.size, key);
        if idx >= hdr.size {
            return NodeView::NULL;
        }
        let entry: ObjectEntry = pas.record_at(hdr.data_off, idx);
        if entry.key(pas) == key {
            NodeView::new(Offset(entry.value))
        } else {
            NodeView::NULL
        }
    }

    /// Key of object pair `idx`, for iteration. `""` if out of range or
    /// not an object.
    #[must_use]
    pub fn key_at<'a>(self, pas: &'a Pas, idx: u64) -> &'a str {
        let Some(n) = self.resolve(pas) else { return "" };
        if n.tag != NodeTag::Object.raw() || n.w0 == 0 {
            return "";
        }
        let hdr = pas.array_header(n.w0);
        if idx >= hdr.size {
            return "";
        }
        let entry: ObjectEntry = pas.record_at(hdr.data_off, idx);
        entry.key(pas)
    }

    /// Value of object pair `idx`, for iteration.
    #[must_use]
    pub fn value_at(self, pas: &Pas, idx: u64) -> NodeView {
        let Some(n) = self.resolve(pas) else { return NodeView::NULL };
        if n.tag != NodeTag::Object.raw() || n.w0 == 0 {
            return NodeView::NULL;
        }
        let hdr = pas.array_header(n.w0);
        if idx >= hdr.size {
            return NodeView::NULL;
        }
        let entry: ObjectEntry = pas.record_at(hdr.data_off, idx);
        NodeView::new(Offset(entry.value))
    }

    /// The binary payload's bytes, or `&[]` if not a binary node.
    #[must_use]
    pub fn as_binary<'a>(self, pas: &'a Pas) -> &'a [u8] {
        let Some(n) = self.resolve(pas) else { return &[] };
        if n.tag != NodeTag::Binary.raw() || n.w0 == 0 {
            return &[];
        }
        let hdr = pas.array_header(n.w0);
        pas.bytes(hdr.data_off, hdr.size)
    }

    /// Follows `$ref` chains. Non-ref nodes (and invalid views) return
    /// themselves. Bounded by `max_depth` and guarded against cycles with
    /// a visited-id set, the "robust implementation" spec.md's own
    /// discussion calls for rather than the bare self-cycle check the
    /// original ships.
    #[must_use]
    pub fn deref(self, pas: &Pas, recursive: bool, max_depth: u64) -> NodeView {
        let mut cur = self;
        let mut visited = std::collections::HashSet::new();
        for _ in 0..max_depth {
            if !cur.is_ref(pas) {
                return cur;
            }
            let target = cur.ref_target(pas);
            if !target.valid() {
                return NodeView::NULL;
            }
            if !recursive {
                return target;
            }
            if !visited.insert(cur.id) {
                return NodeView::NULL;
            }
            if target.id == cur.id || visited.contains(&target.id) {
                return NodeView::NULL;
            }
            cur = target;
        }
        NodeView::NULL
    }
}

fn obj_lower_bound(pas: &Pas, pairs_off: u64, len: u64, key: &str) -> u64 {
    let (mut lo, mut hi) = (0u64, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let entry: ObjectEntry = pas.record_at(pairs_off, mid);
        if entry.key(pas) < key {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Recursively releases everything owned by the node at `off` and resets
/// it to null. Interned strings (object keys, ref paths) are never freed,
/// matching [`pstringview`]'s "strings are never individually freed"
/// policy; only the arrays that reference them are.
pub fn free(pas: &mut Pas, off: Offset) {
    let n = read(pas, off);
    match NodeTag::from_raw(n.tag) {
        NodeTag::String => {
            if n.w1 != 0 {
                pas.free_region(Offset(n.w1), n.w0 + 1);
            }
        }
        NodeTag::Binary => {
            if n.w0 != 0 {
                parr::free::<u8>(pas, Offset(n.w0));
                pas.delete(Offset(n.w0));
            }
        }
        NodeTag::Array => {
            if n.w0 != 0 {
                let hdr = pas.array_header(n.w0);
                for i in 0..hdr.size {
                    let id: u64 = pas.record_at(hdr.data_off, i);
                    if id != 0 {
                        free(pas, Offset(id));
                        pas.delete(Offset(id));
                    }
                }
                parr::free::<u64>(pas, Offset(n.w0));
                pas.delete(Offset(n.w0));
            }
        }
        NodeTag::Object => {
            if n.w0 != 0 {
                let hdr = pas.array_header(n.w0);
                for i in 0..hdr.size {
                    let entry: ObjectEntry = pas.record_at(hdr.data_off, i);
                    if entry.value != 0 {
                        free(pas, Offset(entry.value));
                        pas.delete(Offset(entry.value));
                    }
                }
                parr::free::<ObjectEntry>(pas, Offset(n.w0));
                pas.delete(Offset(n.w0));
            }
        }
        _ => {}
    }
    write(pas, off, Node::NULL);
}

/// Resets `off` to null, releasing whatever it held.
pub fn set_null(pas: &mut Pas, off: Offset) {
    free(pas, off);
}

pub fn set_bool(pas: &mut Pas, off: Offset, value: bool) {
    free(pas, off);
    write(pas, off, Node { tag: NodeTag::Bool.raw(), w0: u64::from(value), ..Node::NULL });
}

pub fn set_int(pas: &mut Pas, off: Offset, value: i64) {
    free(pas, off);
    write(pas, off, Node { tag: NodeTag::Int.raw(), w0: value as u64, ..Node::NULL });
}

pub fn set_uint(pas: &mut Pas, off: Offset, value: u64) {
    free(pas, off);
    write(pas, off, Node { tag: NodeTag::UInt.raw(), w0: value, ..Node::NULL });
}

pub fn set_real(pas: &mut Pas, off: Offset, value: f64) {
    free(pas, off);
    write(pas, off, Node { tag: NodeTag::Real.raw(), w0: value.to_bits(), ..Node::NULL });
}

/// Sets a read-write string value, reallocating its buffer every call
/// (matching `pstring`'s assign semantics, not the interned dictionary's).
pub fn set_string(pas: &mut Pas, off: Offset, s: &str) {
    free(pas, off);
    if s.is_empty() {
        write(pas, off, Node { tag: NodeTag::String.raw(), ..Node::NULL });
        return;
    }
    let bytes = s.as_bytes();
    let chars_off = pas.alloc_region(bytes.len() as u64 + 1, 1);
    pas.write_bytes(chars_off.get(), bytes);
    write(
        pas,
        off,
        Node {
            tag: NodeTag::String.raw(),
            w0: bytes.len() as u64,
            w1: chars_off.get(),
            ..Node::NULL
        },
    );
}

pub fn set_array(pas: &mut Pas, off: Offset) {
    free(pas, off);
    write(pas, off, Node { tag: NodeTag::Array.raw(), ..Node::NULL });
}

pub fn set_object(pas: &mut Pas, off: Offset) {
    free(pas, off);
    write(pas, off, Node { tag: NodeTag::Object.raw(), ..Node::NULL });
}

pub fn set_binary(pas: &mut Pas, off: Offset) {
    free(pas, off);
    write(pas, off, Node { tag: NodeTag::Binary.raw(), ..Node::NULL });
}

/// Sets a `$ref` node with `path` interned and an unresolved target.
pub fn set_ref(pas: &mut Pas, off: Offset, path: &str) {
    free(pas, off);
    if path.is_empty() {
        write(pas, off, Node { tag: NodeTag::Ref.raw(), ..Node::NULL });
        return;
    }
    let view = pstringview::intern(pas, path);
    write(
        pas,
        off,
        Node {
            tag: NodeTag::Ref.raw(),
            w0: view.length,
            w1: view.chars_off,
            w2: 0,
        },
    );
}

/// Resolves a ref node's target, no-op if `off` is not a ref node.
pub fn set_ref_target(pas: &mut Pas, off: Offset, target: Offset) {
    let mut n = read(pas, off);
    if n.tag != NodeTag::Ref.raw() {
        return;
    }
    n.w2 = target.get();
    write(pas, off, n);
}

/// Allocates a new node slot, appends its id to the array at `off`, and
/// returns the new slot's id. Assumes `off` already holds an array.
pub fn array_push_back(pas: &mut Pas, off: Offset) -> Offset {
    let slot = create(pas, None);

    let mut n = read(pas, off);
    if n.w0 == 0 {
        let hdr_off = pas.create::<ArrayHeader>(None);
        parr::init(pas, hdr_off);
        n.w0 = hdr_off.get();
        write(pas, off, n);
    }
    parr::push_back(pas, Offset(n.w0), slot.get());
    slot
}

/// Appends `byte` to the binary payload at `off`. Assumes `off` already
/// holds a binary node.
pub fn binary_push_back(pas: &mut Pas, off: Offset, byte: u8) {
    let mut n = read(pas, off);
    if n.w0 == 0 {
        let hdr_off = pas.create::<ArrayHeader>(None);
        parr::init(pas, hdr_off);
        n.w0 = hdr_off.get();
        write(pas, off, n);
    }
    parr::push_back(pas, Offset(n.w0), byte);
}

/// Inserts (or returns the existing) object entry for `key`, interning the
/// key as a [`pstringview`]. Returns the id of the (possibly freshly
/// allocated null) value slot.
pub fn object_insert(pas: &mut Pas, off: Offset, key: &str) -> Offset {
    let view = pstringview::intern(pas, key);

    let mut n = read(pas, off);
    if n.w0 == 0 {
        let hdr_off = pas.create::<ArrayHeader>(None);
        parr::init(pas, hdr_off);
        n.w0 = hdr_off.get();
        write(pas, off, n);
    }
    let hdr_off = Offset(n.w0);
    let hdr = pas.array_header(hdr_off.get());
    let idx = obj_lower_bound(pas, hdr.data_off, hdr.size, key);
    if idx < hdr.size {
        let existing: ObjectEntry = pas.record_at(hdr.data_off, idx);
        if existing.key(pas) == key {
            return Offset(existing.value);
        }
    }

    let slot = create(pas, None);
    let new_entry = ObjectEntry {
        key_length: view.length,
        key_chars_off: view.chars_off,
        value: slot.get(),
    };
    parr::push_back(pas, hdr_off, ObjectEntry::EMPTY);
    let hdr = pas.array_header(hdr_off.get());
    let mut i = hdr.size - 1;
    while i > idx {
        let moved: ObjectEntry = pas.record_at(hdr.data_off, i - 1);
        pas.set_record_at(hdr.data_off, i, moved);
        i -= 1;
    }
    pas.set_record_at(hdr.data_off, idx, new_entry);
    slot
}

#[cfg(test)]
mod tests;
