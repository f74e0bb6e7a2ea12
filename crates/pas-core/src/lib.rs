//! # `pas-core`
//!
//! A single-file, offset-addressed, memory-mapped-style heap for strongly
//! typed persistent values.
//!
//! A [`Pas`] ("persistent address space") owns one flat byte buffer holding
//! a header, four self-describing internal tables, and every object ever
//! created in it. There are no pointers in a saved image: every reference
//! between objects is an [`Offset`], a byte offset into that buffer, so the
//! whole thing can be written to disk with a single `write` and brought
//! back with a single `read` — no per-object (de)serialization step runs.
//!
//! ## Building blocks
//!
//! - [`pas`] — the engine itself: allocation, the slot/type/name/free-list
//!   tables, save/load, validation.
//! - [`parr`] — the shared growable-array primitive (`{size, capacity,
//!   data_off}`) every other container is built from.
//! - [`fptr`] — a typed, nullable pointer-analogue that always re-resolves
//!   through its owning `Pas`.
//! - [`pstring`] / [`pstringview`] — owned, read-write strings and
//!   interned, read-only strings with a shared dictionary.
//! - [`pvector`] / [`pmap`] — a growable array and a sorted associative map
//!   over arbitrary `Pod` element types.
//! - [`pjson`] — a compact JSON value embedded directly in the address
//!   space, with its own text parser/serializer.
//! - [`node`] — an id-addressed DOM built on the same primitives, adding
//!   binary blobs and `$ref` links between top-level values.
//! - [`legacy`] — a thin adapter preserving the shape of an earlier,
//!   narrower allocator API for callers that have not migrated.
//!
//! ## Quick start
//!
//! ```rust
//! use pas_core::{pjson, Pas};
//!
//! let mut pas = Pas::new();
//! let root = pjson::create(&mut pas, Some("config"));
//! pjson::from_string(&mut pas, root, r#"{"retries": 3, "host": "localhost"}"#);
//! assert!(!pjson::to_string(&pas, root).is_empty());
//! ```
//!
//! Most operations here report failure through a sentinel — a null
//! [`Offset`], an empty string, `false` — rather than [`Result`]; see
//! [`error`] for where the line is drawn.

#![warn(missing_docs)]
#![cfg_attr(
    test,
    allow(clippy::cast_lossless, clippy::cast_possible_truncation, clippy::similar_names)
)]

pub mod config;
pub mod error;
pub mod fptr;
pub mod legacy;
pub mod node;
pub mod offset;
pub mod parr;
pub mod pas;
pub mod pjson;
pub mod pmap;
pub mod pstring;
pub mod pstringview;
pub mod pvector;

pub use config::PasConfig;
pub use error::{ConfigError, Error, Result};
pub use fptr::Fptr;
pub use node::{Node, NodeTag, NodeView};
pub use offset::Offset;
pub use pas::Pas;
pub use pjson::{PJson, PJsonTag};
pub use pmap::PMap;
pub use pstring::PString;
pub use pstringview::PStringView;
pub use pvector::PVector;
