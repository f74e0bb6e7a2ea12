//! Error types for the persistent address space.
//!
//! Most PAS operations signal failure through the sentinel values documented
//! on each method (a zero [`crate::Offset`], `None`, an empty string, a JSON
//! `null`) rather than `Result` — this mirrors the original allocator, where
//! "no memory" and "name taken" are routine, expected outcomes rather than
//! exceptional ones. [`Error`] is reserved for the I/O boundary (opening and
//! saving an image file) and for programmer errors that have no sensible
//! sentinel (resolving a handle at the wrong type, using a handle after
//! [`crate::Pas::reset`]).

use thiserror::Error;

/// Errors produced at the I/O boundary or by programmer misuse of a handle.
#[derive(Error, Debug)]
pub enum Error {
    /// The image file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file's header magic or version does not match this build.
    #[error("not a recognized PAS image (bad magic or version)")]
    BadMagic,

    /// `Pas::load` or `Validate` found the image internally inconsistent.
    #[error("corrupt image: {0}")]
    Corrupt(String),

    /// A handle was resolved at a type or size that does not match the slot
    /// it was created with.
    #[error("offset {offset} does not hold a value of the requested type")]
    TypeMismatch {
        /// The offset that was resolved.
        offset: u64,
    },

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias used throughout this crate's I/O and config surfaces.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading [`crate::config::PasConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The merged configuration failed to deserialize.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// A configuration value was outside its allowed range.
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Dotted path of the offending key.
        key: String,
        /// Human-readable explanation.
        message: String,
    },
}
