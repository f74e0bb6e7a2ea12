//! Fuzz target for the persistent image loader.
//!
//! `Pas::load_bytes` is the other point in this crate that parses untrusted
//! bytes: any byte string, including one that is too short, carries a wrong
//! magic/version, or claims a `data_area_size` that doesn't match its own
//! length, must fall back to an empty image rather than panic or read out
//! of bounds.
//!
//! # Running
//!
//! ```bash
//! cd fuzz
//! cargo +nightly fuzz run fuzz_image_loader
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use pas_core::Pas;

fuzz_target!(|data: &[u8]| {
    let pas = Pas::load_bytes(data);
    let _ = pas.validate();
});
