//! Fuzz target for the `pjson` text parser.
//!
//! `pjson::from_string` is one of two points in this crate that parses
//! untrusted bytes (the other is the image loader, see
//! `fuzz_image_loader.rs`). It must never panic, and on malformed input must
//! leave the target null rather than produce a partially written value.
//!
//! # Running
//!
//! ```bash
//! cd fuzz
//! cargo +nightly fuzz run fuzz_pjson_parser
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use pas_core::{pjson, Pas};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let mut pas = Pas::new();
        let root = pjson::create(&mut pas, None);
        let _ = pjson::from_string(&mut pas, root, input);
    }
});
