//! Fuzz target for tracked `.src.json` documents.
//!
//! This fuzzer feeds arbitrary byte sequences to the tracked source reader,
//! checking for panics, crashes, or hangs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use nix_src::tracked::fuzz_parse_tracked;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let _ = fuzz_parse_tracked(data);
});
