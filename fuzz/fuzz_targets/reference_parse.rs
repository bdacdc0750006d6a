//! Fuzz target for source reference parsing.
//!
//! Anything that parses must survive a render/parse round trip.

#![no_main]

use libfuzzer_sys::fuzz_target;
use nix_src::source::parse_reference;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(locator) = parse_reference(text) {
        let reparsed = parse_reference(&locator.to_string());
        assert_eq!(reparsed.as_ref(), Ok(&locator));
    }
});
