//! Fuzz target for version parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use nix_src::Version;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(version) = Version::parse(text) {
        let reparsed = Version::parse(&version.to_string()).expect("rendered version parses");
        assert_eq!(reparsed, version);
        assert_eq!(reparsed.metadata, version.metadata);
    }
});
