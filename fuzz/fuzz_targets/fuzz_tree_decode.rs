//! Fuzz target for tree payload decoding.
//!
//! Arbitrary bytes must decode or fail cleanly, and anything that decodes must
//! re-encode to a payload that decodes to the same entries.

#![no_main]

use husk_storage::tree;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(entries) = tree::decode(data) else {
        return;
    };

    let encoded = tree::encode(&entries);
    let reparsed = tree::decode(&encoded).expect("re-encoded tree must decode");
    assert_eq!(entries, reparsed);

    // Truncated payloads exercise the cursor's bounds checks.
    if !encoded.is_empty() {
        for cut in [1, encoded.len() / 2, encoded.len() - 1] {
            if cut > 0 && cut < encoded.len() {
                let _ = tree::decode(&encoded[..cut]);
            }
        }
    }
});
