//! Fuzz target for object frame parsing and zlib decoding.
//!
//! Tests that the frame parser and the decompressor handle arbitrary input
//! without panicking.

#![no_main]

use husk_storage::{codec, Object};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Raw bytes as an uncompressed frame
    if let Ok(object) = Object::from_frame(data) {
        assert_eq!(object.to_frame(), data);
    }

    // Raw bytes as a stored object file
    if let Ok(frame) = codec::decompress(data) {
        let _ = Object::from_frame(&frame);
    }
});
