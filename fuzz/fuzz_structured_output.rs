//! Fuzz target for parsing structured model replies.
//!
//! Run with: cargo +nightly fuzz run fuzz_structured_output
//!
//! Model output is untrusted text; fence stripping and JSON object
//! extraction must never panic on it.

#![no_main]

use concierge_core::structured::{parse_json_object, strip_code_fences};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let stripped = strip_code_fences(s);
    assert!(stripped.len() <= s.len());
    let _ = parse_json_object(s);
});
