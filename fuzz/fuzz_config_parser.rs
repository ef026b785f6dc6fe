//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Feeds arbitrary text through `AppConfig::parse()` and, when that succeeds,
//! through the environment override path with the same text as every value.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(mut config) = concierge_config::AppConfig::parse(s) {
        let _ = config.apply_env_from(|_| Some(s.to_string()));
        let _ = config.require_api_key();
    }
});
