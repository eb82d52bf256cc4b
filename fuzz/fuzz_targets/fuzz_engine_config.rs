//! Fuzz target for engine configuration parsing.
//!
//! Tests that JSON and TOML parsing plus validation handle arbitrary input
//! without panicking, and that accepted configs survive a JSON round trip.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pyp_config::validate::validate_engine;
use pyp_config::EngineConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for parsed in [EngineConfig::from_json_str(text), EngineConfig::from_toml_str(text)] {
        let Ok(config) = parsed else {
            continue;
        };
        if validate_engine(&config).is_ok() {
            let json = config.to_json().expect("valid config serializes");
            let back = EngineConfig::from_json_str(&json).expect("own output parses");
            assert!(validate_engine(&back).is_ok());
        }
    }
});
