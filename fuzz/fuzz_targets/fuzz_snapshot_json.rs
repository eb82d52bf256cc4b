//! Fuzz target for engine snapshot parsing.
//!
//! Tests that arbitrary JSON is rejected or loaded without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pyp_core::base_measure::Uniform;
use pyp_core::hpyp::Hpyp;
use pyp_core::EngineSnapshot;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(snapshot) = EngineSnapshot::<Hpyp<u8, u8, Uniform>>::from_json(text) {
        // Loaded state may be inconsistent; checking it must not panic.
        let _ = snapshot.state.check_consistency();
    }
});
