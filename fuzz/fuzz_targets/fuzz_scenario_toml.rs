//! Fuzz target for scenario file parsing.
//!
//! Tests that TOML scenario parsing, metric specs included, handles
//! arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vt_core::ScenarioSpec;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(spec) = toml::from_str::<ScenarioSpec>(text) {
            let _ = spec.validate();
            let _ = spec.filter_spec();
        }
    }
});
