//! Fuzz target for filter specifications.
//!
//! Parses arbitrary JSON as a filter spec and applies it to a fixed table.
//! Bad rules and bad regexes must come back as errors.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vt_common::Table;
use vt_core::{apply_filters, FilterSpec};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(spec) = FilterSpec::from_json_str(text) else {
        return;
    };
    let table = Table::from_csv_str(
        "year,impact_type,projective_cover\n2019,upper dam,40\n2020,natural,\n,,abc\n",
    )
    .expect("fixture table is valid");
    let _ = apply_filters(&table, Some(&spec));
});
