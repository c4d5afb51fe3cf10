//! Fuzz target for CSV table loading.
//!
//! Tests that delimiter sniffing and cell typing handle arbitrary input
//! without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vt_common::Table;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(table) = Table::from_csv_str(text) {
            let mut out = Vec::new();
            let _ = table.write_csv(&mut out);
        }
    }
});
