//! Fuzz target for weighted statistics.
//!
//! Arbitrary values and weights, NaN and infinities included, must never
//! panic.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vt_math::{compute_stats, weighted_quantile};

#[derive(Debug, Arbitrary)]
struct Input {
    pairs: Vec<(f64, f64)>,
    q: f64,
}

fuzz_target!(|input: Input| {
    let (values, weights): (Vec<f64>, Vec<f64>) = input.pairs.into_iter().unzip();
    let stats = compute_stats(&values, &weights, 0.05, 0.95);
    assert!(stats.n_rows_used <= values.len());

    let q = if input.q.is_finite() { input.q.clamp(0.0, 1.0) } else { 0.5 };
    let _ = weighted_quantile(&values, &weights, q);
});
