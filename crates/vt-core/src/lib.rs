//! Vegtrend Core Library
//!
//! This library provides the survey-aggregation engine:
//! - Filter predicate evaluation over tables
//! - Per-unit metrics and the two-stage aggregation
//! - Per-unit ecological spectra and their regrouping
//! - Merged-dataset loading and scenario orchestration
//! - Logging, output rendering and CLI exit codes
//!
//! The binary entry point is in `main.rs`.

pub mod aggregate;
pub mod dataset;
pub mod ecospectrum;
pub mod exit_codes;
pub mod filter;
pub mod logging;
pub mod metric;
pub mod output;
pub mod scenario;

pub use aggregate::{
    aggregate, aggregate_descriptions, to_descriptions, unit_metrics, AggregationRequest,
    N_DESCRIPTIONS,
};
pub use dataset::{load_dataset, merge_dataset, Dataset, DatasetSources};
pub use ecospectrum::{attach_unit_metadata, ecospectrum_by_unit, regroup_mean, EcospectrumOptions};
pub use filter::{apply_filters, FilterRule, FilterSpec};
pub use metric::{default_metrics, Metric, MetricKind};
pub use scenario::{AnalysisKind, Level, ScenarioOutcome, ScenarioRunner, ScenarioSpec};
