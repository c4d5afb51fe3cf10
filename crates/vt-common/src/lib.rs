//! Vegtrend common types, tables, and errors.
//!
//! This crate provides foundational types shared across the vt-* crates:
//! - `Value` cells with total ordering so they can key a group-by
//! - Column-oriented in-memory `Table` with CSV loading and writing
//! - Unified error type with stable codes
//! - Data-quality issue reporting
//! - Output format specifications

pub mod error;
pub mod output;
pub mod quality;
pub mod table;
pub mod text;
pub mod value;

pub use error::{Error, ErrorCategory, Result};
pub use output::OutputFormat;
pub use quality::{DataQualityReport, QualityIssue};
pub use table::Table;
pub use value::Value;

/// Schema version stamped on rendered results.
pub const SCHEMA_VERSION: &str = "1.0.0";
