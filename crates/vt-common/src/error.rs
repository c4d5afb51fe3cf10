//! Error types for Vegtrend.
//!
//! Errors carry:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Remediation suggestions for humans
//!
//! Structural errors are caller contract violations (a column the request
//! names is absent, a filter operator is unknown). They abort the call and
//! are never worked around inside the engine. Data-quality problems are not
//! errors at all; see [`crate::quality`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Vegtrend operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Request does not fit the table it runs against.
    Structural,
    /// Reference table (weights, traits, profiles) is unusable.
    Registry,
    /// Configuration or scenario file errors.
    Config,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Structural => write!(f, "structural"),
            ErrorCategory::Registry => write!(f, "registry"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for Vegtrend.
#[derive(Error, Debug)]
pub enum Error {
    // Structural errors (10-19)
    #[error("filter column not found: {column}")]
    UnknownColumn { column: String },

    #[error("missing required column: {column}")]
    MissingColumn { column: String },

    #[error("unknown filter op for '{column}': {rule}")]
    UnknownFilterOp { column: String, rule: String },

    #[error("predicate filter for '{column}' returned {actual} values for {expected} rows")]
    TypeInvariant {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid regex for '{column}': {message}")]
    InvalidRegex { column: String, message: String },

    #[error("duplicate output column: {column}")]
    DuplicateColumn { column: String },

    #[error("length mismatch: {context} (expected {expected}, got {actual})")]
    LengthMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    // Registry errors (20-29)
    #[error("invalid registry {name}: {message}")]
    InvalidRegistry { name: String, message: String },

    #[error("join keys are not unique on the right side: {keys}")]
    DuplicateKey { keys: String },

    // Configuration errors (30-39)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid scenario '{name}': {message}")]
    InvalidScenario { name: String, message: String },

    // I/O errors (40-49)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Structural errors
    /// - 20-29: Registry errors
    /// - 30-39: Configuration errors
    /// - 40-49: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::UnknownColumn { .. } => 10,
            Error::MissingColumn { .. } => 11,
            Error::UnknownFilterOp { .. } => 12,
            Error::TypeInvariant { .. } => 13,
            Error::InvalidRegex { .. } => 14,
            Error::DuplicateColumn { .. } => 15,
            Error::LengthMismatch { .. } => 16,
            Error::InvalidRegistry { .. } => 20,
            Error::DuplicateKey { .. } => 21,
            Error::Config(_) => 30,
            Error::InvalidScenario { .. } => 31,
            Error::Io(_) => 40,
            Error::Json(_) => 41,
            Error::Csv(_) => 42,
            Error::Toml(_) => 43,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::UnknownColumn { .. }
            | Error::MissingColumn { .. }
            | Error::UnknownFilterOp { .. }
            | Error::TypeInvariant { .. }
            | Error::InvalidRegex { .. }
            | Error::DuplicateColumn { .. }
            | Error::LengthMismatch { .. } => ErrorCategory::Structural,

            Error::InvalidRegistry { .. } | Error::DuplicateKey { .. } => ErrorCategory::Registry,

            Error::Config(_) | Error::InvalidScenario { .. } => ErrorCategory::Config,

            Error::Io(_) | Error::Json(_) | Error::Csv(_) | Error::Toml(_) => ErrorCategory::Io,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::UnknownColumn { .. } => {
                "Check the filter column names against the merged table header."
            }
            Error::MissingColumn { .. } => {
                "The input table lacks a column the request needs. Check groupby, metric and id columns."
            }
            Error::UnknownFilterOp { .. } => {
                "Use a scalar or one of {in, between, contains, regex} as the filter rule."
            }
            Error::TypeInvariant { .. } => {
                "A predicate filter must return exactly one boolean per row."
            }
            Error::InvalidRegex { .. } => "Fix the regular expression syntax in the filter.",
            Error::DuplicateColumn { .. } => {
                "Give every metric a distinct output name that does not shadow a groupby column."
            }
            Error::LengthMismatch { .. } => "Inputs must be aligned row by row.",

            Error::InvalidRegistry { .. } => {
                "Check the registry file header and remove duplicated keys."
            }
            Error::DuplicateKey { .. } => {
                "Metadata must have exactly one row per description (description_id, source_file)."
            }

            Error::Config(_) => "Run 'vegtrend check' to validate configuration and data paths.",
            Error::InvalidScenario { .. } => "Fix the scenario file; see README for the format.",

            Error::Io(_) => "Check that the file exists and is readable.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq .'.",
            Error::Csv(_) => "Check the CSV header and delimiter.",
            Error::Toml(_) => "Invalid TOML. Check the scenario or config file syntax.",
        }
    }

    /// Whether this error is a caller contract violation.
    pub fn is_structural(&self) -> bool {
        self.category() == ErrorCategory::Structural
    }
}
