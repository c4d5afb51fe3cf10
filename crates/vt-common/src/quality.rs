//! Data-quality issues.
//!
//! These are never errors. A join that leaves rows without metadata, a
//! species without a trait value or an abundance code without a weight all
//! shrink the usable data but keep the pipeline running. Each issue is
//! logged when recorded and handed back to the caller with the result.

use serde::Serialize;

/// One non-fatal data-quality finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityIssue {
    /// Observation rows with no matching description metadata.
    MissingMetadata { rows: usize },
    /// Rows whose `source_file` has no entry in the profile registry.
    UnmappedProfile { rows: usize },
    /// Rows whose abundance code has no weight.
    UnmappedAbundance { rows: usize, codes: Vec<String> },
    /// Rows whose species has no value on the selected trait scale.
    UnmatchedTrait {
        scale: String,
        rows: usize,
        species: Vec<String>,
    },
    /// Rows whose geomorphology code is not in the level map.
    UnknownGeomorphCode { rows: usize, codes: Vec<String> },
}

impl QualityIssue {
    /// Number of affected rows.
    pub fn rows(&self) -> usize {
        match self {
            QualityIssue::MissingMetadata { rows }
            | QualityIssue::UnmappedProfile { rows }
            | QualityIssue::UnmappedAbundance { rows, .. }
            | QualityIssue::UnmatchedTrait { rows, .. }
            | QualityIssue::UnknownGeomorphCode { rows, .. } => *rows,
        }
    }
}

impl std::fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityIssue::MissingMetadata { rows } => {
                write!(f, "{} observation rows have no matching metadata", rows)
            }
            QualityIssue::UnmappedProfile { rows } => {
                write!(f, "{} rows have no profile mapping (profile_id is null)", rows)
            }
            QualityIssue::UnmappedAbundance { rows, codes } => write!(
                f,
                "{} rows have abundance codes without weight ({} distinct codes)",
                rows,
                codes.len()
            ),
            QualityIssue::UnmatchedTrait {
                scale,
                rows,
                species,
            } => write!(
                f,
                "{} rows ({} species) have no {} value",
                rows,
                species.len(),
                scale
            ),
            QualityIssue::UnknownGeomorphCode { rows, codes } => write!(
                f,
                "{} rows have unknown geomorphology codes ({} distinct)",
                rows,
                codes.len()
            ),
        }
    }
}

/// Issues collected over one load or scenario run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataQualityReport {
    pub issues: Vec<QualityIssue>,
}

impl DataQualityReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue and emit it as a warning. Zero-row issues are dropped.
    pub fn record(&mut self, issue: QualityIssue) {
        if issue.rows() == 0 {
            return;
        }
        tracing::warn!(issue = %issue, rows = issue.rows(), "data quality");
        self.issues.push(issue);
    }

    /// Append another report's issues without re-logging them.
    pub fn extend(&mut self, other: DataQualityReport) {
        self.issues.extend(other.issues);
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}
