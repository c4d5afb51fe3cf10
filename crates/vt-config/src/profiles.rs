//! Profile / impact registry.
//!
//! Maps each survey batch (`source_file`) to the profile it belongs to and
//! that profile's impact type. Saved by spreadsheet tools with either `,` or
//! `;` as separator.

use std::path::Path;
use vt_common::text::trim_value;
use vt_common::{DataQualityReport, Error, QualityIssue, Result, Table};

pub const PROFILE_ID_COL: &str = "profile_id";
pub const SOURCE_FILE_COL: &str = "source_file";
pub const IMPACT_TYPE_COL: &str = "impact_type";

const REQUIRED: [&str; 3] = [PROFILE_ID_COL, SOURCE_FILE_COL, IMPACT_TYPE_COL];

/// Validated registry, one row per `source_file`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRegistry {
    table: Table,
}

impl ProfileRegistry {
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        Self::from_table(&Table::from_csv_path(path)?)
    }

    /// Check the header, trim the key columns and reject duplicated batches.
    pub fn from_table(table: &Table) -> Result<Self> {
        let missing: Vec<&str> = REQUIRED
            .iter()
            .copied()
            .filter(|c| !table.has_column(c))
            .collect();
        if !missing.is_empty() {
            return Err(Error::InvalidRegistry {
                name: "profiles".to_string(),
                message: format!("missing columns: {}", missing.join(", ")),
            });
        }

        let mut out = table.clone();
        for col in REQUIRED {
            let trimmed = table.require_column(col)?.iter().map(trim_value).collect();
            out = out.with_column(col, trimmed)?;
        }

        let mut seen = std::collections::HashSet::new();
        let mut dups = std::collections::BTreeSet::new();
        for value in out.require_column(SOURCE_FILE_COL)? {
            if !seen.insert(value) {
                dups.insert(value.to_string());
            }
        }
        if !dups.is_empty() {
            return Err(Error::InvalidRegistry {
                name: "profiles".to_string(),
                message: format!(
                    "duplicated source_file values: {}",
                    dups.into_iter().collect::<Vec<_>>().join(", ")
                ),
            });
        }

        Ok(Self { table: out })
    }

    pub fn len(&self) -> usize {
        self.table.n_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Left-join registry columns onto `merged` by `source_file`.
    pub fn attach(&self, merged: &Table, report: &mut DataQualityReport) -> Result<Table> {
        let out = merged.left_join(&self.table, &[SOURCE_FILE_COL])?;
        let unmapped = out
            .require_column(PROFILE_ID_COL)?
            .iter()
            .filter(|v| v.is_null())
            .count();
        report.record(QualityIssue::UnmappedProfile { rows: unmapped });
        Ok(out)
    }
}
