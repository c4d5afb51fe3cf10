//! Abundance-class weights.
//!
//! The table maps an abundance code (Braun-Blanquet style: `r`, `+`, `1`,
//! `2a`, ...) to a positive weight. The first column is the code, the second
//! the weight; headers are free-form.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use vt_common::text::normalize_value;
use vt_common::{DataQualityReport, Error, QualityIssue, Result, Table, Value};

/// Default observation column holding the abundance code.
pub const ABUNDANCE_COL: &str = "abundance_class";

/// Default output column for the weight.
pub const WEIGHT_COL: &str = "w";

/// Code → weight lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbundanceWeights {
    weights: HashMap<String, f64>,
}

impl AbundanceWeights {
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        Self::from_table(&Table::from_csv_path(path)?)
    }

    /// Build from the first two columns. Rows with a blank code or a
    /// non-numeric weight are dropped; a repeated code keeps the last weight.
    pub fn from_table(table: &Table) -> Result<Self> {
        if table.n_cols() < 2 {
            return Err(Error::InvalidRegistry {
                name: "abundance_weights".to_string(),
                message: format!("expected code and weight columns, found {}", table.n_cols()),
            });
        }
        let mut weights = HashMap::new();
        for row in 0..table.n_rows() {
            let code = normalize_value(table.value_at(row, 0));
            let weight = table.value_at(row, 1).as_f64();
            if let (Value::Text(code), Some(w)) = (code, weight) {
                weights.insert(code, w);
            }
        }
        tracing::debug!(codes = weights.len(), "loaded abundance weights");
        Ok(Self { weights })
    }

    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, f64)>) -> Self {
        Self {
            weights: pairs.into_iter().map(|(c, w)| (c.into(), w)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weight for a raw code cell. Null or unmapped codes have none.
    pub fn weight_of(&self, code: &Value) -> Option<f64> {
        match normalize_value(code) {
            Value::Text(code) => self.weights.get(&code).copied(),
            _ => None,
        }
    }

    /// Add `out_col` holding the weight of each row's `abundance_col` code.
    ///
    /// Rows with a present but unmapped code are reported; rows with no code
    /// at all are not, since a missing class is an ordinary observation.
    pub fn attach(
        &self,
        table: &Table,
        abundance_col: &str,
        out_col: &str,
        report: &mut DataQualityReport,
    ) -> Result<Table> {
        let codes = table.require_column(abundance_col)?;
        let mut unmapped_rows = 0;
        let mut unmapped = BTreeSet::new();
        let values = codes
            .iter()
            .map(|code| match self.weight_of(code) {
                Some(w) => Value::Float(w),
                None => {
                    if let Value::Text(c) = normalize_value(code) {
                        unmapped_rows += 1;
                        unmapped.insert(c);
                    }
                    Value::Null
                }
            })
            .collect();

        report.record(QualityIssue::UnmappedAbundance {
            rows: unmapped_rows,
            codes: unmapped.into_iter().collect(),
        });
        table.with_column(out_col, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AbundanceWeights {
        let table = Table::from_csv_str("code,weight\nr,0.1\n+,0.5\n1,3\n2a,not a number\n1,5\n").unwrap();
        AbundanceWeights::from_table(&table).unwrap()
    }

    #[test]
    fn last_duplicate_wins_and_junk_dropped() {
        let w = registry();
        assert_eq!(w.len(), 3);
        assert_eq!(w.weight_of(&Value::from("1")), Some(5.0));
        assert_eq!(w.weight_of(&Value::Int(1)), Some(5.0));
        assert_eq!(w.weight_of(&Value::from("2a")), None);
    }

    #[test]
    fn codes_are_trimmed() {
        assert_eq!(registry().weight_of(&Value::from(" + ")), Some(0.5));
    }

    #[test]
    fn attach_reports_unmapped_codes() {
        let obs = Table::from_rows(
            ["species", "abundance_class"],
            vec![
                vec!["Carex".into(), "r".into()],
                vec!["Poa".into(), "5".into()],
                vec!["Salix".into(), Value::Null],
            ],
        )
        .unwrap();
        let mut report = DataQualityReport::new();
        let out = registry().attach(&obs, ABUNDANCE_COL, WEIGHT_COL, &mut report).unwrap();

        assert_eq!(out.column("w").unwrap(), &[Value::Float(0.1), Value::Null, Value::Null]);
        assert_eq!(
            report.issues,
            vec![QualityIssue::UnmappedAbundance {
                rows: 1,
                codes: vec!["5".to_string()]
            }]
        );
    }

    #[test]
    fn single_column_registry_rejected() {
        let table = Table::from_csv_str("code\nr\n").unwrap();
        let err = AbundanceWeights::from_table(&table).unwrap_err();
        assert_eq!(err.code(), 20);
    }
}
