//! Per-unit ecological spectra.
//!
//! For each survey unit the abundance-weighted distribution of one trait is
//! summarised by [`vt_math::compute_stats`]. The caller prepares the rows
//! (weights and trait attached) and afterwards joins unit metadata back and
//! regroups with a plain mean.

use crate::aggregate::group_rows;
use std::collections::HashMap;
use vt_common::{Result, Table, Value};
use vt_math::{compute_stats, nan_mean, StatsRecord, DEFAULT_Q_HIGH, DEFAULT_Q_LOW, STAT_FIELDS};

/// Columns and quantiles for [`ecospectrum_by_unit`].
#[derive(Debug, Clone, PartialEq)]
pub struct EcospectrumOptions {
    pub trait_col: String,
    pub weight_col: String,
    pub q_low: f64,
    pub q_high: f64,
    pub unit_id_col: String,
    pub unit_scope_col: Option<String>,
}

impl Default for EcospectrumOptions {
    fn default() -> Self {
        Self {
            trait_col: "M".to_string(),
            weight_col: "w".to_string(),
            q_low: DEFAULT_Q_LOW,
            q_high: DEFAULT_Q_HIGH,
            unit_id_col: "description_id".to_string(),
            unit_scope_col: None,
        }
    }
}

impl EcospectrumOptions {
    pub fn unit_columns(&self) -> Vec<&str> {
        let mut cols = vec![self.unit_id_col.as_str()];
        if let Some(scope) = &self.unit_scope_col {
            cols.push(scope.as_str());
        }
        cols
    }
}

/// One row per survey unit, in order of first appearance: the unit columns
/// followed by `n_rows_used sum_w cwm sigma w_median w_min w_max`.
pub fn ecospectrum_by_unit(table: &Table, opts: &EcospectrumOptions) -> Result<Table> {
    let unit_cols = opts.unit_columns();
    let unit_idx = table.require_indices(&unit_cols)?;
    let x_col = table.require_column(&opts.trait_col)?;
    let w_col = table.require_column(&opts.weight_col)?;

    let mut order: Vec<(Vec<Value>, Vec<usize>)> = Vec::new();
    let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
    for r in 0..table.n_rows() {
        let key = table.key_at(r, &unit_idx);
        match index.get(&key) {
            Some(&slot) => order[slot].1.push(r),
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, vec![r]));
            }
        }
    }

    let names = unit_cols
        .iter()
        .copied()
        .chain(STAT_FIELDS)
        .map(str::to_string);
    let mut out = Table::with_columns(names)?;
    for (key, rows) in order {
        let x: Vec<f64> = rows.iter().map(|&r| x_col[r].to_f64_or_nan()).collect();
        let w: Vec<f64> = rows.iter().map(|&r| w_col[r].to_f64_or_nan()).collect();
        let stats = compute_stats(&x, &w, opts.q_low, opts.q_high);
        let mut record = key;
        record.extend(stats_values(&stats));
        out.push_row(record)?;
    }
    tracing::debug!(
        rows = table.n_rows(),
        units = out.n_rows(),
        trait_col = %opts.trait_col,
        "ecospectrum computed"
    );
    Ok(out)
}

fn stats_values(stats: &StatsRecord) -> Vec<Value> {
    STAT_FIELDS
        .iter()
        .map(|field| match *field {
            "n_rows_used" => Value::from(stats.n_rows_used),
            other => Value::from(stats.get(other).unwrap_or(f64::NAN)),
        })
        .collect()
}

/// Join unit-level metadata from `source` onto per-unit rows.
///
/// `source` may hold many rows per unit (one per species); the first row of
/// each unit supplies the metadata.
pub fn attach_unit_metadata(
    per_unit: &Table,
    source: &Table,
    unit_cols: &[&str],
    meta_cols: &[&str],
) -> Result<Table> {
    let mut cols: Vec<&str> = unit_cols.to_vec();
    for c in meta_cols {
        if !cols.contains(c) && !per_unit.has_column(c) {
            cols.push(c);
        }
    }
    let meta = source.select(&cols)?.distinct_by(unit_cols)?;
    per_unit.left_join(&meta, unit_cols)
}

/// Plain NaN-skipping mean of `value_cols` per `groupby` combination,
/// sorted ascending by the groupby columns.
pub fn regroup_mean(table: &Table, groupby: &[&str], value_cols: &[&str]) -> Result<Table> {
    let values: Vec<&[Value]> = value_cols
        .iter()
        .map(|c| table.require_column(c))
        .collect::<Result<_>>()?;
    let groups = group_rows(table, groupby)?;

    let names = groupby.iter().chain(value_cols).map(|c| c.to_string());
    let mut out = Table::with_columns(names)?;
    for (key, rows) in groups {
        let mut record = key;
        for col in &values {
            let xs: Vec<f64> = rows.iter().map(|&r| col[r].to_f64_or_nan()).collect();
            record.push(Value::from(nan_mean(&xs)));
        }
        out.push_row(record)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn species_rows() -> Table {
        Table::from_rows(
            ["description_id", "year", "M", "w"],
            vec![
                vec![7.into(), 2019.into(), 2.0.into(), 1.into()],
                vec![3.into(), 2020.into(), 5.0.into(), 2.into()],
                vec![7.into(), 2019.into(), 4.0.into(), 3.into()],
                vec![3.into(), 2020.into(), Value::Null, 2.into()],
                vec![9.into(), 2020.into(), 6.0.into(), 0.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn units_in_first_appearance_order() {
        let eco = ecospectrum_by_unit(&species_rows(), &EcospectrumOptions::default()).unwrap();
        assert_eq!(
            eco.column("description_id").unwrap(),
            &[7.into(), 3.into(), 9.into()]
        );
        assert_eq!(eco.n_cols(), 8);
    }

    #[test]
    fn weighted_stats_per_unit() {
        let eco = ecospectrum_by_unit(&species_rows(), &EcospectrumOptions::default()).unwrap();
        assert_eq!(eco.value(0, "cwm"), Some(&Value::Float(3.5)));
        let sigma = eco.value(0, "sigma").unwrap().as_f64().unwrap();
        assert!((sigma - 0.75f64.sqrt()).abs() < 1e-12);
        assert_eq!(eco.value(0, "w_median"), Some(&Value::Float(4.0)));
        assert_eq!(eco.value(1, "n_rows_used"), Some(&Value::Int(1)));
    }

    #[test]
    fn zero_weight_unit_is_missing_not_error() {
        let eco = ecospectrum_by_unit(&species_rows(), &EcospectrumOptions::default()).unwrap();
        assert_eq!(eco.value(2, "n_rows_used"), Some(&Value::Int(0)));
        assert_eq!(eco.value(2, "sum_w"), Some(&Value::Float(0.0)));
        assert!(eco.value(2, "cwm").unwrap().is_null());
    }

    #[test]
    fn missing_trait_column_is_structural() {
        let opts = EcospectrumOptions {
            trait_col: "L".to_string(),
            ..EcospectrumOptions::default()
        };
        assert!(ecospectrum_by_unit(&species_rows(), &opts).unwrap_err().is_structural());
    }

    #[test]
    fn metadata_then_regroup() {
        let rows = species_rows();
        let eco = ecospectrum_by_unit(&rows, &EcospectrumOptions::default()).unwrap();
        let eco = attach_unit_metadata(&eco, &rows, &["description_id"], &["year"]).unwrap();
        let by_year = regroup_mean(&eco, &["year"], &["cwm"]).unwrap();

        assert_eq!(by_year.column_names(), &["year", "cwm"]);
        assert_eq!(by_year.value(0, "cwm"), Some(&Value::Float(3.5)));
        // Unit 9 has no usable pairs; its missing cwm does not drag the mean.
        assert_eq!(by_year.value(1, "cwm"), Some(&Value::Float(5.0)));
    }
}
