//! Two-stage aggregation.
//!
//! A merged table has one row per species per survey unit, so a plain
//! group mean would weight each unit by its species count. Aggregation
//! therefore runs in two stages:
//!
//! 1. every metric is evaluated once per survey unit ([`unit_metrics`]);
//! 2. the per-unit values are averaged per `groupby` combination, and the
//!    distinct units behind each group are counted as `n_descriptions`.
//!
//! Missing key values form their own group (sorted last); rows are never
//! dropped for having a null key.

use crate::filter::{apply_filters, FilterSpec};
use crate::metric::{default_metrics, Metric, SPECIES_COL};
use std::collections::{BTreeMap, HashSet};
use vt_common::{Error, Result, Table, Value};
use vt_math::nan_mean;

/// Output column counting distinct survey units per group.
pub const N_DESCRIPTIONS: &str = "n_descriptions";

/// Composite identity of a description in merged survey data.
pub const DESCRIPTION_KEYS: [&str; 2] = ["description_id", "source_file"];

/// What to aggregate and how.
#[derive(Debug, Clone)]
pub struct AggregationRequest {
    pub filters: Option<FilterSpec>,
    pub groupby: Vec<String>,
    pub metrics: Vec<Metric>,
    /// Survey-unit id column.
    pub unit_id_col: String,
    /// Optional second identity column; units are then `(id, scope)` pairs.
    pub unit_scope_col: Option<String>,
}

impl Default for AggregationRequest {
    fn default() -> Self {
        Self {
            filters: None,
            groupby: vec!["year".to_string()],
            metrics: default_metrics(),
            unit_id_col: DESCRIPTION_KEYS[0].to_string(),
            unit_scope_col: None,
        }
    }
}

impl AggregationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(mut self, filters: FilterSpec) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn groupby<S: Into<String>>(mut self, cols: impl IntoIterator<Item = S>) -> Self {
        self.groupby = cols.into_iter().map(Into::into).collect();
        self
    }

    pub fn metrics(mut self, metrics: Vec<Metric>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn unit_id_col(mut self, col: impl Into<String>) -> Self {
        self.unit_id_col = col.into();
        self
    }

    pub fn unit_scope_col(mut self, col: Option<String>) -> Self {
        self.unit_scope_col = col;
        self
    }

    /// Columns identifying one survey unit.
    pub fn unit_columns(&self) -> Vec<&str> {
        let mut cols = vec![self.unit_id_col.as_str()];
        if let Some(scope) = &self.unit_scope_col {
            cols.push(scope.as_str());
        }
        cols
    }

    /// Key columns of the per-unit stage: unit identity, then any groupby
    /// column not already part of it.
    fn unit_key_columns(&self) -> Vec<&str> {
        let mut cols = self.unit_columns();
        for g in &self.groupby {
            if !cols.contains(&g.as_str()) {
                cols.push(g.as_str());
            }
        }
        cols
    }

    fn description_keys(&self) -> [&str; 2] {
        [
            self.unit_id_col.as_str(),
            self.unit_scope_col.as_deref().unwrap_or(DESCRIPTION_KEYS[1]),
        ]
    }

    /// Check that the table has every column the request reads and that
    /// output names do not collide.
    fn validate(&self, table: &Table) -> Result<()> {
        let mut required: Vec<&str> = self.unit_columns();
        required.push(SPECIES_COL);
        required.extend(self.groupby.iter().map(String::as_str));
        for metric in &self.metrics {
            required.extend(metric.required_columns());
        }
        table.require_indices(&required)?;

        let mut names: HashSet<&str> = self.unit_key_columns().into_iter().collect();
        names.insert(N_DESCRIPTIONS);
        for metric in &self.metrics {
            if !names.insert(metric.name.as_str()) {
                return Err(Error::DuplicateColumn {
                    column: metric.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Row indices grouped by their key over `cols`, keys ascending.
pub(crate) fn group_rows(table: &Table, cols: &[&str]) -> Result<BTreeMap<Vec<Value>, Vec<usize>>> {
    let idx = table.require_indices(cols)?;
    let mut groups: BTreeMap<Vec<Value>, Vec<usize>> = BTreeMap::new();
    for r in 0..table.n_rows() {
        groups.entry(table.key_at(r, &idx)).or_default().push(r);
    }
    Ok(groups)
}

/// Stage 1: one record per survey unit (crossed with its groupby values),
/// holding the unit keys and one column per metric. Sorted by key.
pub fn unit_metrics(table: &Table, request: &AggregationRequest) -> Result<Table> {
    let filtered = apply_filters(table, request.filters.as_ref())?;
    compute_unit_metrics(&filtered, request, None)
}

/// With `description_rows`, metrics that do not read the species column
/// only see the rows marked there; species metrics always see every row.
fn compute_unit_metrics(
    table: &Table,
    request: &AggregationRequest,
    description_rows: Option<&[bool]>,
) -> Result<Table> {
    request.validate(table)?;
    let keys = request.unit_key_columns();
    let groups = group_rows(table, &keys)?;

    let names = keys
        .iter()
        .map(|k| k.to_string())
        .chain(request.metrics.iter().map(|m| m.name.clone()));
    let mut out = Table::with_columns(names)?;
    for (key, rows) in &groups {
        let firsts: Option<Vec<usize>> =
            description_rows.map(|mask| rows.iter().copied().filter(|&r| mask[r]).collect());
        let mut record = key.clone();
        for metric in &request.metrics {
            let seen = match &firsts {
                Some(firsts) if !metric.reads_species() => firsts.as_slice(),
                _ => rows.as_slice(),
            };
            record.push(Value::from(metric.evaluate(table, seen)?));
        }
        out.push_row(record)?;
    }
    tracing::debug!(rows = table.n_rows(), units = out.n_rows(), "unit metrics computed");
    Ok(out)
}

/// Filter, evaluate every metric per survey unit, then average per group.
///
/// Result columns: the groupby columns, one column per metric (the mean over
/// the group's units, NaN-skipping), and `n_descriptions`. Sorted ascending
/// by the groupby columns.
pub fn aggregate(table: &Table, request: &AggregationRequest) -> Result<Table> {
    let units = unit_metrics(table, request)?;
    summarize_units(&units, request)
}

fn summarize_units(units: &Table, request: &AggregationRequest) -> Result<Table> {
    let groupby: Vec<&str> = request.groupby.iter().map(String::as_str).collect();
    let names = groupby
        .iter()
        .map(|g| g.to_string())
        .chain(request.metrics.iter().map(|m| m.name.clone()))
        .chain(std::iter::once(N_DESCRIPTIONS.to_string()));
    let mut out = Table::with_columns(names)?;
    if units.is_empty() {
        return Ok(out);
    }

    let unit_cols = units.require_indices(&request.unit_columns())?;
    let id_col = unit_cols[0];
    let metric_cols: Vec<&[Value]> = request
        .metrics
        .iter()
        .map(|m| units.require_column(&m.name))
        .collect::<Result<_>>()?;

    for (key, rows) in group_rows(units, &groupby)? {
        let mut record = key;
        for col in &metric_cols {
            let values: Vec<f64> = rows.iter().map(|&r| col[r].to_f64_or_nan()).collect();
            record.push(Value::from(nan_mean(&values)));
        }
        let distinct: HashSet<Vec<Value>> = rows
            .iter()
            .filter(|&&r| !units.value_at(r, id_col).is_null())
            .map(|&r| units.key_at(r, &unit_cols))
            .collect();
        record.push(Value::from(distinct.len()));
        out.push_row(record)?;
    }
    tracing::debug!(units = units.n_rows(), groups = out.n_rows(), "groups aggregated");
    Ok(out)
}

/// One row per description: de-duplicate on `(description_id, source_file)`
/// keeping the first row.
pub fn to_descriptions(table: &Table) -> Result<Table> {
    table.distinct_by(&DESCRIPTION_KEYS)
}

/// Description-level aggregation.
///
/// Plot attributes (cover, height) repeat on every species row, so column
/// metrics read only the first row of each description and plots with more
/// species do not weigh more. Richness, presence and species means still
/// run over all species rows of the unit.
pub fn aggregate_descriptions(table: &Table, request: &AggregationRequest) -> Result<Table> {
    let filtered = apply_filters(table, request.filters.as_ref())?;
    let firsts = first_rows(&filtered, &request.description_keys())?;
    let units = compute_unit_metrics(&filtered, request, Some(&firsts))?;
    summarize_units(&units, request)
}

/// Marks the first row of every distinct key over `keys`.
fn first_rows(table: &Table, keys: &[&str]) -> Result<Vec<bool>> {
    let idx = table.require_indices(keys)?;
    let mut seen: HashSet<Vec<Value>> = HashSet::new();
    Ok((0..table.n_rows()).map(|r| seen.insert(table.key_at(r, &idx))).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterRule;

    fn merged() -> Table {
        Table::from_rows(
            ["description_id", "source_file", "year", "species", "projective_cover"],
            vec![
                vec![1.into(), "a".into(), 2020.into(), "Carex".into(), 40.into()],
                vec![1.into(), "a".into(), 2020.into(), "Poa".into(), 40.into()],
                vec![1.into(), "a".into(), 2020.into(), "Salix".into(), 40.into()],
                vec![2.into(), "a".into(), 2020.into(), "Carex".into(), 60.into()],
                vec![3.into(), "a".into(), 2021.into(), "Poa".into(), 80.into()],
                vec![4.into(), "a".into(), Value::Null, "Poa".into(), 10.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn unit_stage_one_record_per_unit() {
        let units = unit_metrics(&merged(), &AggregationRequest::default()).unwrap();
        assert_eq!(
            units.column_names(),
            &["description_id", "year", "mean_species_richness", "mean_projective_cover"]
        );
        assert_eq!(units.n_rows(), 4);
        assert_eq!(units.value(0, "mean_species_richness"), Some(&Value::Float(3.0)));
    }

    #[test]
    fn group_means_over_units_not_rows() {
        let out = aggregate(&merged(), &AggregationRequest::default()).unwrap();
        assert_eq!(out.column_names(), &["year", "mean_species_richness", "mean_projective_cover", "n_descriptions"]);
        // 2020: units 1 (3 species, cover 40) and 2 (1 species, cover 60).
        assert_eq!(out.value(0, "year"), Some(&Value::Int(2020)));
        assert_eq!(out.value(0, "mean_species_richness"), Some(&Value::Float(2.0)));
        assert_eq!(out.value(0, "mean_projective_cover"), Some(&Value::Float(50.0)));
        assert_eq!(out.value(0, N_DESCRIPTIONS), Some(&Value::Int(2)));
    }

    #[test]
    fn null_group_key_is_kept_last() {
        let out = aggregate(&merged(), &AggregationRequest::default()).unwrap();
        assert_eq!(out.n_rows(), 3);
        assert!(out.value(2, "year").unwrap().is_null());
        assert_eq!(out.value(2, N_DESCRIPTIONS), Some(&Value::Int(1)));
    }

    #[test]
    fn empty_after_filter_is_empty_result() {
        let req = AggregationRequest::default()
            .filters(FilterSpec::new().with("year", FilterRule::Equals(1999.into())));
        let out = aggregate(&merged(), &req).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.n_cols(), 4);
    }

    #[test]
    fn missing_columns_are_structural() {
        let req = AggregationRequest::default().groupby(["impact_type"]);
        let err = aggregate(&merged(), &req).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column } if column == "impact_type"));

        let no_species = merged().select(&["description_id", "year", "projective_cover"]).unwrap();
        let req = AggregationRequest::default().metrics(vec![Metric::mean("projective_cover")]);
        let err = aggregate(&no_species, &req).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column } if column == "species"));
    }

    #[test]
    fn colliding_metric_names_rejected() {
        let req = AggregationRequest::default()
            .metrics(vec![Metric::richness(), Metric::mean("projective_cover").out("year")]);
        assert!(matches!(aggregate(&merged(), &req), Err(Error::DuplicateColumn { .. })));
    }

    #[test]
    fn scope_column_separates_batches() {
        let t = Table::from_rows(
            ["description_id", "source_file", "year", "species"],
            vec![
                vec![1.into(), "a".into(), 2020.into(), "Carex".into()],
                vec![1.into(), "b".into(), 2020.into(), "Poa".into()],
            ],
        )
        .unwrap();
        let req = AggregationRequest::default().metrics(vec![Metric::richness()]);
        let merged_ids = aggregate(&t, &req).unwrap();
        assert_eq!(merged_ids.value(0, N_DESCRIPTIONS), Some(&Value::Int(1)));
        assert_eq!(merged_ids.value(0, "species_richness"), Some(&Value::Float(2.0)));

        let req = req.unit_scope_col(Some("source_file".to_string()));
        let scoped = aggregate(&t, &req).unwrap();
        assert_eq!(scoped.value(0, N_DESCRIPTIONS), Some(&Value::Int(2)));
        assert_eq!(scoped.value(0, "species_richness"), Some(&Value::Float(1.0)));
    }

    #[test]
    fn description_level_reads_each_plot_once() {
        // Per-row cover mean would be (40*3 + 60) / 4 = 45.
        let req = AggregationRequest::default()
            .metrics(vec![Metric::mean("projective_cover")])
            .filters(FilterSpec::new().with("year", FilterRule::Equals(2020.into())));
        let out = aggregate_descriptions(&merged(), &req).unwrap();
        assert_eq!(out.value(0, "mean_projective_cover"), Some(&Value::Float(50.0)));
        assert_eq!(to_descriptions(&merged()).unwrap().n_rows(), 4);
    }

    #[test]
    fn description_level_keeps_species_rows_for_species_metrics() {
        let req = AggregationRequest::default().metrics(vec![
            Metric::richness(),
            Metric::presence("Poa"),
            Metric::species_mean("projective_cover", "Carex"),
            Metric::mean("projective_cover"),
        ]);
        let out = aggregate_descriptions(&merged(), &req).unwrap();
        // 2020: unit 1 has Carex, Poa, Salix; unit 2 has Carex only.
        assert_eq!(out.value(0, "species_richness"), Some(&Value::Float(2.0)));
        assert_eq!(out.value(0, "presence_Poa"), Some(&Value::Float(0.5)));
        assert_eq!(out.value(0, "projective_cover_mean_Carex"), Some(&Value::Float(50.0)));
        assert_eq!(out.value(0, "mean_projective_cover"), Some(&Value::Float(50.0)));
        assert_eq!(out.value(0, N_DESCRIPTIONS), Some(&Value::Int(2)));
    }

    #[test]
    fn description_level_counts_each_plot_once_per_batch() {
        let t = Table::from_rows(
            ["description_id", "source_file", "year", "species", "projective_cover"],
            vec![
                vec![1.into(), "a".into(), 2020.into(), "Carex".into(), 20.into()],
                vec![1.into(), "a".into(), 2020.into(), "Poa".into(), 20.into()],
                vec![1.into(), "b".into(), 2020.into(), "Poa".into(), 80.into()],
            ],
        )
        .unwrap();
        let req = AggregationRequest::default();
        let out = aggregate_descriptions(&t, &req).unwrap();
        // Without a scope column both batches form one unit: two plots read
        // once each, richness over all three rows.
        assert_eq!(out.value(0, "mean_projective_cover"), Some(&Value::Float(50.0)));
        assert_eq!(out.value(0, "mean_species_richness"), Some(&Value::Float(2.0)));
    }

    #[test]
    fn all_missing_metric_yields_missing_mean() {
        let t = merged()
            .with_column("projective_cover", vec![Value::Null; 6])
            .unwrap();
        let out = aggregate(&t, &AggregationRequest::default()).unwrap();
        assert!(out.value(0, "mean_projective_cover").unwrap().is_null());
    }
}
