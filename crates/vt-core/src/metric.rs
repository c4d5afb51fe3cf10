//! Per-unit metrics.
//!
//! A metric turns the rows of one survey unit into a single number. The set
//! of strategies is closed so every metric the engine can run is known and
//! tested here. An undefined result (no usable values) is NaN, which the
//! table stores as a missing cell.
//!
//! `Presence` deserves a note: per unit it is 1.0 or 0.0, so after the mean
//! across units in the second aggregation stage it reads as the share of
//! units in which the species was recorded.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use vt_common::{Error, Result, Table, Value};
use vt_math::{count_present, nan_mean, nan_sum};

/// Column holding the canonical species name.
pub const SPECIES_COL: &str = "species";

/// What a metric computes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricKind {
    /// Mean of the numeric-coerced column.
    Mean { column: String },
    /// Number of non-missing cells.
    #[serde(rename = "count")]
    CountNonNull { column: String },
    /// Sum of the numeric-coerced column (0 when nothing is present).
    Sum { column: String },
    /// Number of distinct species.
    Richness,
    /// 1.0 when the species occurs at least once, else 0.0.
    Presence { species: String },
    /// Mean of `column` over the rows of one species.
    SpeciesMean { column: String, species: String },
}

/// A named metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MetricSpec")]
pub struct Metric {
    pub name: String,
    #[serde(flatten)]
    pub kind: MetricKind,
}

impl Metric {
    pub fn mean(column: &str) -> Self {
        Self::named(format!("mean_{}", column), MetricKind::Mean { column: column.to_string() })
    }

    pub fn count(column: &str) -> Self {
        Self::named(
            format!("count_{}", column),
            MetricKind::CountNonNull { column: column.to_string() },
        )
    }

    pub fn sum(column: &str) -> Self {
        Self::named(format!("sum_{}", column), MetricKind::Sum { column: column.to_string() })
    }

    pub fn richness() -> Self {
        Self::named("species_richness", MetricKind::Richness)
    }

    pub fn presence(species: &str) -> Self {
        Self::named(
            format!("presence_{}", species),
            MetricKind::Presence { species: species.to_string() },
        )
    }

    pub fn species_mean(column: &str, species: &str) -> Self {
        Self::named(
            format!("{}_mean_{}", column, species),
            MetricKind::SpeciesMean {
                column: column.to_string(),
                species: species.to_string(),
            },
        )
    }

    pub fn named(name: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Rename the output column.
    pub fn out(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Columns the metric reads.
    pub fn required_columns(&self) -> Vec<&str> {
        match &self.kind {
            MetricKind::Mean { column }
            | MetricKind::CountNonNull { column }
            | MetricKind::Sum { column } => vec![column.as_str()],
            MetricKind::Richness | MetricKind::Presence { .. } => vec![SPECIES_COL],
            MetricKind::SpeciesMean { column, .. } => vec![column.as_str(), SPECIES_COL],
        }
    }

    /// True when the metric looks at which species a row holds. Such metrics
    /// always see every species row of a unit.
    pub fn reads_species(&self) -> bool {
        matches!(
            self.kind,
            MetricKind::Richness | MetricKind::Presence { .. } | MetricKind::SpeciesMean { .. }
        )
    }

    /// Evaluate over the given rows of `table`.
    pub fn evaluate(&self, table: &Table, rows: &[usize]) -> Result<f64> {
        let value = match &self.kind {
            MetricKind::Mean { column } => {
                let col = table.require_column(column)?;
                nan_mean(&numeric(col, rows.iter().copied()))
            }
            MetricKind::CountNonNull { column } => {
                let col = table.require_column(column)?;
                rows.iter().filter(|&&r| !col[r].is_null()).count() as f64
            }
            MetricKind::Sum { column } => {
                let col = table.require_column(column)?;
                nan_sum(&numeric(col, rows.iter().copied()))
            }
            MetricKind::Richness => {
                let species = table.require_column(SPECIES_COL)?;
                rows.iter()
                    .map(|&r| &species[r])
                    .filter(|v| !v.is_null())
                    .collect::<HashSet<_>>()
                    .len() as f64
            }
            MetricKind::Presence { species: name } => {
                let species = table.require_column(SPECIES_COL)?;
                let target = Value::from(name.as_str());
                if rows.iter().any(|&r| species[r] == target) {
                    1.0
                } else {
                    0.0
                }
            }
            MetricKind::SpeciesMean {
                column,
                species: name,
            } => {
                let col = table.require_column(column)?;
                let species = table.require_column(SPECIES_COL)?;
                let target = Value::from(name.as_str());
                let values = numeric(col, rows.iter().copied().filter(|&r| species[r] == target));
                nan_mean(&values)
            }
        };
        Ok(value)
    }
}

fn numeric(col: &[Value], rows: impl Iterator<Item = usize>) -> Vec<f64> {
    rows.map(|r| col[r].to_f64_or_nan()).collect()
}

/// Default metrics of an aggregation: mean richness and mean cover.
pub fn default_metrics() -> Vec<Metric> {
    vec![
        Metric::richness().out("mean_species_richness"),
        Metric::mean("projective_cover").out("mean_projective_cover"),
    ]
}

/// Wire form of a metric: `{type, column?, species?, out?}`.
#[derive(Debug, Clone, Deserialize)]
struct MetricSpec {
    #[serde(rename = "type")]
    kind: String,
    column: Option<String>,
    species: Option<String>,
    out: Option<String>,
    name: Option<String>,
}

impl TryFrom<MetricSpec> for Metric {
    type Error = Error;

    fn try_from(spec: MetricSpec) -> Result<Self> {
        let need = |field: &str, value: &Option<String>| -> Result<String> {
            value.clone().ok_or_else(|| {
                Error::Config(format!("metric type '{}' needs '{}'", spec.kind, field))
            })
        };

        let metric = match spec.kind.as_str() {
            "mean" => Metric::mean(&need("column", &spec.column)?),
            "count" => Metric::count(&need("column", &spec.column)?),
            "sum" => Metric::sum(&need("column", &spec.column)?),
            "richness" => Metric::richness(),
            "presence" => Metric::presence(&need("species", &spec.species)?),
            "species_mean" => Metric::species_mean(
                &need("column", &spec.column)?,
                &need("species", &spec.species)?,
            ),
            other => return Err(Error::Config(format!("unknown metric type: {}", other))),
        };

        Ok(match spec.out.or(spec.name) {
            Some(name) => metric.out(name),
            None => metric,
        })
    }
}

/// Parse the CLI form `type[:column][:species]`.
///
/// `presence` takes the species as its only argument:
/// `mean:projective_cover`, `richness`, `presence:Carex acuta`,
/// `species_mean:projective_cover:Carex acuta`.
impl std::str::FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':').map(str::trim);
        let kind = parts.next().unwrap_or_default().to_string();
        let first = parts.next().map(str::to_string);
        let second = parts.next().map(str::to_string);

        let (column, species) = match kind.as_str() {
            "presence" => (None, first),
            _ => (first, second),
        };
        Metric::try_from(MetricSpec {
            kind,
            column,
            species,
            out: None,
            name: None,
        })
    }
}
