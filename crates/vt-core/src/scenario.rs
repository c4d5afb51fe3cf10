//! Scenario orchestration.
//!
//! A scenario names one analysis over the merged dataset: which rows, which
//! grouping and which metrics (aggregation) or trait statistics
//! (ecospectrum). Scenarios are read from TOML or JSON files:
//!
//! ```toml
//! name = "cover_by_impact"
//! analysis = "aggregate"
//! groupby = ["year", "impact_type"]
//! filters = { geomorph_level = { in = ["low_floodplain", "medium_floodplain"] } }
//!
//! [[metrics]]
//! type = "mean"
//! column = "projective_cover"
//! ```
//!
//! The CLI subcommands build the same spec from flags, so every analysis
//! goes through [`ScenarioRunner::run`].

use crate::aggregate::{aggregate, aggregate_descriptions, AggregationRequest};
use crate::ecospectrum::{attach_unit_metadata, ecospectrum_by_unit, regroup_mean, EcospectrumOptions};
use crate::filter::{apply_filters, FilterSpec};
use crate::metric::{default_metrics, Metric};
use serde::{Deserialize, Serialize};
use std::path::Path;
use vt_common::{DataQualityReport, Error, Result, Table};
use vt_config::abundance::{ABUNDANCE_COL, WEIGHT_COL};
use vt_config::resolve::DataFile;
use vt_config::{AbundanceWeights, AnalysisConfig, DataPaths, TraitTable};
use vt_math::STAT_FIELDS;

/// Which engine a scenario runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    #[default]
    Aggregate,
    Ecospectrum,
}

/// Row level of an aggregation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Column metrics such as mean cover read one row per description;
    /// species metrics still see every species row.
    #[default]
    Description,
    /// Species rows as they are; metrics see every occurrence.
    Species,
}

fn default_trait_scale() -> String {
    "M".to_string()
}

fn default_eco_metrics() -> Vec<String> {
    vec!["cwm".to_string()]
}

/// One analysis to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioSpec {
    pub name: String,

    #[serde(default)]
    pub analysis: AnalysisKind,

    /// Aggregation only.
    #[serde(default)]
    pub level: Level,

    /// Raw `column: rule` map; parsed when the scenario runs so a bad rule
    /// reports the filter error rather than a deserialization error.
    #[serde(default)]
    pub filters: Option<serde_json::Map<String, serde_json::Value>>,

    /// Empty means the configured default grouping.
    #[serde(default)]
    pub groupby: Vec<String>,

    /// Empty means mean richness and mean cover.
    #[serde(default)]
    pub metrics: Vec<Metric>,

    /// Ecospectrum only: the indicator-value column.
    #[serde(default = "default_trait_scale")]
    pub trait_scale: String,

    /// Ecospectrum only: statistics to regroup.
    #[serde(default = "default_eco_metrics")]
    pub eco_metrics: Vec<String>,
}

impl ScenarioSpec {
    pub fn new(name: impl Into<String>, analysis: AnalysisKind) -> Self {
        Self {
            name: name.into(),
            analysis,
            level: Level::default(),
            filters: None,
            groupby: Vec::new(),
            metrics: Vec::new(),
            trait_scale: default_trait_scale(),
            eco_metrics: default_eco_metrics(),
        }
    }

    /// Read a scenario file. `.json` files are JSON, everything else TOML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let spec: ScenarioSpec = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)?,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Checks that need no data.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(self.invalid("name must not be empty"));
        }
        if self.analysis == AnalysisKind::Ecospectrum {
            if self.trait_scale.trim().is_empty() {
                return Err(self.invalid("trait_scale must not be empty"));
            }
            if self.eco_metrics.is_empty() {
                return Err(self.invalid("eco_metrics must not be empty"));
            }
            if let Some(bad) = self.eco_metrics.iter().find(|m| !STAT_FIELDS.contains(&m.as_str())) {
                return Err(self.invalid(&format!(
                    "unknown eco metric '{}' (expected one of {})",
                    bad,
                    STAT_FIELDS.join(", ")
                )));
            }
        }
        Ok(())
    }

    pub fn filter_spec(&self) -> Result<Option<FilterSpec>> {
        self.filters.as_ref().map(FilterSpec::from_json_map).transpose()
    }

    fn invalid(&self, message: &str) -> Error {
        Error::InvalidScenario {
            name: self.name.clone(),
            message: message.to_string(),
        }
    }
}

/// Result of one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub result: Table,
    pub quality: DataQualityReport,
}

/// Runs scenarios against a merged table with the registries they need.
#[derive(Debug, Clone, Default)]
pub struct ScenarioRunner {
    config: AnalysisConfig,
    weights: Option<AbundanceWeights>,
    trait_source: Option<Table>,
}

impl ScenarioRunner {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            weights: None,
            trait_source: None,
        }
    }

    pub fn with_weights(mut self, weights: AbundanceWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// The wide indicator-value table; the scale is picked per scenario.
    pub fn with_trait_source(mut self, table: Table) -> Self {
        self.trait_source = Some(table);
        self
    }

    /// Load whichever of the weight and indicator tables are configured.
    pub fn from_paths(config: AnalysisConfig, paths: &DataPaths) -> Result<Self> {
        let mut runner = Self::new(config);
        if let Some(path) = paths.get(DataFile::AbundanceWeights) {
            runner = runner.with_weights(AbundanceWeights::from_csv_path(path)?);
        }
        if let Some(path) = paths.get(DataFile::IndicatorValues) {
            runner = runner.with_trait_source(Table::from_csv_path(path)?);
        }
        Ok(runner)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn run(&self, spec: &ScenarioSpec, merged: &Table) -> Result<ScenarioOutcome> {
        spec.validate()?;
        let groupby = if spec.groupby.is_empty() {
            self.config.default_groupby.clone()
        } else {
            spec.groupby.clone()
        };
        let filters = spec.filter_spec()?;

        let mut quality = DataQualityReport::new();
        let result = match spec.analysis {
            AnalysisKind::Aggregate => self.run_aggregate(spec, merged, groupby, filters)?,
            AnalysisKind::Ecospectrum => {
                self.run_ecospectrum(spec, merged, &groupby, filters, &mut quality)?
            }
        };
        tracing::debug!(
            scenario = %spec.name,
            rows = result.n_rows(),
            issues = quality.issues.len(),
            "scenario finished"
        );
        Ok(ScenarioOutcome {
            name: spec.name.clone(),
            result,
            quality,
        })
    }

    fn run_aggregate(
        &self,
        spec: &ScenarioSpec,
        merged: &Table,
        groupby: Vec<String>,
        filters: Option<FilterSpec>,
    ) -> Result<Table> {
        let metrics = if spec.metrics.is_empty() {
            default_metrics()
        } else {
            spec.metrics.clone()
        };
        let mut request = AggregationRequest::new()
            .groupby(groupby)
            .metrics(metrics)
            .unit_id_col(self.config.unit_id_col.clone())
            .unit_scope_col(self.config.unit_scope_col.clone());
        if let Some(filters) = filters {
            request = request.filters(filters);
        }

        match spec.level {
            Level::Description => aggregate_descriptions(merged, &request),
            Level::Species => aggregate(merged, &request),
        }
    }

    fn run_ecospectrum(
        &self,
        spec: &ScenarioSpec,
        merged: &Table,
        groupby: &[String],
        filters: Option<FilterSpec>,
        quality: &mut DataQualityReport,
    ) -> Result<Table> {
        let weights = self.weights.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "scenario '{}' needs {} (not configured)",
                spec.name,
                DataFile::AbundanceWeights.filename()
            ))
        })?;
        let trait_source = self.trait_source.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "scenario '{}' needs {} (not configured)",
                spec.name,
                DataFile::IndicatorValues.filename()
            ))
        })?;
        let traits = TraitTable::from_table(
            trait_source,
            &self.config.trait_species_col,
            &spec.trait_scale,
        )?;

        let filtered = apply_filters(merged, filters.as_ref())?;
        let classes = filtered.require_column(ABUNDANCE_COL)?;
        let has_class: Vec<bool> = classes.iter().map(|v| !v.is_null()).collect();
        let classified = filtered.filter_mask(&has_class)?;

        let weighted = weights.attach(&classified, ABUNDANCE_COL, WEIGHT_COL, quality)?;
        let positive: Vec<bool> = weighted
            .require_column(WEIGHT_COL)?
            .iter()
            .map(|w| matches!(w.as_f64(), Some(x) if x > 0.0))
            .collect();
        let weighted = weighted.filter_mask(&positive)?;
        let rows = traits.attach(&weighted, quality)?;

        let opts = EcospectrumOptions {
            trait_col: spec.trait_scale.clone(),
            weight_col: WEIGHT_COL.to_string(),
            q_low: self.config.q_low,
            q_high: self.config.q_high,
            unit_id_col: self.config.unit_id_col.clone(),
            unit_scope_col: self.config.unit_scope_col.clone(),
        };
        let per_unit = ecospectrum_by_unit(&rows, &opts)?;

        let unit_cols = opts.unit_columns();
        let groupby: Vec<&str> = groupby.iter().map(String::as_str).collect();
        let with_meta = attach_unit_metadata(&per_unit, &rows, &unit_cols, &groupby)?;
        let eco_metrics: Vec<&str> = spec.eco_metrics.iter().map(String::as_str).collect();
        regroup_mean(&with_meta, &groupby, &eco_metrics)
    }
}
