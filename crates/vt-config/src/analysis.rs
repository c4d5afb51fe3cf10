//! Analysis settings.
//!
//! Everything the engine would otherwise hard-code: the survey-unit id
//! columns, the default grouping axis, the spectrum quantiles and the
//! geomorphology level map. Loaded from TOML; every field has a default.
//!
//! ```toml
//! unit_id_col = "description_id"
//! unit_scope_col = "source_file"
//! default_groupby = ["year"]
//! q_low = 0.05
//! q_high = 0.95
//!
//! [geomorph_levels]
//! "НП" = "low_floodplain"
//! ```

use crate::validate::{validate_analysis, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable pointing at an analysis config file.
pub const ENV_ANALYSIS_CONFIG: &str = "VT_CONFIG";

/// Standard config file name.
pub const ANALYSIS_FILENAME: &str = "vegtrend.toml";

/// Typed analysis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub schema_version: String,

    /// Column holding the survey-unit (description) id.
    pub unit_id_col: String,

    /// Column that disambiguates ids across survey batches. When set, unit
    /// identity is `(unit_id_col, unit_scope_col)`.
    pub unit_scope_col: Option<String>,

    /// Grouping axis used when a request names none.
    pub default_groupby: Vec<String>,

    /// Lower spectrum quantile (`w_min`).
    pub q_low: f64,

    /// Upper spectrum quantile (`w_max`).
    pub q_high: f64,

    /// Species column in the indicator-value table.
    pub trait_species_col: String,

    /// Geomorphology code → level.
    pub geomorph_levels: BTreeMap<String, String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            unit_id_col: "description_id".to_string(),
            unit_scope_col: Some("source_file".to_string()),
            default_groupby: vec!["year".to_string()],
            q_low: 0.05,
            q_high: 0.95,
            trait_species_col: "Taxon".to_string(),
            geomorph_levels: crate::geomorph::default_levels(),
        }
    }
}

impl AnalysisConfig {
    /// Load and validate settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate settings from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ValidationError> {
        let config: AnalysisConfig = toml::from_str(content)
            .map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e)))?;
        validate_analysis(&config)?;
        Ok(config)
    }

    /// Load from an explicit path, `VT_CONFIG`, or the XDG config dir;
    /// defaults when none exists.
    pub fn load(cli_path: Option<&Path>) -> Result<Self, ValidationError> {
        match resolve_analysis_path(cli_path) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading analysis config");
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }
}

fn resolve_analysis_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var(ENV_ANALYSIS_CONFIG) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Some(path);
        }
    }

    dirs::config_dir()
        .map(|d| d.join(crate::resolve::APP_NAME).join(ANALYSIS_FILENAME))
        .filter(|p| p.exists())
}
