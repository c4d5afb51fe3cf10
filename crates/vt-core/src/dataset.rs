//! Merged dataset construction.
//!
//! Observations (one row per species per description) are joined to
//! description metadata on the composite description key, then enriched
//! with the profile registry and the geomorphology level.

use vt_common::{DataQualityReport, Error, QualityIssue, Result, Table};
use vt_config::resolve::DataFile;
use vt_config::{AnalysisConfig, DataPaths, GeomorphLevels, ProfileRegistry, SpeciesAliases};

/// Merged table plus the data-quality findings of building it.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub merged: Table,
    pub quality: DataQualityReport,
}

/// Inputs of [`merge_dataset`].
#[derive(Debug, Clone)]
pub struct DatasetSources {
    pub observations: Table,
    pub descriptions: Table,
    pub aliases: Option<SpeciesAliases>,
    pub profiles: Option<ProfileRegistry>,
}

/// Load the CSV files found in `paths` and merge them.
///
/// Observations and descriptions are required; aliases and the profile
/// registry are applied only when configured.
pub fn load_dataset(paths: &DataPaths, config: &AnalysisConfig) -> Result<Dataset> {
    let observations = Table::from_csv_path(paths.require(DataFile::Observations)?)?;
    let descriptions = Table::from_csv_path(paths.require(DataFile::Descriptions)?)?;
    let aliases = paths
        .get(DataFile::SpeciesAliases)
        .map(SpeciesAliases::from_csv_path)
        .transpose()?;
    let profiles = paths
        .get(DataFile::Profiles)
        .map(ProfileRegistry::from_csv_path)
        .transpose()?;
    tracing::debug!(
        observations = observations.n_rows(),
        descriptions = descriptions.n_rows(),
        aliases = aliases.is_some(),
        profiles = profiles.is_some(),
        "inputs loaded"
    );

    merge_dataset(
        DatasetSources {
            observations,
            descriptions,
            aliases,
            profiles,
        },
        config,
    )
}

/// Join observations to metadata and attach derived columns.
pub fn merge_dataset(sources: DatasetSources, config: &AnalysisConfig) -> Result<Dataset> {
    let keys = description_keys(config);
    require_keys(&sources.observations, "observations", &keys)?;
    require_keys(&sources.descriptions, "descriptions", &keys)?;

    let mut quality = DataQualityReport::new();
    let mut observations = sources.observations;
    if let Some(aliases) = &sources.aliases {
        observations = aliases.apply(&observations, crate::metric::SPECIES_COL)?;
    }

    let mut merged = observations.left_join(&sources.descriptions, &keys)?;
    if let Some(years) = merged.column("year") {
        let missing = years.iter().filter(|v| v.is_null()).count();
        quality.record(QualityIssue::MissingMetadata { rows: missing });
    }

    if let Some(profiles) = &sources.profiles {
        merged = profiles.attach(&merged, &mut quality)?;
    }

    let geomorph = GeomorphLevels::new(config.geomorph_levels.clone());
    merged = geomorph.add_geomorph_level(&merged, &mut quality)?;

    tracing::info!(rows = merged.n_rows(), columns = merged.n_cols(), "dataset merged");
    Ok(Dataset { merged, quality })
}

/// `(unit_id_col, unit_scope_col)`, falling back to `source_file` for the scope.
fn description_keys(config: &AnalysisConfig) -> Vec<&str> {
    vec![
        config.unit_id_col.as_str(),
        config.unit_scope_col.as_deref().unwrap_or("source_file"),
    ]
}

fn require_keys(table: &Table, name: &str, keys: &[&str]) -> Result<()> {
    let missing: Vec<&str> = keys.iter().copied().filter(|k| !table.has_column(k)).collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidRegistry {
            name: name.to_string(),
            message: format!("missing columns: {}", missing.join(", ")),
        })
    }
}
