//! Data file resolution and path discovery.
//!
//! Resolution order per file: CLI argument → `VT_<NAME>` → `VT_DATA_DIR` +
//! filename → XDG data dir (`~/.local/share/vegtrend/`) → not configured.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Application name for XDG directories.
pub const APP_NAME: &str = "vegtrend";

/// Environment variable naming a directory that holds all data files.
pub const ENV_DATA_DIR: &str = "VT_DATA_DIR";

/// The input files the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataFile {
    Observations,
    Descriptions,
    Profiles,
    AbundanceWeights,
    IndicatorValues,
    SpeciesAliases,
}

impl DataFile {
    pub const ALL: [DataFile; 6] = [
        DataFile::Observations,
        DataFile::Descriptions,
        DataFile::Profiles,
        DataFile::AbundanceWeights,
        DataFile::IndicatorValues,
        DataFile::SpeciesAliases,
    ];

    /// Standard file name inside a data directory.
    pub fn filename(self) -> &'static str {
        match self {
            DataFile::Observations => "observations.csv",
            DataFile::Descriptions => "descriptions.csv",
            DataFile::Profiles => "profiles.csv",
            DataFile::AbundanceWeights => "abundance_weights.csv",
            DataFile::IndicatorValues => "indicator_values.csv",
            DataFile::SpeciesAliases => "species_aliases.csv",
        }
    }

    /// Environment variable holding a direct path to this file.
    pub fn env_var(self) -> &'static str {
        match self {
            DataFile::Observations => "VT_OBSERVATIONS",
            DataFile::Descriptions => "VT_DESCRIPTIONS",
            DataFile::Profiles => "VT_PROFILES",
            DataFile::AbundanceWeights => "VT_ABUNDANCE_WEIGHTS",
            DataFile::IndicatorValues => "VT_INDICATOR_VALUES",
            DataFile::SpeciesAliases => "VT_SPECIES_ALIASES",
        }
    }
}

impl std::fmt::Display for DataFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.filename();
        write!(f, "{}", name.trim_end_matches(".csv"))
    }
}

/// Where a data file was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Direct path from `VT_<NAME>`.
    Environment,

    /// Found under `VT_DATA_DIR` or `--data-dir`.
    DataDir,

    /// Found in the XDG data directory.
    XdgData,

    /// Not found anywhere.
    #[default]
    NotConfigured,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::DataDir => write!(f, "data directory"),
            ConfigSource::XdgData => write!(f, "XDG data"),
            ConfigSource::NotConfigured => write!(f, "not configured"),
        }
    }
}

/// Explicit locations from the command line.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    /// Directory searched for every standard file name.
    pub data_dir: Option<PathBuf>,
    /// Per-file paths.
    pub files: BTreeMap<DataFile, PathBuf>,
}

impl PathOverrides {
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_file(mut self, file: DataFile, path: impl Into<PathBuf>) -> Self {
        self.files.insert(file, path.into());
        self
    }
}

/// Resolved data file locations.
#[derive(Debug, Clone, Default)]
pub struct DataPaths {
    entries: BTreeMap<DataFile, (PathBuf, ConfigSource)>,
}

impl DataPaths {
    pub fn get(&self, file: DataFile) -> Option<&Path> {
        self.entries.get(&file).map(|(p, _)| p.as_path())
    }

    pub fn source(&self, file: DataFile) -> ConfigSource {
        self.entries
            .get(&file)
            .map(|(_, s)| *s)
            .unwrap_or_default()
    }

    /// Path of a file the caller cannot do without.
    pub fn require(&self, file: DataFile) -> vt_common::Result<&Path> {
        self.get(file).ok_or_else(|| {
            vt_common::Error::Config(format!(
                "{} not found; pass --{} or set {} or {}",
                file.filename(),
                file.to_string().replace('_', "-"),
                file.env_var(),
                ENV_DATA_DIR
            ))
        })
    }

    /// Record a location directly.
    pub fn insert(&mut self, file: DataFile, path: PathBuf, source: ConfigSource) {
        self.entries.insert(file, (path, source));
    }
}

/// Resolve every data file using the standard resolution order.
pub fn resolve_data_paths(overrides: &PathOverrides) -> DataPaths {
    let mut paths = DataPaths::default();
    for file in DataFile::ALL {
        if let Some((path, source)) = resolve_single(file, overrides) {
            tracing::debug!(file = %file, path = %path.display(), source = %source, "resolved data file");
            paths.insert(file, path, source);
        }
    }
    paths
}

fn resolve_single(file: DataFile, overrides: &PathOverrides) -> Option<(PathBuf, ConfigSource)> {
    // An explicit path is kept even when missing so the load reports it.
    if let Some(path) = overrides.files.get(&file) {
        return Some((path.clone(), ConfigSource::CliArgument));
    }

    if let Ok(env_path) = std::env::var(file.env_var()) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Some((path, ConfigSource::Environment));
        }
    }

    let data_dir = overrides
        .data_dir
        .clone()
        .or_else(|| std::env::var(ENV_DATA_DIR).ok().map(PathBuf::from));
    if let Some(dir) = data_dir {
        let path = dir.join(file.filename());
        if path.exists() {
            return Some((path, ConfigSource::DataDir));
        }
    }

    if let Some(dir) = xdg_data_dir() {
        let path = dir.join(file.filename());
        if path.exists() {
            return Some((path, ConfigSource::XdgData));
        }
    }

    None
}

/// The XDG data directory for vegtrend.
pub fn xdg_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_source_display() {
        assert_eq!(ConfigSource::CliArgument.to_string(), "CLI argument");
        assert_eq!(ConfigSource::DataDir.to_string(), "data directory");
        assert_eq!(ConfigSource::default().to_string(), "not configured");
    }

    #[test]
    fn data_file_names() {
        assert_eq!(DataFile::AbundanceWeights.filename(), "abundance_weights.csv");
        assert_eq!(DataFile::AbundanceWeights.to_string(), "abundance_weights");
        assert_eq!(DataFile::IndicatorValues.env_var(), "VT_INDICATOR_VALUES");
    }

    #[test]
    fn cli_path_wins_over_data_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("observations.csv"), "a\n1\n").unwrap();
        let explicit = dir.path().join("elsewhere.csv");

        let overrides = PathOverrides::default()
            .with_data_dir(dir.path())
            .with_file(DataFile::Observations, &explicit);
        let paths = resolve_data_paths(&overrides);

        assert_eq!(paths.get(DataFile::Observations), Some(explicit.as_path()));
        assert_eq!(paths.source(DataFile::Observations), ConfigSource::CliArgument);
    }

    #[test]
    fn data_dir_lookup() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("profiles.csv"), "a\n1\n").unwrap();

        let paths = resolve_data_paths(&PathOverrides::default().with_data_dir(dir.path()));
        assert_eq!(paths.source(DataFile::Profiles), ConfigSource::DataDir);
    }

    #[test]
    fn require_missing_is_config_error() {
        let paths = DataPaths::default();
        let err = paths.require(DataFile::SpeciesAliases).unwrap_err();
        assert_eq!(err.code(), 30);
        assert!(err.to_string().contains("species_aliases.csv"));
    }
}
