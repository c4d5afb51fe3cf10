//! Vegtrend configuration loading and reference registries.
//!
//! This crate provides:
//! - Data-path resolution (CLI → env → data dir → XDG → none)
//! - Typed analysis settings loaded from TOML, with semantic validation
//! - The reference tables the engine joins against: abundance weights,
//!   trait indicator values, the profile/impact registry, species aliases
//!   and the geomorphology level map

pub mod abundance;
pub mod aliases;
pub mod analysis;
pub mod geomorph;
pub mod profiles;
pub mod resolve;
pub mod traits;
pub mod validate;

pub use abundance::AbundanceWeights;
pub use aliases::SpeciesAliases;
pub use analysis::AnalysisConfig;
pub use geomorph::GeomorphLevels;
pub use profiles::ProfileRegistry;
pub use resolve::{resolve_data_paths, ConfigSource, DataFile, DataPaths, PathOverrides};
pub use traits::{simplify_species_name, TraitTable};
pub use validate::{ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
