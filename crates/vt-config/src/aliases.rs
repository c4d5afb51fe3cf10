//! Species alias table (`raw_species` → `canonical_species`).

use std::collections::HashMap;
use std::path::Path;
use vt_common::text::normalize_value;
use vt_common::{Error, Result, Table, Value};

/// Column that keeps the name as recorded in the field sheet.
pub const SPECIES_RAW_COL: &str = "species_raw";

/// Raw name → canonical name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeciesAliases {
    aliases: HashMap<String, String>,
}

impl SpeciesAliases {
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        Self::from_table(&Table::from_csv_path(path)?)
    }

    /// Both name columns are whitespace-normalized; rows missing either are
    /// skipped and a repeated raw name keeps the last mapping.
    pub fn from_table(table: &Table) -> Result<Self> {
        let (raw, canonical) = match (table.column("raw_species"), table.column("canonical_species")) {
            (Some(r), Some(c)) => (r, c),
            _ => {
                return Err(Error::InvalidRegistry {
                    name: "species_aliases".to_string(),
                    message: "must contain raw_species, canonical_species".to_string(),
                })
            }
        };

        let mut aliases = HashMap::new();
        for (r, c) in raw.iter().zip(canonical) {
            if let (Value::Text(r), Value::Text(c)) = (normalize_value(r), normalize_value(c)) {
                aliases.insert(r, c);
            }
        }
        tracing::debug!(aliases = aliases.len(), "loaded species aliases");
        Ok(Self { aliases })
    }

    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, S)>) -> Self {
        Self {
            aliases: pairs.into_iter().map(|(r, c)| (r.into(), c.into())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Canonical name for `raw`, or `raw` itself when it has no alias.
    pub fn canonical<'a>(&'a self, raw: &'a str) -> &'a str {
        self.aliases.get(raw).map(String::as_str).unwrap_or(raw)
    }

    /// Rewrite `species_col` to canonical names, keeping the normalized
    /// original in `species_raw`.
    pub fn apply(&self, table: &Table, species_col: &str) -> Result<Table> {
        let raw: Vec<Value> = table
            .require_column(species_col)?
            .iter()
            .map(normalize_value)
            .collect();
        let canonical = raw
            .iter()
            .map(|v| match v {
                Value::Text(name) => Value::Text(self.canonical(name).to_string()),
                other => other.clone(),
            })
            .collect();
        table
            .with_column(SPECIES_RAW_COL, raw)?
            .with_column(species_col, canonical)
    }
}
