//! Species trait (indicator value) table.
//!
//! One species column plus one numeric column per scale (`L T M R N S` in
//! the Tichý et al. export). A loaded `TraitTable` holds a single scale.

use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::OnceLock;
use vt_common::text::{normalize_text, normalize_value};
use vt_common::{DataQualityReport, Error, QualityIssue, Result, Table, Value};

/// Observation column holding the species name.
pub const SPECIES_COL: &str = "species";

fn qualifier_suffix() -> &'static Regex {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    SUFFIX.get_or_init(|| {
        Regex::new(r"\s+(agg\.|s\.l\.|sensu lato|subsp\..*|ssp\..*|cf\..*)$")
            .expect("static regex is valid")
    })
}

/// Normalize whitespace and strip a trailing aggregate or infraspecific
/// qualifier, so `Carex acuta agg.` matches `Carex acuta`.
pub fn simplify_species_name(name: &str) -> String {
    let norm = normalize_text(name);
    qualifier_suffix().replace(&norm, "").into_owned()
}

/// Species → value lookup for one scale.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitTable {
    scale: String,
    values: HashMap<String, f64>,
}

impl TraitTable {
    pub fn from_csv_path(path: &Path, species_col: &str, scale: &str) -> Result<Self> {
        Self::from_table(&Table::from_csv_path(path)?, species_col, scale)
    }

    /// Select `scale` from a wide trait table. Values that do not coerce to
    /// numbers are dropped; a repeated species keeps its first value.
    pub fn from_table(table: &Table, species_col: &str, scale: &str) -> Result<Self> {
        let species = table.column(species_col).ok_or_else(|| Error::InvalidRegistry {
            name: "indicator_values".to_string(),
            message: format!("species column '{}' not found", species_col),
        })?;
        let scores = table.column(scale).ok_or_else(|| Error::InvalidRegistry {
            name: "indicator_values".to_string(),
            message: format!("scale '{}' not found", scale),
        })?;

        let mut values = HashMap::new();
        for (name, score) in species.iter().zip(scores) {
            if let (Value::Text(name), Some(x)) = (normalize_value(name), score.as_f64()) {
                values.entry(name).or_insert(x);
            }
        }
        tracing::debug!(scale, species = values.len(), "loaded trait scale");
        Ok(Self {
            scale: scale.to_string(),
            values,
        })
    }

    pub fn from_pairs<S: Into<String>>(
        scale: &str,
        pairs: impl IntoIterator<Item = (S, f64)>,
    ) -> Self {
        let mut values = HashMap::new();
        for (name, x) in pairs {
            values.entry(name.into()).or_insert(x);
        }
        Self {
            scale: scale.to_string(),
            values,
        }
    }

    /// Scale identifier; also the name of the attached column.
    pub fn scale(&self) -> &str {
        &self.scale
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_of(&self, species: &str) -> Option<f64> {
        self.values.get(species).copied()
    }

    /// Simplify the `species` column and add a column named after the scale.
    ///
    /// Unmatched species get a null trait, never zero, and are reported.
    pub fn attach(&self, table: &Table, report: &mut DataQualityReport) -> Result<Table> {
        let species = table.require_column(SPECIES_COL)?;
        let simplified: Vec<Value> = species
            .iter()
            .map(|s| match s.as_text() {
                Some(name) => {
                    let simple = simplify_species_name(&name);
                    if simple.is_empty() {
                        Value::Null
                    } else {
                        Value::Text(simple)
                    }
                }
                None => Value::Null,
            })
            .collect();

        let mut unmatched_rows = 0;
        let mut unmatched = BTreeSet::new();
        let trait_values = simplified
            .iter()
            .map(|s| match s {
                Value::Text(name) => match self.value_of(name) {
                    Some(x) => Value::Float(x),
                    None => {
                        unmatched_rows += 1;
                        unmatched.insert(name.clone());
                        Value::Null
                    }
                },
                _ => Value::Null,
            })
            .collect();

        report.record(QualityIssue::UnmatchedTrait {
            scale: self.scale.clone(),
            rows: unmatched_rows,
            species: unmatched.into_iter().collect(),
        });
        table
            .with_column(SPECIES_COL, simplified)?
            .with_column(self.scale.as_str(), trait_values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_qualifiers() {
        assert_eq!(simplify_species_name("Carex acuta agg."), "Carex acuta");
        assert_eq!(simplify_species_name("Poa  pratensis s.l."), "Poa pratensis");
        assert_eq!(
            simplify_species_name("Festuca rubra subsp. rubra"),
            "Festuca rubra"
        );
        assert_eq!(simplify_species_name("Salix cf. alba"), "Salix");
        assert_eq!(simplify_species_name("Achillea millefolium"), "Achillea millefolium");
    }

    #[test]
    fn first_duplicate_wins_and_missing_scale_rejected() {
        let raw = Table::from_csv_str("Taxon,M,L\nCarex acuta,8,7\nCarex acuta,2,7\nPoa,x,6\n").unwrap();
        let m = TraitTable::from_table(&raw, "Taxon", "M").unwrap();
        assert_eq!(m.value_of("Carex acuta"), Some(8.0));
        assert_eq!(m.value_of("Poa"), None);

        let err = TraitTable::from_table(&raw, "Taxon", "K").unwrap_err();
        assert!(matches!(err, Error::InvalidRegistry { .. }));
    }

    #[test]
    fn attach_matches_simplified_names() {
        let traits = TraitTable::from_pairs("M", [("Carex acuta", 8.0), ("Poa palustris", 6.0)]);
        let obs = Table::from_rows(
            ["species"],
            vec![
                vec!["Carex acuta agg.".into()],
                vec!["Poa palustris".into()],
                vec!["Urtica dioica".into()],
                vec![Value::Null],
            ],
        )
        .unwrap();
        let mut report = DataQualityReport::new();
        let out = traits.attach(&obs, &mut report).unwrap();

        assert_eq!(out.value(0, "species"), Some(&Value::from("Carex acuta")));
        assert_eq!(
            out.column("M").unwrap(),
            &[Value::Float(8.0), Value::Float(6.0), Value::Null, Value::Null]
        );
        assert_eq!(report.issues[0].rows(), 1);
    }
}
