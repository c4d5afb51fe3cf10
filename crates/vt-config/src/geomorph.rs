//! Geomorphology code → level.
//!
//! Field sheets record the landform as a short Cyrillic code, sometimes
//! with a tail (`НП (прирусловая)`, `НП/ВП`). Only the leading 1–3 letter
//! token is mapped.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use vt_common::text::normalize_value;
use vt_common::{DataQualityReport, QualityIssue, Result, Table, Value};

pub const GEOMORPH_COL: &str = "geomorphology";
pub const GEOMORPH_LEVEL_COL: &str = "geomorph_level";

/// Built-in level map.
pub fn default_levels() -> BTreeMap<String, String> {
    [
        ("НП", "low_floodplain"),
        ("СП", "medium_floodplain"),
        ("ВП", "high_floodplain"),
        ("НТ", "terrace"),
        ("ВР", "watershed"),
    ]
    .into_iter()
    .map(|(code, level)| (code.to_string(), level.to_string()))
    .collect()
}

fn leading_code() -> &'static Regex {
    static CODE: OnceLock<Regex> = OnceLock::new();
    CODE.get_or_init(|| Regex::new(r"^([A-Za-zА-Яа-яЁё]{1,3})").expect("static regex is valid"))
}

/// Configured code map.
#[derive(Debug, Clone, PartialEq)]
pub struct GeomorphLevels {
    levels: BTreeMap<String, String>,
}

impl Default for GeomorphLevels {
    fn default() -> Self {
        Self::new(default_levels())
    }
}

impl GeomorphLevels {
    pub fn new(levels: BTreeMap<String, String>) -> Self {
        Self { levels }
    }

    /// Level for one raw cell. Unknown or missing codes have none.
    pub fn level_of(&self, raw: &Value) -> Option<&str> {
        let text = match normalize_value(raw) {
            Value::Text(t) => t,
            _ => return None,
        };
        let code = leading_code().captures(&text)?.get(1)?.as_str();
        self.levels.get(code).map(String::as_str)
    }

    /// Add `geomorph_level`. Tables without `geomorphology` pass through.
    pub fn add_geomorph_level(&self, table: &Table, report: &mut DataQualityReport) -> Result<Table> {
        let Some(codes) = table.column(GEOMORPH_COL) else {
            return Ok(table.clone());
        };

        let mut unknown_rows = 0;
        let mut unknown = BTreeSet::new();
        let levels = codes
            .iter()
            .map(|raw| match self.level_of(raw) {
                Some(level) => Value::from(level),
                None => {
                    if let Value::Text(code) = normalize_value(raw) {
                        unknown_rows += 1;
                        unknown.insert(code);
                    }
                    Value::Null
                }
            })
            .collect();

        report.record(QualityIssue::UnknownGeomorphCode {
            rows: unknown_rows,
            codes: unknown.into_iter().collect(),
        });
        table.with_column(GEOMORPH_LEVEL_COL, levels)
    }
}
