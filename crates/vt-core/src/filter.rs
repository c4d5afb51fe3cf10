//! Declarative row filters.
//!
//! A [`FilterSpec`] maps column names to a [`FilterRule`]. Rules are ANDed:
//! a row survives only when it satisfies every rule in the spec.
//!
//! From JSON or TOML a rule is written as:
//!
//! | shape                         | rule                               |
//! |-------------------------------|------------------------------------|
//! | scalar                        | [`FilterRule::Equals`]             |
//! | `{"in": [a, b]}`              | [`FilterRule::In`]                 |
//! | `{"between": [lo, hi]}`       | [`FilterRule::Between`] (inclusive)|
//! | `{"contains": "text"}`        | [`FilterRule::Contains`]           |
//! | `{"regex": "pattern"}`        | [`FilterRule::Regex`]              |
//!
//! [`FilterRule::Predicate`] exists only in code.

use regex::Regex;
use std::borrow::Cow;
use std::sync::Arc;
use vt_common::{Error, Result, Table, Value};

/// Row predicate over a whole column. Must return one flag per row.
pub type ColumnPredicate = Arc<dyn Fn(&[Value]) -> Vec<bool> + Send + Sync>;

/// One column rule.
#[derive(Clone)]
pub enum FilterRule {
    /// Exact equality. Missing cells never match, not even `Equals(Null)`.
    Equals(Value),
    /// Membership. A `Null` member matches missing cells.
    In(Vec<Value>),
    /// Numeric `lo <= x <= hi` after coercion; non-numeric cells fail.
    Between(f64, f64),
    /// Case-insensitive substring. Missing cells fail.
    Contains(String),
    /// Regular-expression search anywhere in the cell text. Missing cells fail.
    Regex(String),
    /// Arbitrary column predicate.
    Predicate(ColumnPredicate),
}

impl FilterRule {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Vec<bool> + Send + Sync + 'static,
    {
        FilterRule::Predicate(Arc::new(f))
    }

    /// Parse one rule from its JSON form.
    pub fn from_json(column: &str, json: &serde_json::Value) -> Result<Self> {
        let unknown = || Error::UnknownFilterOp {
            column: column.to_string(),
            rule: json.to_string(),
        };

        let obj = match json {
            serde_json::Value::Object(obj) => obj,
            serde_json::Value::Array(_) => return Err(unknown()),
            scalar => return Value::from_json(scalar).map(FilterRule::Equals).ok_or_else(unknown),
        };

        if obj.len() != 1 {
            return Err(unknown());
        }
        let Some((op, arg)) = obj.iter().next() else {
            return Err(unknown());
        };

        match op.as_str() {
            "in" => {
                let items = arg.as_array().ok_or_else(unknown)?;
                let values = items
                    .iter()
                    .map(Value::from_json)
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(unknown)?;
                Ok(FilterRule::In(values))
            }
            "between" => match arg.as_array().map(Vec::as_slice) {
                Some([lo, hi]) => match (lo.as_f64(), hi.as_f64()) {
                    (Some(lo), Some(hi)) => Ok(FilterRule::Between(lo, hi)),
                    _ => Err(unknown()),
                },
                _ => Err(unknown()),
            },
            "contains" => scalar_text(arg).map(FilterRule::Contains).ok_or_else(unknown),
            "regex" => scalar_text(arg).map(FilterRule::Regex).ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }

    /// Row mask of this rule over `values`.
    fn mask(&self, column: &str, values: &[Value]) -> Result<Vec<bool>> {
        let mask = match self {
            FilterRule::Equals(target) => values
                .iter()
                .map(|v| !v.is_null() && v == target)
                .collect(),
            FilterRule::In(set) => values.iter().map(|v| set.contains(v)).collect(),
            FilterRule::Between(lo, hi) => values
                .iter()
                .map(|v| v.as_f64().map_or(false, |x| *lo <= x && x <= *hi))
                .collect(),
            FilterRule::Contains(needle) => {
                let needle = needle.to_lowercase();
                values
                    .iter()
                    .map(|v| {
                        v.as_text()
                            .map_or(false, |s| s.to_lowercase().contains(&needle))
                    })
                    .collect()
            }
            FilterRule::Regex(pattern) => {
                let re = Regex::new(pattern).map_err(|e| Error::InvalidRegex {
                    column: column.to_string(),
                    message: e.to_string(),
                })?;
                values
                    .iter()
                    .map(|v| v.as_text().map_or(false, |s| re.is_match(&s)))
                    .collect()
            }
            FilterRule::Predicate(f) => {
                let mask = f(values);
                if mask.len() != values.len() {
                    return Err(Error::TypeInvariant {
                        column: column.to_string(),
                        expected: values.len(),
                        actual: mask.len(),
                    });
                }
                mask
            }
        };
        Ok(mask)
    }
}

fn scalar_text(json: &serde_json::Value) -> Option<String> {
    match json {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl std::fmt::Debug for FilterRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterRule::Equals(v) => f.debug_tuple("Equals").field(v).finish(),
            FilterRule::In(vs) => f.debug_tuple("In").field(vs).finish(),
            FilterRule::Between(lo, hi) => f.debug_tuple("Between").field(lo).field(hi).finish(),
            FilterRule::Contains(s) => f.debug_tuple("Contains").field(s).finish(),
            FilterRule::Regex(s) => f.debug_tuple("Regex").field(s).finish(),
            FilterRule::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Column → rule, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    rules: Vec<(String, FilterRule)>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the rule for `column`.
    pub fn with(mut self, column: impl Into<String>, rule: FilterRule) -> Self {
        self.insert(column, rule);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, rule: FilterRule) {
        let column = column.into();
        match self.rules.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = rule,
            None => self.rules.push((column, rule)),
        }
    }

    /// Union of two specs. Rules in `other` replace rules on the same column.
    pub fn and(mut self, other: FilterSpec) -> Self {
        for (column, rule) in other.rules {
            self.insert(column, rule);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterRule)> {
        self.rules.iter().map(|(c, r)| (c.as_str(), r))
    }

    /// Parse a JSON object of `column: rule` pairs.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Object(map) => Self::from_json_map(map),
            serde_json::Value::Null => Ok(Self::new()),
            other => Err(Error::UnknownFilterOp {
                column: "<spec>".to_string(),
                rule: other.to_string(),
            }),
        }
    }

    pub fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut spec = Self::new();
        for (column, rule) in map {
            spec.insert(column.clone(), FilterRule::from_json(column, rule)?);
        }
        Ok(spec)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Self::from_json(&serde_json::from_str(s)?)
    }
}

/// Keep the rows of `table` that satisfy every rule of `spec`.
///
/// No spec, or an empty one, hands back the input without copying.
pub fn apply_filters<'a>(table: &'a Table, spec: Option<&FilterSpec>) -> Result<Cow<'a, Table>> {
    let spec = match spec {
        Some(spec) if !spec.is_empty() => spec,
        _ => return Ok(Cow::Borrowed(table)),
    };

    let mut keep = vec![true; table.n_rows()];
    for (column, rule) in spec.iter() {
        let values = table.column(column).ok_or_else(|| Error::UnknownColumn {
            column: column.to_string(),
        })?;
        for (k, m) in keep.iter_mut().zip(rule.mask(column, values)?) {
            *k &= m;
        }
    }

    let out = table.filter_mask(&keep)?;
    tracing::debug!(
        rules = spec.len(),
        rows_in = table.n_rows(),
        rows_out = out.n_rows(),
        "filters applied"
    );
    Ok(Cow::Owned(out))
}
