//! Column-oriented in-memory table.
//!
//! Every operation returns a new table; inputs are never mutated, so a
//! caller can keep using a table after handing it to the engine.

use crate::error::{Error, Result};
use crate::value::Value;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::path::Path;

/// Named columns of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Vec<Value>>,
    n_rows: usize,
}

impl Table {
    /// Empty table with the given header and no rows.
    pub fn with_columns<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Result<Self> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        check_unique(&names)?;
        let columns = vec![Vec::new(); names.len()];
        Ok(Self {
            names,
            columns,
            n_rows: 0,
        })
    }

    /// Build from `(name, values)` pairs. All columns must have the same length.
    pub fn from_columns<S: Into<String>>(
        columns: impl IntoIterator<Item = (S, Vec<Value>)>,
    ) -> Result<Self> {
        let mut table = Table::default();
        for (name, values) in columns {
            table.push_column(name, values)?;
        }
        Ok(table)
    }

    /// Build from a header and row-major data.
    pub fn from_rows<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
        rows: impl IntoIterator<Item = Vec<Value>>,
    ) -> Result<Self> {
        let mut table = Table::with_columns(names)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.column_index(name).map(|i| self.columns[i].as_slice())
    }

    /// Column lookup that fails with `MissingColumn`.
    pub fn require_column(&self, name: &str) -> Result<&[Value]> {
        self.column(name).ok_or_else(|| Error::MissingColumn {
            column: name.to_string(),
        })
    }

    /// Indices of several columns, failing on the first absent one.
    pub fn require_indices(&self, names: &[&str]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                self.column_index(name).ok_or_else(|| Error::MissingColumn {
                    column: name.to_string(),
                })
            })
            .collect()
    }

    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        self.column(name).and_then(|col| col.get(row))
    }

    pub fn value_at(&self, row: usize, col: usize) -> &Value {
        &self.columns[col][row]
    }

    /// Composite key of one row over the given column indices.
    pub fn key_at(&self, row: usize, cols: &[usize]) -> Vec<Value> {
        cols.iter().map(|&c| self.columns[c][row].clone()).collect()
    }

    /// Clone of a single row.
    pub fn row(&self, row: usize) -> Vec<Value> {
        self.columns.iter().map(|c| c[row].clone()).collect()
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.names.len() {
            return Err(Error::LengthMismatch {
                context: "row width".to_string(),
                expected: self.names.len(),
                actual: row.len(),
            });
        }
        for (col, value) in self.columns.iter_mut().zip(row) {
            col.push(value);
        }
        self.n_rows += 1;
        Ok(())
    }

    /// Append a new column.
    pub fn push_column<S: Into<String>>(&mut self, name: S, values: Vec<Value>) -> Result<()> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(Error::DuplicateColumn { column: name });
        }
        if !self.names.is_empty() && values.len() != self.n_rows {
            return Err(Error::LengthMismatch {
                context: format!("column '{}'", name),
                expected: self.n_rows,
                actual: values.len(),
            });
        }
        self.n_rows = values.len();
        self.names.push(name);
        self.columns.push(values);
        Ok(())
    }

    /// New table with `name` replaced, or appended when absent.
    pub fn with_column<S: Into<String>>(&self, name: S, values: Vec<Value>) -> Result<Table> {
        let name = name.into();
        let mut out = self.clone();
        match out.column_index(&name) {
            Some(i) => {
                if values.len() != out.n_rows {
                    return Err(Error::LengthMismatch {
                        context: format!("column '{}'", name),
                        expected: out.n_rows,
                        actual: values.len(),
                    });
                }
                out.columns[i] = values;
            }
            None => out.push_column(name, values)?,
        }
        Ok(out)
    }

    /// Rows at the given positions, in the given order.
    pub fn take(&self, rows: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|col| rows.iter().map(|&r| col[r].clone()).collect())
            .collect();
        Table {
            names: self.names.clone(),
            columns,
            n_rows: rows.len(),
        }
    }

    /// Rows whose mask entry is true, order preserved.
    pub fn filter_mask(&self, mask: &[bool]) -> Result<Table> {
        if mask.len() != self.n_rows {
            return Err(Error::LengthMismatch {
                context: "row mask".to_string(),
                expected: self.n_rows,
                actual: mask.len(),
            });
        }
        let rows: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, keep)| keep.then_some(i))
            .collect();
        Ok(self.take(&rows))
    }

    /// Drop rows whose key over `keys` was already seen, keeping the first.
    pub fn distinct_by(&self, keys: &[&str]) -> Result<Table> {
        let cols = self.require_indices(keys)?;
        let mut seen = HashSet::new();
        let rows: Vec<usize> = (0..self.n_rows)
            .filter(|&r| seen.insert(self.key_at(r, &cols)))
            .collect();
        Ok(self.take(&rows))
    }

    /// Many-to-one left join on `on`.
    ///
    /// The right side must have unique keys. Left rows without a match get
    /// nulls in the right-hand columns. A right column whose name is already
    /// taken on the left is renamed with a `_right` suffix.
    pub fn left_join(&self, right: &Table, on: &[&str]) -> Result<Table> {
        let left_keys = self.require_indices(on)?;
        let right_keys = right.require_indices(on)?;

        let mut lookup: HashMap<Vec<Value>, usize> = HashMap::with_capacity(right.n_rows);
        for r in 0..right.n_rows {
            if lookup.insert(right.key_at(r, &right_keys), r).is_some() {
                return Err(Error::DuplicateKey {
                    keys: on.join(", "),
                });
            }
        }

        let matches: Vec<Option<usize>> = (0..self.n_rows)
            .map(|r| lookup.get(&self.key_at(r, &left_keys)).copied())
            .collect();

        let mut out = self.clone();
        for (c, name) in right.names.iter().enumerate() {
            if right_keys.contains(&c) {
                continue;
            }
            let values = matches
                .iter()
                .map(|m| m.map_or(Value::Null, |r| right.columns[c][r].clone()))
                .collect();
            let out_name = if out.has_column(name) {
                format!("{}_right", name)
            } else {
                name.clone()
            };
            out.push_column(out_name, values)?;
        }
        Ok(out)
    }

    /// Stable ascending sort, lexicographic over `by`. Nulls sort last.
    pub fn sort_by(&self, by: &[&str]) -> Result<Table> {
        let cols = self.require_indices(by)?;
        let mut order: Vec<usize> = (0..self.n_rows).collect();
        order.sort_by(|&a, &b| {
            cols.iter()
                .map(|&c| self.columns[c][a].cmp(&self.columns[c][b]))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(self.take(&order))
    }

    /// Keep only the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let cols = self.require_indices(names)?;
        Ok(Table {
            names: names.iter().map(|n| n.to_string()).collect(),
            columns: cols.iter().map(|&c| self.columns[c].clone()).collect(),
            n_rows: self.n_rows,
        })
    }

    // ------------------------------------------------------------------
    // CSV
    // ------------------------------------------------------------------

    /// Load a CSV file, sniffing `,` vs `;` and skipping a UTF-8 BOM.
    pub fn from_csv_path(path: &Path) -> Result<Table> {
        let content = std::fs::read_to_string(path)?;
        Table::from_csv_str(&content)
    }

    /// Parse CSV text with a sniffed delimiter.
    pub fn from_csv_str(content: &str) -> Result<Table> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let delimiter = sniff_delimiter(content);
        Table::from_csv_reader(content.as_bytes(), delimiter)
    }

    /// Parse CSV with an explicit delimiter. Headers are required.
    pub fn from_csv_reader<R: Read>(reader: R, delimiter: u8) -> Result<Table> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let names: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| crate::text::normalize_text(h))
            .collect();
        let mut table = Table::with_columns(names)?;
        for record in rdr.records() {
            let record = record?;
            table.push_row(record.iter().map(Value::from_field).collect())?;
        }
        Ok(table)
    }

    /// Write as comma-separated CSV. Missing values are empty fields.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.names)?;
        for r in 0..self.n_rows {
            wtr.write_record(self.columns.iter().map(|c| c[r].to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Pick `;` when the header line has more semicolons than commas.
pub fn sniff_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or("");
    let commas = header.matches(',').count();
    let semicolons = header.matches(';').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

fn check_unique(names: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(Error::DuplicateColumn {
                column: name.clone(),
            });
        }
    }
    Ok(())
}

struct RowRef<'a> {
    table: &'a Table,
    row: usize,
}

impl Serialize for RowRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.table.names.len()))?;
        for (name, col) in self.table.names.iter().zip(&self.table.columns) {
            map.serialize_entry(name, &col[self.row])?;
        }
        map.end()
    }
}

/// Serializes as an array of records, columns in table order.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.n_rows))?;
        for row in 0..self.n_rows {
            seq.serialize_element(&RowRef { table: self, row })?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            ["description_id", "source_file", "species"],
            vec![
                vec![1.into(), "a".into(), "Carex".into()],
                vec![1.into(), "a".into(), "Salix".into()],
                vec![2.into(), "a".into(), "Carex".into()],
                vec![1.into(), "b".into(), "Poa".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn ragged_row_rejected() {
        let mut t = Table::with_columns(["a", "b"]).unwrap();
        let err = t.push_row(vec![1.into()]).unwrap_err();
        assert_eq!(err.code(), 16);
    }

    #[test]
    fn duplicate_header_rejected() {
        assert!(Table::with_columns(["a", "a"]).is_err());
    }

    #[test]
    fn distinct_keeps_first() {
        let t = sample().distinct_by(&["description_id", "source_file"]).unwrap();
        assert_eq!(t.n_rows(), 3);
        assert_eq!(t.value(0, "species"), Some(&Value::from("Carex")));
        assert_eq!(t.value(2, "source_file"), Some(&Value::from("b")));
    }

    #[test]
    fn filter_mask_preserves_order() {
        let t = sample().filter_mask(&[false, true, false, true]).unwrap();
        assert_eq!(t.column("species").unwrap(), &[Value::from("Salix"), Value::from("Poa")]);
    }

    #[test]
    fn left_join_many_to_one() {
        let meta = Table::from_rows(
            ["description_id", "source_file", "year"],
            vec![
                vec![1.into(), "a".into(), 2019.into()],
                vec![2.into(), "a".into(), 2020.into()],
            ],
        )
        .unwrap();
        let joined = sample().left_join(&meta, &["description_id", "source_file"]).unwrap();
        assert_eq!(
            joined.column("year").unwrap(),
            &[2019.into(), 2019.into(), 2020.into(), Value::Null]
        );
    }

    #[test]
    fn left_join_rejects_duplicate_right_keys() {
        let meta = Table::from_rows(
            ["source_file", "impact_type"],
            vec![
                vec!["a".into(), "dam".into()],
                vec!["a".into(), "natural".into()],
            ],
        )
        .unwrap();
        let err = sample().left_join(&meta, &["source_file"]).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { .. }));
    }

    #[test]
    fn sort_is_lexicographic_with_nulls_last() {
        let t = Table::from_rows(
            ["year", "site"],
            vec![
                vec![Value::Null, "x".into()],
                vec![2020.into(), "b".into()],
                vec![2020.into(), "a".into()],
                vec![2019.into(), "z".into()],
            ],
        )
        .unwrap();
        let sorted = t.sort_by(&["year", "site"]).unwrap();
        assert_eq!(
            sorted.column("site").unwrap(),
            &["z".into(), "a".into(), "b".into(), "x".into()]
        );
    }

    #[test]
    fn csv_semicolon_and_bom() {
        let t = Table::from_csv_str("\u{feff}profile_id;source_file;impact_type\nP1;a;dam\nP2;b;\n")
            .unwrap();
        assert_eq!(t.column_names(), &["profile_id", "source_file", "impact_type"]);
        assert_eq!(t.n_rows(), 2);
        assert!(t.value(1, "impact_type").unwrap().is_null());
    }

    #[test]
    fn csv_write_roundtrip_keeps_nulls_empty() {
        let t = Table::from_rows(["a", "b"], vec![vec![1.into(), Value::Null]]).unwrap();
        let mut buf = Vec::new();
        t.write_csv(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "a,b\n1,\n");
    }

    #[test]
    fn serializes_as_records() {
        let t = Table::from_rows(["year", "cwm"], vec![vec![2019.into(), Value::Null]]).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"[{"year":2019,"cwm":null}]"#);
    }
}
