//! Result rendering for stdout.
//!
//! JSON wraps the rows in an envelope carrying the schema version, a
//! timestamp and the data-quality findings. CSV and Markdown carry the table
//! alone.

use serde::Serialize;
use vt_common::{DataQualityReport, OutputFormat, Result, Table, SCHEMA_VERSION};

/// JSON result envelope.
#[derive(Debug, Serialize)]
pub struct ResultEnvelope<'a> {
    pub schema_version: &'static str,
    pub generated_at: String,
    pub run_id: &'a str,
    pub name: &'a str,
    pub n_rows: usize,
    pub quality: &'a DataQualityReport,
    pub rows: &'a Table,
}

/// Render `table` in `format`. The returned string ends with a newline.
pub fn render(
    format: OutputFormat,
    name: &str,
    table: &Table,
    quality: &DataQualityReport,
    run_id: &str,
) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let envelope = ResultEnvelope {
                schema_version: SCHEMA_VERSION,
                generated_at: chrono::Utc::now().to_rfc3339(),
                run_id,
                name,
                n_rows: table.n_rows(),
                quality,
                rows: table,
            };
            let mut out = serde_json::to_string_pretty(&envelope)?;
            out.push('\n');
            Ok(out)
        }
        OutputFormat::Csv => {
            let mut buf = Vec::new();
            table.write_csv(&mut buf)?;
            Ok(String::from_utf8_lossy(&buf).into_owned())
        }
        OutputFormat::Md => Ok(render_markdown(name, table, quality)),
    }
}

fn render_markdown(name: &str, table: &Table, quality: &DataQualityReport) -> String {
    let mut out = format!("# {}\n\n", name);
    if table.n_cols() == 0 {
        out.push_str("_no columns_\n");
        return out;
    }

    out.push_str(&md_row(table.column_names().iter().map(String::as_str)));
    out.push_str(&md_row(table.column_names().iter().map(|_| "---")));
    for r in 0..table.n_rows() {
        let cells: Vec<String> = table.row(r).iter().map(format_cell).collect();
        out.push_str(&md_row(cells.iter().map(String::as_str)));
    }

    if !quality.is_clean() {
        out.push_str("\n## Data quality\n\n");
        for issue in &quality.issues {
            out.push_str(&format!("- {}\n", issue));
        }
    }
    out
}

fn md_row<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    let cells: Vec<String> = cells.map(|c| c.replace('|', "\\|")).collect();
    format!("| {} |\n", cells.join(" | "))
}

/// Floats are shown with four decimals; missing cells stay blank.
fn format_cell(value: &vt_common::Value) -> String {
    match value {
        vt_common::Value::Float(f) if f.is_finite() => {
            let s = format!("{:.4}", f);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        other => other.to_string(),
    }
}
