//! Adapter for converting table rows to typed readings
//!
//! Parsing produces untyped rows; coercion pulls each field through the
//! configured [`ColumnMap`] and turns it into a [`RawReading`].

use crate::config::{CoercionPolicy, ColumnMap};
use crate::error::ComputeError;
use crate::schema::table_row::{RowIssue, TableFormat, TableRow};
use crate::types::RawReading;
use serde_json::Value;
use tracing::{debug, warn};

/// Adapter for parsing and coercing datalogger tables
pub struct TableAdapter;

/// Result of coercing a batch of rows
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub readings: Vec<RawReading>,
    /// Rows dropped under [`CoercionPolicy::Lenient`]
    pub skipped: Vec<RowIssue>,
}

impl TableAdapter {
    /// Parse a table in the given format
    pub fn parse(format: TableFormat, input: &str) -> Result<Vec<TableRow>, ComputeError> {
        match format {
            TableFormat::Csv => Self::parse_csv(input),
            TableFormat::Json => Self::parse_array(input),
            TableFormat::Ndjson => Self::parse_ndjson(input),
        }
    }

    /// Parse CSV with a header row. All cells are kept as strings.
    pub fn parse_csv(input: &str) -> Result<Vec<TableRow>, ComputeError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(input.as_bytes());
        let headers = reader.headers()?.clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row: TableRow = headers
                .iter()
                .zip(record.iter())
                .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
                .collect();
            rows.push(row);
        }
        Ok(rows)
    }

    /// Parse a JSON string containing an array of row objects
    pub fn parse_array(json: &str) -> Result<Vec<TableRow>, ComputeError> {
        let rows: Vec<TableRow> = serde_json::from_str(json)?;
        Ok(rows)
    }

    /// Parse NDJSON (newline-delimited JSON) containing row objects
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<TableRow>, ComputeError> {
        let mut rows = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<TableRow>(trimmed) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(rows)
    }

    /// Coerce rows into readings.
    ///
    /// Under [`CoercionPolicy::Strict`] the first bad field fails the batch;
    /// under [`CoercionPolicy::Lenient`] the row is skipped and reported.
    pub fn to_readings(
        rows: &[TableRow],
        columns: &ColumnMap,
        policy: CoercionPolicy,
    ) -> Result<IngestReport, ComputeError> {
        let mut report = IngestReport {
            readings: Vec::with_capacity(rows.len()),
            skipped: Vec::new(),
        };

        for (index, row) in rows.iter().enumerate() {
            match coerce_row(row, index, columns) {
                Ok(reading) => report.readings.push(reading),
                Err(issue) => match policy {
                    CoercionPolicy::Strict => return Err(issue.into()),
                    CoercionPolicy::Lenient => {
                        warn!(%issue, "skipping row");
                        report.skipped.push(issue);
                    }
                },
            }
        }

        debug!(
            rows = rows.len(),
            readings = report.readings.len(),
            skipped = report.skipped.len(),
            "coerced table rows"
        );
        Ok(report)
    }

    /// Every field-level problem in the batch. Never fails.
    pub fn validate_rows(rows: &[TableRow], columns: &ColumnMap) -> Vec<RowIssue> {
        let mut issues = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            for column in [
                &columns.upstream_temp,
                &columns.downstream_temp,
                &columns.timestamp_seconds,
            ] {
                if let Err(issue) = numeric_field(row, index, column) {
                    issues.push(issue);
                }
            }
            for column in [
                &columns.millis_since_reference_temp,
                &columns.millis_since_heat_pulse,
            ] {
                if let Err(issue) = timer_field(row, index, column) {
                    issues.push(issue);
                }
            }
            if let Err(issue) = node_field(row, index, &columns.node_id) {
                issues.push(issue);
            }
        }
        issues
    }
}

fn coerce_row(row: &TableRow, index: usize, columns: &ColumnMap) -> Result<RawReading, RowIssue> {
    Ok(RawReading {
        upstream_temp: numeric_field(row, index, &columns.upstream_temp)?,
        downstream_temp: numeric_field(row, index, &columns.downstream_temp)?,
        millis_since_reference_temp: timer_field(row, index, &columns.millis_since_reference_temp)?,
        millis_since_heat_pulse: timer_field(row, index, &columns.millis_since_heat_pulse)?,
        timestamp_seconds: numeric_field(row, index, &columns.timestamp_seconds)?,
        node_id: node_field(row, index, &columns.node_id)?,
    })
}

/// Raw cell text for error messages
fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn numeric_field(row: &TableRow, index: usize, column: &str) -> Result<f64, RowIssue> {
    let value = match row.get(column) {
        Some(v) if !is_blank(v) => v,
        _ => return Err(RowIssue::missing(index, column)),
    };
    match parse_number(value) {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(RowIssue::non_numeric(index, column, raw_text(value))),
    }
}

/// Millisecond timers must be whole numbers
fn timer_field(row: &TableRow, index: usize, column: &str) -> Result<i64, RowIssue> {
    let n = numeric_field(row, index, column)?;
    if n.fract() != 0.0 || n.abs() >= i64::MAX as f64 {
        let raw = row.get(column).map(raw_text).unwrap_or_default();
        return Err(RowIssue::non_numeric(index, column, raw));
    }
    Ok(n as i64)
}

/// Largest magnitude below which every integer is exact in an `f64`
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Node ids accept strings or numbers.
///
/// Strings are kept verbatim after trimming, so `"007"` and `"7"` are distinct nodes.
fn node_field(row: &TableRow, index: usize, column: &str) -> Result<String, RowIssue> {
    let value = match row.get(column) {
        Some(v) if !is_blank(v) => v,
        _ => return Err(RowIssue::missing(index, column)),
    };
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(numeric_id(n)),
        other => Err(RowIssue::non_numeric(index, column, raw_text(other))),
    }
}

/// Integers render as-is; floats only collapse to an integer when exactly representable
fn numeric_id(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < EXACT_INTEGER_LIMIT => (f as i64).to_string(),
        _ => n.to_string(),
    }
}
