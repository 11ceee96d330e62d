//! Output encoding
//!
//! This module flattens pipeline output into one row per record and encodes it
//! as CSV or JSON. It also hosts the ratio inversion, which is applied to the
//! finished output rather than inside aggregation.

use crate::error::ComputeError;
use crate::types::{FlatRecord, HeatRatioOutput};
use std::io;

/// Header of the flat export table
pub const CSV_COLUMNS: [&str; 4] = ["nodeId", "date", "unixTimestamp", "meanHeatRatio"];

/// Encoder for heat ratio output
pub struct HeatRatioEncoder;

impl HeatRatioEncoder {
    /// Copy of the output with every defined mean replaced by its reciprocal.
    ///
    /// Compensates for sensors installed with upstream and downstream swapped.
    /// A ratio of 0 becomes +inf; undefined ratios stay undefined.
    pub fn invert(output: &HeatRatioOutput) -> HeatRatioOutput {
        let mut inverted = output.clone();
        for records in inverted.data.values_mut() {
            for record in records.iter_mut() {
                record.mean_heat_ratio = record.mean_heat_ratio.map(|ratio| 1.0 / ratio);
            }
        }
        inverted
    }

    /// One flat row per record, nodes in `ids` order
    pub fn to_rows(output: &HeatRatioOutput) -> Vec<FlatRecord> {
        output.records().map(FlatRecord::from).collect()
    }

    /// Grouped output as JSON. Non-finite ratios encode as `null`.
    pub fn to_json(output: &HeatRatioOutput) -> Result<String, ComputeError> {
        serde_json::to_string(output).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    pub fn to_json_pretty(output: &HeatRatioOutput) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(output)
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Flat rows as a JSON array
    pub fn rows_to_json(output: &HeatRatioOutput) -> Result<String, ComputeError> {
        serde_json::to_string(&Self::to_rows(output))
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Write the flat table as CSV. Undefined values become empty cells.
    pub fn write_csv<W: io::Write>(
        output: &HeatRatioOutput,
        writer: W,
    ) -> Result<(), ComputeError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        // Written explicitly so an empty output still carries a header.
        csv_writer.write_record(CSV_COLUMNS)?;
        for row in Self::to_rows(output) {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv(output: &HeatRatioOutput) -> Result<String, ComputeError> {
        let mut buffer = Vec::new();
        Self::write_csv(output, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}
