//! Core types for the heat-ratio pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw readings, heat-pulse episodes, baselines, differential readings,
//! and the per-episode mean heat ratio output.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One datalogger row after coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReading {
    /// Upstream thermistor temperature (°C)
    pub upstream_temp: f64,
    /// Downstream thermistor temperature (°C)
    pub downstream_temp: f64,
    /// Milliseconds since the reference temperature was taken
    pub millis_since_reference_temp: i64,
    /// Milliseconds since the heat pulse fired
    pub millis_since_heat_pulse: i64,
    /// Logger RTC time, seconds since the Unix epoch
    pub timestamp_seconds: f64,
    /// Sensor node identifier
    pub node_id: String,
}

/// A run of readings from one node between two heat-pulse firings.
///
/// Borrows its readings from the ordered stream produced by the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Episode<'a> {
    pub node_id: &'a str,
    /// Zero-based position of this episode within its node
    pub index: usize,
    pub readings: Vec<&'a RawReading>,
}

impl<'a> Episode<'a> {
    pub fn new(node_id: &'a str, index: usize) -> Self {
        Self {
            node_id,
            index,
            readings: Vec::new(),
        }
    }

    /// First reading of the episode, if any
    pub fn first(&self) -> Option<&'a RawReading> {
        self.readings.first().copied()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// All episodes of a single node, in time order
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEpisodes<'a> {
    pub node_id: &'a str,
    pub episodes: Vec<Episode<'a>>,
}

/// Pre-pulse reference temperatures for one episode.
///
/// `None` means the episode had no readings inside the reference window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub reference_downstream_temp: Option<f64>,
    pub reference_upstream_temp: Option<f64>,
}

/// A raw reading augmented with its temperature rise over the episode baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferentialReading<'a> {
    pub reading: &'a RawReading,
    pub downstream_temp_difference: Option<f64>,
    pub upstream_temp_difference: Option<f64>,
    /// Downstream rise divided by upstream rise (IEEE division, may be non-finite)
    pub heat_ratio: Option<f64>,
}

/// Reduced result for one episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeanHeatRatioRecord {
    pub node_id: String,
    /// Heat-pulse firing instant; `None` if the timestamp is out of range
    pub date: Option<DateTime<Utc>>,
    /// Heat-pulse firing instant, seconds since the Unix epoch
    pub unix_timestamp: f64,
    pub mean_heat_ratio: Option<f64>,
}

/// Pipeline output: records grouped per node, plus node ids in first-seen order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HeatRatioOutput {
    pub ids: Vec<String>,
    pub data: BTreeMap<String, Vec<MeanHeatRatioRecord>>,
}

impl HeatRatioOutput {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Total number of records across all nodes
    pub fn record_count(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }

    /// Records in `ids` order, then per-node insertion order
    pub fn records(&self) -> impl Iterator<Item = &MeanHeatRatioRecord> {
        self.ids
            .iter()
            .filter_map(|id| self.data.get(id))
            .flat_map(|records| records.iter())
    }
}

/// One row of the flat export table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatRecord {
    pub node_id: String,
    pub date: Option<String>,
    pub unix_timestamp: f64,
    pub mean_heat_ratio: Option<f64>,
}

impl From<&MeanHeatRatioRecord> for FlatRecord {
    fn from(record: &MeanHeatRatioRecord) -> Self {
        Self {
            node_id: record.node_id.clone(),
            date: record
                .date
                .map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            unix_timestamp: record.unix_timestamp,
            mean_heat_ratio: record.mean_heat_ratio,
        }
    }
}

/// Diagnostic view of a single episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeSummary {
    pub node_id: String,
    pub episode_index: usize,
    pub rows: usize,
    pub baseline: Baseline,
    /// Rows that passed the aggregation window filter
    pub window_rows: usize,
    pub unix_timestamp: f64,
    pub mean_heat_ratio: Option<f64>,
}
