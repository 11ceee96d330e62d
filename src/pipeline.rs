//! Pipeline orchestration
//!
//! This module provides the public API for sapflow-ratio.
//! It runs readings through the full pipeline: normalize, filter and segment,
//! baseline and differentials, windowed aggregation, then output transforms.

use crate::aggregator::WindowedAggregator;
use crate::baseline::BaselineCalculator;
use crate::config::HeatRatioConfig;
use crate::encoder::HeatRatioEncoder;
use crate::error::ComputeError;
use crate::filter::TemperatureFilter;
use crate::normalizer::Normalizer;
use crate::schema::{IngestReport, TableAdapter, TableFormat, TableRow};
use crate::segmenter::EpisodeSegmenter;
use crate::types::{
    Baseline, Episode, EpisodeSummary, HeatRatioOutput, MeanHeatRatioRecord, RawReading,
};
use tracing::{debug, info};

/// Compute mean heat ratios for a batch of readings.
///
/// Never fails: empty input gives empty output, and episodes without usable
/// data carry an undefined ratio.
///
/// # Example
/// ```ignore
/// let output = compute_heat_ratios(&readings, &HeatRatioConfig::with_window(75_000, 95_000));
/// for id in &output.ids {
///     println!("{id}: {} pulses", output.data[id].len());
/// }
/// ```
pub fn compute_heat_ratios(readings: &[RawReading], config: &HeatRatioConfig) -> HeatRatioOutput {
    let ordered = Normalizer::normalize(readings);
    let filter = TemperatureFilter::from_config(config);
    let aggregator = WindowedAggregator::from_config(config);

    let mut output = HeatRatioOutput::default();
    for node in EpisodeSegmenter::segment_stream(&ordered, &filter) {
        let records: Vec<MeanHeatRatioRecord> = node
            .episodes
            .iter()
            .map(|episode| reduce_episode(episode, &aggregator).1)
            .collect();
        output.ids.push(node.node_id.to_string());
        output.data.insert(node.node_id.to_string(), records);
    }

    info!(
        readings = readings.len(),
        nodes = output.ids.len(),
        records = output.record_count(),
        "computed heat ratios"
    );

    if config.invert_heat_ratios {
        debug!("inverting heat ratios");
        HeatRatioEncoder::invert(&output)
    } else {
        output
    }
}

/// Per-episode diagnostics, in node then episode order.
///
/// Ratios are reported before inversion.
pub fn summarize_episodes(
    readings: &[RawReading],
    config: &HeatRatioConfig,
) -> Vec<EpisodeSummary> {
    let ordered = Normalizer::normalize(readings);
    let filter = TemperatureFilter::from_config(config);
    let aggregator = WindowedAggregator::from_config(config);

    EpisodeSegmenter::segment_stream(&ordered, &filter)
        .iter()
        .flat_map(|node| node.episodes.iter())
        .map(|episode| {
            let (baseline, record, window_rows) = reduce_episode(episode, &aggregator);
            EpisodeSummary {
                node_id: episode.node_id.to_string(),
                episode_index: episode.index,
                rows: episode.len(),
                baseline,
                window_rows,
                unix_timestamp: record.unix_timestamp,
                mean_heat_ratio: record.mean_heat_ratio,
            }
        })
        .collect()
}

/// Baseline, reduced record and window row count for one episode
fn reduce_episode(
    episode: &Episode,
    aggregator: &WindowedAggregator,
) -> (Baseline, MeanHeatRatioRecord, usize) {
    let baseline = BaselineCalculator::baseline(episode);
    let diffs = BaselineCalculator::differentials(episode, &baseline);
    let window_rows = aggregator.window_rows(&diffs);
    (baseline, aggregator.aggregate(episode, &diffs), window_rows)
}

/// Processor bound to one validated configuration.
///
/// Holds no state between calls, so one processor can serve any number of batches.
#[derive(Debug, Clone)]
pub struct HeatRatioProcessor {
    config: HeatRatioConfig,
}

impl Default for HeatRatioProcessor {
    fn default() -> Self {
        Self {
            config: HeatRatioConfig::default(),
        }
    }
}

impl HeatRatioProcessor {
    /// Create a processor, rejecting invalid configuration
    pub fn new(config: HeatRatioConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &HeatRatioConfig {
        &self.config
    }

    /// Parse and concatenate tables in the order given, then coerce to readings
    pub fn ingest(&self, tables: &[(TableFormat, &str)]) -> Result<IngestReport, ComputeError> {
        let mut rows: Vec<TableRow> = Vec::new();
        for (format, content) in tables {
            let parsed = TableAdapter::parse(*format, content)?;
            debug!(format = format.as_str(), rows = parsed.len(), "parsed table");
            rows.extend(parsed);
        }
        TableAdapter::to_readings(&rows, &self.config.columns, self.config.coercion)
    }

    pub fn process(&self, readings: &[RawReading]) -> HeatRatioOutput {
        compute_heat_ratios(readings, &self.config)
    }

    /// Ingest and process in one step
    pub fn process_tables(
        &self,
        tables: &[(TableFormat, &str)],
    ) -> Result<HeatRatioOutput, ComputeError> {
        let report = self.ingest(tables)?;
        Ok(self.process(&report.readings))
    }

    pub fn summarize(&self, readings: &[RawReading]) -> Vec<EpisodeSummary> {
        summarize_episodes(readings, &self.config)
    }
}
