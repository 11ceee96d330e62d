//! Windowed heat-ratio aggregation
//!
//! Reduces an episode to a single record: the firing instant of its heat pulse
//! and the mean heat ratio over the readings inside the aggregation window.

use crate::config::{HeatRatioConfig, PULSE_LEAD_SECONDS, REFERENCE_WINDOW_MS};
use crate::stats::{mean, round_half_up};
use crate::types::{DifferentialReading, Episode, MeanHeatRatioRecord, RawReading};
use chrono::{DateTime, Utc};

/// Aggregator over a `(window_start, window_end)` heat-pulse window, both exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowedAggregator {
    window_start: i64,
    window_end: i64,
}

impl WindowedAggregator {
    pub fn new(window_start: i64, window_end: i64) -> Self {
        Self {
            window_start,
            window_end,
        }
    }

    pub fn from_config(config: &HeatRatioConfig) -> Self {
        Self::new(config.heat_ratio_window_start, config.heat_ratio_window_end)
    }

    /// Whether a differential reading contributes to the episode mean
    pub fn in_window(&self, diff: &DifferentialReading) -> bool {
        let reading = diff.reading;
        reading.millis_since_reference_temp > REFERENCE_WINDOW_MS
            && reading.millis_since_heat_pulse > self.window_start
            && reading.millis_since_heat_pulse < self.window_end
            && diff.downstream_temp_difference.is_some_and(|d| d > 0.0)
            && diff.upstream_temp_difference.is_some_and(|u| u > 0.0)
    }

    /// Number of readings passing the window filter
    pub fn window_rows(&self, diffs: &[DifferentialReading]) -> usize {
        diffs.iter().filter(|d| self.in_window(d)).count()
    }

    /// Reduce an episode to its mean heat ratio record
    pub fn aggregate(
        &self,
        episode: &Episode,
        diffs: &[DifferentialReading],
    ) -> MeanHeatRatioRecord {
        let unix_timestamp = episode.first().map(pulse_timestamp).unwrap_or(f64::NAN);

        let mean_heat_ratio = mean(
            diffs
                .iter()
                .filter(|d| self.in_window(d))
                .filter_map(|d| d.heat_ratio),
        );

        MeanHeatRatioRecord {
            node_id: episode.node_id.to_string(),
            date: timestamp_to_date(unix_timestamp),
            unix_timestamp,
            mean_heat_ratio,
        }
    }
}

/// Back-date an episode's first reading to the instant its heat pulse fired
pub fn pulse_timestamp(first: &RawReading) -> f64 {
    let since_reference = round_half_up(first.millis_since_reference_temp as f64 / 1000.0);
    first.timestamp_seconds - (since_reference + PULSE_LEAD_SECONDS)
}

/// UTC instant with millisecond precision, `None` if out of range
pub fn timestamp_to_date(unix_timestamp: f64) -> Option<DateTime<Utc>> {
    let millis = (unix_timestamp * 1000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}
