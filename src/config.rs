//! Pipeline configuration
//!
//! Window bounds, output inversion, the downstream temperature check and the
//! input column names. Loadable from JSON; every field has a default.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default lower bound of the aggregation window (ms since heat pulse)
pub const DEFAULT_WINDOW_START_MS: i64 = 55_000;

/// Default upper bound of the aggregation window (ms since heat pulse)
pub const DEFAULT_WINDOW_END_MS: i64 = 75_000;

/// Readings taken less than this long after the reference temperature form the baseline
pub const REFERENCE_WINDOW_MS: i64 = 10_000;

/// Upper bound (exclusive) on the absolute upstream temperature
pub const UPSTREAM_TEMP_LIMIT: f64 = 40.0;

/// Seconds between the reference temperature reading and the heat pulse firing
pub const PULSE_LEAD_SECONDS: f64 = 10.0;

/// Column names used to pull each field out of an input row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnMap {
    pub upstream_temp: String,
    pub downstream_temp: String,
    pub millis_since_heat_pulse: String,
    pub timestamp_seconds: String,
    pub millis_since_reference_temp: String,
    pub node_id: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            upstream_temp: "temp1".to_string(),
            downstream_temp: "temp2".to_string(),
            millis_since_heat_pulse: "millisSinceHeatPulse".to_string(),
            timestamp_seconds: "rtcUnixTimestamp".to_string(),
            millis_since_reference_temp: "millisSinceReferenceTemp".to_string(),
            node_id: "nodeId".to_string(),
        }
    }
}

/// How the temperature filter treats the downstream reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DownstreamCheck {
    /// Only requires `abs(downstream)` to be non-zero and not NaN. No upper bound.
    Legacy,
    /// Requires `abs(downstream) < limit`, like the upstream check
    Bounded(f64),
}

/// What ingestion does with a value that cannot be coerced to a number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionPolicy {
    /// Fail the whole ingestion
    #[default]
    Strict,
    /// Skip the offending row and keep going
    Lenient,
}

/// Configuration for a heat-ratio computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeatRatioConfig {
    pub heat_ratio_window_start: i64,
    pub heat_ratio_window_end: i64,
    /// Report `1 / ratio`, for sensors wired with upstream and downstream swapped
    pub invert_heat_ratios: bool,
    /// Enables [`DownstreamCheck::Bounded`] when set
    pub downstream_temp_limit: Option<f64>,
    pub coercion: CoercionPolicy,
    pub columns: ColumnMap,
}

impl Default for HeatRatioConfig {
    fn default() -> Self {
        Self {
            heat_ratio_window_start: DEFAULT_WINDOW_START_MS,
            heat_ratio_window_end: DEFAULT_WINDOW_END_MS,
            invert_heat_ratios: false,
            downstream_temp_limit: None,
            coercion: CoercionPolicy::Strict,
            columns: ColumnMap::default(),
        }
    }
}

impl HeatRatioConfig {
    /// Config with the given aggregation window and all other fields at their defaults
    pub fn with_window(start_ms: i64, end_ms: i64) -> Self {
        Self {
            heat_ratio_window_start: start_ms,
            heat_ratio_window_end: end_ms,
            ..Self::default()
        }
    }

    pub fn downstream_check(&self) -> DownstreamCheck {
        match self.downstream_temp_limit {
            Some(limit) => DownstreamCheck::Bounded(limit),
            None => DownstreamCheck::Legacy,
        }
    }

    /// Check that the configuration describes a usable window
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.heat_ratio_window_start >= self.heat_ratio_window_end {
            return Err(ComputeError::InvalidConfig(format!(
                "heatRatioWindowStart ({}) must be below heatRatioWindowEnd ({})",
                self.heat_ratio_window_start, self.heat_ratio_window_end
            )));
        }
        if let Some(limit) = self.downstream_temp_limit {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(ComputeError::InvalidConfig(format!(
                    "downstreamTempLimit must be a positive number, got {}",
                    limit
                )));
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: HeatRatioConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn from_json_file(path: &Path) -> Result<Self, ComputeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}
