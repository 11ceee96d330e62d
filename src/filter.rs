//! Temperature plausibility filter
//!
//! Rows failing the filter are dropped before segmentation, so they never join
//! an episode and never trigger an episode boundary.

use crate::config::{DownstreamCheck, HeatRatioConfig, UPSTREAM_TEMP_LIMIT};
use crate::types::RawReading;

/// Admits readings with plausible thermistor temperatures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureFilter {
    downstream: DownstreamCheck,
}

impl Default for TemperatureFilter {
    fn default() -> Self {
        Self::new(DownstreamCheck::Legacy)
    }
}

impl TemperatureFilter {
    pub fn new(downstream: DownstreamCheck) -> Self {
        Self { downstream }
    }

    pub fn from_config(config: &HeatRatioConfig) -> Self {
        Self::new(config.downstream_check())
    }

    pub fn admits(&self, reading: &RawReading) -> bool {
        reading.upstream_temp >= 0.0
            && reading.downstream_temp >= 0.0
            && reading.upstream_temp.abs() < UPSTREAM_TEMP_LIMIT
            && self.downstream_ok(reading.downstream_temp)
    }

    fn downstream_ok(&self, downstream_temp: f64) -> bool {
        let magnitude = downstream_temp.abs();
        match self.downstream {
            // Truthiness only: zero and NaN fail, any other value passes.
            DownstreamCheck::Legacy => magnitude != 0.0 && !magnitude.is_nan(),
            DownstreamCheck::Bounded(limit) => magnitude < limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(upstream: f64, downstream: f64) -> RawReading {
        RawReading {
            upstream_temp: upstream,
            downstream_temp: downstream,
            millis_since_reference_temp: 0,
            millis_since_heat_pulse: 0,
            timestamp_seconds: 0.0,
            node_id: "1".to_string(),
        }
    }

    #[test]
    fn test_admits_plausible_temperatures() {
        let filter = TemperatureFilter::default();
        assert!(filter.admits(&reading(20.0, 21.0)));
        assert!(filter.admits(&reading(0.0, 0.5)));
    }

    #[test]
    fn test_rejects_negative_and_hot_upstream() {
        let filter = TemperatureFilter::default();
        assert!(!filter.admits(&reading(-0.1, 20.0)));
        assert!(!filter.admits(&reading(20.0, -0.1)));
        assert!(!filter.admits(&reading(40.0, 20.0)));
        assert!(filter.admits(&reading(39.99, 20.0)));
    }

    #[test]
    fn test_legacy_downstream_has_no_upper_bound() {
        let filter = TemperatureFilter::default();
        assert!(filter.admits(&reading(20.0, 100.0)));
        // a zero downstream reading is falsy and rejected
        assert!(!filter.admits(&reading(20.0, 0.0)));
        assert!(!filter.admits(&reading(20.0, f64::NAN)));
    }

    #[test]
    fn test_bounded_downstream() {
        let filter = TemperatureFilter::new(DownstreamCheck::Bounded(40.0));
        assert!(!filter.admits(&reading(20.0, 100.0)));
        assert!(!filter.admits(&reading(20.0, 40.0)));
        assert!(filter.admits(&reading(20.0, 39.5)));
        assert!(filter.admits(&reading(20.0, 0.0)));
    }
}
