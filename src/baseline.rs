//! Baseline and differential computation
//!
//! Each episode's baseline is the mean temperature of each thermistor over the
//! pre-pulse window. Every reading in the episode is then expressed as a rise
//! over that baseline, and the heat ratio is downstream rise over upstream rise.

use crate::config::REFERENCE_WINDOW_MS;
use crate::stats::mean;
use crate::types::{Baseline, DifferentialReading, Episode, RawReading};

/// Calculator for per-episode baselines and differential readings
pub struct BaselineCalculator;

impl BaselineCalculator {
    /// Mean reference temperatures over the pre-pulse readings.
    ///
    /// Both fields are `None` if the episode has no pre-pulse readings.
    pub fn baseline(episode: &Episode) -> Baseline {
        let reference: Vec<&RawReading> = episode
            .readings
            .iter()
            .copied()
            .filter(|r| is_reference_reading(r))
            .collect();

        Baseline {
            reference_downstream_temp: mean(reference.iter().map(|r| r.downstream_temp)),
            reference_upstream_temp: mean(reference.iter().map(|r| r.upstream_temp)),
        }
    }

    /// Differentials for every reading of the episode, not only the baseline subset
    pub fn differentials<'a>(
        episode: &Episode<'a>,
        baseline: &Baseline,
    ) -> Vec<DifferentialReading<'a>> {
        episode
            .readings
            .iter()
            .map(|&reading| Self::differential(reading, baseline))
            .collect()
    }

    pub fn differential<'a>(
        reading: &'a RawReading,
        baseline: &Baseline,
    ) -> DifferentialReading<'a> {
        let downstream = baseline
            .reference_downstream_temp
            .map(|reference| reading.downstream_temp - reference);
        let upstream = baseline
            .reference_upstream_temp
            .map(|reference| reading.upstream_temp - reference);
        let heat_ratio = match (downstream, upstream) {
            (Some(d), Some(u)) => Some(d / u),
            _ => None,
        };

        DifferentialReading {
            reading,
            downstream_temp_difference: downstream,
            upstream_temp_difference: upstream,
            heat_ratio,
        }
    }
}

/// Whether a reading falls inside the pre-pulse reference window
pub fn is_reference_reading(reading: &RawReading) -> bool {
    reading.millis_since_reference_temp < REFERENCE_WINDOW_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(reference_ms: i64, upstream: f64, downstream: f64) -> RawReading {
        RawReading {
            upstream_temp: upstream,
            downstream_temp: downstream,
            millis_since_reference_temp: reference_ms,
            millis_since_heat_pulse: 0,
            timestamp_seconds: 0.0,
            node_id: "1".to_string(),
        }
    }

    fn episode(rows: &[RawReading]) -> Episode<'_> {
        Episode {
            node_id: "1",
            index: 0,
            readings: rows.iter().collect(),
        }
    }

    #[test]
    fn test_baseline_uses_pre_pulse_rows_only() {
        let rows = vec![
            reading(1000, 20.0, 19.0),
            reading(5000, 22.0, 21.0),
            reading(9999, 24.0, 23.0),
            reading(10000, 99.0, 99.0),
            reading(40000, 30.0, 30.0),
        ];
        let baseline = BaselineCalculator::baseline(&episode(&rows));

        assert_eq!(baseline.reference_upstream_temp, Some(22.0));
        assert_eq!(baseline.reference_downstream_temp, Some(21.0));
    }

    #[test]
    fn test_differentials_cover_every_row() {
        let rows = vec![reading(2000, 20.0, 20.0), reading(60000, 21.0, 20.5)];
        let ep = episode(&rows);
        let baseline = BaselineCalculator::baseline(&ep);
        let diffs = BaselineCalculator::differentials(&ep, &baseline);

        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].heat_ratio.map(f64::is_nan), Some(true));
        assert_eq!(diffs[1].downstream_temp_difference, Some(0.5));
        assert_eq!(diffs[1].upstream_temp_difference, Some(1.0));
        assert_eq!(diffs[1].heat_ratio, Some(0.5));
        assert!(std::ptr::eq(diffs[1].reading, &rows[1]));
    }

    #[test]
    fn test_missing_baseline_propagates_as_undefined() {
        let rows = vec![reading(15000, 20.0, 20.0), reading(60000, 21.0, 22.0)];
        let ep = episode(&rows);
        let baseline = BaselineCalculator::baseline(&ep);

        assert_eq!(baseline, Baseline::default());
        for diff in BaselineCalculator::differentials(&ep, &baseline) {
            assert_eq!(diff.downstream_temp_difference, None);
            assert_eq!(diff.upstream_temp_difference, None);
            assert_eq!(diff.heat_ratio, None);
        }
    }

    #[test]
    fn test_zero_upstream_rise_is_non_finite() {
        let baseline = Baseline {
            reference_downstream_temp: Some(20.0),
            reference_upstream_temp: Some(20.0),
        };
        let row = reading(50000, 20.0, 21.0);
        let diff = BaselineCalculator::differential(&row, &baseline);
        assert_eq!(diff.heat_ratio, Some(f64::INFINITY));
    }
}
