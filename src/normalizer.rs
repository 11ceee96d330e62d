//! Reading normalization
//!
//! Concatenates readings from one or more sources and puts them in stream order:
//! ascending logger timestamp, ties broken by time since heat pulse.

use crate::types::RawReading;
use std::cmp::Ordering;
use tracing::debug;

/// Normalizer for producing the ordered reading stream
pub struct Normalizer;

impl Normalizer {
    /// Return a stably sorted copy of the readings. The input is left untouched.
    pub fn normalize(readings: &[RawReading]) -> Vec<RawReading> {
        let mut ordered = readings.to_vec();
        ordered.sort_by(stream_order);
        debug!(readings = ordered.len(), "normalized reading stream");
        ordered
    }

    /// Concatenate batches in the order given, then normalize
    pub fn normalize_batches(batches: &[Vec<RawReading>]) -> Vec<RawReading> {
        let combined: Vec<RawReading> = batches.iter().flatten().cloned().collect();
        Self::normalize(&combined)
    }

    /// Whether the readings are already in stream order
    pub fn is_ordered(readings: &[RawReading]) -> bool {
        readings
            .windows(2)
            .all(|pair| stream_order(&pair[0], &pair[1]) != Ordering::Greater)
    }
}

/// Order by `(timestamp_seconds, millis_since_heat_pulse)`
pub fn stream_order(a: &RawReading, b: &RawReading) -> Ordering {
    a.timestamp_seconds
        .total_cmp(&b.timestamp_seconds)
        .then(a.millis_since_heat_pulse.cmp(&b.millis_since_heat_pulse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reading(ts: f64, heat_pulse: i64, node: &str) -> RawReading {
        RawReading {
            upstream_temp: 20.0,
            downstream_temp: 20.0,
            millis_since_reference_temp: 0,
            millis_since_heat_pulse: heat_pulse,
            timestamp_seconds: ts,
            node_id: node.to_string(),
        }
    }

    #[test]
    fn test_sorts_by_timestamp_then_heat_pulse() {
        let input = vec![
            reading(20.0, 0, "1"),
            reading(10.0, 500, "1"),
            reading(10.0, 100, "1"),
            reading(5.0, 900, "2"),
        ];

        let ordered = Normalizer::normalize(&input);
        let keys: Vec<(f64, i64)> = ordered
            .iter()
            .map(|r| (r.timestamp_seconds, r.millis_since_heat_pulse))
            .collect();

        assert_eq!(keys, vec![(5.0, 900), (10.0, 100), (10.0, 500), (20.0, 0)]);
        assert!(Normalizer::is_ordered(&ordered));
        // input untouched
        assert_eq!(input[0].timestamp_seconds, 20.0);
    }

    #[test]
    fn test_resort_is_noop() {
        let input = vec![
            reading(3.0, 1, "a"),
            reading(1.0, 2, "b"),
            reading(2.0, 0, "a"),
            reading(1.0, 2, "c"),
        ];
        let once = Normalizer::normalize(&input);
        let twice = Normalizer::normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_equal_keys_keep_input_order() {
        let input = vec![reading(1.0, 5, "first"), reading(1.0, 5, "second")];
        let ordered = Normalizer::normalize(&input);
        assert_eq!(ordered[0].node_id, "first");
        assert_eq!(ordered[1].node_id, "second");
    }

    #[test]
    fn test_batches_are_concatenated() {
        let batches = vec![
            vec![reading(30.0, 0, "1")],
            vec![reading(10.0, 0, "2"), reading(20.0, 0, "1")],
        ];
        let ordered = Normalizer::normalize_batches(&batches);
        let nodes: Vec<&str> = ordered.iter().map(|r| r.node_id.as_str()).collect();
        assert_eq!(nodes, vec!["2", "1", "1"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(Normalizer::normalize(&[]).is_empty());
        assert!(Normalizer::is_ordered(&[]));
    }
}
