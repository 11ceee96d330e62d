//! Heat-pulse episode segmentation
//!
//! The ordered stream is grouped per node (first-seen order), then each node's
//! rows are folded into episodes. The reference timer restarts every time the
//! logger fires a pulse, so a drop in `millis_since_reference_temp` between two
//! consecutive rows marks the start of a new episode.

use crate::filter::TemperatureFilter;
use crate::types::{Episode, NodeEpisodes, RawReading};
use std::collections::HashMap;
use tracing::debug;

/// Segmenter for splitting node streams into heat-pulse episodes
pub struct EpisodeSegmenter;

/// Fold accumulator: running episode index plus the episodes built so far
struct SegmentState<'a> {
    current_index: usize,
    previous: Option<&'a RawReading>,
    episodes: Vec<Episode<'a>>,
}

impl EpisodeSegmenter {
    /// Filter, group and segment an ordered stream
    pub fn segment_stream<'a>(
        ordered: &'a [RawReading],
        filter: &TemperatureFilter,
    ) -> Vec<NodeEpisodes<'a>> {
        let admitted = ordered.iter().filter(|r| filter.admits(r));
        let groups = Self::group_by_node(admitted);

        let nodes: Vec<NodeEpisodes<'a>> = groups
            .into_iter()
            .map(|(node_id, rows)| NodeEpisodes {
                node_id,
                episodes: Self::segment(node_id, &rows),
            })
            .collect();

        debug!(
            readings = ordered.len(),
            nodes = nodes.len(),
            episodes = nodes.iter().map(|n| n.episodes.len()).sum::<usize>(),
            "segmented reading stream"
        );
        nodes
    }

    /// Group readings by node id, keeping nodes in order of first appearance
    pub fn group_by_node<'a, I>(readings: I) -> Vec<(&'a str, Vec<&'a RawReading>)>
    where
        I: IntoIterator<Item = &'a RawReading>,
    {
        let mut slots: HashMap<&'a str, usize> = HashMap::new();
        let mut groups: Vec<(&'a str, Vec<&'a RawReading>)> = Vec::new();

        for reading in readings {
            let node_id = reading.node_id.as_str();
            let slot = *slots.entry(node_id).or_insert_with(|| {
                groups.push((node_id, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(reading);
        }
        groups
    }

    /// Split one node's ordered rows into episodes
    pub fn segment<'a>(node_id: &'a str, rows: &[&'a RawReading]) -> Vec<Episode<'a>> {
        let initial = SegmentState {
            current_index: 0,
            previous: None,
            episodes: Vec::new(),
        };

        let state = rows.iter().fold(initial, |mut state, &row| {
            match state.previous {
                None => state.episodes.push(Episode::new(node_id, state.current_index)),
                Some(prev)
                    if row.millis_since_reference_temp < prev.millis_since_reference_temp =>
                {
                    state.current_index += 1;
                    state.episodes.push(Episode::new(node_id, state.current_index));
                }
                Some(_) => {}
            }
            if let Some(current) = state.episodes.last_mut() {
                current.readings.push(row);
            }
            state.previous = Some(row);
            state
        });

        state.episodes
    }
}
