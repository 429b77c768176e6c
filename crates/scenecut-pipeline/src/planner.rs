//! Segment planning: cut points to contiguous time ranges.

use scenecut_core::CutPoint;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One range to extract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannedRange {
    /// 1-based position in the boundary loop, kept across dropped ranges.
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

impl PlannedRange {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Plan the ranges between consecutive boundaries.
///
/// Boundaries are `0.0`, then every cut point timestamp, then `end` when
/// given. Ranges shorter than `min_duration`, or with `end <= start`, are
/// dropped without renumbering the ones that follow.
pub fn plan_segments(cut_points: &[CutPoint], end: Option<f64>, min_duration: f64) -> Vec<PlannedRange> {
    let boundaries: Vec<f64> = std::iter::once(0.0)
        .chain(cut_points.iter().map(|c| c.timestamp))
        .chain(end)
        .collect();

    boundaries
        .windows(2)
        .enumerate()
        .filter_map(|(i, pair)| {
            let range = PlannedRange {
                index: i + 1,
                start: pair[0],
                end: pair[1],
            };
            if range.end <= range.start || range.duration() < min_duration {
                debug!(
                    index = range.index,
                    start = range.start,
                    end = range.end,
                    "Dropping short range"
                );
                return None;
            }
            Some(range)
        })
        .collect()
}
