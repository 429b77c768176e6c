//! Boundary detection: sensitivity → threshold mapping and the
//! minimum-segment-duration post-filter over scorer events.

use crate::content::{BoundaryEvent, ContentDetector};
use scenecut_core::{CancelToken, Result, SceneCutError, Settings};
use scenecut_media::FrameSource;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Calibration bounds of the content-score threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for ThresholdBounds {
    fn default() -> Self {
        Self { min: 3.0, max: 27.0 }
    }
}

impl ThresholdBounds {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            min: settings.threshold_min,
            max: settings.threshold_max,
        }
    }

    /// `max(min, min(max, max - sensitivity * (max - min)))`.
    ///
    /// Sensitivity is clamped to `[0, 1]`; higher sensitivity gives a lower
    /// threshold.
    pub fn threshold(&self, sensitivity: f64) -> f64 {
        let s = sensitivity.clamp(0.0, 1.0);
        let raw = self.max - s * (self.max - self.min);
        self.min.max(self.max.min(raw))
    }

    /// The threshold handed to the scorer, rounded to a whole score unit.
    pub fn detection_threshold(&self, sensitivity: f64) -> f64 {
        self.threshold(sensitivity).round().clamp(self.min, self.max)
    }
}

/// Caller-facing analysis parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub sensitivity: f64,
    pub ignore_cursor: bool,
    pub min_segment_duration: f64,
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        Self {
            sensitivity: 0.8,
            ignore_cursor: true,
            min_segment_duration: 1.0,
        }
    }
}

impl AnalysisRequest {
    /// Defaults taken from settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            sensitivity: settings.default_sensitivity,
            ignore_cursor: settings.ignore_cursor_by_default,
            min_segment_duration: settings.default_min_segment_duration,
        }
    }

    /// Clamp sensitivity into `[0, 1]` and reject values that cannot be
    /// clamped meaningfully.
    pub fn validated(self) -> Result<Self> {
        if self.sensitivity.is_nan() {
            return Err(SceneCutError::Validation("sensitivity must be a number".into()));
        }
        if !self.min_segment_duration.is_finite() || self.min_segment_duration < 0.0 {
            return Err(SceneCutError::Validation(format!(
                "min_segment_duration must be a finite value >= 0 (got {})",
                self.min_segment_duration
            )));
        }
        Ok(Self {
            sensitivity: self.sensitivity.clamp(0.0, 1.0),
            ..self
        })
    }
}

/// A boundary that survived the duration filter, not yet classified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryCandidate {
    pub frame_number: u64,
    pub timestamp: f64,
}

/// Streaming minimum-duration filter.
///
/// A candidate is accepted when it lies at least `min_duration` seconds
/// after the last *accepted* candidate (or after 0 for the first one).
/// Rejected candidates do not move the reference point. Frame 0 is the
/// implicit start of the video and is never accepted.
#[derive(Debug, Clone)]
pub struct DurationFilter {
    min_duration: f64,
    last_accepted: Option<BoundaryCandidate>,
}

impl DurationFilter {
    pub fn new(min_duration: f64) -> Self {
        Self {
            min_duration,
            last_accepted: None,
        }
    }

    /// Offer a candidate; returns it back when accepted.
    pub fn offer(&mut self, candidate: BoundaryCandidate) -> Option<BoundaryCandidate> {
        if candidate.frame_number == 0 {
            return None;
        }
        let reference = match self.last_accepted {
            Some(last) if last.frame_number == candidate.frame_number => return None,
            Some(last) => last.timestamp,
            None => 0.0,
        };
        if candidate.timestamp - reference < self.min_duration {
            debug!(
                frame = candidate.frame_number,
                gap = candidate.timestamp - reference,
                "Dropping boundary closer than minimum segment duration"
            );
            return None;
        }
        self.last_accepted = Some(candidate);
        Some(candidate)
    }
}

/// Output of a detection pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedBoundaries {
    /// Accepted candidates, ordered by timestamp.
    pub candidates: Vec<BoundaryCandidate>,
    /// Threshold the scorer ran with.
    pub threshold: f64,
    /// Whether the scan stopped early on cancellation.
    pub cancelled: bool,
}

/// Runs a content detector and filters its events.
#[derive(Debug, Clone, Default)]
pub struct BoundaryDetector {
    bounds: ThresholdBounds,
}

impl BoundaryDetector {
    pub fn new(bounds: ThresholdBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> ThresholdBounds {
        self.bounds
    }

    /// Scan `source` with `scorer` and return the accepted candidates.
    pub fn detect(
        &self,
        source: &mut dyn FrameSource,
        scorer: &dyn ContentDetector,
        sensitivity: f64,
        min_segment_duration: f64,
        cancel: &CancelToken,
    ) -> Result<DetectedBoundaries> {
        let threshold = self.bounds.detection_threshold(sensitivity);
        info!(sensitivity, threshold, min_segment_duration, "Detecting boundaries");

        let mut filter = DurationFilter::new(min_segment_duration);
        let mut candidates = Vec::new();
        for event in scorer.scan(source, threshold, cancel) {
            let BoundaryEvent {
                frame_number,
                timestamp,
                ..
            } = event?;
            if let Some(accepted) = filter.offer(BoundaryCandidate {
                frame_number,
                timestamp,
            }) {
                candidates.push(accepted);
            }
        }

        let cancelled = cancel.is_cancelled();
        info!(accepted = candidates.len(), cancelled, "Boundary detection complete");
        Ok(DetectedBoundaries {
            candidates,
            threshold,
            cancelled,
        })
    }
}
