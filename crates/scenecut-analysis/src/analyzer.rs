//! Analysis driver: detection, masking and classification in one
//! sequential pass over a frame source.

use crate::boundary::{AnalysisRequest, BoundaryDetector, ThresholdBounds};
use crate::classify::{BoundaryClassifier, Classification};
use crate::content::ContentDetector;
use crate::mask::{MaskConfig, MaskEngine};
use scenecut_core::{CancelToken, ChangeType, CutPoint, Result, Settings};
use scenecut_media::FrameSource;
use tracing::{info, warn};

/// Result of analysing one video.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// Classified cut points, ordered by timestamp.
    pub cut_points: Vec<CutPoint>,
    /// Threshold the scorer ran with.
    pub threshold: f64,
    /// True when the scan stopped early on cancellation; `cut_points` then
    /// holds what was found up to that point.
    pub cancelled: bool,
}

/// Turns a frame source into classified cut points.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    detector: BoundaryDetector,
    mask: MaskEngine,
    classifier: BoundaryClassifier,
}

impl Analyzer {
    pub fn new(bounds: ThresholdBounds, mask: MaskConfig) -> Self {
        Self {
            detector: BoundaryDetector::new(bounds),
            mask: MaskEngine::new(mask),
            classifier: BoundaryClassifier::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            ThresholdBounds::from_settings(settings),
            MaskConfig::from_settings(settings),
        )
    }

    pub fn mask_engine(&self) -> &MaskEngine {
        &self.mask
    }

    /// Detect, filter and classify boundaries.
    pub fn analyze(
        &self,
        source: &mut dyn FrameSource,
        scorer: &dyn ContentDetector,
        request: AnalysisRequest,
        cancel: &CancelToken,
    ) -> Result<AnalysisResult> {
        let request = request.validated()?;
        let detected = self.detector.detect(
            source,
            scorer,
            request.sensitivity,
            request.min_segment_duration,
            cancel,
        )?;

        let frame_rate = source.frame_rate();
        let mut cut_points = Vec::with_capacity(detected.candidates.len());
        let mut cancelled = detected.cancelled;

        for (i, candidate) in detected.candidates.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let classification = match source.seek_and_read(candidate.frame_number) {
                Ok(Some(frame)) => {
                    let frame = if request.ignore_cursor {
                        self.mask.apply(&frame)
                    } else {
                        frame
                    };
                    self.classifier
                        .classify(&frame, candidate.frame_number, frame_rate)
                }
                Ok(None) => {
                    warn!(frame = candidate.frame_number, "Boundary frame past end of stream");
                    unclassified()
                }
                Err(e) => {
                    warn!(frame = candidate.frame_number, error = %e, "Could not read boundary frame");
                    unclassified()
                }
            };

            // Scene 1 is the implicit opening scene.
            let scene = i + 2;
            cut_points.push(CutPoint {
                frame_number: candidate.frame_number,
                timestamp: candidate.timestamp,
                confidence: classification.confidence,
                change_type: classification.change_type,
                description: format!("Scene {scene} detected at {:.2}s", candidate.timestamp),
                thumbnail: None,
            });
        }

        info!(
            cut_points = cut_points.len(),
            threshold = detected.threshold,
            cancelled,
            "Analysis complete"
        );
        Ok(AnalysisResult {
            cut_points,
            threshold: detected.threshold,
            cancelled,
        })
    }
}

fn unclassified() -> Classification {
    Classification {
        change_type: ChangeType::Unknown,
        confidence: 0.5,
    }
}
