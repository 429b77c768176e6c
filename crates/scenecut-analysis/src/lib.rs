//! SceneCut Analysis - boundary detection for screen recordings
//!
//! Provides:
//! - Cursor and border masking
//! - HSV content scoring with a pluggable detector trait
//! - Sensitivity calibration and the minimum-duration filter
//! - Grid-variance change classification
//! - The analysis driver that ties them together

pub mod analyzer;
pub mod boundary;
pub mod classify;
pub mod content;
pub mod mask;

pub use analyzer::{AnalysisResult, Analyzer};
pub use boundary::{
    AnalysisRequest, BoundaryCandidate, BoundaryDetector, DetectedBoundaries, DurationFilter,
    ThresholdBounds,
};
pub use classify::{BoundaryClassifier, Classification};
pub use content::{BoundaryEvent, BoundaryEvents, ContentDetector, HsvContentDetector};
pub use mask::{MaskConfig, MaskEngine};
