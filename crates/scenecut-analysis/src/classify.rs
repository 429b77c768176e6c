//! Change classification from the spatial variance signature of a frame.
//!
//! The frame is split into a 3×3 grid; the luminance variance of each cell
//! is computed and the spread of those variances picks the category.

use scenecut_core::{ChangeType, FrameBuffer};
use tracing::debug;

/// Cells per grid side.
pub const GRID_SIZE: u32 = 3;

/// Result of classifying one boundary frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub change_type: ChangeType,
    pub confidence: f64,
}

impl Classification {
    const fn new(change_type: ChangeType, confidence: f64) -> Self {
        Self {
            change_type,
            confidence,
        }
    }
}

/// Population variance of the luminance of each non-empty grid cell.
///
/// Cell size is the integer division of the frame size by the grid size;
/// the remainder rows and columns are not covered by any cell.
pub fn cell_variances(frame: &FrameBuffer) -> Vec<f64> {
    let cell_h = frame.height / GRID_SIZE;
    let cell_w = frame.width / GRID_SIZE;
    if cell_h == 0 || cell_w == 0 {
        return Vec::new();
    }

    let luma = frame.to_luma();
    let stride = frame.width as usize;
    let mut variances = Vec::with_capacity((GRID_SIZE * GRID_SIZE) as usize);

    for i in 0..GRID_SIZE {
        for j in 0..GRID_SIZE {
            let (y1, y2) = (i * cell_h, (i + 1) * cell_h);
            let (x1, x2) = (j * cell_w, (j + 1) * cell_w);
            let count = ((y2 - y1) * (x2 - x1)) as f64;

            let (mut sum, mut sum_sq) = (0.0f64, 0.0f64);
            for y in y1..y2 {
                let row = &luma[y as usize * stride..][x1 as usize..x2 as usize];
                for &v in row {
                    let v = v as f64;
                    sum += v;
                    sum_sq += v * v;
                }
            }
            let mean = sum / count;
            variances.push((sum_sq / count - mean * mean).max(0.0));
        }
    }
    variances
}

/// Map a variance signature to a category.
///
/// Rules are checked in order and the first match wins.
pub fn classify_variances(variances: &[f64]) -> Classification {
    if variances.is_empty() {
        return Classification::new(ChangeType::Unknown, 0.5);
    }

    let n = variances.len() as f64;
    let max_variance = variances.iter().copied().fold(f64::MIN, f64::max);
    let mean = variances.iter().sum::<f64>() / n;
    let variance_std = (variances.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();

    if max_variance < 1000.0 {
        Classification::new(ChangeType::ButtonClick, 0.7)
    } else if max_variance < 5000.0 && variance_std < 1000.0 {
        Classification::new(ChangeType::DialogOpen, 0.8)
    } else if max_variance > 10000.0 {
        Classification::new(ChangeType::UiUpdate, 0.9)
    } else if variance_std > 2000.0 {
        Classification::new(ChangeType::FormInput, 0.6)
    } else {
        Classification::new(ChangeType::GeneralChange, 0.5)
    }
}

/// Classifies boundary frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryClassifier;

impl BoundaryClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify the (already masked) frame at `frame_number`.
    pub fn classify(&self, frame: &FrameBuffer, frame_number: u64, frame_rate: f64) -> Classification {
        let variances = cell_variances(frame);
        let result = classify_variances(&variances);
        debug!(
            frame = frame_number,
            fps = frame_rate,
            cells = variances.len(),
            change_type = %result.change_type,
            confidence = result.confidence,
            "Classified boundary"
        );
        result
    }
}
