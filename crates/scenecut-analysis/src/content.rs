//! Content-change scoring in HSV space.
//!
//! Each frame is scored against the previous one as the mean of the
//! per-channel mean absolute differences of hue, saturation and value.
//! Scores are on a 0-255 scale, the same scale the sensitivity-derived
//! threshold is expressed in.

use crate::mask::MaskEngine;
use scenecut_core::{CancelToken, FrameBuffer, Result, SceneCutError};
use scenecut_media::FrameSource;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A frame where the content score crossed the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryEvent {
    pub frame_number: u64,
    pub timestamp: f64,
    pub score: f64,
}

/// Lazy, ordered, finite sequence of boundary events.
pub type BoundaryEvents<'a> = Box<dyn Iterator<Item = Result<BoundaryEvent>> + 'a>;

/// A pluggable content-change scorer.
pub trait ContentDetector: Send + Sync {
    /// Scan `source` from its current position, yielding a boundary event
    /// whenever the score exceeds `threshold`. Stops early when `cancel`
    /// is triggered.
    fn scan<'a>(
        &'a self,
        source: &'a mut dyn FrameSource,
        threshold: f64,
        cancel: &'a CancelToken,
    ) -> BoundaryEvents<'a>;
}

/// A frame converted to 8-bit HSV planes (hue 0..180, sat/val 0..255).
#[derive(Debug, Clone)]
pub struct HsvFrame {
    pub width: u32,
    pub height: u32,
    hue: Vec<u8>,
    sat: Vec<u8>,
    val: Vec<u8>,
}

impl HsvFrame {
    pub fn from_rgb(frame: &FrameBuffer) -> Self {
        let n = frame.width as usize * frame.height as usize;
        let mut hue = Vec::with_capacity(n);
        let mut sat = Vec::with_capacity(n);
        let mut val = Vec::with_capacity(n);
        for px in frame.data().chunks_exact(3) {
            let [h, s, v] = rgb_to_hsv(px[0], px[1], px[2]);
            hue.push(h);
            sat.push(s);
            val.push(v);
        }
        Self {
            width: frame.width,
            height: frame.height,
            hue,
            sat,
            val,
        }
    }
}

/// Convert one pixel to HSV with hue halved to fit in a byte.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = v - min;

    let s = if v > 0.0 { diff * 255.0 / v } else { 0.0 };

    let mut h = if diff == 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / diff
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    [
        ((h / 2.0).round() as u32 % 180) as u8,
        s.round() as u8,
        v as u8,
    ]
}

/// Content score between two frames, or `None` if their sizes differ.
pub fn content_score(a: &HsvFrame, b: &HsvFrame) -> Option<f64> {
    if a.width != b.width || a.height != b.height {
        return None;
    }
    let n = a.hue.len();
    if n == 0 {
        return Some(0.0);
    }
    let mad = |x: &[u8], y: &[u8]| -> f64 {
        let total: u64 = x
            .iter()
            .zip(y)
            .map(|(p, q)| (*p as i32 - *q as i32).unsigned_abs() as u64)
            .sum();
        total as f64 / n as f64
    };
    let delta_h = mad(&a.hue, &b.hue);
    let delta_s = mad(&a.sat, &b.sat);
    let delta_v = mad(&a.val, &b.val);
    Some((delta_h + delta_s + delta_v) / 3.0)
}

/// HSV content detector with a minimum gap between events.
#[derive(Debug, Clone)]
pub struct HsvContentDetector {
    /// Minimum number of frames between two events (also measured from the
    /// first scanned frame).
    pub min_scene_len: u64,
    /// Optional suppression applied to each frame before scoring.
    pub mask: Option<MaskEngine>,
}

impl Default for HsvContentDetector {
    fn default() -> Self {
        Self {
            min_scene_len: 15,
            mask: None,
        }
    }
}

impl HsvContentDetector {
    pub fn new(min_scene_len: u64) -> Self {
        Self {
            min_scene_len,
            mask: None,
        }
    }

    /// Score masked frames instead of raw ones.
    pub fn with_mask(mut self, mask: MaskEngine) -> Self {
        self.mask = Some(mask);
        self
    }
}

impl ContentDetector for HsvContentDetector {
    fn scan<'a>(
        &'a self,
        source: &'a mut dyn FrameSource,
        threshold: f64,
        cancel: &'a CancelToken,
    ) -> BoundaryEvents<'a> {
        Box::new(HsvScan {
            detector: self,
            source,
            threshold,
            cancel,
            previous: None,
            last_event: None,
            finished: false,
        })
    }
}

struct HsvScan<'a> {
    detector: &'a HsvContentDetector,
    source: &'a mut dyn FrameSource,
    threshold: f64,
    cancel: &'a CancelToken,
    previous: Option<HsvFrame>,
    last_event: Option<u64>,
    finished: bool,
}

impl Iterator for HsvScan<'_> {
    type Item = Result<BoundaryEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            if self.cancel.is_cancelled() {
                info!(frame = self.source.position(), "Content scan cancelled");
                self.finished = true;
                break;
            }

            let frame = match self.source.read_next() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    self.finished = true;
                    break;
                }
                Err(SceneCutError::Timeout(what)) => {
                    warn!(%what, "Skipping frame that failed to decode in time");
                    continue;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };

            let hsv = match &self.detector.mask {
                Some(mask) => HsvFrame::from_rgb(&mask.apply(&frame.buffer)),
                None => HsvFrame::from_rgb(&frame.buffer),
            };
            let last_event = *self.last_event.get_or_insert(frame.frame_number);
            let score = self
                .previous
                .as_ref()
                .and_then(|prev| content_score(prev, &hsv));
            self.previous = Some(hsv);

            let Some(score) = score else {
                continue;
            };
            if score > self.threshold
                && frame.frame_number > 0
                && frame.frame_number.saturating_sub(last_event) >= self.detector.min_scene_len
            {
                debug!(
                    frame = frame.frame_number,
                    score,
                    threshold = self.threshold,
                    "Content boundary"
                );
                self.last_event = Some(frame.frame_number);
                return Some(Ok(BoundaryEvent {
                    frame_number: frame.frame_number,
                    timestamp: frame.pts,
                    score,
                }));
            }
        }
        None
    }
}
