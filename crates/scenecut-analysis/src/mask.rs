//! Cursor and border suppression for screen-recording frames.
//!
//! Bright blobs large enough to be a mouse cursor are covered with a neutral
//! gray disc, then a band along every border is blacked out. Downstream
//! detectors see the same pixels for a frame regardless of where the cursor
//! sits.

use scenecut_core::{FrameBuffer, Mask, Settings};
use std::collections::VecDeque;
use tracing::trace;

/// Fill color for suppressed cursor regions.
pub const NEUTRAL_GRAY: [u8; 3] = [128, 128, 128];

/// Configuration for the mask engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskConfig {
    /// Radius of the disc painted over each blob.
    pub cursor_radius: u32,
    /// Grayscale level at or above which a pixel is bright.
    pub brightness_threshold: u8,
    /// Blobs must be strictly larger than this many pixels.
    pub min_component_area: u32,
    /// Border band width; 0 disables edge suppression.
    pub edge_width: u32,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl MaskConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            cursor_radius: settings.cursor_mask_size,
            brightness_threshold: settings.cursor_brightness_threshold,
            min_component_area: settings.min_cursor_component_area,
            edge_width: settings.edge_mask_width,
        }
    }
}

/// A bright connected region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    /// Centroid x, truncated toward zero.
    pub cx: u32,
    /// Centroid y, truncated toward zero.
    pub cy: u32,
    /// Area enclosed by the outer boundary through the edge pixel centers.
    /// A solid `w`×`h` rectangle measures `(w-1)(h-1)`; holes count.
    pub area: f64,
}

/// Builds suppressed copies of frames.
#[derive(Debug, Clone, Default)]
pub struct MaskEngine {
    config: MaskConfig,
}

impl MaskEngine {
    pub fn new(config: MaskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MaskConfig {
        &self.config
    }

    /// Return a copy of `frame` with cursor blobs grayed and borders blacked.
    pub fn apply(&self, frame: &FrameBuffer) -> FrameBuffer {
        let blobs = self.detect_blobs(frame);
        let mut out = if blobs.is_empty() {
            frame.clone()
        } else {
            let mask = self.disc_mask(frame.width, frame.height, &blobs);
            compose(frame, &mask, NEUTRAL_GRAY)
        };
        trace!(blobs = blobs.len(), "Masked cursor regions");
        black_out_edges(&mut out, self.config.edge_width);
        out
    }

    /// Find bright 8-connected regions whose outline encloses more than the
    /// configured area.
    pub fn detect_blobs(&self, frame: &FrameBuffer) -> Vec<Blob> {
        let (w, h) = (frame.width as usize, frame.height as usize);
        if w == 0 || h == 0 {
            return Vec::new();
        }

        let threshold = self.config.brightness_threshold;
        let bright: Vec<bool> = frame.to_luma().into_iter().map(|y| y >= threshold).collect();
        let mut visited = vec![false; w * h];
        let mut queue = VecDeque::new();
        let mut blobs = Vec::new();

        for start in 0..w * h {
            if !bright[start] || visited[start] {
                continue;
            }
            visited[start] = true;
            queue.push_back(start);

            let (mut count, mut sum_x, mut sum_y) = (0u64, 0u64, 0u64);
            let mut pixels = Vec::new();
            while let Some(idx) = queue.pop_front() {
                let (x, y) = (idx % w, idx / w);
                count += 1;
                sum_x += x as u64;
                sum_y += y as u64;
                pixels.push(idx);

                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        let nx = x as i64 + dx;
                        let ny = y as i64 + dy;
                        if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                            continue;
                        }
                        let n = ny as usize * w + nx as usize;
                        if bright[n] && !visited[n] {
                            visited[n] = true;
                            queue.push_back(n);
                        }
                    }
                }
            }

            let area = outline_area(&pixels, w);
            if area > self.config.min_component_area as f64 {
                blobs.push(Blob {
                    cx: (sum_x / count) as u32,
                    cy: (sum_y / count) as u32,
                    area,
                });
            }
        }

        blobs
    }

    /// Union of the discs centered on every blob.
    pub fn disc_mask(&self, width: u32, height: u32, blobs: &[Blob]) -> Mask {
        let mut mask = Mask::new(width, height);
        let radius = self.config.cursor_radius as i64;
        for blob in blobs {
            mask.fill_disc(blob.cx as i64, blob.cy as i64, radius);
        }
        mask
    }
}

/// Area of the polygon traced through the centers of a component's outer
/// edge pixels.
///
/// Holes are filled first by flooding the background of the bounding box
/// (4-connected, dual to the 8-connected foreground). With `n` filled pixels
/// of which `b` touch the outside, Pick's theorem gives `n - b/2 - 1`.
/// One-pixel strokes have no true interior yet still measure about half
/// their length.
fn outline_area(pixels: &[usize], frame_width: usize) -> f64 {
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (usize::MAX, usize::MAX, 0, 0);
    for &idx in pixels {
        let (x, y) = (idx % frame_width, idx / frame_width);
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    // Bounding box with a one-pixel background margin.
    let bw = max_x - min_x + 3;
    let bh = max_y - min_y + 3;
    let mut inside = vec![false; bw * bh];
    for &idx in pixels {
        let (x, y) = (idx % frame_width, idx / frame_width);
        inside[(y - min_y + 1) * bw + (x - min_x + 1)] = true;
    }

    let mut outside = vec![false; bw * bh];
    let mut queue = VecDeque::from([0usize]);
    outside[0] = true;
    while let Some(i) = queue.pop_front() {
        let (x, y) = (i % bw, i / bw);
        let neighbours = [
            (x > 0).then(|| i - 1),
            (x + 1 < bw).then(|| i + 1),
            (y > 0).then(|| i - bw),
            (y + 1 < bh).then(|| i + bw),
        ];
        for n in neighbours.into_iter().flatten() {
            if !inside[n] && !outside[n] {
                outside[n] = true;
                queue.push_back(n);
            }
        }
    }

    let (mut filled, mut edge) = (0u64, 0u64);
    for (i, &out) in outside.iter().enumerate() {
        if out {
            continue;
        }
        filled += 1;
        // Filled cells never sit on the margin.
        if outside[i - 1] || outside[i + 1] || outside[i - bw] || outside[i + bw] {
            edge += 1;
        }
    }
    (filled as f64 - edge as f64 / 2.0 - 1.0).max(0.0)
}

/// `(frame AND NOT mask) + (fill AND mask)`: original pixels outside the
/// mask, `fill` inside it.
pub fn compose(frame: &FrameBuffer, mask: &Mask, fill: [u8; 3]) -> FrameBuffer {
    let mut out = frame.clone();
    for y in 0..frame.height {
        let row = out.row_mut(y);
        for x in 0..frame.width {
            if mask.get(x, y) {
                let i = x as usize * 3;
                row[i..i + 3].copy_from_slice(&fill);
            }
        }
    }
    out
}

/// Zero a band of `width` pixels on all four borders.
pub fn black_out_edges(frame: &mut FrameBuffer, width: u32) {
    if width == 0 || frame.is_empty() {
        return;
    }
    let (w, h) = (frame.width, frame.height);
    for y in 0..h {
        let in_band_row = y < width || y >= h.saturating_sub(width);
        let row = frame.row_mut(y);
        if in_band_row {
            row.fill(0);
            continue;
        }
        let band = (width.min(w) as usize) * 3;
        row[..band].fill(0);
        let len = row.len();
        row[len - band..].fill(0);
    }
}
