//! Frame buffer types for decoded video frames in CPU memory.
//!
//! Frames are packed 8-bit RGB, row-major, `height × width × 3` bytes with no
//! row padding. That is the layout ffmpeg emits for `-pix_fmt rgb24`.

use crate::error::{Result, SceneCutError};

/// Bytes per packed RGB pixel.
pub const CHANNELS: usize = 3;

/// A decoded RGB8 video frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Create a black frame with the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; Self::byte_len(width, height)],
        }
    }

    /// Create a frame where every pixel has the same color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(Self::byte_len(width, height));
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap raw packed RGB bytes. Fails if the length does not match.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = Self::byte_len(width, height);
        if data.len() != expected {
            return Err(SceneCutError::Decode(format!(
                "Frame buffer is {} bytes, expected {} for {}x{} rgb24",
                data.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Size in bytes of an RGB8 frame with the given dimensions.
    #[inline]
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * CHANNELS
    }

    /// Raw pixel bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable row of pixel data.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.width as usize * CHANNELS;
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// Read one pixel.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Overwrite one pixel.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let i = self.offset(x, y);
        self.data[i..i + CHANNELS].copy_from_slice(&rgb);
    }

    /// Luminance of one pixel.
    #[inline]
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        let [r, g, b] = self.pixel(x, y);
        luma(r, g, b)
    }

    /// Luminance plane of the whole frame, row-major.
    pub fn to_luma(&self) -> Vec<u8> {
        self.data
            .chunks_exact(CHANNELS)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect()
    }

    /// Returns `true` when the frame has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }
}

/// BT.601 luma in 14-bit fixed point, rounded to nearest.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + (1 << 13);
    (y >> 14) as u8
}

/// A single-channel on/off mask with the same geometry as a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    bits: Vec<bool>,
}

impl Mask {
    /// Create an empty (all-off) mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    /// Is the pixel at `(x, y)` masked?
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[y as usize * self.width as usize + x as usize]
    }

    /// Mark the pixel at `(x, y)`.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32) {
        let i = y as usize * self.width as usize + x as usize;
        self.bits[i] = true;
    }

    /// Mark every pixel within `radius` of `(cx, cy)`, clipped to the mask.
    pub fn fill_disc(&mut self, cx: i64, cy: i64, radius: i64) {
        if radius < 0 || self.width == 0 || self.height == 0 {
            return;
        }
        let r2 = radius * radius;
        let y0 = (cy - radius).max(0);
        let y1 = (cy + radius).min(self.height as i64 - 1);
        let x0 = (cx - radius).max(0);
        let x1 = (cx + radius).min(self.width as i64 - 1);
        for y in y0..=y1 {
            let dy = y - cy;
            for x in x0..=x1 {
                let dx = x - cx;
                if dx * dx + dy * dy <= r2 {
                    self.set(x as u32, y as u32);
                }
            }
        }
    }

    /// Number of marked pixels.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }
}
