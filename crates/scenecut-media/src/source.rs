//! The frame source capability consumed by analysis.

use scenecut_core::{FrameBuffer, Result};
use std::path::Path;

/// A decoded video frame with metadata.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Frame data in RGB8 format
    pub buffer: FrameBuffer,
    /// Presentation timestamp in seconds
    pub pts: f64,
    /// Frame number
    pub frame_number: u64,
}

/// Sequential and random access to the frames of one video.
///
/// A source is a stateful cursor: only one reader may advance it at a time.
/// Analysing two videos concurrently needs two independent sources.
pub trait FrameSource: Send {
    /// Frames per second.
    fn frame_rate(&self) -> f64;

    /// Total frame count as reported by the container.
    fn frame_count(&self) -> u64;

    /// Frame dimensions as `(width, height)`.
    fn dimensions(&self) -> (u32, u32);

    /// Frame number the next [`FrameSource::read_next`] call will return.
    fn position(&self) -> u64;

    /// Decode the frame at the cursor and advance it.
    ///
    /// Returns `Ok(None)` at end of stream. A `Timeout` error consumes the
    /// frame; the cursor moves past it.
    fn read_next(&mut self) -> Result<Option<VideoFrame>>;

    /// Move the cursor to `frame_number` and decode that frame.
    ///
    /// Returns `Ok(None)` when the frame lies past the end of the stream.
    fn seek_and_read(&mut self, frame_number: u64) -> Result<Option<FrameBuffer>>;

    /// Timestamp in seconds of `frame_number`.
    fn timestamp_of(&self, frame_number: u64) -> f64 {
        let fps = self.frame_rate();
        if fps > 0.0 {
            frame_number as f64 / fps
        } else {
            0.0
        }
    }
}

/// Opens frame sources by path.
pub trait FrameSourceOpener: Send + Sync {
    /// Open `path`. Fails with `NotFound` for a missing file and `Decode`
    /// when the file cannot be read as video.
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>>;
}
