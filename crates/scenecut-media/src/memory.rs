//! Frame sources backed by frames already in memory.
//!
//! Used by tests and by callers that decode through other means.

use crate::source::{FrameSource, FrameSourceOpener, VideoFrame};
use scenecut_core::{FrameBuffer, Result, SceneCutError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A frame source over a shared list of frames.
#[derive(Debug, Clone)]
pub struct InMemoryFrameSource {
    frames: Arc<Vec<FrameBuffer>>,
    frame_rate: f64,
    position: u64,
}

impl InMemoryFrameSource {
    pub fn new(frames: Vec<FrameBuffer>, frame_rate: f64) -> Self {
        Self::shared(Arc::new(frames), frame_rate)
    }

    pub fn shared(frames: Arc<Vec<FrameBuffer>>, frame_rate: f64) -> Self {
        Self {
            frames,
            frame_rate,
            position: 0,
        }
    }
}

impl FrameSource for InMemoryFrameSource {
    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    fn dimensions(&self) -> (u32, u32) {
        self.frames
            .first()
            .map(|f| (f.width, f.height))
            .unwrap_or((0, 0))
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn read_next(&mut self) -> Result<Option<VideoFrame>> {
        let Some(buffer) = self.frames.get(self.position as usize) else {
            return Ok(None);
        };
        let frame = VideoFrame {
            buffer: buffer.clone(),
            pts: self.timestamp_of(self.position),
            frame_number: self.position,
        };
        self.position += 1;
        Ok(Some(frame))
    }

    fn seek_and_read(&mut self, frame_number: u64) -> Result<Option<FrameBuffer>> {
        self.position = frame_number;
        Ok(self.read_next()?.map(|f| f.buffer))
    }
}

/// Opener that serves registered in-memory videos by path.
#[derive(Debug, Default)]
pub struct InMemoryOpener {
    videos: HashMap<PathBuf, (Arc<Vec<FrameBuffer>>, f64)>,
}

impl InMemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `frames` under `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, frames: Vec<FrameBuffer>, frame_rate: f64) {
        self.videos
            .insert(path.into(), (Arc::new(frames), frame_rate));
    }
}

impl FrameSourceOpener for InMemoryOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        let (frames, fps) = self.videos.get(path).ok_or_else(|| {
            SceneCutError::Decode(format!("Could not open video file: {}", path.display()))
        })?;
        Ok(Box::new(InMemoryFrameSource::shared(frames.clone(), *fps)))
    }
}
