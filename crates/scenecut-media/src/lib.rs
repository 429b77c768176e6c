//! SceneCut Media - FFmpeg integration for video I/O
//!
//! This crate handles:
//! - The frame source capability (sequential and random frame access)
//! - Media file probing through ffprobe
//! - Lossless stream-copy extraction of time ranges
//! - Locating the external ffmpeg/ffprobe binaries

pub mod decoder;
pub mod locator;
pub mod memory;
pub mod probe;
mod process;
pub mod source;
pub mod stream_copy;

pub use decoder::{FfmpegFrameSource, FfmpegOpener};
pub use locator::ToolLocator;
pub use memory::{InMemoryFrameSource, InMemoryOpener};
pub use probe::StreamProbe;
pub use source::{FrameSource, FrameSourceOpener, VideoFrame};
pub use stream_copy::{FfmpegStreamCopy, StreamCopy};
