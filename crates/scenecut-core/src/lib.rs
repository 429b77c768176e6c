//! SceneCut Core - Foundation types for screen-recording segmentation
//!
//! This crate provides the fundamental types used throughout SceneCut:
//! - Video metadata, cut points and segments
//! - RGB frame buffers
//! - Settings and cancellation
//! - The shared error type

pub mod cancel;
pub mod error;
pub mod frame;
pub mod model;
pub mod settings;

pub use cancel::{CancelReason, CancelToken};
pub use error::{Result, SceneCutError};
pub use frame::{FrameBuffer, Mask};
pub use model::{ChangeType, CutPoint, Segment, VideoInfo};
pub use settings::Settings;

/// File naming contract shared by the extractor and the report writer.
pub mod naming {
    /// Name of the processing report written into the output directory.
    pub const REPORT_FILE: &str = "processing_log.json";

    /// Name of the artifact written when no stream-copy tool is available.
    pub const DEGRADED_NOTE_FILE: &str = "ffmpeg_not_available.txt";

    /// Media file name for the segment at 1-based `index`.
    pub fn segment_file(index: usize) -> String {
        format!("segment_{index:03}.mp4")
    }

    /// Error note file name for the segment at 1-based `index`.
    pub fn segment_error_file(index: usize) -> String {
        format!("segment_{index:03}_error.txt")
    }
}
