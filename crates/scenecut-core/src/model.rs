//! Data model shared by analysis, segmentation and reporting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Information about a video file, computed once from the frame source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// File name without directories.
    pub filename: String,
    /// Duration in seconds (`total_frames / frame_rate`, 0 when the rate is unknown).
    pub duration: f64,
    /// Frames per second.
    pub frame_rate: f64,
    /// Resolution as `"WxH"`.
    pub resolution: String,
    /// Total number of frames.
    pub total_frames: u64,
    /// File size in bytes.
    pub file_size: u64,
}

impl VideoInfo {
    /// Build video info from stream properties.
    pub fn new(
        filename: impl Into<String>,
        frame_rate: f64,
        total_frames: u64,
        (width, height): (u32, u32),
        file_size: u64,
    ) -> Self {
        let duration = if frame_rate > 0.0 {
            total_frames as f64 / frame_rate
        } else {
            0.0
        };
        Self {
            filename: filename.into(),
            duration,
            frame_rate,
            resolution: format!("{width}x{height}"),
            total_frames,
            file_size,
        }
    }
}

/// Kind of on-screen change a cut point represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Small, localized change.
    ButtonClick,
    /// Medium change, evenly distributed.
    DialogOpen,
    /// Large change across the frame.
    UiUpdate,
    /// Unevenly spread change.
    FormInput,
    /// Anything the other categories do not cover.
    GeneralChange,
    /// Not enough information to decide.
    Unknown,
}

impl ChangeType {
    /// Stable wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ButtonClick => "button_click",
            Self::DialogOpen => "dialog_open",
            Self::UiUpdate => "ui_update",
            Self::FormInput => "form_input",
            Self::GeneralChange => "general_change",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point in the video where a new segment starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutPoint {
    /// Frame number of the first frame after the change.
    pub frame_number: u64,
    /// Time of the change in seconds.
    pub timestamp: f64,
    /// Classifier confidence (0.0 to 1.0).
    pub confidence: f64,
    /// Category of the change.
    pub change_type: ChangeType,
    /// Human-readable description.
    pub description: String,
    /// Optional reference to a thumbnail image.
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// One entry of the segment list: an extracted clip, a failed range, or
/// the degraded-mode notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub filename: String,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub path: PathBuf,
    /// Set when extraction of this range failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set on informational entries that carry no media.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Segment {
    /// A successfully extracted range.
    pub fn extracted(filename: String, start: f64, end: f64, path: PathBuf) -> Self {
        Self {
            filename,
            start_time: start,
            end_time: end,
            duration: end - start,
            path,
            error: None,
            note: None,
        }
    }

    /// A range whose extraction failed.
    pub fn failed(filename: String, start: f64, end: f64, path: PathBuf, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::extracted(filename, start, end, path)
        }
    }

    /// An informational entry with an empty time range.
    pub fn notice(filename: String, path: PathBuf, note: String) -> Self {
        Self {
            filename,
            start_time: 0.0,
            end_time: 0.0,
            duration: 0.0,
            path,
            error: None,
            note: Some(note),
        }
    }

    /// True for entries that point at an extracted media file.
    pub fn is_media(&self) -> bool {
        self.error.is_none() && self.note.is_none()
    }
}
