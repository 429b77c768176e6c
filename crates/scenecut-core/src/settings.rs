//! Runtime configuration.
//!
//! Every field has a default, so a partial JSON file is enough:
//!
//! ```json
//! { "edge_mask_width": 32, "output_dir": "/tmp/cuts" }
//! ```
//!
//! Environment variables override the file: `SCENECUT_FFMPEG`,
//! `SCENECUT_FFPROBE` and `SCENECUT_OUTPUT_DIR`.

use crate::error::{Result, SceneCutError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const ENV_FFMPEG: &str = "SCENECUT_FFMPEG";
pub const ENV_FFPROBE: &str = "SCENECUT_FFPROBE";
pub const ENV_OUTPUT_DIR: &str = "SCENECUT_OUTPUT_DIR";

/// Configuration for analysis and segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Lowest content-score threshold (reached at sensitivity 1.0).
    pub threshold_min: f64,
    /// Highest content-score threshold (reached at sensitivity 0.0).
    pub threshold_max: f64,
    pub default_sensitivity: f64,
    pub default_min_segment_duration: f64,
    pub ignore_cursor_by_default: bool,

    /// Radius of the gray disc painted over each cursor blob.
    pub cursor_mask_size: u32,
    /// Grayscale level at or above which a pixel counts as bright.
    pub cursor_brightness_threshold: u8,
    /// Bright regions must be larger than this many pixels.
    pub min_cursor_component_area: u32,
    /// Width of the blacked-out border band (0 disables).
    pub edge_mask_width: u32,

    /// Minimum number of frames between two scorer events.
    pub min_scene_len_frames: u64,
    /// Run the mask engine on every frame fed to the scorer.
    pub mask_detection_frames: bool,

    /// Planned ranges shorter than this are discarded.
    pub min_planned_duration: f64,

    /// Accepted container extensions, lowercase without the dot.
    pub allowed_extensions: Vec<String>,
    /// Largest accepted input in bytes.
    pub max_file_size: u64,
    /// Where segments and the report are written.
    pub output_dir: PathBuf,

    /// Explicit ffmpeg binary; resolved from the environment and PATH when unset.
    pub ffmpeg_path: Option<PathBuf>,
    /// Explicit ffprobe binary.
    pub ffprobe_path: Option<PathBuf>,

    /// Upper bound on concurrent stream-copy invocations.
    pub extraction_concurrency: usize,
    pub frame_timeout_ms: u64,
    pub extraction_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold_min: 3.0,
            threshold_max: 27.0,
            default_sensitivity: 0.8,
            default_min_segment_duration: 1.0,
            ignore_cursor_by_default: true,
            cursor_mask_size: 25,
            cursor_brightness_threshold: 200,
            min_cursor_component_area: 500,
            edge_mask_width: 50,
            min_scene_len_frames: 15,
            mask_detection_frames: false,
            min_planned_duration: 0.1,
            allowed_extensions: ["mp4", "avi", "mov", "mkv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_file_size: 500 * 1024 * 1024,
            output_dir: PathBuf::from("download"),
            ffmpeg_path: None,
            ffprobe_path: None,
            extraction_concurrency: num_cpus::get().max(1),
            frame_timeout_ms: 10_000,
            extraction_timeout_secs: 600,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SceneCutError::NotFound(format!(
                "Settings file not found: {}",
                path.display()
            )));
        }
        let json = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply environment overrides on top of the current values.
    pub fn apply_env(mut self) -> Self {
        if let Some(path) = std::env::var_os(ENV_FFMPEG) {
            debug!(path = ?path, "ffmpeg path from environment");
            self.ffmpeg_path = Some(PathBuf::from(path));
        }
        if let Some(path) = std::env::var_os(ENV_FFPROBE) {
            debug!(path = ?path, "ffprobe path from environment");
            self.ffprobe_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = std::env::var_os(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
        self
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold_min.is_finite()
            || !self.threshold_max.is_finite()
            || self.threshold_min > self.threshold_max
        {
            return Err(SceneCutError::Validation(format!(
                "threshold bounds must satisfy min <= max (got {} and {})",
                self.threshold_min, self.threshold_max
            )));
        }
        if self.extraction_concurrency == 0 {
            return Err(SceneCutError::Validation(
                "extraction_concurrency must be at least 1".into(),
            ));
        }
        if self.min_planned_duration.is_nan() || self.min_planned_duration < 0.0 {
            return Err(SceneCutError::Validation(
                "min_planned_duration must be non-negative".into(),
            ));
        }
        Ok(())
    }

    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    /// Whether `path` has one of the accepted extensions (case-insensitive).
    pub fn is_allowed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions.iter().any(|a| *a == ext)
            })
            .unwrap_or(false)
    }
}
