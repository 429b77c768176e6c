//! Lossless extraction of a time range into its own file.
//!
//! Streams are copied (`-c copy`), never re-encoded.

use crate::locator::ToolLocator;
use crate::process;
use ffmpeg_sidecar::command::FfmpegCommand;
use scenecut_core::{Result, SceneCutError, Settings};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Copies `[start, start + duration)` of `input` into `output`.
pub trait StreamCopy: Send + Sync {
    fn extract(&self, input: &Path, start: f64, duration: f64, output: &Path) -> Result<()>;
}

/// Stream copy through an ffmpeg subprocess.
#[derive(Debug, Clone)]
pub struct FfmpegStreamCopy {
    ffmpeg: PathBuf,
    timeout: Duration,
}

impl FfmpegStreamCopy {
    pub fn new(ffmpeg: PathBuf, timeout: Duration) -> Self {
        Self { ffmpeg, timeout }
    }

    /// Locate ffmpeg from settings. `None` means the capability is unavailable.
    pub fn locate(settings: &Settings) -> Option<Self> {
        ToolLocator::ffmpeg(settings)
            .resolve()
            .map(|ffmpeg| Self::new(ffmpeg, settings.extraction_timeout()))
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg
    }

    /// Build the FFmpeg command arguments.
    pub fn ffmpeg_args(input: &Path, start: f64, duration: f64, output: &Path) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-i".into(),
            input.to_string_lossy().into_owned(),
            "-ss".into(),
            start.to_string(),
            "-t".into(),
            duration.to_string(),
            "-c".into(),
            "copy".into(),
            "-avoid_negative_ts".into(),
            "make_zero".into(),
            output.to_string_lossy().into_owned(),
        ]
    }
}

impl StreamCopy for FfmpegStreamCopy {
    fn extract(&self, input: &Path, start: f64, duration: f64, output: &Path) -> Result<()> {
        let args = Self::ffmpeg_args(input, start, duration, output);
        debug!(output = %output.display(), start, duration, "Running stream copy");

        let mut child = FfmpegCommand::new_with_path(&self.ffmpeg)
            .args(&args)
            .spawn()
            .map_err(|e| {
                SceneCutError::Extraction(format!(
                    "Failed to spawn ffmpeg ({}): {e}",
                    self.ffmpeg.display()
                ))
            })?;

        let stderr = child.take_stderr().map(process::drain);
        if let Some(stdout) = child.take_stdout() {
            process::drain(stdout);
        }

        let status = process::wait_with_timeout(child.as_inner_mut(), self.timeout)?;
        let log = stderr
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(SceneCutError::Extraction(format!(
                "ffmpeg exited with status {status}: {}",
                process::last_line(&log)
            )));
        }
        Ok(())
    }
}
