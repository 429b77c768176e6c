//! Media file probing to get stream metadata without a full decode.

use scenecut_core::{Result, SceneCutError};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Properties of the primary video stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamProbe {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub frame_count: u64,
    pub duration: f64,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

impl StreamProbe {
    /// Probe `path` with the ffprobe binary at `ffprobe`.
    pub fn run(ffprobe: &Path, path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SceneCutError::NotFound(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let output = Command::new(ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames,duration:format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| {
                SceneCutError::CapabilityUnavailable(format!(
                    "Failed to run ffprobe ({}): {e}",
                    ffprobe.display()
                ))
            })?;

        if !output.status.success() {
            return Err(SceneCutError::Decode(format!(
                "Could not open video file {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let probe = Self::parse(&output.stdout)?;
        debug!(
            path = %path.display(),
            width = probe.width,
            height = probe.height,
            fps = probe.frame_rate,
            frames = probe.frame_count,
            "Probed video stream"
        );
        Ok(probe)
    }

    /// Parse ffprobe JSON output.
    pub fn parse(json: &[u8]) -> Result<Self> {
        let parsed: FfprobeOutput = serde_json::from_slice(json)
            .map_err(|e| SceneCutError::Decode(format!("Unreadable ffprobe output: {e}")))?;

        let stream = parsed
            .streams
            .into_iter()
            .next()
            .ok_or_else(|| SceneCutError::Decode("No video stream found".into()))?;

        let (width, height) = match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(SceneCutError::Decode(
                    "Video stream has no dimensions".into(),
                ))
            }
        };

        let frame_rate = [stream.avg_frame_rate.as_deref(), stream.r_frame_rate.as_deref()]
            .into_iter()
            .flatten()
            .map(parse_frame_rate)
            .find(|fps| *fps > 0.0)
            .unwrap_or(0.0);

        let duration = stream
            .duration
            .as_deref()
            .or(parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        let frame_count = stream
            .nb_frames
            .as_deref()
            .and_then(|n| n.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or_else(|| (duration * frame_rate).round().max(0.0) as u64);

        Ok(Self {
            width,
            height,
            frame_rate,
            frame_count,
            duration,
        })
    }
}

/// Parse a frame rate such as `"30000/1001"` or `"30"`. Returns 0 when invalid.
pub fn parse_frame_rate(fps: &str) -> f64 {
    if let Some((num, den)) = fps.split_once('/') {
        let num: f64 = num.trim().parse().unwrap_or(0.0);
        let den: f64 = den.trim().parse().unwrap_or(0.0);
        if den != 0.0 {
            return num / den;
        }
        return 0.0;
    }
    fps.trim().parse().unwrap_or(0.0)
}
