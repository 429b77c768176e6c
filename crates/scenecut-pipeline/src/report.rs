//! Processing report written next to the extracted segments.

use chrono::{DateTime, Utc};
use scenecut_core::naming::REPORT_FILE;
use scenecut_core::{CutPoint, Result, SceneCutError, Segment, VideoInfo};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Parameters a run actually used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    pub sensitivity: f64,
    pub threshold: f64,
    pub ignore_cursor: bool,
    pub min_segment_duration: f64,
    pub cursor_mask_size: u32,
    pub edge_mask_width: u32,
    pub min_planned_duration: f64,
}

/// Full record of one processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub session_id: String,
    pub video_info: VideoInfo,
    pub cut_points: Vec<CutPoint>,
    pub segments: Vec<Segment>,
    /// When processing finished.
    pub processing_time: DateTime<Utc>,
    pub settings: ReportSettings,
    /// Extraction stopped before every range was attempted.
    #[serde(default)]
    pub cancelled: bool,
}

/// Reads and writes the report file in an output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE)
    }

    /// Write `report`, replacing any previous one.
    pub fn write(&self, report: &ProcessingReport) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.path();
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| SceneCutError::Serialization(format!("Failed to serialize report: {e}")))?;
        std::fs::write(&path, json)?;
        info!(path = %path.display(), segments = report.segments.len(), "Report written");
        Ok(path)
    }

    pub fn load(&self) -> Result<ProcessingReport> {
        Self::load_from(&self.path())
    }

    pub fn load_from(path: &Path) -> Result<ProcessingReport> {
        if !path.exists() {
            return Err(SceneCutError::NotFound(format!(
                "Report not found: {}",
                path.display()
            )));
        }
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| SceneCutError::Serialization(format!("Failed to parse report: {e}")))
    }
}
