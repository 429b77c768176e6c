//! Session-oriented facade over analysis, extraction and reporting.

use crate::extractor::SegmentExtractor;
use crate::planner::plan_segments;
use crate::report::{ProcessingReport, ReportSettings, ReportWriter};
use crate::session::{
    AnalysisRecord, InMemorySessionStore, ProcessingSession, SessionId, SessionStatus, SessionStore,
};
use chrono::Utc;
use parking_lot::Mutex;
use scenecut_analysis::{
    AnalysisRequest, Analyzer, ContentDetector, HsvContentDetector, MaskConfig, MaskEngine,
    ThresholdBounds,
};
use scenecut_core::{
    CancelReason, CancelToken, CutPoint, Result, SceneCutError, Segment, Settings, VideoInfo,
};
use scenecut_media::{FfmpegOpener, FfmpegStreamCopy, FrameSourceOpener, StreamCopy};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Video metadata and current cut points of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    pub session_id: SessionId,
    pub video_info: VideoInfo,
    pub cut_points: Vec<CutPoint>,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub session_id: SessionId,
    pub cut_points: Vec<CutPoint>,
    pub threshold: f64,
    pub elapsed_secs: f64,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub session_id: SessionId,
    pub output_dir: PathBuf,
    pub report_path: PathBuf,
    /// Entries backed by an extracted media file.
    pub media_segments: usize,
    pub segments: Vec<Segment>,
    pub elapsed_secs: f64,
    pub cancelled: bool,
    pub degraded: bool,
}

/// A manual replacement of a session's cut points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutPointEdit {
    pub cut_points: Vec<CutPoint>,
}

impl CutPointEdit {
    /// Check every point against `info` and return them sorted by timestamp.
    pub fn validate(self, info: &VideoInfo) -> Result<Vec<CutPoint>> {
        let mut seen = HashSet::new();
        for cp in &self.cut_points {
            if !cp.timestamp.is_finite() || cp.timestamp < 0.0 {
                return Err(SceneCutError::Validation(format!(
                    "cut point at frame {} has invalid timestamp {}",
                    cp.frame_number, cp.timestamp
                )));
            }
            if info.duration > 0.0 && cp.timestamp > info.duration {
                return Err(SceneCutError::Validation(format!(
                    "cut point at {:.2}s is past the end of the video ({:.2}s)",
                    cp.timestamp, info.duration
                )));
            }
            if !(0.0..=1.0).contains(&cp.confidence) {
                return Err(SceneCutError::Validation(format!(
                    "confidence must be within [0, 1] (got {})",
                    cp.confidence
                )));
            }
            if !seen.insert(cp.frame_number) {
                return Err(SceneCutError::Validation(format!(
                    "duplicate cut point at frame {}",
                    cp.frame_number
                )));
            }
        }
        let mut cut_points = self.cut_points;
        cut_points.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(cut_points)
    }
}

/// Tokens of the runs currently in flight, one per session.
type ActiveRuns = Mutex<HashMap<SessionId, CancelToken>>;

/// Marks a session busy for the duration of one analyze or process run.
struct RunGuard<'a> {
    runs: &'a ActiveRuns,
    id: SessionId,
}

impl<'a> RunGuard<'a> {
    fn claim(runs: &'a ActiveRuns, id: SessionId, cancel: &CancelToken) -> Result<Self> {
        let mut active = runs.lock();
        if active.contains_key(&id) {
            return Err(SceneCutError::Validation(format!(
                "Session {id} already has a run in progress"
            )));
        }
        active.insert(id, cancel.clone());
        Ok(Self { runs, id })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.runs.lock().remove(&self.id);
    }
}

/// Results of a run whose session vanished have nowhere to go.
fn ensure_session_kept(cancel: &CancelToken) -> Result<()> {
    match cancel.reason() {
        Some(CancelReason::SessionRemoved) => {
            Err(SceneCutError::Cancelled(CancelReason::SessionRemoved))
        }
        _ => Ok(()),
    }
}

/// Runs the analysis and segmentation pipeline for stored sessions.
pub struct SceneCutService {
    settings: Settings,
    store: Arc<dyn SessionStore>,
    opener: Arc<dyn FrameSourceOpener>,
    scorer: Arc<dyn ContentDetector>,
    analyzer: Analyzer,
    extractor: SegmentExtractor,
    active: ActiveRuns,
}

impl SceneCutService {
    pub fn new(
        settings: Settings,
        store: Arc<dyn SessionStore>,
        opener: Arc<dyn FrameSourceOpener>,
        scorer: Arc<dyn ContentDetector>,
        copier: Option<Arc<dyn StreamCopy>>,
    ) -> Result<Self> {
        settings.validate()?;
        let extractor = SegmentExtractor::new(copier, settings.extraction_concurrency)?;
        Ok(Self {
            analyzer: Analyzer::from_settings(&settings),
            settings,
            store,
            opener,
            scorer,
            extractor,
            active: Mutex::new(HashMap::new()),
        })
    }

    /// Wire the service to ffmpeg/ffprobe and an in-memory session store.
    ///
    /// Fails when no frame source can be opened; a missing ffmpeg for
    /// extraction only degrades `process`.
    pub fn with_ffmpeg(settings: Settings) -> Result<Self> {
        let opener = FfmpegOpener::from_settings(&settings)?;
        let copier = FfmpegStreamCopy::locate(&settings).map(|c| Arc::new(c) as Arc<dyn StreamCopy>);
        if copier.is_none() {
            warn!("ffmpeg not found for extraction, processing will run in degraded mode");
        }
        let mut scorer = HsvContentDetector::new(settings.min_scene_len_frames);
        if settings.mask_detection_frames {
            scorer = scorer.with_mask(MaskEngine::new(MaskConfig::from_settings(&settings)));
        }
        Self::new(
            settings,
            Arc::new(InMemorySessionStore::new()),
            Arc::new(opener),
            Arc::new(scorer),
            copier,
        )
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Validate a video file, read its metadata and open a session for it.
    pub fn register_video(&self, path: &Path) -> Result<SessionId> {
        if !path.exists() {
            return Err(SceneCutError::NotFound(format!(
                "Video file not found: {}",
                path.display()
            )));
        }
        if !self.settings.is_allowed_extension(path) {
            return Err(SceneCutError::Validation(format!(
                "Unsupported file type: {} (allowed: {})",
                path.display(),
                self.settings.allowed_extensions.join(", ")
            )));
        }
        let file_size = std::fs::metadata(path)?.len();
        if file_size > self.settings.max_file_size {
            return Err(SceneCutError::Validation(format!(
                "File too large: {file_size} bytes (limit {})",
                self.settings.max_file_size
            )));
        }

        let source = self.opener.open(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let info = VideoInfo::new(
            filename,
            source.frame_rate(),
            source.frame_count(),
            source.dimensions(),
            file_size,
        );

        let session = ProcessingSession::new(path.to_path_buf(), info);
        let id = session.id;
        info!(
            session = %id,
            duration = session.video_info.duration,
            resolution = %session.video_info.resolution,
            "Session created"
        );
        self.store.insert(session);
        Ok(id)
    }

    pub fn preview(&self, id: SessionId) -> Result<Preview> {
        let session = self.store.get(id)?;
        Ok(Preview {
            session_id: id,
            video_info: session.video_info,
            cut_points: session.cut_points,
            status: session.status,
        })
    }

    /// Detect and classify cut points, replacing the session's current set.
    pub fn analyze(
        &self,
        id: SessionId,
        request: AnalysisRequest,
        cancel: &CancelToken,
    ) -> Result<AnalysisOutcome> {
        let request = request.validated()?;
        let session = self.store.get(id)?;
        let _run = RunGuard::claim(&self.active, id, cancel)?;
        let started = Instant::now();
        info!(
            session = %id,
            sensitivity = request.sensitivity,
            ignore_cursor = request.ignore_cursor,
            min_segment_duration = request.min_segment_duration,
            "Analyzing video"
        );

        let mut source = self.opener.open(&session.video_path)?;
        let result = self
            .analyzer
            .analyze(source.as_mut(), self.scorer.as_ref(), request, cancel)?;
        ensure_session_kept(cancel)?;

        let record = AnalysisRecord {
            request,
            threshold: result.threshold,
        };
        let cut_points = result.cut_points.clone();
        self.store.update(id, &mut |s| {
            s.cut_points = cut_points.clone();
            s.status = SessionStatus::Analyzed;
            s.last_analysis = Some(record);
        })?;

        Ok(AnalysisOutcome {
            session_id: id,
            cut_points: result.cut_points,
            threshold: result.threshold,
            elapsed_secs: started.elapsed().as_secs_f64(),
            cancelled: result.cancelled,
        })
    }

    /// Replace the session's cut points with a validated manual edit.
    pub fn adjust_cut_points(&self, id: SessionId, edit: CutPointEdit) -> Result<Vec<CutPoint>> {
        let session = self.store.get(id)?;
        let cut_points = edit.validate(&session.video_info)?;
        info!(session = %id, cut_points = cut_points.len(), "Cut points adjusted");
        let stored = cut_points.clone();
        self.store.update(id, &mut |s| s.cut_points = stored.clone())?;
        Ok(cut_points)
    }

    /// Plan, extract and report segments for the session's cut points.
    pub fn process(&self, id: SessionId, cancel: &CancelToken) -> Result<ProcessOutcome> {
        let session = self.store.get(id)?;
        let _run = RunGuard::claim(&self.active, id, cancel)?;
        let started = Instant::now();
        let output_dir = self.settings.output_dir.clone();

        let end = (session.video_info.duration > 0.0).then_some(session.video_info.duration);
        let ranges = plan_segments(&session.cut_points, end, self.settings.min_planned_duration);
        info!(
            session = %id,
            cut_points = session.cut_points.len(),
            ranges = ranges.len(),
            "Processing video"
        );

        let outcome = self.extractor.extract(
            &session.video_path,
            &ranges,
            &session.cut_points,
            &output_dir,
            cancel,
        )?;
        ensure_session_kept(cancel)?;

        let report = ProcessingReport {
            session_id: id.to_string(),
            video_info: session.video_info.clone(),
            cut_points: session.cut_points.clone(),
            segments: outcome.segments.clone(),
            processing_time: Utc::now(),
            settings: self.report_settings(&session),
            cancelled: outcome.cancelled,
        };
        let report_path = ReportWriter::new(&output_dir).write(&report)?;

        if !outcome.cancelled {
            self.store
                .update(id, &mut |s| s.status = SessionStatus::Processed)?;
        }
        log_output_listing(&output_dir);

        Ok(ProcessOutcome {
            session_id: id,
            media_segments: outcome.media_count(),
            output_dir,
            report_path,
            segments: outcome.segments,
            elapsed_secs: started.elapsed().as_secs_f64(),
            cancelled: outcome.cancelled,
            degraded: outcome.degraded,
        })
    }

    /// Ask the run in flight for `id`, if any, to stop. Returns whether
    /// there was one.
    pub fn cancel(&self, id: SessionId) -> bool {
        match self.active.lock().get(&id) {
            Some(token) => {
                token.cancel();
                info!(session = %id, "Run cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Drop the session, stopping any run still working on it.
    pub fn remove(&self, id: SessionId) -> Result<()> {
        self.store.remove(id)?;
        if let Some(token) = self.active.lock().get(&id) {
            token.cancel_for(CancelReason::SessionRemoved);
            warn!(session = %id, "Session removed during a run, stopping it");
        }
        info!(session = %id, "Session removed");
        Ok(())
    }

    fn report_settings(&self, session: &ProcessingSession) -> ReportSettings {
        let record = session.last_analysis.unwrap_or_else(|| {
            let request = AnalysisRequest::from_settings(&self.settings);
            AnalysisRecord {
                request,
                threshold: ThresholdBounds::from_settings(&self.settings)
                    .detection_threshold(request.sensitivity),
            }
        });
        ReportSettings {
            sensitivity: record.request.sensitivity,
            threshold: record.threshold,
            ignore_cursor: record.request.ignore_cursor,
            min_segment_duration: record.request.min_segment_duration,
            cursor_mask_size: self.settings.cursor_mask_size,
            edge_mask_width: self.settings.edge_mask_width,
            min_planned_duration: self.settings.min_planned_duration,
        }
    }
}

fn log_output_listing(dir: &Path) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(error = %e, "Could not list output directory");
            return;
        }
    };
    info!(dir = %dir.display(), "Files exported");
    for entry in entries.flatten() {
        if entry.path().is_file() {
            info!(file = %entry.file_name().to_string_lossy(), "  exported");
        }
    }
}
