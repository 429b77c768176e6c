//! Segment extraction through the stream-copy capability.
//!
//! Ranges are extracted on a bounded worker pool and collected back in
//! index order. A failed range is recorded and the batch continues. When
//! no stream-copy tool is available the whole batch is replaced by a single
//! text artifact listing the detected cut points.

use crate::planner::PlannedRange;
use rayon::prelude::*;
use scenecut_core::naming::{segment_error_file, segment_file, DEGRADED_NOTE_FILE};
use scenecut_core::{CancelToken, CutPoint, Result, SceneCutError, Segment};
use scenecut_media::StreamCopy;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Note attached to the degraded-mode entry.
pub const DEGRADED_NOTE: &str = "FFmpeg not installed. Install FFmpeg to create video segments.";

/// What an extraction pass produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    /// Entries in index order: media, per-range errors, or the degraded notice.
    pub segments: Vec<Segment>,
    /// No stream-copy capability was available.
    pub degraded: bool,
    /// The pass stopped early; ranges not started are absent.
    pub cancelled: bool,
}

impl ExtractionOutcome {
    /// Number of entries backed by an extracted media file.
    pub fn media_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_media()).count()
    }
}

/// Extracts planned ranges into an output directory.
pub struct SegmentExtractor {
    copier: Option<Arc<dyn StreamCopy>>,
    pool: rayon::ThreadPool,
}

impl SegmentExtractor {
    /// `copier` of `None` puts every batch in degraded mode.
    pub fn new(copier: Option<Arc<dyn StreamCopy>>, concurrency: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency.max(1))
            .thread_name(|i| format!("scenecut-extract-{i}"))
            .build()
            .map_err(|e| SceneCutError::Internal(format!("Failed to build extraction pool: {e}")))?;
        Ok(Self { copier, pool })
    }

    pub fn is_degraded(&self) -> bool {
        self.copier.is_none()
    }

    /// Extract `ranges` of `input` into `output_dir`.
    ///
    /// `cut_points` is only used to describe the boundaries in degraded mode.
    pub fn extract(
        &self,
        input: &Path,
        ranges: &[PlannedRange],
        cut_points: &[CutPoint],
        output_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<ExtractionOutcome> {
        std::fs::create_dir_all(output_dir)?;

        let Some(copier) = &self.copier else {
            warn!("Stream-copy tool unavailable, writing cut point list only");
            let notice = write_degraded_note(output_dir, cut_points)?;
            return Ok(ExtractionOutcome {
                segments: vec![notice],
                degraded: true,
                cancelled: false,
            });
        };

        info!(
            ranges = ranges.len(),
            threads = self.pool.current_num_threads(),
            output = %output_dir.display(),
            "Extracting segments"
        );

        let results: Vec<Option<Segment>> = self.pool.install(|| {
            ranges
                .par_iter()
                .map(|range| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    Some(extract_one(copier.as_ref(), input, range, output_dir))
                })
                .collect()
        });

        let cancelled = results.iter().any(Option::is_none);
        let segments: Vec<Segment> = results.into_iter().flatten().collect();
        if cancelled {
            warn!(done = segments.len(), total = ranges.len(), "Extraction cancelled");
        }
        Ok(ExtractionOutcome {
            segments,
            degraded: false,
            cancelled,
        })
    }
}

fn extract_one(copier: &dyn StreamCopy, input: &Path, range: &PlannedRange, output_dir: &Path) -> Segment {
    let filename = segment_file(range.index);
    let path = output_dir.join(&filename);

    match copier.extract(input, range.start, range.duration(), &path) {
        Ok(()) => {
            debug!(index = range.index, path = %path.display(), "Segment extracted");
            Segment::extracted(filename, range.start, range.end, path)
        }
        Err(e) => {
            warn!(index = range.index, error = %e, "Segment extraction failed");
            if path.exists() {
                if let Err(rm) = std::fs::remove_file(&path) {
                    debug!(error = %rm, "Could not remove partial segment");
                }
            }
            let error_name = segment_error_file(range.index);
            let error_path = output_dir.join(&error_name);
            let reason = e.to_string();
            if let Err(io) = std::fs::write(&error_path, format!("{reason}\n")) {
                warn!(error = %io, path = %error_path.display(), "Could not write segment error file");
            }
            Segment::failed(error_name, range.start, range.end, error_path, reason)
        }
    }
}

/// Human-readable cut point list used when nothing can be extracted.
pub fn degraded_note_text(cut_points: &[CutPoint]) -> String {
    let mut text = String::from(
        "FFmpeg is not installed on this system.\n\
         To create video segments, install FFmpeg and either add it to PATH\n\
         or point SCENECUT_FFMPEG at the binary, then process again.\n\n\
         Cut points detected:\n",
    );
    for (i, cp) in cut_points.iter().enumerate() {
        text.push_str(&format!(
            "  Cut {}: {:.2}s (Frame {})\n",
            i + 1,
            cp.timestamp,
            cp.frame_number
        ));
    }
    text
}

fn write_degraded_note(output_dir: &Path, cut_points: &[CutPoint]) -> Result<Segment> {
    let path = output_dir.join(DEGRADED_NOTE_FILE);
    std::fs::write(&path, degraded_note_text(cut_points))?;
    Ok(Segment::notice(DEGRADED_NOTE_FILE.to_string(), path, DEGRADED_NOTE.to_string()))
}
