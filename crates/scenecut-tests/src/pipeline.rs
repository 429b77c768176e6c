//! Integration tests for the session service.
//!
//! Runs register → analyze → adjust → process through scenecut-pipeline
//! with in-memory frames and a recording stream copier.

use crate::support::{scenes, ten_second_recording, HarnessBuilder};
use scenecut_analysis::AnalysisRequest;
use scenecut_core::naming::DEGRADED_NOTE_FILE;
use scenecut_core::{CancelReason, CancelToken, ChangeType, CutPoint, SceneCutError};
use scenecut_pipeline::{CutPointEdit, ReportWriter, SessionId, SessionStatus};

fn manual_cut(frame_number: u64, timestamp: f64) -> CutPoint {
    CutPoint {
        frame_number,
        timestamp,
        confidence: 1.0,
        change_type: ChangeType::GeneralChange,
        description: format!("Manual cut at {timestamp:.2}s"),
        thumbnail: None,
    }
}

// ── Full runs ──────────────────────────────────────────────────

#[test]
fn ten_second_recording_is_split_in_three() {
    let h = HarnessBuilder::new(ten_second_recording()).build();
    let id = h.service.register_video(&h.video).unwrap();

    let preview = h.service.preview(id).unwrap();
    assert_eq!(preview.video_info.total_frames, 300);
    assert_eq!(preview.video_info.duration, 10.0);
    assert_eq!(preview.video_info.resolution, "64x48");
    assert_eq!(preview.status, SessionStatus::Uploaded);

    let analysis = h
        .service
        .analyze(id, AnalysisRequest::default(), &CancelToken::new())
        .unwrap();
    assert_eq!(analysis.threshold, 8.0);
    let stamps: Vec<f64> = analysis.cut_points.iter().map(|c| c.timestamp).collect();
    assert_eq!(stamps, vec![3.0, 7.0]);

    let processed = h.service.process(id, &CancelToken::new()).unwrap();
    assert!(!processed.degraded);
    assert!(!processed.cancelled);
    assert_eq!(processed.media_segments, 3);

    let ranges: Vec<(f64, f64)> = processed
        .segments
        .iter()
        .map(|s| (s.start_time, s.end_time))
        .collect();
    assert_eq!(ranges, vec![(0.0, 3.0), (3.0, 7.0), (7.0, 10.0)]);
    assert_eq!(
        h.outputs_with_extension(".mp4"),
        ["segment_001.mp4", "segment_002.mp4", "segment_003.mp4"]
    );

    let calls = h.copier.as_ref().unwrap().calls.lock().len();
    assert_eq!(calls, 3);
    assert_eq!(h.service.preview(id).unwrap().status, SessionStatus::Processed);
}

#[test]
fn report_matches_processed_run() {
    let h = HarnessBuilder::new(ten_second_recording()).build();
    let id = h.service.register_video(&h.video).unwrap();
    let request = AnalysisRequest {
        sensitivity: 0.5,
        ignore_cursor: false,
        min_segment_duration: 2.0,
    };
    let analysis = h.service.analyze(id, request, &CancelToken::new()).unwrap();
    let processed = h.service.process(id, &CancelToken::new()).unwrap();

    let report = ReportWriter::new(h.output_dir()).load().unwrap();
    assert_eq!(processed.report_path, h.output_dir().join("processing_log.json"));
    assert_eq!(report.session_id, id.to_string());
    assert_eq!(report.cut_points, analysis.cut_points);
    assert_eq!(report.segments, processed.segments);
    assert_eq!(report.settings.sensitivity, 0.5);
    assert_eq!(report.settings.threshold, 15.0);
    assert!(!report.settings.ignore_cursor);
    assert_eq!(report.settings.min_segment_duration, 2.0);
    assert!(!report.cancelled);
}

#[test]
fn degraded_mode_writes_one_artifact_and_no_media() {
    let h = HarnessBuilder::new(ten_second_recording())
        .without_ffmpeg()
        .build();
    let id = h.service.register_video(&h.video).unwrap();
    h.service
        .analyze(id, AnalysisRequest::default(), &CancelToken::new())
        .unwrap();

    let processed = h.service.process(id, &CancelToken::new()).unwrap();
    assert!(processed.degraded);
    assert_eq!(processed.media_segments, 0);
    assert_eq!(processed.segments.len(), 1);

    assert!(h.outputs_with_extension(".mp4").is_empty());
    assert_eq!(h.outputs_with_extension(".txt"), [DEGRADED_NOTE_FILE]);

    let note = std::fs::read_to_string(h.output_dir().join(DEGRADED_NOTE_FILE)).unwrap();
    assert!(note.contains("Cut 1: 3.00s (Frame 90)"));
    assert!(note.contains("Cut 2: 7.00s (Frame 210)"));

    let report = ReportWriter::new(h.output_dir()).load().unwrap();
    assert_eq!(report.segments[0].filename, DEGRADED_NOTE_FILE);
    assert!(report.segments[0].note.is_some());
}

#[test]
fn failed_segment_is_recorded_and_others_extracted() {
    let h = HarnessBuilder::new(ten_second_recording())
        .failing_at(vec![3])
        .build();
    let id = h.service.register_video(&h.video).unwrap();
    h.service
        .analyze(id, AnalysisRequest::default(), &CancelToken::new())
        .unwrap();

    let processed = h.service.process(id, &CancelToken::new()).unwrap();
    assert_eq!(processed.media_segments, 2);
    assert_eq!(processed.segments[1].filename, "segment_002_error.txt");
    assert!(processed.segments[1].error.is_some());
    assert_eq!(
        h.outputs_with_extension(".mp4"),
        ["segment_001.mp4", "segment_003.mp4"]
    );
    assert_eq!(h.outputs_with_extension("_error.txt"), ["segment_002_error.txt"]);
}

// ── Manual edits ───────────────────────────────────────────────

#[test]
fn adjusted_cut_points_drive_processing() {
    let h = HarnessBuilder::new(ten_second_recording()).build();
    let id = h.service.register_video(&h.video).unwrap();
    h.service
        .analyze(id, AnalysisRequest::default(), &CancelToken::new())
        .unwrap();

    let edit = CutPointEdit {
        cut_points: vec![manual_cut(240, 8.0), manual_cut(60, 2.0), manual_cut(63, 2.05)],
    };
    let stored = h.service.adjust_cut_points(id, edit).unwrap();
    let stamps: Vec<f64> = stored.iter().map(|c| c.timestamp).collect();
    assert_eq!(stamps, vec![2.0, 2.05, 8.0]);

    let processed = h.service.process(id, &CancelToken::new()).unwrap();
    let names: Vec<&str> = processed.segments.iter().map(|s| s.filename.as_str()).collect();
    // The 0.05s range between the first two cuts is dropped; indices keep their slot.
    assert_eq!(names, ["segment_001.mp4", "segment_003.mp4", "segment_004.mp4"]);
}

#[test]
fn invalid_edit_leaves_cut_points_unchanged() {
    let h = HarnessBuilder::new(ten_second_recording()).build();
    let id = h.service.register_video(&h.video).unwrap();
    let before = h
        .service
        .analyze(id, AnalysisRequest::default(), &CancelToken::new())
        .unwrap()
        .cut_points;

    let edit = CutPointEdit {
        cut_points: vec![manual_cut(600, 20.0)],
    };
    let err = h.service.adjust_cut_points(id, edit).unwrap_err();
    assert!(matches!(err, SceneCutError::Validation(_)));
    assert_eq!(h.service.preview(id).unwrap().cut_points, before);
}

#[test]
fn reanalysis_replaces_cut_points() {
    let frames = scenes(&[(60, [100, 100, 100]), (60, [120, 120, 120]), (60, [0, 0, 0])]);
    let h = HarnessBuilder::new(frames).build();
    let id = h.service.register_video(&h.video).unwrap();

    let sensitive = AnalysisRequest {
        sensitivity: 1.0,
        ..Default::default()
    };
    let first = h.service.analyze(id, sensitive, &CancelToken::new()).unwrap();
    assert_eq!(first.cut_points.len(), 2);

    let strict = AnalysisRequest {
        sensitivity: 0.0,
        ..Default::default()
    };
    let second = h.service.analyze(id, strict, &CancelToken::new()).unwrap();
    assert_eq!(second.cut_points.len(), 1);
    assert_eq!(h.service.preview(id).unwrap().cut_points, second.cut_points);
}

// ── Errors & lifecycle ─────────────────────────────────────────

#[test]
fn unknown_session_is_not_found() {
    let h = HarnessBuilder::new(ten_second_recording()).build();
    let id = SessionId::new();
    assert!(matches!(h.service.preview(id), Err(SceneCutError::NotFound(_))));
    assert!(matches!(
        h.service.process(id, &CancelToken::new()),
        Err(SceneCutError::NotFound(_))
    ));
}

#[test]
fn removed_session_is_gone() {
    let h = HarnessBuilder::new(ten_second_recording()).build();
    let id = h.service.register_video(&h.video).unwrap();
    h.service.remove(id).unwrap();
    assert!(matches!(h.service.preview(id), Err(SceneCutError::NotFound(_))));
    assert!(h.service.remove(id).is_err());
}

#[test]
fn unsupported_extension_is_rejected() {
    let h = HarnessBuilder::new(ten_second_recording())
        .filename("notes.txt")
        .build();
    assert!(matches!(
        h.service.register_video(&h.video),
        Err(SceneCutError::Validation(_))
    ));
    assert!(matches!(
        h.service.register_video(&h.dir.path().join("missing.mp4")),
        Err(SceneCutError::NotFound(_))
    ));
}

#[test]
fn decode_failure_leaves_session_untouched() {
    let h = HarnessBuilder::new(ten_second_recording())
        .decode_error_at(150)
        .build();
    let id = h.service.register_video(&h.video).unwrap();

    let err = h
        .service
        .analyze(id, AnalysisRequest::default(), &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, SceneCutError::Decode(_)));

    let preview = h.service.preview(id).unwrap();
    assert_eq!(preview.status, SessionStatus::Uploaded);
    assert!(preview.cut_points.is_empty());
    // The run released the session.
    assert!(!h.service.cancel(id));
}

#[test]
fn invalid_parameters_rejected_before_analysis() {
    let h = HarnessBuilder::new(ten_second_recording()).build();
    let id = h.service.register_video(&h.video).unwrap();
    let request = AnalysisRequest {
        min_segment_duration: -0.5,
        ..Default::default()
    };
    assert!(matches!(
        h.service.analyze(id, request, &CancelToken::new()),
        Err(SceneCutError::Validation(_))
    ));
    assert_eq!(h.service.preview(id).unwrap().status, SessionStatus::Uploaded);
}

#[test]
fn cancelled_runs_report_partial_results() {
    let h = HarnessBuilder::new(ten_second_recording()).build();
    let id = h.service.register_video(&h.video).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    let analysis = h
        .service
        .analyze(id, AnalysisRequest::default(), &cancel)
        .unwrap();
    assert!(analysis.cancelled);
    assert!(analysis.cut_points.is_empty());

    let processed = h.service.process(id, &cancel).unwrap();
    assert!(processed.cancelled);
    assert_eq!(processed.media_segments, 0);
    assert!(ReportWriter::new(h.output_dir()).load().unwrap().cancelled);
    assert_eq!(h.service.preview(id).unwrap().status, SessionStatus::Analyzed);
}

#[test]
fn removing_a_session_stops_its_analysis() {
    let h = HarnessBuilder::new(ten_second_recording())
        .gated_at(150)
        .build();
    let id = h.service.register_video(&h.video).unwrap();
    let gate = h.gate.as_ref().unwrap();

    std::thread::scope(|s| {
        let run = s.spawn(|| {
            h.service
                .analyze(id, AnalysisRequest::default(), &CancelToken::new())
        });
        gate.reached.recv().unwrap();
        h.service.remove(id).unwrap();
        gate.release.send(()).unwrap();

        let err = run.join().unwrap().unwrap_err();
        assert!(matches!(err, SceneCutError::Cancelled(CancelReason::SessionRemoved)));
    });
    assert!(matches!(h.service.preview(id), Err(SceneCutError::NotFound(_))));
}

#[test]
fn cancelling_a_run_stops_it_early() {
    let h = HarnessBuilder::new(ten_second_recording())
        .gated_at(150)
        .build();
    let id = h.service.register_video(&h.video).unwrap();
    let gate = h.gate.as_ref().unwrap();
    assert!(!h.service.cancel(id));

    let analysis = std::thread::scope(|s| {
        let run = s.spawn(|| {
            h.service
                .analyze(id, AnalysisRequest::default(), &CancelToken::new())
        });
        gate.reached.recv().unwrap();

        // One run per session at a time.
        let second = h
            .service
            .analyze(id, AnalysisRequest::default(), &CancelToken::new());
        assert!(matches!(second, Err(SceneCutError::Validation(_))));

        assert!(h.service.cancel(id));
        gate.release.send(()).unwrap();
        run.join().unwrap().unwrap()
    });

    // Stopped before classification, so nothing is reported.
    assert!(analysis.cancelled);
    assert!(analysis.cut_points.is_empty());
    assert_eq!(h.service.preview(id).unwrap().status, SessionStatus::Analyzed);
    assert!(!h.service.cancel(id));
}
