//! Integration tests for detection, masking and classification.
//!
//! Exercises scenecut-analysis against in-memory scenecut-media sources.

use crate::support::{scenes, ten_second_recording, ScriptedSource, FPS};
use scenecut_analysis::mask::NEUTRAL_GRAY;
use scenecut_analysis::{
    AnalysisRequest, Analyzer, ContentDetector, HsvContentDetector, MaskConfig, MaskEngine,
    ThresholdBounds,
};
use scenecut_core::{CancelToken, ChangeType, FrameBuffer, SceneCutError};
use scenecut_media::{FrameSource, InMemoryFrameSource};

// ── Detection ──────────────────────────────────────────────────

#[test]
fn hard_changes_become_cut_points() {
    let mut source = InMemoryFrameSource::new(ten_second_recording(), FPS);
    let result = Analyzer::default()
        .analyze(
            &mut source,
            &HsvContentDetector::default(),
            AnalysisRequest::default(),
            &CancelToken::new(),
        )
        .unwrap();

    assert_eq!(result.threshold, 8.0);
    let stamps: Vec<(u64, f64)> = result
        .cut_points
        .iter()
        .map(|c| (c.frame_number, c.timestamp))
        .collect();
    assert_eq!(stamps, vec![(90, 3.0), (210, 7.0)]);
    assert_eq!(result.cut_points[1].description, "Scene 3 detected at 7.00s");
}

#[test]
fn candidate_inside_min_duration_is_dropped() {
    let frames = scenes(&[(90, [0, 0, 0]), (1, [250, 250, 250]), (209, [0, 120, 0])]);
    let mut source = InMemoryFrameSource::new(frames, FPS);
    let result = Analyzer::default()
        .analyze(
            &mut source,
            &HsvContentDetector::new(1),
            AnalysisRequest::default(),
            &CancelToken::new(),
        )
        .unwrap();

    assert_eq!(result.cut_points.len(), 1);
    assert_eq!(result.cut_points[0].timestamp, 3.0);
}

#[test]
fn zero_sensitivity_ignores_subtle_changes() {
    // A 20-level step in value scores about 6.7.
    let frames = scenes(&[(60, [100, 100, 100]), (60, [120, 120, 120])]);
    let run = |sensitivity: f64| {
        let mut source = InMemoryFrameSource::new(frames.clone(), FPS);
        Analyzer::default()
            .analyze(
                &mut source,
                &HsvContentDetector::default(),
                AnalysisRequest {
                    sensitivity,
                    ..Default::default()
                },
                &CancelToken::new(),
            )
            .unwrap()
            .cut_points
            .len()
    };
    assert_eq!(run(0.0), 0);
    assert_eq!(run(1.0), 1);
}

#[test]
fn custom_threshold_bounds_are_used() {
    let analyzer = Analyzer::new(ThresholdBounds { min: 10.0, max: 50.0 }, MaskConfig::default());
    let mut source = InMemoryFrameSource::new(ten_second_recording(), FPS);
    let result = analyzer
        .analyze(
            &mut source,
            &HsvContentDetector::default(),
            AnalysisRequest {
                sensitivity: 0.5,
                ..Default::default()
            },
            &CancelToken::new(),
        )
        .unwrap();
    assert_eq!(result.threshold, 30.0);
}

#[test]
fn scanning_consumes_the_source_once() {
    let mut source = InMemoryFrameSource::new(ten_second_recording(), FPS);
    let cancel = CancelToken::new();
    let count = HsvContentDetector::default()
        .scan(&mut source, 8.0, &cancel)
        .count();
    assert_eq!(count, 2);
    assert_eq!(source.position(), 300);
}

#[test]
fn decode_failure_mid_scan_aborts_analysis() {
    // The cut at 3.0s is already behind the scan when decoding breaks.
    let mut source = ScriptedSource::failing_at(ten_second_recording(), 150);
    let err = Analyzer::default()
        .analyze(
            &mut source,
            &HsvContentDetector::default(),
            AnalysisRequest::default(),
            &CancelToken::new(),
        )
        .unwrap_err();
    assert!(matches!(err, SceneCutError::Decode(_)));
    assert_eq!(source.position(), 150);
}

// ── Masking & classification ───────────────────────────────────

/// 300×200 dark frame with a 30×30 white cursor centered at (101, 101).
fn frame_with_cursor() -> FrameBuffer {
    let mut frame = FrameBuffer::filled(300, 200, [30, 60, 90]);
    for y in 86..116 {
        for x in 86..116 {
            frame.set_pixel(x, y, [255, 255, 255]);
        }
    }
    frame
}

#[test]
fn cursor_disc_is_gray_and_rest_untouched() {
    let frame = frame_with_cursor();
    let engine = MaskEngine::new(MaskConfig {
        edge_width: 0,
        ..MaskConfig::default()
    });
    let out = engine.apply(&frame);

    for y in 0..200u32 {
        for x in 0..300u32 {
            let (dx, dy) = (x as i64 - 100, y as i64 - 100);
            if dx * dx + dy * dy <= 25 * 25 {
                assert_eq!(out.pixel(x, y), NEUTRAL_GRAY);
            } else {
                assert_eq!(out.pixel(x, y), frame.pixel(x, y));
            }
        }
    }
}

#[test]
fn edge_band_is_black_with_default_mask() {
    let out = MaskEngine::default().apply(&frame_with_cursor());
    assert_eq!(out.pixel(0, 0), [0, 0, 0]);
    assert_eq!(out.pixel(299, 199), [0, 0, 0]);
    assert_eq!(out.pixel(100, 100), NEUTRAL_GRAY);
    assert_eq!(out.pixel(150, 100), [30, 60, 90]);
}

#[test]
fn border_masking_changes_classification() {
    // Stripes only inside the border band; the edge mask removes them.
    let mut frame = FrameBuffer::new(300, 300);
    for y in 0..300u32 {
        for x in 0..300u32 {
            let in_band = x < 50 || x >= 250 || y < 50 || y >= 250;
            let v = if in_band && x % 2 == 1 { 255 } else { 0 };
            frame.set_pixel(x, y, [v, v, v]);
        }
    }
    let frames = vec![FrameBuffer::filled(300, 300, [0, 0, 0]); 60]
        .into_iter()
        .chain(std::iter::repeat(frame).take(60))
        .collect::<Vec<_>>();

    let classify = |ignore_cursor: bool| {
        let mut source = InMemoryFrameSource::new(frames.clone(), FPS);
        let result = Analyzer::default()
            .analyze(
                &mut source,
                &HsvContentDetector::default(),
                AnalysisRequest {
                    ignore_cursor,
                    ..Default::default()
                },
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(result.cut_points.len(), 1);
        result.cut_points[0].change_type
    };

    assert_eq!(classify(false), ChangeType::UiUpdate);
    assert_eq!(classify(true), ChangeType::ButtonClick);
}
