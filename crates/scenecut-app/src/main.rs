//! SceneCut - screen-recording scene splitter
//!
//! Registers a video, detects cut points, prints them, then splits the
//! recording into lossless segments unless `--analyze-only` is given.

use anyhow::{Context, Result};
use clap::Parser;
use scenecut_analysis::AnalysisRequest;
use scenecut_core::{CancelToken, Settings};
use scenecut_pipeline::SceneCutService;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "scenecut")]
#[command(about = "Split screen recordings into scenes without re-encoding")]
#[command(version)]
struct Args {
    /// Input video file
    video: PathBuf,

    /// Detection sensitivity in [0, 1]; higher finds more cuts
    #[arg(short, long, value_parser = parse_sensitivity)]
    sensitivity: Option<f64>,

    /// Minimum seconds between accepted cuts
    #[arg(long, value_parser = parse_min_duration)]
    min_duration: Option<f64>,

    /// Analyze frames without cursor and border masking
    #[arg(long, default_value_t = false)]
    keep_cursor: bool,

    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for segments and the report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop after printing cut points
    #[arg(long, default_value_t = false)]
    analyze_only: bool,
}

fn parse_sensitivity(s: &str) -> std::result::Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if (0.0..=1.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("sensitivity must be within [0, 1] (got {v})"))
    }
}

fn parse_min_duration(s: &str) -> std::result::Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(format!("min duration must be a non-negative number of seconds (got {v})"))
    }
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    }
    .apply_env();
    if let Some(dir) = &args.output {
        settings.output_dir = dir.clone();
    }

    let mut request = AnalysisRequest::from_settings(&settings);
    if let Some(s) = args.sensitivity {
        request.sensitivity = s;
    }
    if let Some(d) = args.min_duration {
        request.min_segment_duration = d;
    }
    if args.keep_cursor {
        request.ignore_cursor = false;
    }

    info!("SceneCut starting...");
    let service = SceneCutService::with_ffmpeg(settings)?;
    let cancel = CancelToken::new();

    let id = service
        .register_video(&args.video)
        .with_context(|| format!("could not open {}", args.video.display()))?;
    let preview = service.preview(id)?;
    println!(
        "{}: {:.2}s, {} fps, {}",
        preview.video_info.filename,
        preview.video_info.duration,
        preview.video_info.frame_rate,
        preview.video_info.resolution
    );

    let analysis = service.analyze(id, request, &cancel)?;
    println!(
        "{} cut point(s) at threshold {} in {:.1}s",
        analysis.cut_points.len(),
        analysis.threshold,
        analysis.elapsed_secs
    );
    for cp in &analysis.cut_points {
        println!(
            "  {:>8.2}s  frame {:>6}  {:<14} {:.1}",
            cp.timestamp,
            cp.frame_number,
            cp.change_type.as_str(),
            cp.confidence
        );
    }

    if args.analyze_only {
        return Ok(());
    }

    let processed = service.process(id, &cancel)?;
    if processed.degraded {
        println!(
            "ffmpeg not available: cut points written to {}",
            processed.output_dir.display()
        );
    } else {
        println!(
            "{} segment(s) written to {}",
            processed.media_segments,
            processed.output_dir.display()
        );
    }
    for failed in processed.segments.iter().filter(|s| s.error.is_some()) {
        eprintln!("  {}: {}", failed.filename, failed.error.as_deref().unwrap_or_default());
    }
    println!("report: {}", processed.report_path.display());

    Ok(())
}
