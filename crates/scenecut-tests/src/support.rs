//! Shared fixtures: synthetic recordings, a fake stream copier and a
//! service wired to both.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use scenecut_analysis::HsvContentDetector;
use scenecut_core::{FrameBuffer, Result, SceneCutError, Settings};
use scenecut_media::{
    FrameSource, FrameSourceOpener, InMemoryFrameSource, InMemoryOpener, StreamCopy, VideoFrame,
};
use scenecut_pipeline::{InMemorySessionStore, SceneCutService};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const FPS: f64 = 30.0;

/// Frames of `(count, rgb)` runs, each frame 64×48.
pub fn scenes(runs: &[(usize, [u8; 3])]) -> Vec<FrameBuffer> {
    runs.iter()
        .flat_map(|&(count, rgb)| std::iter::repeat(FrameBuffer::filled(64, 48, rgb)).take(count))
        .collect()
}

/// 10 s at 30 fps with hard changes at 3.0 s and 7.0 s.
pub fn ten_second_recording() -> Vec<FrameBuffer> {
    scenes(&[(90, [10, 10, 10]), (120, [220, 220, 220]), (90, [40, 90, 160])])
}

/// Records every extraction and writes a small placeholder file.
#[derive(Default)]
pub struct RecordingCopy {
    pub calls: Mutex<Vec<(f64, f64, PathBuf)>>,
    /// Start times (whole seconds) that fail.
    pub fail_at: Vec<u64>,
}

impl StreamCopy for RecordingCopy {
    fn extract(&self, _input: &Path, start: f64, duration: f64, output: &Path) -> Result<()> {
        self.calls.lock().push((start, duration, output.to_path_buf()));
        if self.fail_at.contains(&(start as u64)) {
            return Err(SceneCutError::Extraction(format!("copy failed at {start}")));
        }
        std::fs::write(output, b"mp4")?;
        Ok(())
    }
}

/// Both ends of a pause point inside a frame source.
pub struct Gate {
    /// Receives once the source reaches the gated frame.
    pub reached: Receiver<()>,
    /// Send to let the source continue.
    pub release: Sender<()>,
}

/// Pause point shared by a [`ScriptedSource`] and its test.
struct GateEnds {
    frame: u64,
    reached: Sender<()>,
    release: Receiver<()>,
}

/// Wraps a source to pause at one frame or fail decoding at another.
pub struct ScriptedSource {
    inner: Box<dyn FrameSource>,
    gate: Option<GateEnds>,
    fail_at: Option<u64>,
}

impl ScriptedSource {
    /// In-memory source whose sequential reads fail from `frame` on.
    pub fn failing_at(frames: Vec<FrameBuffer>, frame: u64) -> Self {
        Self {
            inner: Box::new(InMemoryFrameSource::new(frames, FPS)),
            gate: None,
            fail_at: Some(frame),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn frame_rate(&self) -> f64 {
        self.inner.frame_rate()
    }

    fn frame_count(&self) -> u64 {
        self.inner.frame_count()
    }

    fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    fn position(&self) -> u64 {
        self.inner.position()
    }

    fn read_next(&mut self) -> Result<Option<VideoFrame>> {
        let position = self.inner.position();
        if let Some(gate) = self.gate.as_ref().filter(|g| g.frame == position) {
            let _ = gate.reached.send(());
            let _ = gate.release.recv();
        }
        if self.fail_at.is_some_and(|f| position >= f) {
            return Err(SceneCutError::Decode(format!(
                "corrupt packet at frame {position}"
            )));
        }
        self.inner.read_next()
    }

    fn seek_and_read(&mut self, frame_number: u64) -> Result<Option<FrameBuffer>> {
        self.inner.seek_and_read(frame_number)
    }
}

struct ScriptedOpener {
    inner: InMemoryOpener,
    gate: Option<(u64, Sender<()>, Receiver<()>)>,
    fail_at: Option<u64>,
}

impl FrameSourceOpener for ScriptedOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(ScriptedSource {
            inner: self.inner.open(path)?,
            gate: self.gate.as_ref().map(|(frame, reached, release)| GateEnds {
                frame: *frame,
                reached: reached.clone(),
                release: release.clone(),
            }),
            fail_at: self.fail_at,
        }))
    }
}

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub video: PathBuf,
    pub service: SceneCutService,
    pub copier: Option<Arc<RecordingCopy>>,
    pub gate: Option<Gate>,
}

impl Harness {
    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("download")
    }

    /// Files in the output directory with the given extension.
    pub fn outputs_with_extension(&self, ext: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.output_dir())
            .map(|entries| {
                entries
                    .flatten()
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .filter(|n| n.ends_with(ext))
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

pub struct HarnessBuilder {
    frames: Vec<FrameBuffer>,
    gate_frame: Option<u64>,
    fail_at: Option<u64>,
    copier: Option<RecordingCopy>,
    filename: &'static str,
}

impl HarnessBuilder {
    pub fn new(frames: Vec<FrameBuffer>) -> Self {
        Self {
            frames,
            gate_frame: None,
            fail_at: None,
            copier: Some(RecordingCopy::default()),
            filename: "recording.mp4",
        }
    }

    /// Pause the sequential scan before reading `frame`.
    pub fn gated_at(mut self, frame: u64) -> Self {
        self.gate_frame = Some(frame);
        self
    }

    /// Make sequential decoding fail from `frame` on.
    pub fn decode_error_at(mut self, frame: u64) -> Self {
        self.fail_at = Some(frame);
        self
    }

    pub fn without_ffmpeg(mut self) -> Self {
        self.copier = None;
        self
    }

    pub fn failing_at(mut self, starts: Vec<u64>) -> Self {
        self.copier = Some(RecordingCopy {
            fail_at: starts,
            ..Default::default()
        });
        self
    }

    pub fn filename(mut self, name: &'static str) -> Self {
        self.filename = name;
        self
    }

    pub fn build(self) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join(self.filename);
        std::fs::write(&video, b"not really a video").unwrap();

        let mut opener = InMemoryOpener::new();
        opener.insert(video.clone(), self.frames, FPS);

        let (gate_ends, gate) = match self.gate_frame {
            Some(frame) => {
                let (reached_tx, reached_rx) = bounded(1);
                let (release_tx, release_rx) = bounded(1);
                let gate = Gate {
                    reached: reached_rx,
                    release: release_tx,
                };
                (Some((frame, reached_tx, release_rx)), Some(gate))
            }
            None => (None, None),
        };
        let opener = ScriptedOpener {
            inner: opener,
            gate: gate_ends,
            fail_at: self.fail_at,
        };

        let settings = Settings {
            output_dir: dir.path().join("download"),
            extraction_concurrency: 2,
            ..Settings::default()
        };

        let copier = self.copier.map(Arc::new);
        let service = SceneCutService::new(
            settings,
            Arc::new(InMemorySessionStore::new()),
            Arc::new(opener),
            Arc::new(HsvContentDetector::default()),
            copier.clone().map(|c| c as Arc<dyn StreamCopy>),
        )
        .unwrap();

        Harness {
            dir,
            video,
            service,
            copier,
            gate,
        }
    }
}
