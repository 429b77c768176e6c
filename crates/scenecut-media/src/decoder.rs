//! Video decoder using FFmpeg via ffmpeg-sidecar.
//!
//! ffmpeg runs as a subprocess writing `rgb24` rawvideo to stdout. A reader
//! thread slices the pipe into frames and hands them over a bounded channel
//! so every read can be bounded by a timeout.

use crate::locator::ToolLocator;
use crate::probe::StreamProbe;
use crate::process;
use crate::source::{FrameSource, FrameSourceOpener, VideoFrame};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use scenecut_core::{FrameBuffer, Result, SceneCutError, Settings};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Frames buffered between the reader thread and the consumer.
const FRAME_QUEUE_DEPTH: usize = 4;

/// A running ffmpeg decode positioned at `next_frame`.
struct DecodeStream {
    child: FfmpegChild,
    frames: Receiver<std::io::Result<Vec<u8>>>,
    stderr: Option<JoinHandle<String>>,
    next_frame: u64,
}

impl DecodeStream {
    /// Reap ffmpeg once its stdout has closed. A non-zero exit means the
    /// stream was cut short, not that the video ended.
    fn finish(&mut self, timeout: Duration) -> Result<()> {
        let status = process::wait_with_timeout(self.child.as_inner_mut(), timeout)?;
        if status.success() {
            return Ok(());
        }
        let log = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        Err(SceneCutError::Decode(format!(
            "ffmpeg exited with status {status} at frame {}: {}",
            self.next_frame,
            process::last_line(&log)
        )))
    }
}

impl Drop for DecodeStream {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Frame source decoding a file with an ffmpeg subprocess.
pub struct FfmpegFrameSource {
    ffmpeg: PathBuf,
    path: PathBuf,
    probe: StreamProbe,
    frame_timeout: Duration,
    position: u64,
    stream: Option<DecodeStream>,
}

impl FfmpegFrameSource {
    /// Open a video file for decoding.
    pub fn open(ffmpeg: &Path, ffprobe: &Path, path: &Path, frame_timeout: Duration) -> Result<Self> {
        info!("Opening video file: {}", path.display());
        let probe = StreamProbe::run(ffprobe, path)?;
        Ok(Self {
            ffmpeg: ffmpeg.to_path_buf(),
            path: path.to_path_buf(),
            probe,
            frame_timeout,
            position: 0,
            stream: None,
        })
    }

    /// Get the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream properties reported by ffprobe.
    pub fn probe(&self) -> &StreamProbe {
        &self.probe
    }

    fn frame_len(&self) -> usize {
        FrameBuffer::byte_len(self.probe.width, self.probe.height)
    }

    /// Start ffmpeg decoding from `start_frame`.
    fn spawn_stream(&self, start_frame: u64) -> Result<DecodeStream> {
        let mut cmd = FfmpegCommand::new_with_path(&self.ffmpeg);
        cmd.args(["-hide_banner", "-nostdin", "-loglevel", "error"]);
        if start_frame > 0 {
            let start_secs = self.timestamp_of(start_frame);
            cmd.args(["-ss".to_string(), format!("{start_secs:.6}")]);
        }
        cmd.input(self.path.as_os_str());
        cmd.args(["-an", "-sn", "-f", "rawvideo", "-pix_fmt", "rgb24"]);
        cmd.output("-");

        let mut child = cmd.spawn().map_err(|e| {
            SceneCutError::Decode(format!(
                "Failed to spawn ffmpeg ({}): {e}",
                self.ffmpeg.display()
            ))
        })?;

        let mut stdout = child
            .take_stdout()
            .ok_or_else(|| SceneCutError::Decode("Failed to open ffmpeg stdout".into()))?;
        let stderr = child.take_stderr().map(process::drain);

        let frame_len = self.frame_len();
        let (tx, rx) = bounded(FRAME_QUEUE_DEPTH);
        std::thread::spawn(move || loop {
            let mut buf = vec![0u8; frame_len];
            match stdout.read_exact(&mut buf) {
                Ok(()) => {
                    if tx.send(Ok(buf)).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        });

        debug!(path = %self.path.display(), start_frame, "Started decode stream");
        Ok(DecodeStream {
            child,
            frames: rx,
            stderr,
            next_frame: start_frame,
        })
    }

    /// Receive the next frame of the running stream, starting one at the
    /// cursor if needed.
    fn receive(&mut self) -> Result<Option<FrameBuffer>> {
        if self.stream.is_none() {
            self.stream = Some(self.spawn_stream(self.position)?);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };

        match stream.frames.recv_timeout(self.frame_timeout) {
            Ok(Ok(data)) => {
                stream.next_frame += 1;
                self.position += 1;
                FrameBuffer::from_raw(self.probe.width, self.probe.height, data).map(Some)
            }
            Ok(Err(e)) => {
                self.stream = None;
                Err(SceneCutError::Decode(format!(
                    "Failed to read frame {}: {e}",
                    self.position
                )))
            }
            Err(RecvTimeoutError::Disconnected) => {
                let finished = stream.finish(self.frame_timeout);
                self.stream = None;
                finished.map(|()| None)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    frame = self.position,
                    timeout_ms = self.frame_timeout.as_millis() as u64,
                    "Frame decode timed out, restarting decoder past it"
                );
                let frame = self.position;
                self.stream = None;
                self.position += 1;
                Err(SceneCutError::Timeout(format!("decoding frame {frame}")))
            }
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn frame_rate(&self) -> f64 {
        self.probe.frame_rate
    }

    fn frame_count(&self) -> u64 {
        self.probe.frame_count
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.probe.width, self.probe.height)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn read_next(&mut self) -> Result<Option<VideoFrame>> {
        let frame_number = self.position;
        Ok(self.receive()?.map(|buffer| VideoFrame {
            buffer,
            pts: self.timestamp_of(frame_number),
            frame_number,
        }))
    }

    fn seek_and_read(&mut self, frame_number: u64) -> Result<Option<FrameBuffer>> {
        let in_place = self
            .stream
            .as_ref()
            .is_some_and(|s| s.next_frame == frame_number);
        if !in_place {
            self.stream = None;
            self.position = frame_number;
            debug!(frame = frame_number, "Seeked");
        }
        self.receive()
    }
}

/// Opens [`FfmpegFrameSource`]s using located ffmpeg/ffprobe binaries.
#[derive(Debug, Clone)]
pub struct FfmpegOpener {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    frame_timeout: Duration,
}

impl FfmpegOpener {
    pub fn new(ffmpeg: PathBuf, ffprobe: PathBuf, frame_timeout: Duration) -> Self {
        Self {
            ffmpeg,
            ffprobe,
            frame_timeout,
        }
    }

    /// Locate both tools from settings. Decoding is impossible without them.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let ffmpeg = ToolLocator::ffmpeg(settings).resolve().ok_or_else(|| {
            SceneCutError::CapabilityUnavailable("ffmpeg not found for decoding".into())
        })?;
        let ffprobe = ToolLocator::ffprobe(settings).resolve().ok_or_else(|| {
            SceneCutError::CapabilityUnavailable("ffprobe not found for probing".into())
        })?;
        Ok(Self::new(ffmpeg, ffprobe, settings.frame_timeout()))
    }
}

impl FrameSourceOpener for FfmpegOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        let source = FfmpegFrameSource::open(&self.ffmpeg, &self.ffprobe, path, self.frame_timeout)?;
        Ok(Box::new(source))
    }
}
