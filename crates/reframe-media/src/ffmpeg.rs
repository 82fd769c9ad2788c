//! FFmpeg-backed frame source and sink.
//!
//! Frames cross the process boundary as packed `rgb24` rawvideo on
//! stdout/stdin.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use image::RgbImage;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::frame::{FrameSink, FrameSource};
use crate::probe::{probe_video, VideoInfo};

/// Reads single frames from a video file by seeking with FFmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegFrameSource {
    path: PathBuf,
    info: VideoInfo,
}

impl FfmpegFrameSource {
    /// Open a video file. Every failure is reported as [`MediaError::VideoUnreadable`].
    pub async fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let info = probe_video(path).await.map_err(|e| match e {
            e @ MediaError::VideoUnreadable { .. } => e,
            other => MediaError::video_unreadable(path, other.to_string()),
        })?;

        which::which("ffmpeg")
            .map_err(|_| MediaError::video_unreadable(path, "ffmpeg not found in PATH"))?;

        debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            fps = info.fps,
            duration = info.duration,
            "Opened video"
        );

        Ok(Self {
            path: path.to_path_buf(),
            info,
        })
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    async fn get_frame(&mut self, time: f64) -> MediaResult<RgbImage> {
        let (width, height) = (self.info.width, self.info.height);

        let output = Command::new("ffmpeg")
            .args(["-hide_banner", "-v", "error", "-ss"])
            .arg(format!("{:.3}", time.max(0.0)))
            .arg("-i")
            .arg(&self.path)
            .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MediaError::frame_read(time, format!("failed to run ffmpeg: {}", e)))?;

        if !output.status.success() {
            return Err(MediaError::frame_read(
                time,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let expected = width as usize * height as usize * 3;
        if output.stdout.len() < expected {
            return Err(MediaError::frame_read(
                time,
                format!("short frame: {} of {} bytes", output.stdout.len(), expected),
            ));
        }

        let mut data = output.stdout;
        data.truncate(expected);
        RgbImage::from_raw(width, height, data)
            .ok_or_else(|| MediaError::frame_read(time, "frame buffer does not match dimensions"))
    }
}

/// Encodes frames to H.264 through an FFmpeg child process.
pub struct FfmpegFrameSink {
    output: PathBuf,
    width: u32,
    height: u32,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_task: Option<JoinHandle<String>>,
    frames_written: u64,
}

impl FfmpegFrameSink {
    /// Start an encoder for `width x height` frames at `fps`.
    pub fn create(
        output: impl AsRef<Path>,
        width: u32,
        height: u32,
        fps: f64,
        preset: &str,
        crf: u32,
    ) -> MediaResult<Self> {
        let output = output.as_ref().to_path_buf();
        if width == 0 || height == 0 {
            return Err(MediaError::render(
                format!("invalid output size {}x{}", width, height),
                None,
                None,
            ));
        }

        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 30.0 };
        let mut child = Command::new("ffmpeg")
            .args(["-y", "-hide_banner", "-v", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .arg("-s")
            .arg(format!("{}x{}", width, height))
            .arg("-r")
            .arg(format!("{}", fps))
            .args(["-i", "-"])
            // yuv420p needs even dimensions
            .args(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"])
            .args(["-c:v", "libx264", "-preset", preset])
            .arg("-crf")
            .arg(crf.to_string())
            .args(["-pix_fmt", "yuv420p", "-movflags", "+faststart"])
            .arg(&output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::render(format!("failed to start ffmpeg: {}", e), None, None))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::render("failed to capture ffmpeg stdin", None, None))?;
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        info!(
            output = %output.display(),
            size = %format!("{}x{}", width, height),
            fps,
            preset,
            crf,
            "Started encoder"
        );

        Ok(Self {
            output,
            width,
            height,
            child: Some(child),
            stdin: Some(stdin),
            stderr_task,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    async fn collect_stderr(&mut self) -> Option<String> {
        match self.stderr_task.take() {
            Some(task) => task.await.ok().filter(|s| !s.trim().is_empty()),
            None => None,
        }
    }
}

#[async_trait]
impl FrameSink for FfmpegFrameSink {
    async fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(MediaError::render(
                format!(
                    "frame is {}x{}, encoder expects {}x{}",
                    frame.width(),
                    frame.height(),
                    self.width,
                    self.height
                ),
                None,
                None,
            ));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(MediaError::render("encoder already finished", None, None));
        };

        if let Err(e) = stdin.write_all(frame.as_raw()).await {
            let stderr = self.collect_stderr().await;
            return Err(MediaError::render(format!("failed to write frame: {}", e), stderr, None));
        }
        self.frames_written += 1;
        Ok(())
    }

    async fn finish(&mut self) -> MediaResult<PathBuf> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin
                .shutdown()
                .await
                .map_err(|e| MediaError::render(format!("failed to close encoder input: {}", e), None, None))?;
        }

        let Some(mut child) = self.child.take() else {
            return Ok(self.output.clone());
        };

        let status = child
            .wait()
            .await
            .map_err(|e| MediaError::render(format!("failed to wait for ffmpeg: {}", e), None, None))?;
        let stderr = self.collect_stderr().await;

        if !status.success() {
            return Err(MediaError::render("ffmpeg encoder failed", stderr, status.code()));
        }

        debug!(
            output = %self.output.display(),
            frames = self.frames_written,
            "Encoder finished"
        );
        Ok(self.output.clone())
    }
}
