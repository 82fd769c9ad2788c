//! Frame source and sink interfaces.
//!
//! Tracking reads frames through [`FrameSource`] and rendering writes them
//! through [`FrameSink`]. FFmpeg-backed implementations live in
//! [`crate::ffmpeg`]; the in-memory ones here serve tests and callers that
//! already hold decoded frames.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::RgbImage;

use crate::error::{MediaError, MediaResult};
use crate::probe::VideoInfo;

/// Random-access reader of decoded RGB frames.
#[async_trait]
pub trait FrameSource: Send {
    /// Stream geometry, rate and duration.
    fn info(&self) -> &VideoInfo;

    /// File backing the source, if any.
    fn path(&self) -> Option<&Path> {
        None
    }

    /// Frame displayed at `time` seconds.
    async fn get_frame(&mut self, time: f64) -> MediaResult<RgbImage>;
}

/// Sequential writer of encoded output frames.
#[async_trait]
pub trait FrameSink: Send {
    /// Append one frame.
    async fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()>;

    /// Flush and close the output, returning its path.
    async fn finish(&mut self) -> MediaResult<PathBuf>;
}

/// Frames held in memory, indexed by `round(time * fps)`.
#[derive(Debug, Clone)]
pub struct InMemoryFrameSource {
    info: VideoInfo,
    frames: Vec<RgbImage>,
    unreadable: HashSet<usize>,
}

impl InMemoryFrameSource {
    /// Build a source over `frames` at `fps`. Dimensions come from the first frame.
    pub fn new(frames: Vec<RgbImage>, fps: f64) -> Self {
        let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        let duration = if fps > 0.0 { frames.len() as f64 / fps } else { 0.0 };
        Self {
            info: VideoInfo::new(width, height, fps, duration),
            frames,
            unreadable: HashSet::new(),
        }
    }

    /// Make reads of the given frame index fail.
    pub fn with_unreadable_frame(mut self, index: usize) -> Self {
        self.unreadable.insert(index);
        self
    }

    /// Override the reported stream info.
    pub fn with_info(mut self, info: VideoInfo) -> Self {
        self.info = info;
        self
    }

    fn index_at(&self, time: f64) -> Option<usize> {
        if !(time.is_finite() && time >= 0.0) || self.frames.is_empty() {
            return None;
        }
        let index = (time * self.info.fps).round() as usize;
        Some(index.min(self.frames.len() - 1))
    }
}

#[async_trait]
impl FrameSource for InMemoryFrameSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    async fn get_frame(&mut self, time: f64) -> MediaResult<RgbImage> {
        let index = self
            .index_at(time)
            .ok_or_else(|| MediaError::frame_read(time, "no frame at this time"))?;
        if self.unreadable.contains(&index) {
            return Err(MediaError::frame_read(time, format!("frame {} is unreadable", index)));
        }
        Ok(self.frames[index].clone())
    }
}

/// Sink that keeps every written frame.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFrameSink {
    path: PathBuf,
    frames: Vec<RgbImage>,
    finished: bool,
}

impl InMemoryFrameSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frames: Vec::new(),
            finished: false,
        }
    }

    pub fn frames(&self) -> &[RgbImage] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[async_trait]
impl FrameSink for InMemoryFrameSink {
    async fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()> {
        if self.finished {
            return Err(MediaError::render("sink already finished", None, None));
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    async fn finish(&mut self) -> MediaResult<PathBuf> {
        self.finished = true;
        Ok(self.path.clone())
    }
}
