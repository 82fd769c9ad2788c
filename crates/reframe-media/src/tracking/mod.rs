//! Subject tracking and smart cropping.
//!
//! Keeps the most relevant subject of a video inside a crop of a different
//! aspect ratio:
//! 1. Sample frames at the detection-mode stride
//! 2. Run the detector chain (face, object, saliency) on each sample
//! 3. Select the primary subject by priority, then area
//! 4. Smooth the subject center with an exponential moving average
//! 5. Interpolate centers to every output frame
//! 6. Compute crop windows and render them at the target resolution
//!
//! # Architecture
//!
//! ```text
//! FrameSource
//!     │
//!     ▼
//! ┌─────────────────┐
//! │     Sampler     │ ← t_k = k * frame_skip / fps
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ SubjectDetector │ ← face → object → saliency
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │    Selector     │ ← (priority asc, area desc)
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │    Smoother     │ ← EMA fold, per run
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │  Interpolator   │ ← one center per frame
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │  Crop Planner   │ ← in-bounds window, target ratio
//! └────────┬────────┘
//!          ▼
//!      FrameSink
//! ```

pub mod config;
pub mod crop_planner;
pub mod interpolator;
pub mod models;
pub mod renderer;
pub mod sampler;
pub mod selector;
pub mod smoother;

#[cfg(test)]
mod tests;

pub use config::TrackingConfig;
pub use crop_planner::{is_static_crop, CropPlanner};
pub use models::*;
pub use selector::select_primary;
pub use smoother::SmoothingState;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use image::RgbImage;
use metrics::{counter, histogram};
use reframe_models::{AspectRatio, TargetResolution};
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::detection::SubjectDetector;
use crate::error::{MediaError, MediaResult};
use crate::frame::{FrameSink, FrameSource};
use crate::probe::VideoInfo;

/// Tracks the primary subject of a video and renders the smart crop.
///
/// The detector is shared; every call owns its own smoothing state, so one
/// tracker may serve concurrent runs.
pub struct SubjectTracker {
    config: TrackingConfig,
    detector: Arc<SubjectDetector>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl SubjectTracker {
    pub fn new(config: TrackingConfig, detector: Arc<SubjectDetector>) -> Self {
        Self {
            config,
            detector,
            cancel_rx: None,
        }
    }

    /// Abort between sampled frames once the channel reads `true`.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Compute one crop center per frame of `source`.
    ///
    /// Fails with [`MediaError::VideoUnreadable`] when the stream metadata is
    /// unusable and with [`MediaError::Cancelled`] on cancellation. Per-frame
    /// read and detection failures are absorbed.
    pub async fn track_subject<S>(
        &self,
        source: &mut S,
        target: &AspectRatio,
        smoothing: f64,
    ) -> MediaResult<CropCenters>
    where
        S: FrameSource + ?Sized,
    {
        let span = info_span!("track_subject", run_id = %Uuid::new_v4());
        self.track_centers(source, target, smoothing)
            .instrument(span)
            .await
    }

    /// Track (or detect once at the midpoint) and write the cropped frames to `sink`.
    ///
    /// Returns the sink's output path.
    pub async fn apply_smart_crop<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
        target_size: TargetResolution,
        track: bool,
    ) -> MediaResult<PathBuf>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let span = info_span!("apply_smart_crop", run_id = %Uuid::new_v4(), track);
        async move {
            if target_size.width == 0 || target_size.height == 0 {
                return Err(MediaError::render(
                    format!("invalid target resolution {}", target_size),
                    None,
                    None,
                ));
            }
            let aspect = target_size.aspect_ratio();

            let centers = if track {
                self.track_centers(source, &aspect, self.config.smoothing).await?
            } else {
                self.midpoint_centers(source).await?
            };

            self.render(source, sink, &centers, target_size, &aspect).await
        }
        .instrument(span)
        .await
    }

    async fn track_centers<S>(
        &self,
        source: &mut S,
        target: &AspectRatio,
        smoothing: f64,
    ) -> MediaResult<CropCenters>
    where
        S: FrameSource + ?Sized,
    {
        let start = Instant::now();
        let info = readable_info(source)?;
        let smoothing = smoother::sanitize_smoothing(smoothing);
        let frame_skip = self.config.frame_skip();
        let total_frames = info.frame_count();
        let samples = sampler::sample_instants(info.duration, info.fps, frame_skip);

        info!(
            frames = total_frames,
            samples = samples.len(),
            mode = %self.config.detection_mode,
            target = %target,
            smoothing,
            "Tracking subject"
        );

        let mut state = SmoothingState::initial();
        let mut smoothed = Vec::with_capacity(samples.len());

        for sample in &samples {
            self.check_cancelled()?;
            counter!("reframe_samples_total").increment(1);

            let raw = match source.get_frame(sample.time).await {
                Ok(frame) => self.primary_center(frame, sample.frame_index).await,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(
                        frame_index = sample.frame_index,
                        error = %e,
                        "Frame read failed, keeping previous center"
                    );
                    counter!("reframe_frame_read_failures_total").increment(1);
                    None
                }
            };

            state = smoother::smooth_step(state, raw, smoothing);
            smoothed.push(state.center());
        }

        let centers = interpolator::interpolate_centers(&smoothed, frame_skip, total_frames);

        let elapsed = start.elapsed();
        histogram!("reframe_track_duration_seconds").record(elapsed.as_secs_f64());
        info!(
            frames = centers.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Tracking complete"
        );

        Ok(CropCenters::new(centers))
    }

    /// Single detection at the midpoint, repeated for every frame.
    async fn midpoint_centers<S>(&self, source: &mut S) -> MediaResult<CropCenters>
    where
        S: FrameSource + ?Sized,
    {
        let info = readable_info(source)?;
        self.check_cancelled()?;

        let midpoint = info.duration / 2.0;
        let center = match source.get_frame(midpoint).await {
            Ok(frame) => {
                let index = (midpoint * info.fps).round() as usize;
                self.primary_center(frame, index).await
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Midpoint frame unreadable, using frame center");
                counter!("reframe_frame_read_failures_total").increment(1);
                None
            }
        }
        .unwrap_or(NormalizedPoint::CENTER);

        info!(cx = center.x, cy = center.y, "Using static crop center");
        Ok(CropCenters::constant(center, info.frame_count()))
    }

    /// Run the detector chain off the async runtime and select the primary subject.
    async fn primary_center(&self, frame: RgbImage, frame_index: usize) -> Option<NormalizedPoint> {
        let detector = Arc::clone(&self.detector);
        let result = tokio::task::spawn_blocking(move || {
            let detections = detector.detect(&frame);
            select_primary(&detections)
        })
        .await;

        match result {
            Ok(primary) => {
                debug!(
                    frame_index,
                    class = primary.class_name(),
                    priority = primary.priority(),
                    cx = primary.center().x,
                    cy = primary.center().y,
                    "Primary subject"
                );
                Some(primary.center())
            }
            Err(e) => {
                warn!(frame_index, error = %e, "Detection task failed, keeping previous center");
                None
            }
        }
    }

    async fn render<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
        centers: &CropCenters,
        target_size: TargetResolution,
        aspect: &AspectRatio,
    ) -> MediaResult<PathBuf>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let info = source.info().clone();
        let windows =
            CropPlanner::new(info.width, info.height).compute_crop_windows(centers, aspect);

        info!(
            frames = windows.len(),
            target = %target_size,
            static_crop = is_static_crop(&windows),
            "Rendering smart crop"
        );

        let mut previous: Option<RgbImage> = None;
        for (index, window) in windows.iter().enumerate() {
            self.check_cancelled()?;

            let time = index as f64 / info.fps;
            let output = match source.get_frame(time).await {
                Ok(frame) => renderer::render_frame(&frame, window, target_size),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(frame_index = index, error = %e, "Frame read failed, repeating previous output");
                    counter!("reframe_frame_read_failures_total").increment(1);
                    previous
                        .take()
                        .unwrap_or_else(|| renderer::blank_frame(target_size))
                }
            };

            sink.write_frame(&output).await?;
            previous = Some(output);
        }

        let path = sink.finish().await?;
        info!(output = %path.display(), "Smart crop written");
        Ok(path)
    }

    fn check_cancelled(&self) -> MediaResult<()> {
        match &self.cancel_rx {
            Some(rx) if *rx.borrow() => {
                info!("Tracking cancelled");
                Err(MediaError::Cancelled)
            }
            _ => Ok(()),
        }
    }
}

/// Stream info, rejected when it cannot be sampled.
fn readable_info<S>(source: &S) -> MediaResult<VideoInfo>
where
    S: FrameSource + ?Sized,
{
    let info = source.info().clone();
    if !info.is_readable() {
        let path = source
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("<memory>"));
        return Err(MediaError::video_unreadable(
            path,
            format!("unusable stream: fps={} duration={}", info.fps, info.duration),
        ));
    }
    Ok(info)
}
