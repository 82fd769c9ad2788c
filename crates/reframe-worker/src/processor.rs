//! Video processing: open, track, render.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use metrics::counter;
use reframe_media::{FfmpegFrameSink, FfmpegFrameSource, FrameSource, SubjectDetector, SubjectTracker};
use tokio::sync::watch;
use tracing::{debug, Instrument};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::VideoLogger;

/// Output file for `input`: `<output_dir>/<stem>_reframed.mp4`.
pub fn output_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    output_dir.join(format!("{}_reframed.mp4", file_stem(input)))
}

/// Output files for a batch, one per input and pairwise distinct.
///
/// Inputs sharing a stem get `<stem>_reframed_<n>.mp4` from the second
/// occurrence on, so concurrent encoders never write the same file.
pub fn output_paths_for(inputs: &[PathBuf], output_dir: &Path) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let mut output = output_path_for(input, output_dir);
            let mut n = 2;
            while taken.contains(&output) {
                output = output_dir.join(format!("{}_reframed_{}.mp4", file_stem(input), n));
                n += 1;
            }
            taken.insert(output.clone());
            output
        })
        .collect()
}

fn file_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

/// Processes videos against one shared detector.
pub struct VideoProcessor {
    config: WorkerConfig,
    tracker: SubjectTracker,
}

impl VideoProcessor {
    pub fn new(config: WorkerConfig, detector: Arc<SubjectDetector>) -> Self {
        let tracker = SubjectTracker::new(config.tracking_config(), detector);
        Self { config, tracker }
    }

    /// Stop in-flight runs once the channel reads `true`.
    pub fn with_cancel(self, cancel_rx: watch::Receiver<bool>) -> Self {
        Self {
            config: self.config,
            tracker: self.tracker.with_cancel(cancel_rx),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Process every input, at most `max_concurrent_jobs` at a time.
    ///
    /// Results come back in completion order.
    pub async fn process_all(&self, inputs: Vec<PathBuf>) -> Vec<(PathBuf, WorkerResult<PathBuf>)> {
        let outputs = output_paths_for(&inputs, &self.config.output_dir);
        stream::iter(inputs.into_iter().zip(outputs))
            .map(|(input, output)| async move {
                let result = self.process_to(&input, &output).await;
                (input, result)
            })
            .buffer_unordered(self.config.max_concurrent_jobs.max(1))
            .collect()
            .await
    }

    /// Smart-crop one video into `<stem>_reframed.mp4`.
    pub async fn process(&self, input: &Path) -> WorkerResult<PathBuf> {
        let output = output_path_for(input, &self.config.output_dir);
        self.process_to(input, &output).await
    }

    /// Smart-crop one video into `output`. A failed run leaves no output file behind.
    async fn process_to(&self, input: &Path, output: &Path) -> WorkerResult<PathBuf> {
        let logger = VideoLogger::new(input);
        let span = logger.create_span();

        async {
            logger.log_start(&format!(
                "target={} track={}",
                self.config.target, self.config.track
            ));

            let result = self.render(input, output).await;

            match &result {
                Ok(path) => {
                    counter!("reframe_videos_total", "status" => "success").increment(1);
                    logger.log_completion(&path.display().to_string());
                }
                Err(e) => {
                    let status = if e.is_cancelled() { "cancelled" } else { "failed" };
                    counter!("reframe_videos_total", "status" => status).increment(1);
                    if e.is_cancelled() {
                        logger.log_warning("cancelled");
                    } else {
                        logger.log_error(&e.to_string());
                    }
                    if tokio::fs::remove_file(output).await.is_ok() {
                        debug!(output = %output.display(), "Removed partial output");
                    }
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn render(&self, input: &Path, output: &Path) -> WorkerResult<PathBuf> {
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let mut source = FfmpegFrameSource::open(input).await?;
        let tracking = self.tracker.config();
        let target = self.config.target;
        if target.width == 0 || target.height == 0 {
            return Err(WorkerError::config_error(format!("invalid target {}", target)));
        }

        let mut sink = FfmpegFrameSink::create(
            output,
            target.width,
            target.height,
            source.info().fps,
            &tracking.render_preset,
            tracking.render_crf,
        )?;

        let path = self
            .tracker
            .apply_smart_crop(&mut source, &mut sink, target, self.config.track)
            .await?;
        Ok(path)
    }
}
