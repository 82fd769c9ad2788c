//! Structured per-video logging.

use std::path::Path;

use tracing::{error, info, warn, Span};
use uuid::Uuid;

/// Logger carrying the run id and input of one video.
#[derive(Debug, Clone)]
pub struct VideoLogger {
    run_id: String,
    input: String,
}

impl VideoLogger {
    /// Logger with a fresh run id.
    pub fn new(input: &Path) -> Self {
        Self::with_run_id(&Uuid::new_v4().to_string(), input)
    }

    pub fn with_run_id(run_id: &str, input: &Path) -> Self {
        Self {
            run_id: run_id.to_string(),
            input: input.display().to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(run_id = %self.run_id, input = %self.input, "Video started: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(run_id = %self.run_id, input = %self.input, "Video warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(run_id = %self.run_id, input = %self.input, "Video failed: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(run_id = %self.run_id, input = %self.input, "Video completed: {}", message);
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Span tying all events of this video together.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("video", run_id = %self.run_id, input = %self.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_from_run_id() {
        let logger = VideoLogger::with_run_id("run-123", Path::new("/videos/a.mp4"));
        assert_eq!(logger.run_id(), "run-123");
        assert_eq!(logger.input(), "/videos/a.mp4");
    }

    #[test]
    fn test_fresh_run_ids_differ() {
        let a = VideoLogger::new(Path::new("a.mp4"));
        let b = VideoLogger::new(Path::new("a.mp4"));
        assert_ne!(a.run_id(), b.run_id());
    }
}
