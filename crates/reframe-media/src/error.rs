//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during subject tracking and rendering.
///
/// Only `VideoUnreadable`, `Render` and `Cancelled` ever escape a tracking
/// run. The remaining variants are produced at component boundaries and are
/// handled there with a defined fallback.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Video unreadable: {path}: {message}")]
    VideoUnreadable { path: PathBuf, message: String },

    #[error("Detector backend '{backend}' unavailable: {message}")]
    DetectorBackendUnavailable {
        backend: &'static str,
        message: String,
    },

    #[error("Detection failed in '{backend}': {message}")]
    DetectionFailed {
        backend: &'static str,
        message: String,
    },

    #[error("Failed to read frame at {time:.3}s: {message}")]
    FrameRead { time: f64, message: String },

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Render failed: {message}")]
    Render {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Model not found: {0}")]
    ModelNotFound(String),
}

impl MediaError {
    /// Create an unreadable-video error.
    pub fn video_unreadable(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VideoUnreadable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a backend-unavailable error.
    pub fn backend_unavailable(backend: &'static str, message: impl Into<String>) -> Self {
        Self::DetectorBackendUnavailable {
            backend,
            message: message.into(),
        }
    }

    /// Create a detection failure error.
    pub fn detection_failed(backend: &'static str, message: impl Into<String>) -> Self {
        Self::DetectionFailed {
            backend,
            message: message.into(),
        }
    }

    /// Create a single-frame read error.
    pub fn frame_read(time: f64, message: impl Into<String>) -> Self {
        Self::FrameRead {
            time,
            message: message.into(),
        }
    }

    /// Create a render failure error.
    pub fn render(message: impl Into<String>, stderr: Option<String>, exit_code: Option<i32>) -> Self {
        Self::Render {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a model not found error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::ModelNotFound(path.into())
    }

    /// Whether this error aborts a whole tracking run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::VideoUnreadable { .. }
                | Self::Render { .. }
                | Self::Cancelled
                | Self::FfmpegNotFound
                | Self::FfprobeNotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(MediaError::video_unreadable("a.mp4", "no stream").is_fatal());
        assert!(MediaError::render("encoder died", None, Some(1)).is_fatal());
        assert!(MediaError::Cancelled.is_fatal());
        assert!(!MediaError::frame_read(1.0, "short read").is_fatal());
        assert!(!MediaError::backend_unavailable("object", "no weights").is_fatal());
        assert!(!MediaError::DegenerateGeometry("0x0".into()).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = MediaError::frame_read(2.5, "eof");
        assert_eq!(err.to_string(), "Failed to read frame at 2.500s: eof");
    }
}
