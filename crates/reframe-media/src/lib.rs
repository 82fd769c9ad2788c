#![deny(unreachable_patterns)]
//! Subject-tracking smart crop engine.
//!
//! This crate provides:
//! - A layered subject detector (face model, object model, saliency fallback)
//! - Primary subject selection, trajectory smoothing and per-frame interpolation
//! - Crop windows that keep a target aspect ratio inside the source frame
//! - Frame source/sink traits with FFmpeg and in-memory implementations
//! - Cancellation support via tokio

pub mod detection;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod probe;
pub mod tracking;

pub use detection::{BackendAvailability, Detector, SubjectDetector};
pub use error::{MediaError, MediaResult};
pub use ffmpeg::{FfmpegFrameSink, FfmpegFrameSource};
pub use frame::{FrameSink, FrameSource, InMemoryFrameSink, InMemoryFrameSource};
pub use probe::{probe_video, VideoInfo};
pub use tracking::{
    CropCenters, CropPlanner, CropWindow, Detection, NormalizedPoint, SubjectTracker,
    TrackingConfig,
};

pub use reframe_models::{AspectRatio, DetectionMode, TargetResolution};
