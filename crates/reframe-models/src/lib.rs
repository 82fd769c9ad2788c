//! Shared data models for the reframe workspace.
//!
//! This crate provides Serde-serializable types for:
//! - Detection modes (sampling stride)
//! - Target aspect ratios and output resolutions

pub mod aspect;
pub mod detection_mode;

// Re-export common types
pub use aspect::{AspectRatio, AspectRatioParseError, TargetResolution};
pub use detection_mode::{DetectionMode, DetectionModeParseError};
