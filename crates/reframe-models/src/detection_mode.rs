//! Detection mode definitions for subject tracking.
//!
//! The detection mode controls how many source frames are skipped between
//! two detector invocations:
//!
//! - `Fast`: every 10th frame
//! - `Balanced`: every 5th frame
//! - `Accurate`: every frame

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Detection mode for subject tracking.
///
/// Lower strides give tighter tracking at the cost of more detector calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Detect on every 10th frame.
    Fast,

    /// Detect on every 5th frame.
    #[default]
    Balanced,

    /// Detect on every frame.
    Accurate,
}

impl DetectionMode {
    /// Returns the mode name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMode::Fast => "fast",
            DetectionMode::Balanced => "balanced",
            DetectionMode::Accurate => "accurate",
        }
    }

    /// Number of source frames advanced between detection samples.
    pub fn frame_skip(&self) -> usize {
        match self {
            DetectionMode::Fast => 10,
            DetectionMode::Balanced => 5,
            DetectionMode::Accurate => 1,
        }
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DetectionMode {
    type Err = DetectionModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" => Ok(DetectionMode::Fast),
            "balanced" | "default" => Ok(DetectionMode::Balanced),
            "accurate" | "precise" => Ok(DetectionMode::Accurate),
            _ => Err(DetectionModeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown detection mode: {0}")]
pub struct DetectionModeParseError(String);
