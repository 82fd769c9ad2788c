//! Configuration for the subject tracking pipeline.

use reframe_models::DetectionMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default location of the face detection model.
pub const DEFAULT_FACE_MODEL_PATH: &str = "models/face_detection/version-RFB-320.onnx";

/// Default location of the generic object detection model.
pub const DEFAULT_OBJECT_MODEL_PATH: &str = "models/object_detection/yolov8n.onnx";

/// Configuration for the subject tracking pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    // === Sampling ===
    /// Detection mode controlling the sampling stride (default: balanced)
    pub detection_mode: DetectionMode,

    // === Smoothing ===
    /// EMA weight of the previous center, in [0, 1] (default: 0.7)
    pub smoothing: f64,

    // === Face Backend ===
    /// Path to the face detection ONNX model
    pub face_model_path: PathBuf,

    /// Minimum confidence for face detections (default: 0.6)
    pub face_confidence_threshold: f32,

    // === Object Backend ===
    /// Path to the YOLOv8 ONNX model; the backend is skipped if absent
    pub object_model_path: PathBuf,

    /// Minimum confidence for object detections (default: 0.25)
    pub object_confidence_threshold: f32,

    /// IoU threshold for non-maximum suppression (default: 0.45)
    pub nms_threshold: f32,

    // === Saliency Fallback ===
    /// Grid cells per axis for the saliency fallback (default: 4)
    pub saliency_grid: u32,

    // === Rendering ===
    /// FFmpeg x264 preset for rendering (default: "fast")
    pub render_preset: String,

    /// FFmpeg CRF quality (default: 23)
    pub render_crf: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            detection_mode: DetectionMode::Balanced,
            smoothing: 0.7,

            face_model_path: PathBuf::from(DEFAULT_FACE_MODEL_PATH),
            face_confidence_threshold: 0.6,

            object_model_path: PathBuf::from(DEFAULT_OBJECT_MODEL_PATH),
            object_confidence_threshold: 0.25,
            nms_threshold: 0.45,

            saliency_grid: 4,

            render_preset: "fast".to_string(),
            render_crf: 23,
        }
    }
}

impl TrackingConfig {
    /// Fast configuration for quick previews.
    pub fn fast() -> Self {
        Self {
            detection_mode: DetectionMode::Fast,
            render_preset: "ultrafast".to_string(),
            ..Default::default()
        }
    }

    /// Accurate configuration for final output.
    pub fn accurate() -> Self {
        Self {
            detection_mode: DetectionMode::Accurate,
            render_preset: "slow".to_string(),
            render_crf: 18,
            ..Default::default()
        }
    }

    /// Source frames advanced between detection samples.
    pub fn frame_skip(&self) -> usize {
        self.detection_mode.frame_skip()
    }
}
