//! Object detection using YOLOv8 ONNX model.
//!
//! Provides the object stage of the subject chain with GPU acceleration support:
//! - CUDA on Linux with NVIDIA GPU
//! - CoreML on macOS with Apple Silicon
//! - CPU fallback on all platforms

use std::path::PathBuf;
use std::sync::Mutex;

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use super::session::{create_session, non_maximum_suppression, Candidate};
use super::Detector;
use crate::error::{MediaError, MediaResult};
use crate::tracking::config::TrackingConfig;
use crate::tracking::models::{BoundingBox, Detection};

const BACKEND: &str = "object";

/// COCO class names (80 classes).
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

const ANIMAL_CLASSES: &[&str] = &[
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe",
];

const MID_SIZE_CLASSES: &[&str] = &[
    "laptop", "cell phone", "tv", "book", "cup", "bottle", "chair", "couch", "teddy bear",
    "sports ball", "bicycle", "skateboard", "surfboard", "tennis racket", "car", "motorcycle",
];

/// Selection priority of a COCO class: person 2, animals 3, mid-size objects 4,
/// everything else 5.
pub fn class_priority(class_id: usize) -> u8 {
    let Some(name) = COCO_CLASSES.get(class_id) else {
        return 5;
    };
    match *name {
        "person" => 2,
        n if ANIMAL_CLASSES.contains(&n) => 3,
        n if MID_SIZE_CLASSES.contains(&n) => 4,
        _ => 5,
    }
}

/// Human-readable name of a COCO class.
pub fn class_name(class_id: usize) -> &'static str {
    COCO_CLASSES.get(class_id).copied().unwrap_or("object")
}

/// Configuration for object detection.
#[derive(Debug, Clone)]
pub struct ObjectDetectorConfig {
    /// Path to ONNX model file
    pub model_path: PathBuf,
    /// Confidence threshold for detections
    pub confidence_threshold: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Input image size (model expects square input)
    pub input_size: u32,
}

impl Default for ObjectDetectorConfig {
    fn default() -> Self {
        Self::from_tracking(&TrackingConfig::default())
    }
}

impl ObjectDetectorConfig {
    pub fn from_tracking(config: &TrackingConfig) -> Self {
        Self {
            model_path: config.object_model_path.clone(),
            confidence_threshold: config.object_confidence_threshold,
            nms_threshold: config.nms_threshold,
            input_size: 640,
        }
    }
}

/// Object detector using YOLOv8 ONNX model.
pub struct ObjectDetector {
    session: Mutex<Session>,
    config: ObjectDetectorConfig,
}

impl ObjectDetector {
    /// Create a new object detector from config.
    ///
    /// Returns error if model file doesn't exist or cannot be loaded.
    pub fn new(config: ObjectDetectorConfig) -> MediaResult<Self> {
        let session = Mutex::new(create_session(&config.model_path, BACKEND)?);
        info!(
            model_path = %config.model_path.display(),
            input_size = config.input_size,
            "Object detector initialized"
        );

        Ok(Self { session, config })
    }

    /// Preprocess image for YOLOv8 inference.
    ///
    /// - Resize to model input size (640x640)
    /// - Normalize pixel values to [0, 1]
    /// - Convert to NCHW format (batch, channels, height, width)
    fn preprocess(&self, frame: &RgbImage) -> MediaResult<Value> {
        let size = self.config.input_size;
        let resized = imageops::resize(frame, size, size, FilterType::Triangle);
        let (w, h) = (size as usize, size as usize);

        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for pixel in resized.pixels() {
                chw_data.push(pixel[c] as f32 / 255.0);
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::detection_failed(BACKEND, format!("Failed to create tensor: {}", e)))
    }

    fn run_inference(&self, input: Value) -> MediaResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::detection_failed(BACKEND, "Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::detection_failed(BACKEND, format!("ONNX inference failed: {}", e)))?;

        // YOLOv8 output is [1, 84, 8400]
        let output = outputs
            .get("output0")
            .ok_or_else(|| MediaError::detection_failed(BACKEND, "Missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::detection_failed(BACKEND, format!("Failed to extract tensor: {}", e)))?;

        Ok(tensor.1.to_vec())
    }

    pub fn config(&self) -> &ObjectDetectorConfig {
        &self.config
    }
}

impl Detector for ObjectDetector {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn detect(&self, frame: &RgbImage) -> MediaResult<Vec<Detection>> {
        let input = self.preprocess(frame)?;
        let outputs = self.run_inference(input)?;
        let candidates = decode_output(
            &outputs,
            self.config.input_size as f32,
            self.config.confidence_threshold,
        )?;
        let kept = non_maximum_suppression(candidates, self.config.nms_threshold);

        debug!(count = kept.len(), "Object detection completed");

        Ok(kept
            .into_iter()
            .map(|c| to_detection(&c, frame.width(), frame.height()))
            .collect())
    }
}

/// Decode a raw YOLOv8 `[1, 84, 8400]` output into normalized candidates.
///
/// - 84 = 4 (bbox: cx, cy, w, h in input pixels) + 80 class scores
/// - 8400 = number of detection candidates
pub(crate) fn decode_output(
    outputs: &[f32],
    input_size: f32,
    confidence_threshold: f32,
) -> MediaResult<Vec<Candidate>> {
    let num_classes = COCO_CLASSES.len();
    let num_features = 4 + num_classes;
    if outputs.is_empty() || outputs.len() % num_features != 0 {
        return Err(MediaError::detection_failed(
            BACKEND,
            format!("Unexpected output size {}", outputs.len()),
        ));
    }
    let num_boxes = outputs.len() / num_features;

    let output_array = Array::from_shape_vec((num_features, num_boxes), outputs.to_vec())
        .map_err(|e| MediaError::detection_failed(BACKEND, format!("Failed to reshape output: {}", e)))?;
    let transposed = output_array.t();

    let mut candidates = Vec::new();
    for row in transposed.outer_iter() {
        let (best_class, best_score) = row
            .iter()
            .skip(4)
            .enumerate()
            .fold((0usize, 0.0f32), |best, (c, &s)| if s > best.1 { (c, s) } else { best });

        if best_score < confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        candidates.push(Candidate {
            x1: ((cx - w / 2.0) / input_size).clamp(0.0, 1.0),
            y1: ((cy - h / 2.0) / input_size).clamp(0.0, 1.0),
            x2: ((cx + w / 2.0) / input_size).clamp(0.0, 1.0),
            y2: ((cy + h / 2.0) / input_size).clamp(0.0, 1.0),
            score: best_score,
            class_id: best_class,
        });
    }

    Ok(candidates)
}

fn to_detection(candidate: &Candidate, frame_width: u32, frame_height: u32) -> Detection {
    let w = frame_width as f64;
    let h = frame_height as f64;
    let bbox = BoundingBox::new(
        candidate.x1 as f64 * w,
        candidate.y1 as f64 * h,
        (candidate.x2 - candidate.x1) as f64 * w,
        (candidate.y2 - candidate.y1) as f64 * h,
    );

    Detection::new(
        candidate.class_id as i32,
        class_name(candidate.class_id),
        candidate.score as f64,
        bbox,
        frame_width,
        frame_height,
        class_priority(candidate.class_id),
    )
}
