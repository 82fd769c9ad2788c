//! Face detection using the Ultra-Light-Fast (RFB-320) ONNX model.
//!
//! The model takes a `[1, 3, 240, 320]` input normalized as `(p - 127) / 128`
//! and produces:
//! - `scores`: `[1, N, 2]` softmax over (background, face)
//! - `boxes`: `[1, N, 4]` normalized corner coordinates

use std::path::PathBuf;
use std::sync::Mutex;

use image::imageops::{self, FilterType};
use image::RgbImage;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use super::session::{create_session, non_maximum_suppression, Candidate};
use super::Detector;
use crate::error::{MediaError, MediaResult};
use crate::tracking::config::TrackingConfig;
use crate::tracking::models::{BoundingBox, Detection, FACE_CLASS_ID, PRIORITY_FACE};

const BACKEND: &str = "face";

#[derive(Debug, Clone)]
pub struct FaceDetectorConfig {
    pub model_path: PathBuf,
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    pub input_width: u32,
    pub input_height: u32,
}

impl Default for FaceDetectorConfig {
    fn default() -> Self {
        Self::from_tracking(&TrackingConfig::default())
    }
}

impl FaceDetectorConfig {
    pub fn from_tracking(config: &TrackingConfig) -> Self {
        Self {
            model_path: config.face_model_path.clone(),
            confidence_threshold: config.face_confidence_threshold,
            nms_threshold: config.nms_threshold,
            input_width: 320,
            input_height: 240,
        }
    }
}

/// Face detector backed by ONNX Runtime.
pub struct FaceDetector {
    session: Mutex<Session>,
    config: FaceDetectorConfig,
}

impl FaceDetector {
    pub fn new(config: FaceDetectorConfig) -> MediaResult<Self> {
        let session = Mutex::new(create_session(&config.model_path, BACKEND)?);
        info!(
            model_path = %config.model_path.display(),
            input = %format!("{}x{}", config.input_width, config.input_height),
            "Face detector initialized"
        );

        Ok(Self { session, config })
    }

    fn preprocess(&self, frame: &RgbImage) -> MediaResult<Value> {
        let (w, h) = (self.config.input_width, self.config.input_height);
        let resized = imageops::resize(frame, w, h, FilterType::Triangle);

        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * (w * h) as usize);
        for c in 0..3 {
            for pixel in resized.pixels() {
                chw_data.push((pixel[c] as f32 - 127.0) / 128.0);
            }
        }

        let shape = vec![1usize, 3, h as usize, w as usize];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::detection_failed(BACKEND, format!("Failed to create tensor: {}", e)))
    }

    fn run_inference(&self, input: Value) -> MediaResult<(Vec<f32>, Vec<f32>)> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::detection_failed(BACKEND, "Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::detection_failed(BACKEND, format!("ONNX inference failed: {}", e)))?;

        let extract = |name: &str| -> MediaResult<Vec<f32>> {
            let value = outputs
                .get(name)
                .ok_or_else(|| MediaError::detection_failed(BACKEND, format!("Missing {} tensor", name)))?;
            let tensor = value.try_extract_tensor::<f32>().map_err(|e| {
                MediaError::detection_failed(BACKEND, format!("Failed to extract {}: {}", name, e))
            })?;
            Ok(tensor.1.to_vec())
        };

        Ok((extract("scores")?, extract("boxes")?))
    }
}

impl Detector for FaceDetector {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn detect(&self, frame: &RgbImage) -> MediaResult<Vec<Detection>> {
        let input = self.preprocess(frame)?;
        let (scores, boxes) = self.run_inference(input)?;
        let candidates = decode_output(&scores, &boxes, self.config.confidence_threshold)?;
        let faces = non_maximum_suppression(candidates, self.config.nms_threshold);

        debug!(count = faces.len(), "Face detection completed");

        let (fw, fh) = (frame.width() as f64, frame.height() as f64);
        Ok(faces
            .into_iter()
            .map(|c| {
                Detection::new(
                    FACE_CLASS_ID,
                    "face",
                    c.score as f64,
                    BoundingBox::new(
                        c.x1 as f64 * fw,
                        c.y1 as f64 * fh,
                        (c.x2 - c.x1) as f64 * fw,
                        (c.y2 - c.y1) as f64 * fh,
                    ),
                    frame.width(),
                    frame.height(),
                    PRIORITY_FACE,
                )
            })
            .collect())
    }
}

/// Pair up per-anchor scores and boxes, keeping faces above `threshold`.
pub(crate) fn decode_output(scores: &[f32], boxes: &[f32], threshold: f32) -> MediaResult<Vec<Candidate>> {
    if scores.len() % 2 != 0 || boxes.len() % 4 != 0 || scores.len() / 2 != boxes.len() / 4 {
        return Err(MediaError::detection_failed(
            BACKEND,
            format!("Mismatched outputs: {} scores, {} box values", scores.len(), boxes.len()),
        ));
    }

    Ok(scores
        .chunks_exact(2)
        .zip(boxes.chunks_exact(4))
        .filter(|(score, _)| score[1] >= threshold)
        .map(|(score, b)| Candidate {
            x1: b[0].clamp(0.0, 1.0),
            y1: b[1].clamp(0.0, 1.0),
            x2: b[2].clamp(0.0, 1.0),
            y2: b[3].clamp(0.0, 1.0),
            score: score[1],
            class_id: 0,
        })
        .collect())
}
