//! Subject detection backends.
//!
//! | Stage | Backend | Priority |
//! |-------|---------|----------|
//! | 1 | Face model (UltraFace RFB-320) | 1 |
//! | 2 | Object model (YOLOv8, COCO) | 2-5 by class |
//! | 3 | Visual saliency (edge-density grid) | 6 |
//!
//! [`SubjectDetector`] runs the stages in order and guarantees at least one
//! detection per frame.

pub mod face_detector;
pub mod object_detector;
pub mod saliency;
mod session;
pub mod subject_detector;

use image::RgbImage;

use crate::error::MediaResult;
use crate::tracking::models::Detection;

pub use face_detector::{FaceDetector, FaceDetectorConfig};
pub use object_detector::{class_priority, ObjectDetector, ObjectDetectorConfig, COCO_CLASSES};
pub use saliency::SaliencyDetector;
pub use subject_detector::{BackendAvailability, SubjectDetector};

/// A single detection stage.
///
/// Implementations are called from blocking worker threads and may be shared
/// between concurrent tracking runs.
pub trait Detector: Send + Sync {
    /// Short backend name used in logs and metrics labels.
    fn name(&self) -> &'static str;

    /// Detect subjects in one RGB frame.
    fn detect(&self, frame: &RgbImage) -> MediaResult<Vec<Detection>>;
}
