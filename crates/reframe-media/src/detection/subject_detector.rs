//! Multi-backend subject detection with graceful fallback.

use image::RgbImage;
use metrics::counter;
use tracing::{debug, error, info, warn};

use super::face_detector::{FaceDetector, FaceDetectorConfig};
use super::object_detector::{ObjectDetector, ObjectDetectorConfig};
use super::saliency::SaliencyDetector;
use super::Detector;
use crate::error::{MediaError, MediaResult};
use crate::tracking::config::TrackingConfig;
use crate::tracking::models::FrameDetections;

/// Which model backends loaded at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendAvailability {
    pub face: bool,
    pub object: bool,
}

/// Detection chain: model backends in order, then saliency when nothing was found.
///
/// Results of all backends that ran are accumulated; a backend error is
/// logged and treated as "no detections". The saliency stage only runs on an
/// empty union, so every frame yields at least one detection.
pub struct SubjectDetector {
    backends: Vec<Box<dyn Detector>>,
    saliency: SaliencyDetector,
    availability: BackendAvailability,
}

impl SubjectDetector {
    /// Load the face and object backends named by the config.
    ///
    /// The face stage is required: failing to load it is a
    /// [`MediaError::DetectorBackendUnavailable`]. The object stage is optional
    /// and, when it fails to load, is reported once and left out of the chain.
    pub fn from_config(config: &TrackingConfig) -> MediaResult<Self> {
        let mut backends: Vec<Box<dyn Detector>> = Vec::new();
        let mut availability = BackendAvailability::default();

        match FaceDetector::new(FaceDetectorConfig::from_tracking(config)) {
            Ok(detector) => {
                availability.face = true;
                backends.push(Box::new(detector));
            }
            Err(e) => {
                let e = as_unavailable("face", e);
                error!(backend = "face", error = %e, "Face detection backend failed to load");
                return Err(e);
            }
        }

        match ObjectDetector::new(ObjectDetectorConfig::from_tracking(config)) {
            Ok(detector) => {
                availability.object = true;
                backends.push(Box::new(detector));
            }
            Err(e) => report_unavailable("object", e),
        }

        info!(
            face = availability.face,
            object = availability.object,
            saliency_grid = config.saliency_grid,
            "Subject detector ready"
        );

        Ok(Self {
            backends,
            saliency: SaliencyDetector::new(config.saliency_grid),
            availability,
        })
    }

    /// Build a chain from explicit backends, in order.
    pub fn with_backends(backends: Vec<Box<dyn Detector>>, saliency: SaliencyDetector) -> Self {
        let availability = BackendAvailability {
            face: backends.iter().any(|b| b.name() == "face"),
            object: backends.iter().any(|b| b.name() == "object"),
        };
        Self {
            backends,
            saliency,
            availability,
        }
    }

    /// Chain with only the saliency stage.
    pub fn saliency_only(grid: u32) -> Self {
        Self::with_backends(Vec::new(), SaliencyDetector::new(grid))
    }

    pub fn availability(&self) -> BackendAvailability {
        self.availability
    }

    /// Run the chain on one frame. Never fails and never returns an empty list.
    pub fn detect(&self, frame: &RgbImage) -> FrameDetections {
        let mut detections = FrameDetections::new();

        for backend in &self.backends {
            match backend.detect(frame) {
                Ok(found) => {
                    debug!(backend = backend.name(), count = found.len(), "Backend finished");
                    detections.extend(found);
                }
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "Detection backend failed on frame");
                    counter!("reframe_backend_failures_total", "backend" => backend.name()).increment(1);
                }
            }
        }

        if detections.is_empty() {
            counter!("reframe_saliency_fallbacks_total").increment(1);
            detections.push(self.saliency.most_salient(frame));
        }

        detections
    }
}

fn as_unavailable(backend: &'static str, error: MediaError) -> MediaError {
    match error {
        e @ MediaError::DetectorBackendUnavailable { .. } => e,
        other => MediaError::backend_unavailable(backend, other.to_string()),
    }
}

fn report_unavailable(backend: &'static str, error: MediaError) {
    let error = as_unavailable(backend, error);
    warn!(backend, error = %error, "Detection backend disabled");
}
