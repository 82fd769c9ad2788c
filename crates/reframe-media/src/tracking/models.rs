//! Data models for the subject tracking pipeline.

use serde::{Deserialize, Serialize};

/// Class id reserved for the face backend.
pub const FACE_CLASS_ID: i32 = -1;
/// Class id reserved for the saliency fallback.
pub const SALIENCY_CLASS_ID: i32 = -2;
/// Class id of the "no subject" sentinel.
pub const NO_SUBJECT_CLASS_ID: i32 = -3;

/// Priority of face detections (highest).
pub const PRIORITY_FACE: u8 = 1;
/// Priority of saliency fallback detections.
pub const PRIORITY_SALIENCY: u8 = 6;
/// Priority meaning "no subject found".
pub const PRIORITY_NONE: u8 = 10;

/// Bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge x-coordinate
    pub x: f64,
    /// Top edge y-coordinate
    pub y: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Center x-coordinate.
    #[inline]
    pub fn cx(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Center y-coordinate.
    #[inline]
    pub fn cy(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Right edge x-coordinate.
    #[inline]
    pub fn x2(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate.
    #[inline]
    pub fn y2(&self) -> f64 {
        self.y + self.height
    }

    /// Box area in pixels.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Intersect the box with the frame rectangle `[0,W]x[0,H]`.
    ///
    /// Unlike a shift, this trims whatever part of the box falls outside.
    pub fn clip_to_frame(&self, frame_width: u32, frame_height: u32) -> BoundingBox {
        let w = frame_width as f64;
        let h = frame_height as f64;

        let x1 = self.x.clamp(0.0, w);
        let y1 = self.y.clamp(0.0, h);
        let x2 = self.x2().clamp(x1, w);
        let y2 = self.y2().clamp(y1, h);

        BoundingBox::new(x1, y1, x2 - x1, y2 - y1)
    }
}

/// Position expressed as fractions of frame width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    /// Frame center, the initial tracking position.
    pub const CENTER: NormalizedPoint = NormalizedPoint { x: 0.5, y: 0.5 };

    /// Create a point, clamping both coordinates into `[0, 1]`.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    /// Linear interpolation between two points.
    pub fn lerp(a: NormalizedPoint, b: NormalizedPoint, t: f64) -> NormalizedPoint {
        NormalizedPoint {
            x: a.x + t * (b.x - a.x),
            y: a.y + t * (b.y - a.y),
        }
    }

    /// Whether both coordinates lie in `[0, 1]`.
    pub fn is_normalized(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

impl Default for NormalizedPoint {
    fn default() -> Self {
        Self::CENTER
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.5
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// One candidate subject found in a single frame.
///
/// Center and area are always derived from the bounding box and the frame
/// size passed to [`Detection::new`]; the fields are private so they cannot
/// drift apart afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    class_id: i32,
    class_name: String,
    confidence: f64,
    bbox: BoundingBox,
    center: NormalizedPoint,
    area: f64,
    priority: u8,
}

impl Detection {
    /// Create a detection from a pixel-space box in a `frame_width x frame_height` frame.
    ///
    /// The box is clipped to the frame and the confidence clamped to `[0, 1]`.
    pub fn new(
        class_id: i32,
        class_name: impl Into<String>,
        confidence: f64,
        bbox: BoundingBox,
        frame_width: u32,
        frame_height: u32,
        priority: u8,
    ) -> Self {
        let bbox = bbox.clip_to_frame(frame_width, frame_height);
        let frame_area = frame_width as f64 * frame_height as f64;

        let (center, area) = if frame_area > 0.0 {
            (
                NormalizedPoint::new(
                    bbox.cx() / frame_width as f64,
                    bbox.cy() / frame_height as f64,
                ),
                clamp_unit(bbox.area() / frame_area),
            )
        } else {
            (NormalizedPoint::CENTER, 0.0)
        };

        Self {
            class_id,
            class_name: class_name.into(),
            confidence: if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) },
            bbox,
            center,
            area,
            priority,
        }
    }

    /// Sentinel returned when there is nothing to select.
    pub fn no_subject() -> Self {
        Self {
            class_id: NO_SUBJECT_CLASS_ID,
            class_name: "none".to_string(),
            confidence: 0.0,
            bbox: BoundingBox::new(0.0, 0.0, 0.0, 0.0),
            center: NormalizedPoint::CENTER,
            area: 0.0,
            priority: PRIORITY_NONE,
        }
    }

    pub fn class_id(&self) -> i32 {
        self.class_id
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Normalized center in `[0,1] x [0,1]`.
    pub fn center(&self) -> NormalizedPoint {
        self.center
    }

    /// Normalized area in `[0,1]`.
    pub fn area(&self) -> f64 {
        self.area
    }

    /// 1 is the highest priority.
    pub fn priority(&self) -> u8 {
        self.priority
    }
}

/// Detections for one sampled frame.
pub type FrameDetections = Vec<Detection>;

/// Crop rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Set when the window is a full-frame fallback for degenerate geometry.
    pub fallback: bool,
}

impl CropWindow {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            fallback: false,
        }
    }

    /// Full-frame window used when the target ratio cannot be honored.
    pub fn full_frame(frame_width: u32, frame_height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width: frame_width,
            height: frame_height,
            fallback: true,
        }
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn x2(&self) -> u32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn y2(&self) -> u32 {
        self.y + self.height
    }

    /// Width / height, `None` for an empty window.
    pub fn ratio(&self) -> Option<f64> {
        if self.width == 0 || self.height == 0 {
            None
        } else {
            Some(self.width as f64 / self.height as f64)
        }
    }
}

/// Per-output-frame crop centers produced by one tracking run.
///
/// Immutable once built: callers get read access only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropCenters {
    centers: Vec<NormalizedPoint>,
}

impl CropCenters {
    pub(crate) fn new(centers: Vec<NormalizedPoint>) -> Self {
        Self { centers }
    }

    /// Same center repeated for every output frame.
    pub(crate) fn constant(center: NormalizedPoint, frame_count: usize) -> Self {
        Self {
            centers: vec![center; frame_count],
        }
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    pub fn get(&self, frame_index: usize) -> Option<NormalizedPoint> {
        self.centers.get(frame_index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedPoint> {
        self.centers.iter()
    }

    pub fn as_slice(&self) -> &[NormalizedPoint] {
        &self.centers
    }
}

impl IntoIterator for CropCenters {
    type Item = NormalizedPoint;
    type IntoIter = std::vec::IntoIter<NormalizedPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.centers.into_iter()
    }
}
