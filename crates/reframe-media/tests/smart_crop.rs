//! Public API tests for the smart crop engine.

use std::sync::Arc;

use image::{Rgb, RgbImage};
use reframe_media::detection::SaliencyDetector;
use reframe_media::tracking::{BoundingBox, PRIORITY_FACE};
use reframe_media::{
    AspectRatio, Detection, Detector, FfmpegFrameSink, FfmpegFrameSource, InMemoryFrameSink,
    InMemoryFrameSource, MediaError, MediaResult, SubjectDetector, SubjectTracker,
    TargetResolution, TrackingConfig,
};

/// Reports a fixed face box in every frame.
struct FixedFace {
    x: f64,
}

impl Detector for FixedFace {
    fn name(&self) -> &'static str {
        "face"
    }

    fn detect(&self, frame: &RgbImage) -> MediaResult<Vec<Detection>> {
        let w = frame.width() as f64;
        let h = frame.height() as f64;
        Ok(vec![Detection::new(
            -1,
            "face",
            0.95,
            BoundingBox::new(self.x * w - 10.0, h / 2.0 - 10.0, 20.0, 20.0),
            frame.width(),
            frame.height(),
            PRIORITY_FACE,
        )])
    }
}

fn gray_frames(count: usize, width: u32, height: u32) -> Vec<RgbImage> {
    (0..count)
        .map(|_| RgbImage::from_pixel(width, height, Rgb([90, 90, 90])))
        .collect()
}

fn tracker_with_face_at(x: f64) -> SubjectTracker {
    let detector = SubjectDetector::with_backends(vec![Box::new(FixedFace { x })], SaliencyDetector::default());
    SubjectTracker::new(TrackingConfig::accurate(), Arc::new(detector))
}

#[tokio::test]
async fn test_static_face_converges_to_face() {
    let tracker = tracker_with_face_at(0.25);
    let mut source = InMemoryFrameSource::new(gray_frames(60, 640, 360), 30.0);

    let centers = tracker
        .track_subject(&mut source, &AspectRatio::PORTRAIT, 0.7)
        .await
        .unwrap();

    assert_eq!(centers.len(), 60);
    let last = centers.get(59).unwrap();
    assert!((last.x - 0.25).abs() < 0.01, "converged to {}", last.x);
    assert!((last.y - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_render_output_matches_target() {
    let tracker = tracker_with_face_at(0.8);
    let mut source = InMemoryFrameSource::new(gray_frames(12, 640, 360), 24.0);
    let mut sink = InMemoryFrameSink::new("clip_reframed.mp4");

    let path = tracker
        .apply_smart_crop(&mut source, &mut sink, TargetResolution::new(108, 192), true)
        .await
        .unwrap();

    assert_eq!(path.to_string_lossy(), "clip_reframed.mp4");
    assert_eq!(sink.frames().len(), 12);
    assert!(sink.frames().iter().all(|f| f.dimensions() == (108, 192)));
}

#[tokio::test]
async fn test_missing_file_is_unreadable() {
    let result = FfmpegFrameSource::open("/nonexistent/clip.mp4").await;
    assert!(matches!(result, Err(MediaError::VideoUnreadable { .. })));
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe in PATH"]
async fn test_ffmpeg_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.mp4");

    let mut writer = FfmpegFrameSink::create(&input, 320, 180, 10.0, "ultrafast", 23).unwrap();
    for frame in gray_frames(20, 320, 180) {
        reframe_media::FrameSink::write_frame(&mut writer, &frame).await.unwrap();
    }
    reframe_media::FrameSink::finish(&mut writer).await.unwrap();

    let mut source = FfmpegFrameSource::open(&input).await.unwrap();
    let output = dir.path().join("input_reframed.mp4");
    let mut sink = FfmpegFrameSink::create(&output, 90, 160, 10.0, "ultrafast", 23).unwrap();

    let path = tracker_with_face_at(0.5)
        .apply_smart_crop(&mut source, &mut sink, TargetResolution::new(90, 160), true)
        .await
        .unwrap();

    assert_eq!(path, output);
    assert!(output.exists());
}
