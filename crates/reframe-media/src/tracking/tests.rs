//! End-to-end tracking tests over synthetic in-memory videos.

use std::sync::Arc;

use image::{Rgb, RgbImage};
use reframe_models::{AspectRatio, TargetResolution};
use tokio::sync::watch;

use super::*;
use crate::detection::{Detector, SaliencyDetector, SubjectDetector};
use crate::error::{MediaError, MediaResult};
use crate::frame::{FrameSource, InMemoryFrameSink, InMemoryFrameSource};
use crate::probe::VideoInfo;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 180;
const SQUARE: u32 = 20;

/// Face stand-in: reports the bounding box of bright pixels.
struct BrightRegionFace;

impl Detector for BrightRegionFace {
    fn name(&self) -> &'static str {
        "face"
    }

    fn detect(&self, frame: &RgbImage) -> MediaResult<Vec<Detection>> {
        let bright: Vec<(u32, u32)> = frame
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 200)
            .map(|(x, y, _)| (x, y))
            .collect();
        if bright.is_empty() {
            return Ok(Vec::new());
        }

        let x0 = bright.iter().map(|p| p.0).min().unwrap_or(0);
        let x1 = bright.iter().map(|p| p.0).max().unwrap_or(0) + 1;
        let y0 = bright.iter().map(|p| p.1).min().unwrap_or(0);
        let y1 = bright.iter().map(|p| p.1).max().unwrap_or(0) + 1;

        Ok(vec![Detection::new(
            FACE_CLASS_ID,
            "face",
            0.9,
            BoundingBox::new(x0 as f64, y0 as f64, (x1 - x0) as f64, (y1 - y0) as f64),
            frame.width(),
            frame.height(),
            PRIORITY_FACE,
        )])
    }
}

/// Frame with a bright square centered at normalized `cx`, vertically centered.
fn frame_with_subject(cx: f64) -> RgbImage {
    let mut frame = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([60, 60, 60]));
    let left = (cx * WIDTH as f64).round() as u32 - SQUARE / 2;
    let top = (HEIGHT - SQUARE) / 2;
    for y in top..top + SQUARE {
        for x in left..left + SQUARE {
            frame.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }
    frame
}

/// 100 frames at 10 fps, subject moving linearly from x=0.2 to x=0.8.
fn moving_subject_video() -> InMemoryFrameSource {
    let frames = (0..100)
        .map(|i| frame_with_subject(0.2 + 0.6 * i as f64 / 99.0))
        .collect();
    InMemoryFrameSource::new(frames, 10.0)
}

fn tracker() -> SubjectTracker {
    let detector = SubjectDetector::with_backends(vec![Box::new(BrightRegionFace)], SaliencyDetector::default());
    SubjectTracker::new(TrackingConfig::default(), Arc::new(detector))
}

fn assert_windows_in_bounds(centers: &CropCenters, aspect: &AspectRatio) {
    let planner = CropPlanner::new(WIDTH, HEIGHT);
    let expected = aspect.as_f64().unwrap();
    for window in planner.compute_crop_windows(centers, aspect) {
        assert!(window.x < window.x2() && window.x2() <= WIDTH, "{:?}", window);
        assert!(window.y < window.y2() && window.y2() <= HEIGHT, "{:?}", window);
        let ratio = window.ratio().unwrap();
        assert!((ratio - expected).abs() / expected < 0.01, "ratio {}", ratio);
    }
}

#[tokio::test]
async fn test_moving_subject_without_smoothing_is_monotonic() {
    let mut video = moving_subject_video();
    let centers = tracker()
        .track_subject(&mut video, &AspectRatio::PORTRAIT, 0.0)
        .await
        .unwrap();

    assert_eq!(centers.len(), 100);
    let xs: Vec<f64> = centers.iter().map(|c| c.x).collect();
    assert!(xs.windows(2).all(|w| w[0] <= w[1]), "x sequence: {:?}", xs);
    assert!((xs[0] - 0.2).abs() < 0.02);
    assert!(centers.iter().all(|c| c.is_normalized()));
    assert_windows_in_bounds(&centers, &AspectRatio::PORTRAIT);
}

#[tokio::test]
async fn test_moving_subject_with_smoothing_follows_after_settling() {
    let mut video = moving_subject_video();
    let centers = tracker()
        .track_subject(&mut video, &AspectRatio::PORTRAIT, 0.5)
        .await
        .unwrap();

    assert_eq!(centers.len(), 100);
    let xs: Vec<f64> = centers.iter().map(|c| c.x).collect();

    // Starts from the frame center, settles onto the subject, then follows it
    let (argmin, _) = xs
        .iter()
        .enumerate()
        .fold((0, f64::MAX), |best, (i, &x)| if x < best.1 { (i, x) } else { best });
    assert!(argmin <= 20, "settled at frame {}", argmin);
    assert!(xs[argmin..].windows(2).all(|w| w[0] <= w[1]), "x sequence: {:?}", xs);
    assert!(xs[99] > 0.7);
    assert!(centers.iter().all(|c| (c.y - 0.5).abs() < 0.01));
    assert_windows_in_bounds(&centers, &AspectRatio::PORTRAIT);
}

#[tokio::test]
async fn test_in_between_frames_are_linear() {
    let mut video = moving_subject_video();
    let centers = tracker()
        .track_subject(&mut video, &AspectRatio::PORTRAIT, 0.5)
        .await
        .unwrap();

    for k in 0..19 {
        let a = centers.get(k * 5).unwrap();
        let b = centers.get(k * 5 + 5).unwrap();
        for offset in 1..5 {
            let c = centers.get(k * 5 + offset).unwrap();
            let t = offset as f64 / 5.0;
            assert!((c.x - (a.x + t * (b.x - a.x))).abs() < 1e-9);
            assert!((c.y - (a.y + t * (b.y - a.y))).abs() < 1e-9);
        }
    }
}

#[tokio::test]
async fn test_full_smoothing_stays_centered() {
    let mut video = moving_subject_video();
    let centers = tracker()
        .track_subject(&mut video, &AspectRatio::SQUARE, 1.0)
        .await
        .unwrap();
    assert!(centers.iter().all(|c| *c == NormalizedPoint::CENTER));
}

#[tokio::test]
async fn test_single_frame_video() {
    let mut video = InMemoryFrameSource::new(vec![frame_with_subject(0.3)], 10.0);
    let centers = tracker()
        .track_subject(&mut video, &AspectRatio::PORTRAIT, 0.7)
        .await
        .unwrap();
    assert_eq!(centers.len(), 1);

    let mut zero_length = InMemoryFrameSource::new(vec![frame_with_subject(0.3)], 30.0)
        .with_info(VideoInfo::new(WIDTH, HEIGHT, 30.0, 0.0));
    let centers = tracker()
        .track_subject(&mut zero_length, &AspectRatio::PORTRAIT, 0.7)
        .await
        .unwrap();
    assert_eq!(centers.len(), 1);
}

#[tokio::test]
async fn test_unreadable_video_fails_before_processing() {
    let mut video = InMemoryFrameSource::new(vec![frame_with_subject(0.5)], 10.0)
        .with_info(VideoInfo::new(WIDTH, HEIGHT, 0.0, 10.0));
    let result = tracker()
        .track_subject(&mut video, &AspectRatio::PORTRAIT, 0.7)
        .await;
    assert!(matches!(result, Err(MediaError::VideoUnreadable { .. })));
}

#[tokio::test]
async fn test_unreadable_frame_reuses_previous_center() {
    let mut video = moving_subject_video().with_unreadable_frame(5);
    let centers = tracker()
        .track_subject(&mut video, &AspectRatio::PORTRAIT, 0.0)
        .await
        .unwrap();

    assert_eq!(centers.len(), 100);
    assert_eq!(centers.get(5), centers.get(0));
    assert!(centers.get(10).unwrap().x > centers.get(5).unwrap().x);
}

#[tokio::test]
async fn test_cancellation_discards_run() {
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let mut video = moving_subject_video();
    let result = tracker()
        .with_cancel(rx)
        .track_subject(&mut video, &AspectRatio::PORTRAIT, 0.5)
        .await;
    assert!(matches!(result, Err(MediaError::Cancelled)));
}

#[tokio::test]
async fn test_empty_backends_fall_back_to_saliency() {
    struct Blind;

    impl Detector for Blind {
        fn name(&self) -> &'static str {
            "object"
        }

        fn detect(&self, _frame: &RgbImage) -> MediaResult<Vec<Detection>> {
            Err(MediaError::detection_failed("object", "model crashed"))
        }
    }

    let detector = SubjectDetector::with_backends(vec![Box::new(Blind)], SaliencyDetector::new(4));
    let tracker = SubjectTracker::new(TrackingConfig::default(), Arc::new(detector));

    // Texture only in the right half; saliency should pull the crop right
    let frames = (0..20).map(|_| frame_with_subject(0.85)).collect();
    let mut video = InMemoryFrameSource::new(frames, 10.0);
    let centers = tracker
        .track_subject(&mut video, &AspectRatio::PORTRAIT, 0.0)
        .await
        .unwrap();

    assert_eq!(centers.len(), 20);
    assert!(centers.iter().all(|c| c.x > 0.5));
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let tracker = tracker();
    let mut left = InMemoryFrameSource::new((0..30).map(|_| frame_with_subject(0.2)).collect(), 10.0);
    let mut right = InMemoryFrameSource::new((0..30).map(|_| frame_with_subject(0.8)).collect(), 10.0);

    let (a, b) = tokio::join!(
        tracker.track_subject(&mut left, &AspectRatio::PORTRAIT, 0.5),
        tracker.track_subject(&mut right, &AspectRatio::PORTRAIT, 0.5),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let mut left_again =
        InMemoryFrameSource::new((0..30).map(|_| frame_with_subject(0.2)).collect(), 10.0);
    let sequential = tracker
        .track_subject(&mut left_again, &AspectRatio::PORTRAIT, 0.5)
        .await
        .unwrap();

    assert_eq!(a, sequential);
    assert!(a.get(29).unwrap().x < 0.3);
    assert!(b.get(29).unwrap().x > 0.7);
}

#[tokio::test]
async fn test_apply_smart_crop_renders_every_frame() {
    let mut video = moving_subject_video();
    let mut sink = InMemoryFrameSink::new("/tmp/reframed.mp4");
    let target = TargetResolution::new(90, 160);

    let path = tracker()
        .apply_smart_crop(&mut video, &mut sink, target, true)
        .await
        .unwrap();

    assert_eq!(path, std::path::PathBuf::from("/tmp/reframed.mp4"));
    assert!(sink.is_finished());
    assert_eq!(sink.frames().len(), 100);
    assert!(sink.frames().iter().all(|f| f.dimensions() == (90, 160)));
}

#[tokio::test]
async fn test_apply_smart_crop_static_uses_midpoint() {
    let mut video = moving_subject_video();
    let mut sink = InMemoryFrameSink::new("/tmp/static.mp4");

    tracker()
        .apply_smart_crop(&mut video, &mut sink, TargetResolution::new(90, 160), false)
        .await
        .unwrap();
    assert_eq!(sink.frames().len(), 100);

    // The subject at the midpoint sits near x=0.5, so the static crop keeps it
    // in view; at frame 50 the bright square must be in the output.
    let mid = &sink.frames()[50];
    assert!(mid.pixels().any(|p| p[0] > 200));
}

#[tokio::test]
async fn test_static_crop_unreadable_midpoint_uses_frame_center() {
    // 10 s at 10 fps: the midpoint frame is index 50.
    let mut video = moving_subject_video().with_unreadable_frame(50);

    let centers = tracker().midpoint_centers(&mut video).await.unwrap();
    assert_eq!(centers.len(), 100);
    assert!(centers.iter().all(|c| *c == NormalizedPoint::CENTER));

    let mut sink = InMemoryFrameSink::new("/tmp/static_center.mp4");
    tracker()
        .apply_smart_crop(&mut video, &mut sink, TargetResolution::new(90, 160), false)
        .await
        .unwrap();
    assert_eq!(sink.frames().len(), 100);
    assert_eq!(sink.frames()[50], sink.frames()[49]);
}

#[tokio::test]
async fn test_apply_smart_crop_rejects_zero_target() {
    let mut video = moving_subject_video();
    let mut sink = InMemoryFrameSink::new("/tmp/none.mp4");
    let result = tracker()
        .apply_smart_crop(&mut video, &mut sink, TargetResolution::new(0, 0), true)
        .await;
    assert!(matches!(result, Err(MediaError::Render { .. })));
}

#[tokio::test]
async fn test_apply_smart_crop_first_frame_unreadable() {
    let mut video = moving_subject_video().with_unreadable_frame(0);
    let mut sink = InMemoryFrameSink::new("/tmp/broken.mp4");
    let path = tracker()
        .apply_smart_crop(&mut video, &mut sink, TargetResolution::new(90, 160), true)
        .await
        .unwrap();

    assert_eq!(path, PathBuf::from("/tmp/broken.mp4"));
    assert_eq!(sink.frames().len(), 100);
    assert!(sink.frames().iter().all(|f| f.dimensions() == (90, 160)));
    // Nothing to repeat yet, so the first output is blank; the rest are real frames.
    assert!(sink.frames()[0].pixels().all(|p| p.0 == [0, 0, 0]));
    assert!(sink.frames()[1].pixels().any(|p| p[0] > 0));
}

#[tokio::test]
async fn test_source_info_is_reported() {
    let video = moving_subject_video();
    assert_eq!(video.info().frame_count(), 100);
    assert!(video.path().is_none());
}
