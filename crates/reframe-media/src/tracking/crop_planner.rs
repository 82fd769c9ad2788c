//! Crop window computation for different aspect ratios.
//!
//! Converts normalized crop centers to pixel crop windows that match the
//! target aspect ratio and lie entirely inside the source frame.

use metrics::counter;
use reframe_models::AspectRatio;
use tracing::debug;

use super::models::{CropCenters, CropWindow, NormalizedPoint};
use crate::error::{MediaError, MediaResult};

/// Crop planner for one source geometry.
#[derive(Debug, Clone, Copy)]
pub struct CropPlanner {
    frame_width: u32,
    frame_height: u32,
}

impl CropPlanner {
    /// Create a new crop planner.
    pub fn new(frame_width: u32, frame_height: u32) -> Self {
        Self {
            frame_width,
            frame_height,
        }
    }

    /// Compute one crop window per center.
    pub fn compute_crop_windows(
        &self,
        centers: &CropCenters,
        aspect_ratio: &AspectRatio,
    ) -> Vec<CropWindow> {
        centers
            .iter()
            .map(|c| self.compute_crop_window(*c, aspect_ratio))
            .collect()
    }

    /// Compute the crop window for a center, falling back to the full frame
    /// when the geometry is degenerate.
    pub fn compute_crop_window(
        &self,
        center: NormalizedPoint,
        aspect_ratio: &AspectRatio,
    ) -> CropWindow {
        match self.try_crop_window(center, aspect_ratio) {
            Ok(window) => window,
            Err(e) => {
                debug!("Using full-frame crop: {}", e);
                counter!("reframe_degenerate_crops_total").increment(1);
                CropWindow::full_frame(self.frame_width, self.frame_height)
            }
        }
    }

    /// Compute the crop window, reporting degenerate geometry as an error.
    pub fn try_crop_window(
        &self,
        center: NormalizedPoint,
        aspect_ratio: &AspectRatio,
    ) -> MediaResult<CropWindow> {
        let (crop_width, crop_height) = self.crop_dimensions(aspect_ratio)?;

        let w = self.frame_width as f64;
        let h = self.frame_height as f64;

        let x = place_axis(center.x * w, crop_width, self.frame_width);
        let y = place_axis(center.y * h, crop_height, self.frame_height);

        Ok(CropWindow::new(x, y, crop_width, crop_height))
    }

    /// Largest crop of the target ratio that fits the source frame.
    pub fn crop_dimensions(&self, aspect_ratio: &AspectRatio) -> MediaResult<(u32, u32)> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(MediaError::DegenerateGeometry(format!(
                "zero-size frame {}x{}",
                self.frame_width, self.frame_height
            )));
        }

        let target_ratio = aspect_ratio.as_f64().ok_or_else(|| {
            MediaError::DegenerateGeometry(format!("invalid target ratio {}", aspect_ratio))
        })?;

        let w = self.frame_width as f64;
        let h = self.frame_height as f64;

        let (crop_width, crop_height) = if w / h > target_ratio {
            // Source wider than target: keep full height
            ((h * target_ratio).round(), h)
        } else {
            // Source narrower (or equal): keep full width
            (w, (w / target_ratio).round())
        };

        Ok((
            (crop_width as u32).clamp(1, self.frame_width),
            (crop_height as u32).clamp(1, self.frame_height),
        ))
    }
}

/// Left/top edge of a span of `size` centered at `center`, shifted inward so
/// it lies inside `[0, extent]`.
fn place_axis(center: f64, size: u32, extent: u32) -> u32 {
    let max_start = extent.saturating_sub(size) as f64;
    let start = (center - size as f64 / 2.0).round();
    if start.is_nan() {
        return (max_start / 2.0).round() as u32;
    }
    start.clamp(0.0, max_start) as u32
}

/// Check if crop windows are essentially static.
pub fn is_static_crop(crop_windows: &[CropWindow]) -> bool {
    let (Some(min_x), Some(max_x)) = (
        crop_windows.iter().map(|w| w.x).min(),
        crop_windows.iter().map(|w| w.x).max(),
    ) else {
        return true;
    };
    let min_y = crop_windows.iter().map(|w| w.y).min().unwrap_or(0);
    let max_y = crop_windows.iter().map(|w| w.y).max().unwrap_or(0);

    let avg_width =
        crop_windows.iter().map(|w| w.width as f64).sum::<f64>() / crop_windows.len() as f64;

    // Static if movement is under 5% of the crop width
    let threshold = avg_width * 0.05;
    ((max_x - min_x) as f64) < threshold && ((max_y - min_y) as f64) < threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_in_bounds(crop: &CropWindow, w: u32, h: u32) {
        assert!(crop.x < crop.x2(), "empty width: {:?}", crop);
        assert!(crop.y < crop.y2(), "empty height: {:?}", crop);
        assert!(crop.x2() <= w, "right edge {} > {}", crop.x2(), w);
        assert!(crop.y2() <= h, "bottom edge {} > {}", crop.y2(), h);
    }

    #[test]
    fn test_portrait_from_landscape() {
        let planner = CropPlanner::new(1920, 1080);
        let crop = planner.compute_crop_window(NormalizedPoint::CENTER, &AspectRatio::PORTRAIT);

        assert_eq!(crop.height, 1080);
        assert_eq!(crop.width, 608); // round(1080 * 9/16) = round(607.5)
        assert_eq!(crop.x, (1920 - 608) / 2);
        assert!((crop.ratio().unwrap() - 0.5625).abs() / 0.5625 < 0.01);
        assert!(!crop.fallback);
    }

    #[test]
    fn test_landscape_from_portrait() {
        let planner = CropPlanner::new(1080, 1920);
        let crop = planner.compute_crop_window(NormalizedPoint::new(0.5, 0.1), &AspectRatio::LANDSCAPE);

        assert_eq!(crop.width, 1080);
        assert_eq!(crop.height, 608);
        assert_eq!(crop.y, 0, "box shifted down to stay in frame");
        assert_in_bounds(&crop, 1080, 1920);
    }

    #[test]
    fn test_edge_centers_shift_without_resizing() {
        let planner = CropPlanner::new(1920, 1080);
        for (cx, cy) in [(0.0, 0.0), (1.0, 1.0), (0.02, 0.5), (0.98, 0.5), (0.5, 0.5)] {
            let crop = planner.compute_crop_window(NormalizedPoint::new(cx, cy), &AspectRatio::PORTRAIT);
            assert_eq!(crop.width, 608);
            assert_eq!(crop.height, 1080);
            assert_in_bounds(&crop, 1920, 1080);
        }

        let left = planner.compute_crop_window(NormalizedPoint::new(0.0, 0.5), &AspectRatio::PORTRAIT);
        let right = planner.compute_crop_window(NormalizedPoint::new(1.0, 0.5), &AspectRatio::PORTRAIT);
        assert_eq!(left.x, 0);
        assert_eq!(right.x2(), 1920);
    }

    #[test]
    fn test_same_ratio_uses_full_frame() {
        let planner = CropPlanner::new(1280, 720);
        let crop = planner.compute_crop_window(NormalizedPoint::new(0.9, 0.1), &AspectRatio::LANDSCAPE);
        assert_eq!(crop, CropWindow::new(0, 0, 1280, 720));
    }

    #[test]
    fn test_ratio_holds_within_one_percent() {
        let sizes = [(1920, 1080), (1280, 720), (3840, 2160), (720, 1280), (1000, 1000), (641, 359)];
        let targets = [
            AspectRatio::PORTRAIT,
            AspectRatio::SQUARE,
            AspectRatio::INSTAGRAM_PORTRAIT,
            AspectRatio::LANDSCAPE,
        ];
        for (w, h) in sizes {
            let planner = CropPlanner::new(w, h);
            for target in &targets {
                let crop = planner.compute_crop_window(NormalizedPoint::new(0.3, 0.7), target);
                let expected = target.as_f64().unwrap();
                let actual = crop.ratio().unwrap();
                assert!(
                    (actual - expected).abs() / expected < 0.01,
                    "{}x{} -> {}: got {}",
                    w,
                    h,
                    target,
                    actual
                );
                assert_in_bounds(&crop, w, h);
            }
        }
    }

    #[test]
    fn test_zero_size_frame_falls_back() {
        let planner = CropPlanner::new(0, 0);
        let crop = planner.compute_crop_window(NormalizedPoint::CENTER, &AspectRatio::PORTRAIT);
        assert!(crop.fallback);
        assert_eq!(crop, CropWindow::full_frame(0, 0));
        assert!(matches!(
            planner.try_crop_window(NormalizedPoint::CENTER, &AspectRatio::PORTRAIT),
            Err(MediaError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_invalid_ratio_falls_back() {
        let planner = CropPlanner::new(640, 480);
        let crop = planner.compute_crop_window(NormalizedPoint::CENTER, &AspectRatio::new(0, 1));
        assert_eq!(crop, CropWindow::full_frame(640, 480));
    }

    #[test]
    fn test_static_crop_detection() {
        let static_windows = vec![
            CropWindow::new(100, 0, 500, 900),
            CropWindow::new(102, 0, 500, 900),
            CropWindow::new(101, 0, 500, 900),
        ];
        assert!(is_static_crop(&static_windows));

        let moving_windows = vec![
            CropWindow::new(100, 0, 500, 900),
            CropWindow::new(300, 0, 500, 900),
        ];
        assert!(!is_static_crop(&moving_windows));
        assert!(is_static_crop(&[]));
    }
}
