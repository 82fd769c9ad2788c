//! Visual-saliency fallback.
//!
//! Scores a coarse grid of cells by edge density (mean absolute Laplacian of
//! the luma channel) and reports the busiest cell as the subject. It needs no
//! model and always produces exactly one detection.

use image::imageops;
use image::RgbImage;

use super::Detector;
use crate::error::MediaResult;
use crate::tracking::models::{BoundingBox, Detection, PRIORITY_SALIENCY, SALIENCY_CLASS_ID};

/// Confidence reported for saliency detections.
const SALIENCY_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct SaliencyDetector {
    grid: u32,
}

impl Default for SaliencyDetector {
    fn default() -> Self {
        Self::new(4)
    }
}

impl SaliencyDetector {
    /// Create a detector over a `grid x grid` layout; `grid` is at least 1.
    pub fn new(grid: u32) -> Self {
        Self { grid: grid.max(1) }
    }

    pub fn grid(&self) -> u32 {
        self.grid
    }

    /// Most salient region of the frame.
    pub fn most_salient(&self, frame: &RgbImage) -> Detection {
        let (width, height) = frame.dimensions();
        let grid = self.grid;

        let scores = self.cell_scores(frame);
        let best = scores
            .iter()
            .enumerate()
            .fold((0usize, f64::MIN), |best, (i, &s)| if s > best.1 { (i, s) } else { best })
            .0;

        let (col, row) = (best as u32 % grid, best as u32 / grid);
        let x0 = cell_edge(col, grid, width);
        let x1 = cell_edge(col + 1, grid, width);
        let y0 = cell_edge(row, grid, height);
        let y1 = cell_edge(row + 1, grid, height);

        Detection::new(
            SALIENCY_CLASS_ID,
            "saliency",
            SALIENCY_CONFIDENCE,
            BoundingBox::new(x0 as f64, y0 as f64, (x1 - x0) as f64, (y1 - y0) as f64),
            width,
            height,
            PRIORITY_SALIENCY,
        )
    }

    /// Mean absolute Laplacian per cell, row-major.
    fn cell_scores(&self, frame: &RgbImage) -> Vec<f64> {
        let grid = self.grid;
        let cells = (grid * grid) as usize;
        let mut sums = vec![0.0f64; cells];
        let mut counts = vec![0u64; cells];

        let (width, height) = frame.dimensions();
        if width < 3 || height < 3 {
            return sums;
        }

        let luma = imageops::grayscale(frame);
        let at = |x: u32, y: u32| luma.get_pixel(x, y)[0] as f64;

        for y in 1..height - 1 {
            let row = (y as u64 * grid as u64 / height as u64) as u32;
            for x in 1..width - 1 {
                let col = (x as u64 * grid as u64 / width as u64) as u32;
                let laplacian =
                    4.0 * at(x, y) - at(x - 1, y) - at(x + 1, y) - at(x, y - 1) - at(x, y + 1);
                let cell = (row * grid + col) as usize;
                sums[cell] += laplacian.abs();
                counts[cell] += 1;
            }
        }

        sums.iter()
            .zip(counts.iter())
            .map(|(&s, &n)| if n > 0 { s / n as f64 } else { 0.0 })
            .collect()
    }
}

/// Pixel coordinate of the `index`-th cell boundary along an axis.
fn cell_edge(index: u32, grid: u32, extent: u32) -> u32 {
    (index as u64 * extent as u64 / grid as u64) as u32
}

impl Detector for SaliencyDetector {
    fn name(&self) -> &'static str {
        "saliency"
    }

    fn detect(&self, frame: &RgbImage) -> MediaResult<Vec<Detection>> {
        Ok(vec![self.most_salient(frame)])
    }
}
