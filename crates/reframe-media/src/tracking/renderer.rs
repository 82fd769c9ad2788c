//! Per-frame crop and resize.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use reframe_models::TargetResolution;

use super::models::CropWindow;

/// Crop `window` out of `frame` and scale it to `target` with Lanczos3.
///
/// Windows are clipped to the frame first. An empty frame or window renders
/// as a black frame of the target size.
pub fn render_frame(frame: &RgbImage, window: &CropWindow, target: TargetResolution) -> RgbImage {
    let (fw, fh) = frame.dimensions();
    let x = window.x.min(fw);
    let y = window.y.min(fh);
    let width = window.width.min(fw - x);
    let height = window.height.min(fh - y);

    if width == 0 || height == 0 {
        return blank_frame(target);
    }

    let cropped = imageops::crop_imm(frame, x, y, width, height).to_image();
    if (width, height) == (target.width, target.height) {
        return cropped;
    }
    imageops::resize(&cropped, target.width, target.height, FilterType::Lanczos3)
}

/// Black frame of the target size.
pub fn blank_frame(target: TargetResolution) -> RgbImage {
    RgbImage::from_pixel(target.width, target.height, Rgb([0, 0, 0]))
}
