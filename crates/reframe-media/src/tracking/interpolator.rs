//! Temporal interpolation of sampled centers to every output frame.

use super::models::NormalizedPoint;

/// Expand smoothed sample centers to one center per output frame.
///
/// Sample `k` sits at frame `k * stride`; frames between two samples are
/// linearly interpolated, frames after the last sample repeat it. The result
/// is padded with the last value or truncated to exactly `total_frames`.
pub fn interpolate_centers(
    samples: &[NormalizedPoint],
    stride: usize,
    total_frames: usize,
) -> Vec<NormalizedPoint> {
    let stride = stride.max(1);
    let Some(&last) = samples.last() else {
        return vec![NormalizedPoint::CENTER; total_frames];
    };

    let mut centers = Vec::with_capacity(total_frames.max(samples.len() * stride));

    for pair in samples.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        for offset in 0..stride {
            let t = offset as f64 / stride as f64;
            centers.push(NormalizedPoint::lerp(a, b, t));
        }
    }
    centers.push(last);

    if centers.len() < total_frames {
        centers.resize(total_frames, last);
    } else {
        centers.truncate(total_frames);
    }

    centers
}
