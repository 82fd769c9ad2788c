//! Exponential trajectory smoothing of the tracked subject center.
//!
//! The smoother is a causal fold over the sampled frames: the only state is
//! the last smoothed center, which is passed in and returned explicitly so
//! two runs can never observe each other's position.

use tracing::warn;

use super::models::NormalizedPoint;

/// Last smoothed center, threaded through one tracking run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingState {
    last: NormalizedPoint,
}

impl SmoothingState {
    /// Initial state centered in the frame.
    pub fn initial() -> Self {
        Self {
            last: NormalizedPoint::CENTER,
        }
    }

    /// Most recent smoothed center.
    pub fn center(&self) -> NormalizedPoint {
        self.last
    }
}

impl Default for SmoothingState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Clamp a smoothing factor into `[0, 1]`.
pub fn sanitize_smoothing(smoothing: f64) -> f64 {
    if smoothing.is_nan() {
        warn!("Smoothing factor is NaN, using 0.7");
        return 0.7;
    }
    if !(0.0..=1.0).contains(&smoothing) {
        warn!(smoothing, "Smoothing factor outside [0, 1], clamping");
    }
    smoothing.clamp(0.0, 1.0)
}

/// Advance the fold by one sampled frame.
///
/// `raw` is the primary subject center of the frame, or `None` when the frame
/// could not be read, in which case the previous center is carried over.
pub fn smooth_step(
    state: SmoothingState,
    raw: Option<NormalizedPoint>,
    smoothing: f64,
) -> SmoothingState {
    let Some(raw) = raw else {
        return state;
    };

    let prev = state.last;
    SmoothingState {
        last: NormalizedPoint::new(
            smoothing * prev.x + (1.0 - smoothing) * raw.x,
            smoothing * prev.y + (1.0 - smoothing) * raw.y,
        ),
    }
}

/// Smooth a whole sequence of raw sample centers.
pub fn smooth_trajectory(raw: &[Option<NormalizedPoint>], smoothing: f64) -> Vec<NormalizedPoint> {
    let smoothing = sanitize_smoothing(smoothing);
    raw.iter()
        .scan(SmoothingState::initial(), |state, sample| {
            *state = smooth_step(*state, *sample, smoothing);
            Some(state.center())
        })
        .collect()
}
