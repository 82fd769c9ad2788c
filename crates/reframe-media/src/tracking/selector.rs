//! Primary subject selection.

use std::cmp::Ordering;

use super::models::Detection;

/// Pick the primary subject of a frame.
///
/// Lowest priority number wins; among equal priorities the larger normalized
/// area wins. An empty slice yields [`Detection::no_subject`].
pub fn select_primary(detections: &[Detection]) -> Detection {
    detections
        .iter()
        .min_by(|a, b| compare_candidates(a, b))
        .cloned()
        .unwrap_or_else(Detection::no_subject)
}

fn compare_candidates(a: &Detection, b: &Detection) -> Ordering {
    a.priority()
        .cmp(&b.priority())
        .then_with(|| b.area().partial_cmp(&a.area()).unwrap_or(Ordering::Equal))
}
