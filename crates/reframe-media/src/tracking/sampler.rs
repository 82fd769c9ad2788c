//! Frame sampling at a fixed stride.

use serde::{Deserialize, Serialize};

/// One detection sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleInstant {
    /// Position of this sample in the sample sequence
    pub index: usize,
    /// Source frame index (`index * frame_skip`)
    pub frame_index: usize,
    /// Timestamp in seconds
    pub time: f64,
}

/// Number of output frames for a video of `duration` seconds at `fps`.
///
/// Never less than one, so a degenerate single-frame clip still yields a
/// center.
pub fn total_frame_count(duration: f64, fps: f64) -> usize {
    if !(duration.is_finite() && fps.is_finite()) || duration <= 0.0 || fps <= 0.0 {
        return 1;
    }
    ((duration * fps).round() as usize).max(1)
}

/// Sample instants `t_k = k * frame_skip / fps` for all `t_k < duration`.
///
/// The first frame is always sampled, even for zero-length input.
pub fn sample_instants(duration: f64, fps: f64, frame_skip: usize) -> Vec<SampleInstant> {
    let frame_skip = frame_skip.max(1);
    let first = SampleInstant {
        index: 0,
        frame_index: 0,
        time: 0.0,
    };

    if !(duration.is_finite() && fps.is_finite()) || fps <= 0.0 {
        return vec![first];
    }

    let mut samples = vec![first];
    let mut k = 1;
    loop {
        let frame_index = k * frame_skip;
        let time = frame_index as f64 / fps;
        if time >= duration {
            break;
        }
        samples.push(SampleInstant {
            index: k,
            frame_index,
            time,
        });
        k += 1;
    }

    samples
}
