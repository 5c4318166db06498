//! Splitting a long delay across capacity-bounded delay nodes.

/// Slack (in units of capacity) below which a remainder counts as float noise
/// rather than a real segment. Keeps `2.0000001 / 1.0` at two segments.
const SEGMENT_TOLERANCE: f32 = 1e-5;

/// Number of delay nodes needed to hold `duration` at `capacity` per node.
///
/// Returns 0 when either value is non-positive or non-finite.
pub fn segment_count(duration: f32, capacity: f32) -> usize {
    if !(duration.is_finite() && duration > 0.0 && capacity.is_finite() && capacity > 0.0) {
        return 0;
    }
    let ratio = duration / capacity;
    ((ratio - SEGMENT_TOLERANCE).ceil() as usize).max(1)
}

/// Greedy front-filled segmentation: every segment is a full `capacity`
/// except the last, which carries the remainder.
///
/// `segment(2.5, 1.0) == [1.0, 1.0, 0.5]`. Empty when `duration <= 0`.
pub fn segment(duration: f32, capacity: f32) -> Vec<f32> {
    let count = segment_count(duration, capacity);
    if count == 0 {
        return Vec::new();
    }

    let mut segments = vec![capacity; count];
    let remainder = duration - capacity * (count - 1) as f32;
    segments[count - 1] = remainder.min(capacity);
    segments
}
