//! Audio frame helpers.

/// Samples at or below this magnitude count as silence.
pub const SILENCE_THRESHOLD: f32 = 1e-6;

/// Peak absolute amplitude of a frame.
#[inline]
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

/// True when every sample is within [`SILENCE_THRESHOLD`] of zero.
///
/// An empty frame is not considered silent; it is invalid input.
#[inline]
pub fn is_silent(samples: &[f32]) -> bool {
    !samples.is_empty() && samples.iter().all(|s| s.abs() <= SILENCE_THRESHOLD)
}
