//! Tolerance constants for weight comparisons.

/// Exact operations (copies, silence vectors).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Smoothing blends accumulate a little rounding per frame.
pub const SMOOTHING_EPSILON: f32 = 1e-5;
