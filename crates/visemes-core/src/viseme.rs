//! Viseme set and weight vectors.
//!
//! The viseme order follows the 15-viseme set common to lip-sync engines, extended with a
//! laughter slot at the end:
//!
//! | Index | Viseme | Index | Viseme |
//! |---|---|---|---|
//! | 0 | `sil` | 8 | `nn` |
//! | 1 | `PP` | 9 | `RR` |
//! | 2 | `FF` | 10 | `aa` |
//! | 3 | `TH` | 11 | `E` |
//! | 4 | `DD` | 12 | `ih` |
//! | 5 | `kk` | 13 | `oh` |
//! | 6 | `CH` | 14 | `ou` |
//! | 7 | `SS` | 15 | `laugh` |

use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// Number of weights in a [`VisemeWeights`] vector.
pub const VISEME_COUNT: usize = 16;

/// Index of the laughter weight. Inference models do not produce it.
pub const LAUGHTER_INDEX: usize = 15;

/// Named viseme slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Viseme {
    Silence,
    PP,
    FF,
    TH,
    DD,
    KK,
    CH,
    SS,
    NN,
    RR,
    AA,
    E,
    IH,
    OH,
    OU,
    Laughter,
}

impl Viseme {
    pub const ALL: [Viseme; VISEME_COUNT] = [
        Viseme::Silence,
        Viseme::PP,
        Viseme::FF,
        Viseme::TH,
        Viseme::DD,
        Viseme::KK,
        Viseme::CH,
        Viseme::SS,
        Viseme::NN,
        Viseme::RR,
        Viseme::AA,
        Viseme::E,
        Viseme::IH,
        Viseme::OH,
        Viseme::OU,
        Viseme::Laughter,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Viseme::Silence => "sil",
            Viseme::PP => "PP",
            Viseme::FF => "FF",
            Viseme::TH => "TH",
            Viseme::DD => "DD",
            Viseme::KK => "kk",
            Viseme::CH => "CH",
            Viseme::SS => "SS",
            Viseme::NN => "nn",
            Viseme::RR => "RR",
            Viseme::AA => "aa",
            Viseme::E => "E",
            Viseme::IH => "ih",
            Viseme::OH => "oh",
            Viseme::OU => "ou",
            Viseme::Laughter => "laugh",
        }
    }
}

/// One frame of viseme blend weights, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisemeWeights([f32; VISEME_COUNT]);

impl VisemeWeights {
    /// All weights zero.
    pub const fn zero() -> Self {
        Self([0.0; VISEME_COUNT])
    }

    /// The deterministic silence vector: `sil = 1`, everything else 0.
    pub fn silence() -> Self {
        let mut weights = [0.0; VISEME_COUNT];
        weights[0] = 1.0;
        Self(weights)
    }

    pub fn from_array(weights: [f32; VISEME_COUNT]) -> Self {
        Self(weights)
    }

    /// Builds weights from model output in viseme order.
    ///
    /// Missing trailing entries (e.g. the laughter slot) are zero, extra entries are ignored.
    pub fn from_model_output(values: &[f32]) -> Self {
        let mut weights = [0.0; VISEME_COUNT];
        for (dst, src) in weights.iter_mut().zip(values) {
            *dst = *src;
        }
        Self(weights)
    }

    pub fn get(&self, viseme: Viseme) -> f32 {
        self.0[viseme.index()]
    }

    pub fn set(&mut self, viseme: Viseme, value: f32) {
        self.0[viseme.index()] = value;
    }

    pub fn as_array(&self) -> &[f32; VISEME_COUNT] {
        &self.0
    }

    /// Replaces NaN with 0 and clamps every weight into [0, 1].
    pub fn sanitize(&mut self) {
        for w in self.0.iter_mut() {
            *w = if w.is_nan() { 0.0 } else { w.clamp(0.0, 1.0) };
        }
    }

    pub fn is_normalized(&self) -> bool {
        self.0.iter().all(|w| (0.0..=1.0).contains(w))
    }

    pub fn is_silence(&self) -> bool {
        *self == Self::silence()
    }

    /// Exponential smoothing towards `self`: `prev * s + self * (1 - s)`.
    pub fn smoothed_from(&self, prev: &VisemeWeights, smoothing: f32) -> Self {
        let mut out = [0.0; VISEME_COUNT];
        for (i, o) in out.iter_mut().enumerate() {
            *o = prev.0[i] * smoothing + self.0[i] * (1.0 - smoothing);
        }
        Self(out)
    }

    /// The viseme with the largest weight.
    pub fn dominant(&self) -> Viseme {
        let mut best = 0;
        for (i, w) in self.0.iter().enumerate() {
            if *w > self.0[best] {
                best = i;
            }
        }
        Viseme::ALL[best]
    }

    /// Copies all weights into the first [`VISEME_COUNT`] entries of `out`.
    ///
    /// Returns false without writing when `out` is too short.
    pub fn write_into(&self, out: &mut [f32]) -> bool {
        match out.get_mut(..VISEME_COUNT) {
            Some(dst) => {
                dst.copy_from_slice(&self.0);
                true
            }
            None => false,
        }
    }
}

impl Default for VisemeWeights {
    fn default() -> Self {
        Self::silence()
    }
}

impl Deref for VisemeWeights {
    type Target = [f32; VISEME_COUNT];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for VisemeWeights {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Writes the silence vector into a host buffer of any length.
///
/// Buffers shorter than [`VISEME_COUNT`] get as much of the vector as fits; an empty buffer
/// is left alone.
pub fn write_silence(out: &mut [f32]) {
    if out.is_empty() {
        return;
    }
    out.fill(0.0);
    out[0] = 1.0;
}

/// What happens to the laughter slot after inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaughterPolicy {
    /// Keep whatever the backend produced.
    #[default]
    Passthrough,
    /// Always write 0.
    ForceZero,
    /// Leave the value already in the caller's buffer.
    KeepPrior,
}

impl LaughterPolicy {
    /// Applies the policy to freshly inferred weights. `prior` is the caller's buffer
    /// before this frame was written.
    pub fn apply(self, weights: &mut VisemeWeights, prior: &[f32]) {
        match self {
            LaughterPolicy::Passthrough => {}
            LaughterPolicy::ForceZero => weights[LAUGHTER_INDEX] = 0.0,
            LaughterPolicy::KeepPrior => {
                if let Some(v) = prior.get(LAUGHTER_INDEX) {
                    weights[LAUGHTER_INDEX] = *v;
                }
            }
        }
    }
}
