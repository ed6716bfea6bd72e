//! Window normalization and score fusion
//!
//! Pure, deterministic math: raw signal arrays in, one fused scalar per
//! window out. No I/O happens here so every piece is unit-testable without
//! touching media files.

use super::FeatureSet;

/// Denominator guard for min-max normalization of constant arrays
pub const NORM_EPSILON: f32 = 1e-6;

/// Min-max normalize to roughly [0, 1]; constant input maps to 0
pub fn min_max_normalize(values: &[f32]) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min + NORM_EPSILON;
    values.iter().map(|v| (v - min) / range).collect()
}

/// Mean over `[start, end)` with saturation at the last valid index.
///
/// Signal arrays can be shorter than the window count (degenerate videos),
/// so out-of-range lookups clamp instead of failing.
pub fn mean_range(values: &[f32], start: usize, end: usize) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let last = values.len() - 1;
    let lo = start.min(last);
    let hi = end.clamp(lo + 1, values.len());
    values[lo..hi].iter().sum::<f32>() / (hi - lo) as f32
}

/// Normalized per-window signal means handed to a scoring strategy
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowFeatures {
    pub loudness: f32,
    pub zcr: f32,
    pub centroid: f32,
    pub bandwidth: f32,
    pub timbre_var: f32,
    pub beat_density: f32,
    pub loudness_delta: f32,
    pub scene_change: f32,
    pub motion: f32,
    /// Raw (pre-normalization) mean loudness, used for the silence check
    pub raw_loudness: f32,
}

/// Fuses per-window features into one interestingness score
pub trait ScoreStrategy: Send + Sync {
    fn score(&self, features: &WindowFeatures) -> f32;
}

/// Fixed-weight linear fusion with a silence penalty.
///
/// Weights sum to 1.0 excluding the penalty. They are design constants, not
/// learned; tunable here without touching the selector.
#[derive(Debug, Clone)]
pub struct WeightedScore {
    pub loudness: f32,
    pub zcr: f32,
    pub centroid: f32,
    pub bandwidth: f32,
    pub timbre_var: f32,
    pub beat_density: f32,
    pub loudness_delta: f32,
    pub scene_change: f32,
    pub motion: f32,
    /// Raw loudness below this counts as silence
    pub silence_threshold: f32,
    pub silence_penalty: f32,
}

impl Default for WeightedScore {
    fn default() -> Self {
        Self {
            loudness: 0.20,
            zcr: 0.10,
            centroid: 0.10,
            bandwidth: 0.10,
            timbre_var: 0.10,
            beat_density: 0.05,
            loudness_delta: 0.10,
            scene_change: 0.15,
            motion: 0.10,
            silence_threshold: 0.02,
            silence_penalty: -0.2,
        }
    }
}

impl ScoreStrategy for WeightedScore {
    fn score(&self, f: &WindowFeatures) -> f32 {
        let mut score = self.loudness * f.loudness
            + self.zcr * f.zcr
            + self.centroid * f.centroid
            + self.bandwidth * f.bandwidth
            + self.timbre_var * f.timbre_var
            + self.beat_density * f.beat_density
            + self.loudness_delta * f.loudness_delta
            + self.scene_change * f.scene_change
            + self.motion * f.motion;
        if f.raw_loudness < self.silence_threshold {
            score += self.silence_penalty;
        }
        score
    }
}

/// Computes per-window features against a feature set.
///
/// Audio arrays are normalized once at construction; visual arrays arrive
/// already normalized from the extractor.
pub struct WindowScorer<'a> {
    features: &'a FeatureSet,
    loudness: Vec<f32>,
    zcr: Vec<f32>,
    centroid: Vec<f32>,
    bandwidth: Vec<f32>,
    timbre_var: Vec<f32>,
    loudness_delta: Vec<f32>,
}

impl<'a> WindowScorer<'a> {
    pub fn new(features: &'a FeatureSet) -> Self {
        Self {
            loudness: min_max_normalize(&features.loudness),
            zcr: min_max_normalize(&features.zcr),
            centroid: min_max_normalize(&features.centroid),
            bandwidth: min_max_normalize(&features.bandwidth),
            timbre_var: min_max_normalize(&features.timbre_var),
            loudness_delta: min_max_normalize(&features.loudness_delta),
            features,
        }
    }

    /// Sample index for a point in time: floor(t * sr / hop)
    fn sample_index(&self, time_sec: f64) -> usize {
        (time_sec * self.features.sample_rate as f64 / self.features.hop_length as f64) as usize
    }

    /// Per-window feature means for `[start_sec, end_sec)`
    pub fn window_features(&self, start_sec: f64, end_sec: f64, stride_sec: f64) -> WindowFeatures {
        let i0 = self.sample_index(start_sec);
        let i1 = self.sample_index(end_sec);
        let b0 = (start_sec / stride_sec) as usize;
        let b1 = (end_sec / stride_sec) as usize;

        WindowFeatures {
            loudness: mean_range(&self.loudness, i0, i1),
            zcr: mean_range(&self.zcr, i0, i1),
            centroid: mean_range(&self.centroid, i0, i1),
            bandwidth: mean_range(&self.bandwidth, i0, i1),
            timbre_var: mean_range(&self.timbre_var, i0, i1),
            beat_density: self.features.beat_density,
            loudness_delta: mean_range(&self.loudness_delta, i0, i1),
            scene_change: mean_range(&self.features.scene_change, b0, b1),
            motion: mean_range(&self.features.motion, b0, b1),
            raw_loudness: mean_range(&self.features.loudness, i0, i1),
        }
    }
}
