//! Audio feature extraction
//!
//! The audio path decodes the input to mono PCM through ffmpeg and computes
//! short-time features over 0.5s frames advanced by 0.25s hops: RMS loudness,
//! zero-crossing rate, spectral centroid/bandwidth, a cepstral variance
//! summary of timbre, a loudness derivative, and a single beat-density scalar.

use std::f32::consts::PI;
use std::path::Path;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use tracing::info;

use crate::error::ClipResult;
use crate::export::retry::{run_with_retry, RetryPolicy};
use crate::tools::{ToolCommand, ToolRunner};

/// Raw audio-derived signal arrays (not normalized; the scorer does that)
#[derive(Debug, Clone)]
pub struct AudioFeatures {
    pub loudness: Vec<f32>,
    pub zcr: Vec<f32>,
    pub centroid: Vec<f32>,
    pub bandwidth: Vec<f32>,
    pub timbre_var: Vec<f32>,
    pub loudness_delta: Vec<f32>,
    /// Estimated beats per second over the whole file
    pub beat_density: f32,
    pub duration_sec: f64,
}

/// Frame length in seconds for short-time analysis
const FRAME_SEC: f64 = 0.5;
/// Hop between consecutive frames in seconds
const HOP_SEC: f64 = 0.25;
/// Number of cepstral coefficients summarized into the timbre variance
const CEPSTRAL_COEFFS: usize = 13;

/// Decode the input's audio track to mono f32 samples at `sample_rate`.
///
/// The decode is an external tool call, so transient failures are retried
/// under `retry` like any export stage.
pub fn extract_audio_samples(
    runner: &dyn ToolRunner,
    input: &Path,
    sample_rate: u32,
    retry: &RetryPolicy,
) -> ClipResult<Vec<f32>> {
    let tmp = tempfile::Builder::new()
        .prefix("clipsmith-audio-")
        .suffix(".pcm")
        .tempfile()?;
    let pcm_path = tmp.path().display().to_string();

    info!("Extracting audio to temp file: {}", pcm_path);
    let cmd = ToolCommand::new("ffmpeg").args([
        "-y",
        "-i",
        &input.display().to_string(),
        "-vn",
        "-ac",
        "1",
        "-ar",
        &sample_rate.to_string(),
        "-f",
        "s16le",
        &pcm_path,
    ]);
    run_with_retry(runner, retry, "audio_decode", &cmd)?;

    let bytes = std::fs::read(tmp.path())?;
    let samples: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();
    info!("Loaded audio: {} samples at {}Hz", samples.len(), sample_rate);
    Ok(samples)
}

/// Compute all audio features from decoded samples. Pure; no I/O.
pub fn compute_features(samples: &[f32], sample_rate: u32) -> AudioFeatures {
    let frame_len = (FRAME_SEC * sample_rate as f64) as usize;
    let hop_len = (HOP_SEC * sample_rate as f64) as usize;
    let duration_sec = samples.len() as f64 / sample_rate as f64;

    if samples.is_empty() {
        // Degenerate input: one zero-valued frame so downstream lookups clamp
        return AudioFeatures {
            loudness: vec![0.0],
            zcr: vec![0.0],
            centroid: vec![0.0],
            bandwidth: vec![0.0],
            timbre_var: vec![0.0],
            loudness_delta: vec![0.0],
            beat_density: 0.0,
            duration_sec: 0.0,
        };
    }

    let fft_len = frame_len.next_power_of_two();
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(fft_len);
    let ifft = planner.plan_fft_inverse(fft_len);
    let bin_hz = sample_rate as f32 / fft_len as f32;
    let hann: Vec<f32> = (0..frame_len)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / frame_len as f32).cos())
        .collect();

    let mut loudness = Vec::new();
    let mut zcr = Vec::new();
    let mut centroid = Vec::new();
    let mut bandwidth = Vec::new();
    let mut timbre_var = Vec::new();

    let mut start = 0;
    while start < samples.len() {
        let end = (start + frame_len).min(samples.len());
        let frame = &samples[start..end];

        loudness.push(frame_rms(frame));
        zcr.push(frame_zcr(frame));

        let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); fft_len];
        for (i, &sample) in frame.iter().enumerate() {
            buffer[i] = Complex::new(sample * hann[i], 0.0);
        }
        fft.process(&mut buffer);

        let half = fft_len / 2;
        let mags: Vec<f32> = buffer[..half].iter().map(|c| c.norm()).collect();
        let (c, b) = spectral_moments(&mags, bin_hz);
        centroid.push(c);
        bandwidth.push(b);

        // Real cepstrum: inverse transform of the log magnitude spectrum
        let mut log_spec: Vec<Complex<f32>> = buffer
            .iter()
            .map(|c| Complex::new((c.norm() + 1e-10).ln(), 0.0))
            .collect();
        ifft.process(&mut log_spec);
        let coeffs: Vec<f32> = log_spec[1..=CEPSTRAL_COEFFS]
            .iter()
            .map(|c| c.re / fft_len as f32)
            .collect();
        timbre_var.push(variance(&coeffs));

        start += hop_len;
    }

    let loudness_delta = loudness_derivative(&loudness);
    let beat_density = estimate_beat_density(&loudness, duration_sec);

    AudioFeatures {
        loudness,
        zcr,
        centroid,
        bandwidth,
        timbre_var,
        loudness_delta,
        beat_density,
        duration_sec,
    }
}

fn frame_rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
}

fn frame_zcr(frame: &[f32]) -> f32 {
    if frame.len() < 2 {
        return 0.0;
    }
    let crossings = frame
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    crossings as f32 / frame.len() as f32
}

/// Spectral centroid and bandwidth from a magnitude spectrum
fn spectral_moments(mags: &[f32], bin_hz: f32) -> (f32, f32) {
    let total: f32 = mags.iter().sum::<f32>() + 1e-10;
    let centroid = mags
        .iter()
        .enumerate()
        .map(|(k, &m)| k as f32 * bin_hz * m)
        .sum::<f32>()
        / total;
    let spread = mags
        .iter()
        .enumerate()
        .map(|(k, &m)| {
            let delta = k as f32 * bin_hz - centroid;
            m * delta * delta
        })
        .sum::<f32>()
        / total;
    (centroid, spread.sqrt())
}

fn variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / values.len() as f32
}

/// Absolute frame-to-frame loudness difference; the first frame is seeded
/// with itself, so its derivative is zero.
fn loudness_derivative(loudness: &[f32]) -> Vec<f32> {
    let mut delta = Vec::with_capacity(loudness.len());
    for (i, &value) in loudness.iter().enumerate() {
        if i == 0 {
            delta.push(0.0);
        } else {
            delta.push((value - loudness[i - 1]).abs());
        }
    }
    delta
}

/// Beat density = estimated beat count / (duration + ε).
///
/// Beats are approximated as local maxima of the positive loudness
/// derivative that rise above mean + one standard deviation of the onset
/// envelope.
fn estimate_beat_density(loudness: &[f32], duration_sec: f64) -> f32 {
    if loudness.len() < 3 || duration_sec <= 0.0 {
        return 0.0;
    }
    let onset: Vec<f32> = loudness
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).max(0.0))
        .collect();
    let mean = onset.iter().sum::<f32>() / onset.len() as f32;
    let std = variance(&onset).sqrt();
    let threshold = mean + std;

    let mut beats = 0usize;
    for i in 1..onset.len() - 1 {
        if onset[i] > threshold && onset[i] > onset[i - 1] && onset[i] >= onset[i + 1] {
            beats += 1;
        }
    }
    (beats as f64 / (duration_sec + 1e-9)) as f32
}
