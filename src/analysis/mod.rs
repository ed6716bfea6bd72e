//! Clip suggestion engine
//!
//! Scans a video file and suggests clip ranges with heuristic
//! "interestingness" scores fused from audio and visual signals. The audio
//! pass and the two visual passes are independent and run concurrently; the
//! scorer fuses their outputs once all three finish.

pub mod audio;
pub mod scoring;
pub mod selector;
pub mod visual;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::clips::Clip;
use crate::config::PerformanceConfig;
use crate::error::{ClipError, ClipResult};
use crate::export::retry::RetryPolicy;
use crate::probe;
use crate::tools::ToolRunner;
use scoring::{ScoreStrategy, WeightedScore, WindowScorer};
use selector::ScoredWindow;

/// All raw signal arrays extracted from one input file.
///
/// Audio arrays are raw (normalized later by the scorer); visual arrays are
/// already min-max normalized per-bucket. Immutable after extraction.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub loudness: Vec<f32>,
    pub zcr: Vec<f32>,
    pub centroid: Vec<f32>,
    pub bandwidth: Vec<f32>,
    pub timbre_var: Vec<f32>,
    pub loudness_delta: Vec<f32>,
    pub beat_density: f32,
    /// Scene-change magnitude per stride bucket, normalized
    pub scene_change: Vec<f32>,
    /// Motion magnitude per stride bucket, normalized
    pub motion: Vec<f32>,
    pub duration_sec: f64,
    pub sample_rate: u32,
    pub hop_length: usize,
}

/// Tunables for one suggestion pass
#[derive(Debug, Clone)]
pub struct SuggestionParams {
    /// Window duration in seconds
    pub window_sec: f64,
    /// Offset between consecutive window starts
    pub stride_sec: f64,
    /// Audio analysis sample rate
    pub sample_rate: u32,
    /// Maximum number of suggested clips
    pub max_clips: usize,
    /// Margin added when testing accepted windows for conflicts
    pub allowed_overlap_sec: f64,
}

impl Default for SuggestionParams {
    fn default() -> Self {
        Self {
            window_sec: 20.0,
            stride_sec: 5.0,
            sample_rate: 16_000,
            max_clips: 5,
            allowed_overlap_sec: 1.0,
        }
    }
}

/// Runs feature extraction, scoring, and selection for one video
pub struct Analyzer {
    runner: Arc<dyn ToolRunner>,
    perf: PerformanceConfig,
    strategy: Arc<dyn ScoreStrategy>,
    retry: RetryPolicy,
}

impl Analyzer {
    pub fn new(runner: Arc<dyn ToolRunner>, perf: PerformanceConfig) -> Self {
        Self {
            runner,
            perf,
            strategy: Arc::new(WeightedScore::default()),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the default fixed-weight fusion with a custom strategy
    pub fn with_strategy(mut self, strategy: Arc<dyn ScoreStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Override the attempt budget for extraction tool calls
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Analyze the video and return suggested clips, best first
    pub async fn suggest_clips(
        &self,
        input: &Path,
        params: &SuggestionParams,
    ) -> ClipResult<Vec<Clip>> {
        info!("Starting analysis of {}", input.display());

        let media = {
            let runner = self.runner.clone();
            let input = input.to_path_buf();
            tokio::task::spawn_blocking(move || probe::probe_media(runner.as_ref(), &input))
                .await
                .map_err(join_error)??
        };
        info!(
            "Duration: {:.2}s, window: {}s, stride: {}s",
            media.duration_sec, params.window_sec, params.stride_sec
        );

        let features = self.extract_features(input, media.duration_sec, media.fps, params).await?;
        let clips = self.score_and_select(&features, params);
        info!("Suggested top {} clips", clips.len());
        for (index, clip) in clips.iter().enumerate() {
            info!(
                "  [{}] {}ms -> {}ms | Score: {:.4}",
                index + 1,
                clip.start_ms,
                clip.end_ms,
                clip.score
            );
        }
        Ok(clips)
    }

    /// Run the three extraction passes concurrently and assemble the result
    pub async fn extract_features(
        &self,
        input: &Path,
        duration_sec: f64,
        fps: f64,
        params: &SuggestionParams,
    ) -> ClipResult<FeatureSet> {
        let sample_rate = params.sample_rate;
        let stride_sec = params.stride_sec;
        let frame_skip = self.perf.frame_skip(fps);
        let parallel_visual = self.perf.max_analysis_workers > 1;

        let audio_task = {
            let runner = self.runner.clone();
            let input = input.to_path_buf();
            let retry = self.retry.clone();
            tokio::task::spawn_blocking(move || {
                let samples =
                    audio::extract_audio_samples(runner.as_ref(), &input, sample_rate, &retry)?;
                Ok::<_, ClipError>(audio::compute_features(&samples, sample_rate))
            })
        };

        let visual_task = {
            let input = input.to_path_buf();
            let retry = self.retry.clone();
            tokio::task::spawn_blocking(move || {
                visual::visual_passes(
                    &input,
                    duration_sec,
                    stride_sec,
                    fps,
                    frame_skip,
                    parallel_visual,
                    &retry,
                )
            })
        };

        let audio_features = audio_task.await.map_err(join_error)??;
        let (scene_change, motion) = visual_task.await.map_err(join_error)??;

        Ok(FeatureSet {
            loudness: audio_features.loudness,
            zcr: audio_features.zcr,
            centroid: audio_features.centroid,
            bandwidth: audio_features.bandwidth,
            timbre_var: audio_features.timbre_var,
            loudness_delta: audio_features.loudness_delta,
            beat_density: audio_features.beat_density,
            scene_change,
            motion,
            duration_sec,
            sample_rate,
            hop_length: (sample_rate as f64 * 0.25) as usize,
        })
    }

    /// Score every window and pick the top non-overlapping set. Pure.
    pub fn score_and_select(&self, features: &FeatureSet, params: &SuggestionParams) -> Vec<Clip> {
        let scorer = WindowScorer::new(features);
        let windows: Vec<ScoredWindow> =
            selector::enumerate_windows(features.duration_sec, params.window_sec, params.stride_sec)
                .into_iter()
                .map(|(start, end)| {
                    let wf = scorer.window_features(start, end, params.stride_sec);
                    ScoredWindow {
                        start_ms: (start * 1000.0) as u64,
                        end_ms: (end * 1000.0) as u64,
                        score: self.strategy.score(&wf),
                    }
                })
                .collect();

        selector::select_top_windows(windows, params.max_clips, params.allowed_overlap_sec)
            .into_iter()
            .map(|w| Clip {
                start_ms: w.start_ms,
                end_ms: w.end_ms,
                score: w.score as f64,
            })
            .collect()
    }
}

fn join_error(e: tokio::task::JoinError) -> ClipError {
    ClipError::AnalysisError {
        message: format!("analysis task failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ProcessRunner;

    fn analyzer() -> Analyzer {
        Analyzer::new(Arc::new(ProcessRunner::new()), PerformanceConfig::default())
    }

    fn feature_set(duration_sec: f64, frames: usize) -> FeatureSet {
        FeatureSet {
            loudness: (0..frames).map(|i| 0.05 + (i % 10) as f32 * 0.05).collect(),
            zcr: vec![0.1; frames],
            centroid: (0..frames).map(|i| 500.0 + i as f32).collect(),
            bandwidth: vec![400.0; frames],
            timbre_var: vec![0.2; frames],
            loudness_delta: vec![0.05; frames],
            beat_density: 1.0,
            scene_change: vec![0.3, 0.9, 0.1, 0.5],
            motion: vec![0.2, 0.8, 0.4, 0.6],
            duration_sec,
            sample_rate: 16_000,
            hop_length: 4000,
        }
    }

    #[test]
    fn test_score_and_select_respects_max_clips() {
        let features = feature_set(120.0, 480);
        let params = SuggestionParams {
            max_clips: 3,
            ..Default::default()
        };
        let clips = analyzer().score_and_select(&features, &params);
        assert!(clips.len() <= 3);
        assert!(!clips.is_empty());
        for clip in &clips {
            assert!(clip.end_ms > clip.start_ms);
        }
    }

    #[test]
    fn test_score_and_select_short_video_is_empty() {
        let features = feature_set(15.0, 60);
        let clips = analyzer().score_and_select(&features, &SuggestionParams::default());
        assert!(clips.is_empty());
    }

    #[test]
    fn test_suggestions_sorted_best_first() {
        let features = feature_set(120.0, 480);
        let clips = analyzer().score_and_select(&features, &SuggestionParams::default());
        for pair in clips.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}
