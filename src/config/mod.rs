//! Configuration structures
//!
//! All tunables are plain values resolved once at startup (TOML file and/or
//! CLI flags) and passed into the engine; no component reads the environment
//! or a config file after construction.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ClipError, ClipResult};

/// Performance-related settings for analysis and export
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Parallel clip exports (None = min(cpu count, 4))
    pub max_export_workers: Option<usize>,
    /// Frames to skip during motion analysis (None = derive from fps)
    pub analysis_frame_skip: Option<u32>,
    /// Parallel workers for the independent analysis passes
    pub max_analysis_workers: usize,
    /// Transcription device ("cpu" or "cuda")
    pub whisper_device: String,
    /// Transcription compute precision ("int8", "int16", or "float32")
    pub whisper_compute_type: String,
    /// FFmpeg encoding preset
    pub ffmpeg_preset: String,
    /// Constant Rate Factor (18-28, lower = better quality)
    pub ffmpeg_crf: u8,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_export_workers: None,
            analysis_frame_skip: None,
            max_analysis_workers: 2,
            whisper_device: "cpu".to_string(),
            whisper_compute_type: "int8".to_string(),
            ffmpeg_preset: "ultrafast".to_string(),
            ffmpeg_crf: 23,
        }
    }
}

impl PerformanceConfig {
    /// Worker count for clip export, capped to avoid overwhelming the system
    pub fn export_workers(&self) -> usize {
        self.max_export_workers
            .unwrap_or_else(|| num_cpus::get().min(4))
            .max(1)
    }

    /// Motion-pass frame skip: configured value, or roughly two samples per second
    pub fn frame_skip(&self, fps: f64) -> u32 {
        match self.analysis_frame_skip {
            Some(skip) => skip.max(1),
            None => ((fps / 2.0) as u32).max(1),
        }
    }
}

/// Subtitle rendering style
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleStyle {
    pub words_per_line: usize,
    pub lines_per_event: usize,
    /// Fade in/out duration in milliseconds
    pub fade_ms: u32,
    pub font: String,
    pub font_size: u32,
    /// Packed ASS color codes (&HAABBGGRR)
    pub primary_color: String,
    pub secondary_color: String,
    pub outline_color: String,
    pub back_color: String,
    /// Transcription model size selector
    pub model_size: String,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            words_per_line: 5,
            lines_per_event: 2,
            fade_ms: 100,
            font: "Comic Sans MS".to_string(),
            font_size: 72,
            primary_color: "&H00FFFFFF".to_string(),
            secondary_color: "&H0000FFFF".to_string(),
            outline_color: "&H00000000".to_string(),
            back_color: "&H64000000".to_string(),
            model_size: "small".to_string(),
        }
    }
}

impl SubtitleStyle {
    /// Words displayed per subtitle event
    pub fn words_per_event(&self) -> usize {
        (self.words_per_line * self.lines_per_event).max(1)
    }
}

/// Top-level configuration file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub performance: PerformanceConfig,
    pub subtitles: SubtitleStyle,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> ClipResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ClipError::ConfigError {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        toml::from_str(&contents).map_err(|e| ClipError::ConfigError {
            message: format!("invalid config {}: {}", path.display(), e),
        })
    }

    /// Load from a file when given, otherwise defaults
    pub fn load(path: Option<&Path>) -> ClipResult<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }
}
