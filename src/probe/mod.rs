//! Media probing via ffprobe
//!
//! Extracts the handful of container facts the analysis and export stages
//! need: duration, video frame rate, and whether an audio track exists.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{ClipError, ClipResult};
use crate::tools::{ToolCommand, ToolRunner};

/// Summary of a probed media file
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Total duration in seconds
    pub duration_sec: f64,
    /// Average video frame rate
    pub fps: f64,
    /// Whether the file carries at least one audio stream
    pub has_audio: bool,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Probe a media file with ffprobe
pub fn probe_media(runner: &dyn ToolRunner, input: &Path) -> ClipResult<MediaInfo> {
    if !input.exists() {
        return Err(ClipError::InputFileNotFound {
            path: input.display().to_string(),
        });
    }

    let cmd = ToolCommand::new("ffprobe").args([
        "-v",
        "error",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
        &input.display().to_string(),
    ]);

    let output = runner.run(&cmd)?;
    if !output.success() {
        return Err(ClipError::ProbeError {
            message: output.stderr,
        });
    }

    let parsed: ProbeOutput =
        serde_json::from_str(&output.stdout).map_err(|e| ClipError::ProbeError {
            message: format!("unparseable ffprobe output: {}", e),
        })?;

    let info = interpret_probe(parsed)?;
    info!(
        "Probed {}: {:.2}s at {:.2} fps, audio: {}",
        input.display(),
        info.duration_sec,
        info.fps,
        info.has_audio
    );
    Ok(info)
}

fn interpret_probe(parsed: ProbeOutput) -> ClipResult<MediaInfo> {
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or_else(|| video.and_then(|s| s.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| ClipError::ProbeError {
            message: "no duration reported".to_string(),
        })?;

    let fps = video
        .and_then(|s| s.avg_frame_rate.as_deref())
        .and_then(parse_frame_rate)
        .unwrap_or(30.0);

    Ok(MediaInfo {
        duration_sec,
        fps,
        has_audio,
    })
}

/// Parse an ffprobe rational frame rate like `30000/1001`
fn parse_frame_rate(rate: &str) -> Option<f64> {
    if let Some((num, den)) = rate.split_once('/') {
        let num = num.parse::<f64>().ok()?;
        let den = den.parse::<f64>().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate.parse::<f64>().ok().filter(|&r| r > 0.0)
}
