//! Visual feature extraction
//!
//! Two independent full-file passes over ffmpeg-decoded grayscale frames:
//! a scene-change pass (Bhattacharyya distance between consecutive intensity
//! histograms) and a motion pass (mean absolute pixel difference between
//! sampled frames). Both accumulate into per-stride buckets and are min-max
//! normalized before scoring.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{info, warn};

use super::scoring::min_max_normalize;
use crate::error::{ClipError, ClipResult};
use crate::export::retry::{retry_stage, RetryPolicy};

/// Decode resolution for the scene-change pass
const SCENE_WIDTH: usize = 160;
const SCENE_HEIGHT: usize = 90;
/// Intensity histogram bins (256 levels / 4)
const HIST_BINS: usize = 64;
/// Decode resolution for the motion pass
const MOTION_WIDTH: usize = 64;
const MOTION_HEIGHT: usize = 36;

/// Run both visual passes, optionally in parallel.
///
/// Each pass is a full-file decode through an external tool, so it gets its
/// own per-pass attempt budget from `retry`.
pub fn visual_passes(
    input: &Path,
    duration_sec: f64,
    stride_sec: f64,
    fps: f64,
    frame_skip: u32,
    parallel: bool,
    retry: &RetryPolicy,
) -> ClipResult<(Vec<f32>, Vec<f32>)> {
    let scene = || {
        retry_stage(retry, "scene_pass", || {
            scene_change_pass(input, duration_sec, stride_sec, fps)
        })
    };
    let motion = || {
        retry_stage(retry, "motion_pass", || {
            motion_pass(input, duration_sec, stride_sec, fps, frame_skip)
        })
    };

    if parallel {
        std::thread::scope(|scope| {
            let scene_handle = scope.spawn(scene);
            let motion = motion();
            let scene = scene_handle.join().map_err(|_| ClipError::AnalysisError {
                message: "scene-change pass panicked".to_string(),
            })?;
            Ok((scene?, motion?))
        })
    } else {
        Ok((scene()?, motion()?))
    }
}

/// Scene-change magnitude per stride bucket, normalized to [0, 1]
pub fn scene_change_pass(
    input: &Path,
    duration_sec: f64,
    stride_sec: f64,
    fps: f64,
) -> ClipResult<Vec<f32>> {
    let filter = format!("scale={}:{}", SCENE_WIDTH, SCENE_HEIGHT);
    let mut buckets = new_buckets(duration_sec, stride_sec);
    let mut prev_hist: Option<Vec<f32>> = None;

    let frames = stream_gray_frames(
        input,
        &filter,
        SCENE_WIDTH * SCENE_HEIGHT,
        |index, frame| {
            let hist = gray_histogram(frame);
            if let Some(prev) = &prev_hist {
                let distance = bhattacharyya(prev, &hist);
                let time_sec = index as f64 / fps.max(1e-6);
                accumulate(&mut buckets, time_sec, stride_sec, distance);
            }
            prev_hist = Some(hist);
        },
    )?;

    if frames < 2 {
        // Zero- or one-frame video: degrade to a single zero bucket
        return Ok(vec![0.0]);
    }
    info!("Scene-change pass processed {} frames", frames);
    Ok(min_max_normalize(&buckets))
}

/// Motion magnitude per stride bucket, normalized to [0, 1].
///
/// Only every `frame_skip`-th frame is decoded, targeting roughly two
/// samples per second of source.
pub fn motion_pass(
    input: &Path,
    duration_sec: f64,
    stride_sec: f64,
    fps: f64,
    frame_skip: u32,
) -> ClipResult<Vec<f32>> {
    let skip = frame_skip.max(1);
    let filter = format!(
        "select=not(mod(n\\,{})),scale={}:{}",
        skip, MOTION_WIDTH, MOTION_HEIGHT
    );
    let mut buckets = new_buckets(duration_sec, stride_sec);
    let mut prev_frame: Option<Vec<u8>> = None;

    let frames = stream_gray_frames(
        input,
        &filter,
        MOTION_WIDTH * MOTION_HEIGHT,
        |index, frame| {
            if let Some(prev) = &prev_frame {
                let diff = mean_abs_diff(prev, frame);
                let time_sec = (index * skip as usize) as f64 / fps.max(1e-6);
                accumulate(&mut buckets, time_sec, stride_sec, diff);
            }
            prev_frame = Some(frame.to_vec());
        },
    )?;

    if frames < 2 {
        return Ok(vec![0.0]);
    }
    info!("Motion pass processed {} sampled frames", frames);
    Ok(min_max_normalize(&buckets))
}

/// Spawn ffmpeg decoding the input to raw grayscale frames and feed each
/// complete frame to the callback. Returns the number of frames decoded.
fn stream_gray_frames(
    input: &Path,
    filter: &str,
    frame_bytes: usize,
    mut on_frame: impl FnMut(usize, &[u8]),
) -> ClipResult<usize> {
    let mut child = Command::new("ffmpeg")
        .args([
            "-v",
            "error",
            "-i",
            &input.display().to_string(),
            "-vf",
            filter,
            "-vsync",
            "0",
            "-pix_fmt",
            "gray",
            "-f",
            "rawvideo",
            "pipe:1",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut stdout = child.stdout.take().ok_or_else(|| ClipError::AnalysisError {
        message: "ffmpeg stdout unavailable".to_string(),
    })?;

    let mut frame = vec![0u8; frame_bytes];
    let mut frames = 0usize;
    while read_exact_or_eof(&mut stdout, &mut frame)? {
        on_frame(frames, &frame);
        frames += 1;
    }

    let mut stderr_text = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_string(&mut stderr_text);
    }
    let status = child.wait()?;
    if !status.success() {
        if frames == 0 {
            return Err(ClipError::ToolFailed {
                tool: "ffmpeg".to_string(),
                status: status.code().unwrap_or(-1),
                stderr: stderr_text,
            });
        }
        warn!(
            "ffmpeg decode exited nonzero after {} frames: {}",
            frames,
            stderr_text.trim()
        );
    }
    Ok(frames)
}

/// Fill `buf` completely, or return false on clean EOF at a frame boundary
fn read_exact_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> ClipResult<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            // Partial trailing frame is discarded
            return Ok(false);
        }
        filled += n;
    }
    Ok(true)
}

fn new_buckets(duration_sec: f64, stride_sec: f64) -> Vec<f32> {
    let count = (duration_sec / stride_sec.max(1e-6)).ceil() as usize;
    vec![0.0; count.max(1)]
}

fn accumulate(buckets: &mut [f32], time_sec: f64, stride_sec: f64, value: f32) {
    let index = (time_sec / stride_sec.max(1e-6)) as usize;
    let index = index.min(buckets.len() - 1);
    buckets[index] += value;
}

/// Normalized intensity histogram of a grayscale frame
fn gray_histogram(frame: &[u8]) -> Vec<f32> {
    let mut hist = vec![0.0f32; HIST_BINS];
    for &pixel in frame {
        hist[(pixel as usize) * HIST_BINS / 256] += 1.0;
    }
    let total = frame.len().max(1) as f32;
    for bin in &mut hist {
        *bin /= total;
    }
    hist
}

/// Bhattacharyya distance between two normalized histograms
fn bhattacharyya(a: &[f32], b: &[f32]) -> f32 {
    let coefficient: f32 = a.iter().zip(b).map(|(x, y)| (x * y).sqrt()).sum();
    (1.0 - coefficient).max(0.0).sqrt()
}

/// Mean absolute pixel difference, scaled to [0, 1]
fn mean_abs_diff(a: &[u8], b: &[u8]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let sum: u64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| (x as i16 - y as i16).unsigned_abs() as u64)
        .sum();
    sum as f32 / (a.len() as f32 * 255.0)
}
