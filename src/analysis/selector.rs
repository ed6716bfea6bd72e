//! Window enumeration and top-K selection

use std::cmp::Ordering;

/// A candidate window with its fused score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredWindow {
    pub start_ms: u64,
    pub end_ms: u64,
    pub score: f32,
}

/// Enumerate window start/end times in seconds: starts at 0, stride, 2*stride, ...
/// while `start + window_sec < duration`. Produces nothing when the video is
/// no longer than one window.
pub fn enumerate_windows(duration_sec: f64, window_sec: f64, stride_sec: f64) -> Vec<(f64, f64)> {
    let mut windows = Vec::new();
    if window_sec <= 0.0 || stride_sec <= 0.0 {
        return windows;
    }
    let mut index = 0u64;
    loop {
        let start = index as f64 * stride_sec;
        if start + window_sec >= duration_sec {
            break;
        }
        windows.push((start, start + window_sec));
        index += 1;
    }
    windows
}

/// Greedily pick up to `max_clips` high-scoring windows whose intervals,
/// expanded by `allowed_overlap_sec` on both sides, do not intersect.
///
/// Candidates are taken in score-descending order; ties keep scan order.
/// The tolerance deliberately treats *near* misses as conflicts: two windows
/// closer than the tolerance are rejected even if their raw intervals never
/// touch.
pub fn select_top_windows(
    mut windows: Vec<ScoredWindow>,
    max_clips: usize,
    allowed_overlap_sec: f64,
) -> Vec<ScoredWindow> {
    // Stable sort keeps enumeration order for equal scores
    windows.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let tolerance_ms = (allowed_overlap_sec.max(0.0) * 1000.0) as u64;
    let mut accepted: Vec<ScoredWindow> = Vec::new();

    for candidate in windows {
        if accepted.len() >= max_clips {
            break;
        }
        let conflicts = accepted.iter().any(|a| {
            candidate.start_ms < a.end_ms + tolerance_ms
                && a.start_ms < candidate.end_ms + tolerance_ms
        });
        if !conflicts {
            accepted.push(candidate);
        }
    }

    accepted
}
