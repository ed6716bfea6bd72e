//! In-memory clip storage
//!
//! The authoritative ordered list of clips for one loaded video. Entries come
//! from manual start/end marking, suggestion injection, or edits; insertion
//! order is preserved and overlapping clips are allowed.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClipError, ClipResult};

/// One clip record: half-open interval `[start_ms, end_ms)` plus a score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub start_ms: u64,
    pub end_ms: u64,
    pub score: f64,
}

impl Clip {
    /// Clip length in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// Ordered collection of clips with mark/add/edit/remove operations
#[derive(Debug, Default)]
pub struct ClipStore {
    clips: Vec<Clip>,
    pending_start: Option<u64>,
}

impl ClipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start position of a clip being marked
    pub fn mark_start(&mut self, position_ms: u64) {
        self.pending_start = Some(position_ms);
    }

    /// Complete a marked clip; fails without a pending start or when
    /// `position_ms` is not after it. Failure leaves the store unchanged.
    pub fn mark_end(&mut self, position_ms: u64) -> ClipResult<()> {
        let start_ms = self.pending_start.ok_or(ClipError::NoPendingStart)?;
        if position_ms <= start_ms {
            return Err(ClipError::InvalidClipRange {
                start_ms,
                end_ms: position_ms,
            });
        }
        self.clips.push(Clip {
            start_ms,
            end_ms: position_ms,
            score: 1.0,
        });
        self.pending_start = None;
        Ok(())
    }

    /// Best-effort insert used by the suggestion pipeline: a malformed
    /// interval is dropped silently instead of failing the whole batch.
    pub fn add_clip(&mut self, start_ms: u64, end_ms: u64, score: f64) {
        if end_ms <= start_ms {
            debug!(
                "Ignoring malformed clip {}ms..{}ms (end <= start)",
                start_ms, end_ms
            );
            return;
        }
        self.clips.push(Clip {
            start_ms,
            end_ms,
            score,
        });
    }

    /// Remove a clip by index; out-of-range indices are a no-op
    pub fn remove_clip(&mut self, index: usize) {
        if index < self.clips.len() {
            self.clips.remove(index);
        }
    }

    /// Update fields of an existing clip. Out-of-range indices are a no-op;
    /// an edit producing `end <= start` fails and leaves the clip intact.
    pub fn update_clip(
        &mut self,
        index: usize,
        start_ms: Option<u64>,
        end_ms: Option<u64>,
        score: Option<f64>,
    ) -> ClipResult<()> {
        let Some(clip) = self.clips.get(index) else {
            return Ok(());
        };
        let new_start = start_ms.unwrap_or(clip.start_ms);
        let new_end = end_ms.unwrap_or(clip.end_ms);
        if new_end <= new_start {
            return Err(ClipError::InvalidClipRange {
                start_ms: new_start,
                end_ms: new_end,
            });
        }
        let clip = &mut self.clips[index];
        clip.start_ms = new_start;
        clip.end_ms = new_end;
        if let Some(score) = score {
            clip.score = score;
        }
        Ok(())
    }

    /// Remove all clips and any pending start mark
    pub fn clear(&mut self) {
        self.clips.clear();
        self.pending_start = None;
    }

    /// All clips in insertion order
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}
