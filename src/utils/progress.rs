//! Progress tracking for long-running analysis and export operations

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

/// Tracks progress of a multi-item operation and reports through tracing
#[derive(Debug)]
pub struct ProgressTracker {
    operation: String,
    total: usize,
    current: usize,
    started: Instant,
    completed: Vec<String>,
    failed: Vec<(String, String)>,
}

/// Read-only snapshot of a tracker's state
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSummary {
    pub operation: String,
    pub total: usize,
    pub current: usize,
    pub completed: usize,
    pub failed: usize,
    pub percent: u32,
    pub elapsed_secs: f64,
}

impl ProgressTracker {
    /// Create a tracker for `total` items of the named operation
    pub fn new(operation: impl Into<String>, total: usize) -> Self {
        Self {
            operation: operation.into(),
            total,
            current: 0,
            started: Instant::now(),
            completed: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Advance progress by `increment` and log the current state
    pub fn update(&mut self, increment: usize, message: &str) {
        self.current += increment;
        let eta = match self.eta() {
            Some(remaining) => format!("ETA: {}s", remaining.as_secs()),
            None => "calculating...".to_string(),
        };
        info!(
            "[{}] {}/{} ({}%) - {} - {}",
            self.operation,
            self.current,
            self.total,
            self.percent(),
            message,
            eta
        );
    }

    /// Mark an item as successfully completed
    pub fn mark_completed(&mut self, item: impl Into<String>) {
        let item = item.into();
        self.completed.push(item.clone());
        self.update(1, &format!("Completed: {}", item));
    }

    /// Mark an item as failed
    pub fn mark_failed(&mut self, item: impl Into<String>, error: impl Into<String>) {
        let item = item.into();
        let error = error.into();
        self.failed.push((item.clone(), error.clone()));
        self.update(1, &format!("Failed: {} - {}", item, error));
    }

    /// Percentage of items processed (0-100)
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            0
        } else {
            ((self.current as f64 / self.total as f64) * 100.0) as u32
        }
    }

    /// Estimated time remaining based on average per-item time so far
    pub fn eta(&self) -> Option<Duration> {
        if self.current == 0 || self.current >= self.total {
            return None;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let avg = elapsed / self.current as f64;
        Some(Duration::from_secs_f64(avg * (self.total - self.current) as f64))
    }

    /// Log a final summary line and return the snapshot
    pub fn complete(&self) -> ProgressSummary {
        let summary = self.summary();
        info!(
            "[{}] Complete! Success: {}, Failed: {}, Time: {:.1}s",
            summary.operation,
            summary.completed,
            summary.failed,
            summary.elapsed_secs
        );
        summary
    }

    /// Current state snapshot
    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            operation: self.operation.clone(),
            total: self.total,
            current: self.current,
            completed: self.completed.len(),
            failed: self.failed.len(),
            percent: self.percent(),
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        }
    }
}
