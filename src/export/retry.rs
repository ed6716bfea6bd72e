//! Retry with exponential backoff and error-pattern recovery
//!
//! Every external-tool invocation, in export stages and analysis passes
//! alike, carries its own attempt budget. Failures whose stderr matches a
//! known recoverable pattern get a mutated command before the next attempt;
//! everything else retries verbatim, then escalates the last error as a
//! stage failure.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::{ClipError, ClipResult};
use crate::tools::{ToolCommand, ToolOutput, ToolRunner};

/// Retry behavior configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// First retry delay in seconds
    pub initial_delay: f64,
    /// Delay ceiling in seconds
    pub max_delay: f64,
    pub exponential_base: f64,
    /// Scale each delay by a uniform [0.5, 1.5) multiplier
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: 1.0,
            max_delay: 30.0,
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Delay in seconds before the retry following attempt `attempt` (0-indexed)
    pub fn delay_for(&self, attempt: u32) -> f64 {
        let delay = (self.initial_delay * self.exponential_base.powi(attempt as i32))
            .min(self.max_delay);
        if self.jitter {
            delay * (0.5 + rand::random::<f64>())
        } else {
            delay
        }
    }
}

/// Rewrite a failed command when its stderr matches a recoverable pattern.
///
/// Known mutations: downgrade an `ultrafast` preset to `fast` on conversion
/// failures, and replace a stream-copy codec with `libx264` when the tool
/// produced an empty output.
pub fn recover_command(cmd: &ToolCommand, stderr: &str) -> Option<ToolCommand> {
    if stderr.contains("Conversion failed!") || stderr.contains("Invalid data") {
        if let Some(index) = cmd.value_index_of("-preset") {
            if cmd.args[index] == "ultrafast" {
                let mut mutated = cmd.clone();
                mutated.args[index] = "fast".to_string();
                info!("Recovery: retrying with 'fast' preset instead of 'ultrafast'");
                return Some(mutated);
            }
        }
    }

    if stderr.contains("Output file is empty") {
        if let Some(index) = cmd.value_index_of("-c") {
            if cmd.args[index] == "copy" {
                let mut mutated = cmd.clone();
                mutated.args[index] = "libx264".to_string();
                info!("Recovery: retrying with re-encoding instead of stream copy");
                return Some(mutated);
            }
        }
    }

    None
}

/// Run a tool command under the policy, applying recovery mutations between
/// attempts. Returns the successful output or a stage failure carrying the
/// last error once the budget is exhausted.
pub fn run_with_retry(
    runner: &dyn ToolRunner,
    policy: &RetryPolicy,
    stage: &str,
    cmd: &ToolCommand,
) -> ClipResult<ToolOutput> {
    let mut current = cmd.clone();
    let mut last_error: Option<ClipError> = None;

    for attempt in 0..policy.max_attempts {
        match runner.run(&current) {
            Ok(output) if output.success() => return Ok(output),
            Ok(output) => {
                warn!(
                    "Attempt {}/{} of stage '{}' failed (exit {})",
                    attempt + 1,
                    policy.max_attempts,
                    stage,
                    output.status
                );
                if let Some(mutated) = recover_command(&current, &output.stderr) {
                    current = mutated;
                }
                last_error = Some(output.into_error(&cmd.program));
            }
            Err(e) => {
                warn!(
                    "Attempt {}/{} of stage '{}' failed: {}",
                    attempt + 1,
                    policy.max_attempts,
                    stage,
                    e
                );
                last_error = Some(e);
            }
        }

        if attempt + 1 < policy.max_attempts {
            let delay = policy.delay_for(attempt);
            info!("Retrying stage '{}' in {:.1}s", stage, delay);
            std::thread::sleep(Duration::from_secs_f64(delay));
        }
    }

    Err(ClipError::StageFailed {
        stage: stage.to_string(),
        attempts: policy.max_attempts,
        message: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown failure".to_string()),
    })
}

/// Retry an arbitrary fallible operation (used for the transcription stage,
/// which is not a single command). No recovery mutations apply.
pub fn retry_stage<T>(
    policy: &RetryPolicy,
    stage: &str,
    mut op: impl FnMut() -> ClipResult<T>,
) -> ClipResult<T> {
    let mut last_error: Option<ClipError> = None;

    for attempt in 0..policy.max_attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(
                    "Attempt {}/{} of stage '{}' failed: {}",
                    attempt + 1,
                    policy.max_attempts,
                    stage,
                    e
                );
                last_error = Some(e);
            }
        }
        if attempt + 1 < policy.max_attempts {
            std::thread::sleep(Duration::from_secs_f64(policy.delay_for(attempt)));
        }
    }

    Err(ClipError::StageFailed {
        stage: stage.to_string(),
        attempts: policy.max_attempts,
        message: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown failure".to_string()),
    })
}
