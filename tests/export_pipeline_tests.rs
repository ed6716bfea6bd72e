//! Integration tests for the staged export pipeline
//!
//! External tools are replaced by a scripted runner that records every
//! command and fabricates output files, so the full stage flow, recovery
//! mutations and intermediate cleanup run against a real filesystem
//! without ffmpeg installed.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clipsmith::clips::Clip;
use clipsmith::error::{ClipError, ClipResult};
use clipsmith::export::retry::RetryPolicy;
use clipsmith::export::{ExportJob, ExportRequest, RenderOptions};
use clipsmith::tools::{ToolCommand, ToolOutput, ToolRunner};
use clipsmith::transcribe::{Segment, Transcriber, Transcript, Word};

/// Runner that fails a scripted number of times, then succeeds by creating
/// the file named by each command's last argument
struct FakeRunner {
    seen: Mutex<Vec<ToolCommand>>,
    failures_left: Mutex<u32>,
    failure_stderr: String,
}

impl FakeRunner {
    fn passing() -> Self {
        Self::failing(0, "")
    }

    fn failing(times: u32, stderr: &str) -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            failures_left: Mutex::new(times),
            failure_stderr: stderr.to_string(),
        }
    }

    fn commands(&self) -> Vec<ToolCommand> {
        self.seen.lock().unwrap().clone()
    }
}

impl ToolRunner for FakeRunner {
    fn run(&self, cmd: &ToolCommand) -> ClipResult<ToolOutput> {
        self.seen.lock().unwrap().push(cmd.clone());

        let mut failures = self.failures_left.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Ok(ToolOutput {
                status: 1,
                stdout: String::new(),
                stderr: self.failure_stderr.clone(),
            });
        }

        if let Some(output) = cmd.args.last() {
            std::fs::write(output, b"fake media")?;
        }
        Ok(ToolOutput {
            status: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

struct FakeTranscriber;

impl Transcriber for FakeTranscriber {
    fn transcribe(&self, _audio: &Path, _model_size: &str) -> ClipResult<Transcript> {
        Ok(Transcript {
            language: "en".to_string(),
            language_probability: 0.99,
            segments: vec![Segment {
                start: 0.0,
                end: 2.0,
                text: "hello there".to_string(),
                words: Some(vec![
                    Word::Real {
                        start: 0.0,
                        end: 1.0,
                        text: "hello".to_string(),
                    },
                    Word::Real {
                        start: 1.0,
                        end: 2.0,
                        text: "there".to_string(),
                    },
                ]),
            }],
        })
    }
}

struct FailingTranscriber;

impl Transcriber for FailingTranscriber {
    fn transcribe(&self, _audio: &Path, _model_size: &str) -> ClipResult<Transcript> {
        Err(ClipError::TranscriptionError {
            message: "model unavailable".to_string(),
        })
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: 0.001,
        max_delay: 0.001,
        exponential_base: 1.0,
        jitter: false,
    }
}

fn job_with(runner: Arc<FakeRunner>, transcriber: Arc<dyn Transcriber>) -> ExportJob {
    ExportJob::new(runner, transcriber, fast_retry())
}

fn request_in(dir: &Path, options: RenderOptions) -> ExportRequest {
    let input = dir.join("input.mp4");
    std::fs::write(&input, b"source video").unwrap();
    ExportRequest {
        input,
        clip: Clip {
            start_ms: 2_000,
            end_ms: 10_000,
            score: 0.7,
        },
        output: dir.join("clip_00.mp4"),
        options,
    }
}

#[test]
fn plain_export_produces_single_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::passing());
    let job = job_with(Arc::clone(&runner), Arc::new(FakeTranscriber));
    let request = request_in(dir.path(), RenderOptions::default());

    let artifact = job.run(&request).unwrap();

    assert_eq!(artifact, request.output);
    assert!(artifact.exists());
    // Stream-copy cut only, no transcription stages
    let commands = runner.commands();
    assert_eq!(commands.len(), 1);
    assert!(commands[0].to_line().contains("-c copy"));
    assert!(!dir.path().join("clip_00.wav").exists());
    assert!(!dir.path().join("clip_00.ass").exists());
}

#[test]
fn subtitled_export_cleans_up_intermediates() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::passing());
    let job = job_with(Arc::clone(&runner), Arc::new(FakeTranscriber));
    let request = request_in(
        dir.path(),
        RenderOptions {
            subtitles: true,
            ..Default::default()
        },
    );

    let artifact = job.run(&request).unwrap();

    assert_eq!(artifact, dir.path().join("clip_00_sub.mp4"));
    assert!(artifact.exists());
    // Base cut, extracted audio and subtitle file are gone
    assert!(!dir.path().join("clip_00.mp4").exists());
    assert!(!dir.path().join("clip_00.wav").exists());
    assert!(!dir.path().join("clip_00.ass").exists());

    let commands = runner.commands();
    assert_eq!(commands.len(), 3);
    assert!(commands[1].to_line().contains("-ar 16000"));
    assert!(commands[2].to_line().contains("ass="));
}

#[test]
fn base_cut_recovers_with_downgraded_preset() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::failing(2, "Conversion failed!"));
    let job = job_with(Arc::clone(&runner), Arc::new(FakeTranscriber));
    let request = request_in(
        dir.path(),
        RenderOptions {
            portrait: true,
            ..Default::default()
        },
    );

    let artifact = job.run(&request).unwrap();
    assert!(artifact.exists());

    let commands = runner.commands();
    assert_eq!(commands.len(), 3);
    let preset_of = |cmd: &ToolCommand| {
        let i = cmd.value_index_of("-preset").unwrap();
        cmd.args[i].clone()
    };
    assert_eq!(preset_of(&commands[0]), "ultrafast");
    assert_eq!(preset_of(&commands[1]), "fast");
    assert_eq!(preset_of(&commands[2]), "fast");
}

#[test]
fn exhausted_retries_surface_stage_failure() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::failing(10, "unrecoverable"));
    let job = job_with(Arc::clone(&runner), Arc::new(FakeTranscriber));
    let request = request_in(dir.path(), RenderOptions::default());

    let err = job.run(&request).unwrap_err();
    match err {
        ClipError::StageFailed { stage, attempts, .. } => {
            assert_eq!(stage, "base_cut");
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(runner.commands().len(), 3);
}

#[test]
fn transcription_failure_stops_before_burn_in() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::passing());
    let job = job_with(Arc::clone(&runner), Arc::new(FailingTranscriber));
    let request = request_in(
        dir.path(),
        RenderOptions {
            subtitles: true,
            ..Default::default()
        },
    );

    let err = job.run(&request).unwrap_err();
    assert!(matches!(err, ClipError::StageFailed { ref stage, .. } if stage == "transcribe"));
    // Base cut and audio extract ran, burn-in never did
    assert_eq!(runner.commands().len(), 2);
    assert!(!dir.path().join("clip_00_sub.mp4").exists());
}

#[test]
fn missing_input_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::passing());
    let job = job_with(Arc::clone(&runner), Arc::new(FakeTranscriber));
    let request = ExportRequest {
        input: PathBuf::from("/nonexistent/video.mp4"),
        clip: Clip {
            start_ms: 0,
            end_ms: 1_000,
            score: 0.0,
        },
        output: dir.path().join("out.mp4"),
        options: RenderOptions::default(),
    };

    let err = job.run(&request).unwrap_err();
    assert!(matches!(err, ClipError::InputFileNotFound { .. }));
    assert!(runner.commands().is_empty());
}
