//! Integration tests for the bounded-concurrency export scheduler

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clipsmith::clips::Clip;
use clipsmith::error::{ClipError, ClipResult};
use clipsmith::export::retry::RetryPolicy;
use clipsmith::export::scheduler::ExportScheduler;
use clipsmith::export::{ExportJob, ExportRequest, RenderOptions};
use clipsmith::tools::{ToolCommand, ToolOutput, ToolRunner};
use clipsmith::transcribe::{Transcriber, Transcript};

/// Runner that tracks how many invocations overlap in time
struct ConcurrencyProbe {
    active: AtomicUsize,
    peak: AtomicUsize,
    fail: bool,
}

impl ConcurrencyProbe {
    fn new(fail: bool) -> Self {
        Self {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            fail,
        }
    }
}

impl ToolRunner for ConcurrencyProbe {
    fn run(&self, cmd: &ToolCommand) -> ClipResult<ToolOutput> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Ok(ToolOutput {
                status: 1,
                stdout: String::new(),
                stderr: "boom".to_string(),
            });
        }
        if let Some(output) = cmd.args.last() {
            std::fs::write(output, b"clip")?;
        }
        Ok(ToolOutput {
            status: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

struct NoopTranscriber;

impl Transcriber for NoopTranscriber {
    fn transcribe(&self, _audio: &Path, _model_size: &str) -> ClipResult<Transcript> {
        Ok(Transcript {
            language: "en".to_string(),
            language_probability: 1.0,
            segments: Vec::new(),
        })
    }
}

fn single_attempt() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 1,
        initial_delay: 0.001,
        max_delay: 0.001,
        exponential_base: 1.0,
        jitter: false,
    }
}

fn scheduler_with(probe: Arc<ConcurrencyProbe>, workers: usize) -> ExportScheduler {
    let job = ExportJob::new(probe, Arc::new(NoopTranscriber), single_attempt());
    ExportScheduler::new(Arc::new(job), workers)
}

fn request(dir: &Path, index: usize) -> ExportRequest {
    let input = dir.join("input.mp4");
    if !input.exists() {
        std::fs::write(&input, b"source").unwrap();
    }
    ExportRequest {
        input,
        clip: Clip {
            start_ms: (index as u64) * 10_000,
            end_ms: (index as u64) * 10_000 + 5_000,
            score: 0.5,
        },
        output: dir.join(format!("clip_{:02}.mp4", index)),
        options: RenderOptions::default(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn respects_worker_limit_and_completes_all() {
    let dir = tempfile::tempdir().unwrap();
    let probe = Arc::new(ConcurrencyProbe::new(false));
    let scheduler = scheduler_with(Arc::clone(&probe), 2);

    let artifacts = Arc::new(Mutex::new(Vec::new()));
    for i in 0..6 {
        let artifacts = Arc::clone(&artifacts);
        scheduler.submit(
            request(dir.path(), i),
            Box::new(move |artifact, error| {
                assert!(error.is_none());
                artifacts.lock().unwrap().push(artifact.unwrap());
            }),
        );
    }
    scheduler.shutdown().await;

    let artifacts = artifacts.lock().unwrap();
    assert_eq!(artifacts.len(), 6);
    for artifact in artifacts.iter() {
        assert!(artifact.exists());
    }
    assert!(probe.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reports_failures_through_callbacks() {
    let dir = tempfile::tempdir().unwrap();
    let probe = Arc::new(ConcurrencyProbe::new(true));
    let scheduler = scheduler_with(probe, 2);

    let errors = Arc::new(Mutex::new(Vec::new()));
    for i in 0..3 {
        let errors = Arc::clone(&errors);
        scheduler.submit(
            request(dir.path(), i),
            Box::new(move |artifact, error| {
                assert!(artifact.is_none());
                errors.lock().unwrap().push(error.unwrap());
            }),
        );
    }
    scheduler.shutdown().await;

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 3);
    for error in errors.iter() {
        assert!(matches!(error, ClipError::StageFailed { .. }));
    }
}
