//! Bounded-concurrency export scheduling
//!
//! Jobs are accepted eagerly and executed by at most `workers` blocking tasks
//! at a time. Completion is reported through a per-job callback rather than a
//! return value, so callers can fire off a batch and track progress as each
//! clip finishes.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::ClipError;

use super::{ExportJob, ExportRequest};

/// Invoked exactly once per submitted job with either the artifact path or
/// the error that stopped it
pub type ExportCallback = Box<dyn FnOnce(Option<PathBuf>, Option<ClipError>) + Send + 'static>;

/// Dispatches export jobs with a fixed concurrency limit
pub struct ExportScheduler {
    job: Arc<ExportJob>,
    permits: Arc<Semaphore>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    workers: usize,
}

impl ExportScheduler {
    pub fn new(job: Arc<ExportJob>, workers: usize) -> Self {
        let workers = workers.max(1);
        info!("Export scheduler ready with {} worker slot(s)", workers);
        Self {
            job,
            permits: Arc::new(Semaphore::new(workers)),
            handles: Mutex::new(Vec::new()),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Queue one export. The callback fires when the job completes, on a
    /// runtime worker thread.
    pub fn submit(&self, request: ExportRequest, callback: ExportCallback) {
        let job = Arc::clone(&self.job);
        let permits = Arc::clone(&self.permits);

        let handle = tokio::spawn(async move {
            // Semaphore is never closed while the scheduler is alive
            let _permit = permits
                .acquire_owned()
                .await
                .expect("export semaphore closed");

            let result = tokio::task::spawn_blocking(move || job.run(&request)).await;
            match result {
                Ok(Ok(artifact)) => {
                    info!("Export finished: {}", artifact.display());
                    callback(Some(artifact), None);
                }
                Ok(Err(e)) => {
                    error!("Export failed: {}", e);
                    callback(None, Some(e));
                }
                Err(join_err) => {
                    error!("Export task panicked: {}", join_err);
                    callback(
                        None,
                        Some(ClipError::ExportFailed {
                            message: format!("export task panicked: {}", join_err),
                        }),
                    );
                }
            }
        });

        self.handles.lock().expect("scheduler handle list poisoned").push(handle);
    }

    /// Wait for every submitted job to finish
    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.handles.lock().expect("scheduler handle list poisoned");
            guard.drain(..).collect()
        };
        for handle in handles {
            // The spawned task already routed panics through the callback
            let _ = handle.await;
        }
    }
}
