// Worker Pool - Bounded blocking thread pool for stem decoding and fingerprinting
// Explicit lifecycle: start, submit, terminate (cancels anything not yet running)

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Failed to start worker pool: {0}")]
    Start(#[from] std::io::Error),

    #[error("Worker pool needs at least one worker")]
    NoWorkers,

    #[error("Worker pool has been terminated")]
    Terminated,

    #[error("Job was cancelled before it finished")]
    Cancelled,

    #[error("Job panicked: {0}")]
    Panicked(String),
}

struct PoolState {
    runtime: Runtime,
    jobs: Vec<JoinHandle<()>>,
}

/// Fixed-size pool of blocking worker threads
///
/// Shareable between callers by reference; jobs queue once every worker is busy.
pub struct WorkerPool {
    state: Mutex<Option<PoolState>>,
}

/// Pending result of a submitted job
#[derive(Debug)]
pub struct JobHandle<T> {
    receiver: oneshot::Receiver<Result<T, PoolError>>,
}

impl<T> JobHandle<T> {
    /// Block until the job finishes
    ///
    /// Must not be called from inside an async runtime.
    pub fn wait(self) -> Result<T, PoolError> {
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(PoolError::Cancelled))
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl WorkerPool {
    /// Start a pool with `max_workers` threads
    pub fn start(max_workers: usize) -> Result<Self, PoolError> {
        if max_workers == 0 {
            return Err(PoolError::NoWorkers);
        }

        let runtime = Builder::new_current_thread()
            .max_blocking_threads(max_workers)
            .thread_name("chartfill-worker")
            .build()?;

        log::debug!("Started worker pool with {} workers", max_workers);

        Ok(WorkerPool {
            state: Mutex::new(Some(PoolState {
                runtime,
                jobs: Vec::new(),
            })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<PoolState>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    /// Queue a job; a panic inside it is reported through its handle
    pub fn submit<T, F>(&self, job: F) -> Result<JobHandle<T>, PoolError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let mut guard = self.lock();
        let state = guard.as_mut().ok_or(PoolError::Terminated)?;

        let (sender, receiver) = oneshot::channel();
        let handle = state.runtime.spawn_blocking(move || {
            let result = catch_unwind(AssertUnwindSafe(job))
                .map_err(|payload| PoolError::Panicked(panic_message(payload)));
            // The caller may have dropped its handle
            let _ = sender.send(result);
        });

        state.jobs.retain(|job| !job.is_finished());
        state.jobs.push(handle);

        Ok(JobHandle { receiver })
    }

    /// Stop the pool, cancelling queued jobs
    ///
    /// Jobs already running finish in the background but their results are
    /// still delivered; queued jobs resolve to `PoolError::Cancelled`.
    pub fn terminate(&self) {
        let Some(state) = self.lock().take() else {
            return;
        };

        let pending = state.jobs.iter().filter(|job| !job.is_finished()).count();
        for job in &state.jobs {
            job.abort();
        }
        state.runtime.shutdown_background();

        log::debug!("Terminated worker pool ({} jobs outstanding)", pending);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.terminate();
    }
}
