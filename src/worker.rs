/// Worker thread lifecycle
///
/// Every background thread in a process (signal receivers, the timer
/// service, the dispatcher) is a [`Worker`] driven through a
/// [`WorkerHandle`]: `run()` spawns exactly one thread, `stop()` clears the
/// running flag, `join()` waits for the thread to exit.
///
/// ```text
///   run() ──► thread_function(control) ──► loop while control.is_running()
///   stop() ──► running = false ──► on_stop()   (wake private condvars)
///   join() ──► wait for the thread to return
/// ```
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::WorkerError;

/// Running flag shared between a handle and its thread.
#[derive(Debug, Default)]
pub struct WorkerControl {
    running: AtomicBool,
}

impl WorkerControl {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Body of a background thread.
pub trait Worker: Send + Sync + 'static {
    /// Thread name, also used in log lines
    fn name(&self) -> &str;

    /// Runs on the worker thread. Must return soon after
    /// `control.is_running()` turns false.
    fn thread_function(&self, control: &WorkerControl);

    /// Called by `stop()` after the running flag is cleared.
    fn on_stop(&self) {}
}

/// Object-safe view of a handle, used by owners that manage a mixed set of workers.
pub trait Lifecycle: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self) -> Result<(), WorkerError>;
    fn stop(&self);
    fn join(&self);
    fn is_running(&self) -> bool;
}

/// Owns one worker and at most one thread running it.
pub struct WorkerHandle<W: Worker> {
    worker: Arc<W>,
    control: Arc<WorkerControl>,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl<W: Worker> WorkerHandle<W> {
    pub fn new(worker: W) -> Self {
        Self::from_arc(Arc::new(worker))
    }

    pub fn from_arc(worker: Arc<W>) -> Self {
        Self {
            worker,
            control: Arc::new(WorkerControl::default()),
            thread: Mutex::new(None),
        }
    }

    pub fn worker(&self) -> &Arc<W> {
        &self.worker
    }

    /// Start the worker thread. A second call while running only warns.
    pub fn run(&self) -> Result<(), WorkerError> {
        let mut slot = self.thread.lock();

        if self.control.is_running() {
            warn!("Worker {} is already running", self.worker.name());
            return Ok(());
        }

        // A previous thread was stopped but never joined
        if let Some(stale) = slot.take() {
            debug!("Joining stale thread of worker {}", self.worker.name());
            if stale.join().is_err() {
                error!("Worker {} panicked before restart", self.worker.name());
            }
        }

        self.control.running.store(true, Ordering::SeqCst);

        let worker = Arc::clone(&self.worker);
        let control = Arc::clone(&self.control);
        let spawned = thread::Builder::new()
            .name(self.worker.name().to_string())
            .spawn(move || {
                info!("Worker {} started", worker.name());
                worker.thread_function(&control);
                // The body may return on its own, e.g. a dispatcher on a closed queue
                control.running.store(false, Ordering::SeqCst);
                info!("Worker {} stopped", worker.name());
            });

        match spawned {
            Ok(handle) => {
                *slot = Some(handle);
                Ok(())
            }
            Err(source) => {
                self.control.running.store(false, Ordering::SeqCst);
                Err(WorkerError::SpawnFailed {
                    name: self.worker.name().to_string(),
                    source,
                })
            }
        }
    }

    /// Request cooperative termination. The thread exits at its next check.
    pub fn stop(&self) {
        if !self.control.running.swap(false, Ordering::SeqCst) {
            warn!("Worker {} is not running", self.worker.name());
            return;
        }
        self.worker.on_stop();
    }

    /// Block until the worker thread has exited.
    pub fn join(&self) {
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Worker {} panicked", self.worker.name());
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }
}

impl<W: Worker> Lifecycle for WorkerHandle<W> {
    fn name(&self) -> &str {
        self.worker.name()
    }

    fn run(&self) -> Result<(), WorkerError> {
        WorkerHandle::run(self)
    }

    fn stop(&self) {
        WorkerHandle::stop(self)
    }

    fn join(&self) {
        WorkerHandle::join(self)
    }

    fn is_running(&self) -> bool {
        WorkerHandle::is_running(self)
    }
}
