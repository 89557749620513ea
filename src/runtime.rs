/// Process composition root
///
/// Owns the one event queue and the one timer service of a process and
/// every worker started for it. Handles are passed down explicitly; nothing
/// is global. Teardown is explicit: [`ProcessRuntime::shutdown`] stops and
/// joins the producers, closes the queue, then lets the dispatcher drain
/// what is left before joining it.
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::error::WorkerError;
use crate::messaging::{Dispatcher, DomainEvent, EventHandler};
use crate::queue::EventQueue;
use crate::timer::TimerService;
use crate::worker::{Lifecycle, Worker, WorkerHandle};

pub struct ProcessRuntime<E: Send + 'static> {
    name: String,
    queue: EventQueue<E>,
    timers: TimerService<E>,
    workers: Mutex<Vec<Arc<dyn Lifecycle>>>,
    consumers: Mutex<Vec<Arc<dyn Lifecycle>>>,
}

impl<E: Send + 'static> ProcessRuntime<E> {
    pub fn new(name: impl Into<String>, config: &RuntimeConfig) -> Self {
        let queue = EventQueue::new();
        let timers = TimerService::with_interval(config.timer_interval());
        timers.attach_queue(queue.clone());

        Self {
            name: name.into(),
            queue,
            timers,
            workers: Mutex::new(Vec::new()),
            consumers: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queue(&self) -> &EventQueue<E> {
        &self.queue
    }

    pub fn timers(&self) -> &TimerService<E> {
        &self.timers
    }

    /// Start the timer thread
    pub fn start(&self) -> Result<(), WorkerError> {
        let handle = self.timers.worker();
        handle.run()?;
        self.workers.lock().push(handle);
        Ok(())
    }

    /// Run `worker` on its own thread and keep it for shutdown.
    pub fn spawn<W: Worker>(&self, worker: W) -> Result<Arc<WorkerHandle<W>>, WorkerError> {
        let handle = Arc::new(WorkerHandle::new(worker));
        handle.run()?;
        self.workers.lock().push(handle.clone());
        debug!("{}: spawned {}", self.name, handle.worker().name());
        Ok(handle)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.lock().len() + self.consumers.lock().len()
    }

    /// Stop and join producers in reverse start order, close the queue,
    /// then join the dispatchers once they have drained it.
    pub fn shutdown(&self) {
        let producers: Vec<_> = self.workers.lock().drain(..).rev().collect();
        let consumers: Vec<_> = self.consumers.lock().drain(..).collect();
        info!(
            "{}: shutting down {} workers",
            self.name,
            producers.len() + consumers.len()
        );

        for worker in &producers {
            if worker.is_running() {
                worker.stop();
            }
        }
        for worker in &producers {
            worker.join();
            debug!("{}: joined {}", self.name, worker.name());
        }

        // Nothing can be pushed any more; dispatchers exit after a last drain
        self.queue.close();
        for worker in &consumers {
            worker.join();
            debug!("{}: joined {}", self.name, worker.name());
        }

        info!("{}: shutdown complete", self.name);
    }
}

impl<E: DomainEvent> ProcessRuntime<E> {
    /// Run the dispatcher of this process. It is joined last at shutdown,
    /// after every event pushed by the other workers has been handled.
    pub fn spawn_dispatcher<H: EventHandler<E>>(
        &self,
        dispatcher: Dispatcher<E, H>,
    ) -> Result<Arc<WorkerHandle<Dispatcher<E, H>>>, WorkerError> {
        let handle = Arc::new(WorkerHandle::new(dispatcher));
        handle.run()?;
        self.consumers.lock().push(handle.clone());
        debug!("{}: spawned {}", self.name, handle.worker().name());
        Ok(handle)
    }
}
