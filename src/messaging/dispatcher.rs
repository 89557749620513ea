/// Event dispatcher
///
/// The single consumer of a process queue. All state-machine mutation
/// happens on the dispatcher thread, in push order.
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::events::DomainEvent;
use crate::queue::EventQueue;
use crate::worker::{Worker, WorkerControl};

pub const DEFAULT_DISPATCHER_WAIT: Duration = Duration::from_millis(500);

/// Reaction of a process to its own events
pub trait EventHandler<E>: Send + Sync + 'static {
    fn handle_event(&self, event: E);
}

pub struct Dispatcher<E, H> {
    name: String,
    queue: EventQueue<E>,
    handler: Arc<H>,
    wait: Duration,
}

impl<E: DomainEvent, H: EventHandler<E>> Dispatcher<E, H> {
    pub fn new(name: impl Into<String>, queue: EventQueue<E>, handler: Arc<H>) -> Self {
        Self {
            name: name.into(),
            queue,
            handler,
            wait: DEFAULT_DISPATCHER_WAIT,
        }
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait.max(Duration::from_millis(1));
        self
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Handle every event currently queued on the calling thread.
    pub fn drain(&self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.queue.pop_event() {
            debug!("{}: dispatching {}", self.name, event.description());
            self.handler.handle_event(event);
            handled += 1;
        }
        handled
    }
}

impl<E: DomainEvent, H: EventHandler<E>> Worker for Dispatcher<E, H> {
    fn name(&self) -> &str {
        &self.name
    }

    fn thread_function(&self, control: &WorkerControl) {
        while control.is_running() {
            self.queue.wait_for_event(self.wait);
            self.drain();

            if self.queue.is_closed() {
                // Events pushed before close() were drained above
                debug!("{}: queue closed", self.name);
                return;
            }
        }

        // Stopped with the queue still open
        let late = self.drain();
        if late > 0 {
            debug!("{}: handled {} events after stop", self.name, late);
        }
    }
}
