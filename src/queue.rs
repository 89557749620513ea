/// Event queue
///
/// Thread-safe FIFO mailbox feeding a process's single dispatcher. Any
/// thread may push; only the dispatcher loop pops.
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

struct QueueState<E> {
    events: VecDeque<E>,
    closed: bool,
}

struct QueueInner<E> {
    state: Mutex<QueueState<E>>,
    available: Condvar,
}

/// Cloneable handle to one shared queue.
pub struct EventQueue<E> {
    inner: Arc<QueueInner<E>>,
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    events: VecDeque::new(),
                    closed: false,
                }),
                available: Condvar::new(),
            }),
        }
    }

    /// Append an event and wake waiters.
    ///
    /// Returns false only after [`EventQueue::close`]; the event is dropped.
    pub fn push_event(&self, event: E) -> bool {
        let mut state = self.inner.state.lock();
        if state.closed {
            debug!("Event queue closed, rejecting push");
            return false;
        }
        state.events.push_back(event);
        drop(state);

        self.inner.available.notify_all();
        true
    }

    /// Remove the head event without blocking
    pub fn pop_event(&self) -> Option<E> {
        self.inner.state.lock().events.pop_front()
    }

    pub fn has_event(&self) -> bool {
        !self.inner.state.lock().events.is_empty()
    }

    pub fn size(&self) -> usize {
        self.inner.state.lock().events.len()
    }

    /// Block until an event is available, the queue is closed, or `timeout`
    /// elapses. Returns whether an event was available on return; callers
    /// still re-check with `has_event()`/`pop_event()`.
    pub fn wait_for_event(&self, timeout: Duration) -> bool {
        let mut state = self.inner.state.lock();
        if state.events.is_empty() && !state.closed {
            self.inner.available.wait_for(&mut state, timeout);
        }
        !state.events.is_empty()
    }

    /// Reject further pushes and wake every waiter. Queued events stay poppable.
    pub fn close(&self) {
        self.inner.state.lock().closed = true;
        self.inner.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EventQueue<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
