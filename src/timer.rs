/// Timer service
///
/// Turns "deliver event E after D" requests into events pushed onto an
/// [`EventQueue`], using one background thread no matter how many timers
/// are pending.
///
/// ```text
///   start_timer(d, e) ──► pending[id] = (now + d, e) ──► notify
///
///   loop while running:
///     expired = pending.extract(expiry <= now)
///     for e in expired: queue.push_event(e)
///     wake = min(min expiry, now + default_interval)
///     condvar.wait_until(wake)      (early wake on insert/cancel/stop)
/// ```
///
/// One instance per process, constructed by the process's composition root
/// and passed to whoever needs it.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::error::{TimerError, WorkerError};
use crate::queue::EventQueue;
use crate::worker::{Worker, WorkerControl, WorkerHandle};

/// Largest timer id (31-bit id space).
pub const MAX_TIMER_ID: u32 = i32::MAX as u32;

/// Default upper bound on one sleep of the timer thread.
pub const DEFAULT_TIMER_INTERVAL: Duration = Duration::from_secs(1);

/// Process-unique timer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u32);

impl TimerId {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

struct TimerElement<E> {
    expires_at: Instant,
    event: E,
}

struct TimerTable<E> {
    pending: HashMap<TimerId, TimerElement<E>>,
    next_id: u32,
    max_id: u32,
    queue: Option<EventQueue<E>>,
}

impl<E> TimerTable<E> {
    fn new(max_id: u32) -> Self {
        Self {
            pending: HashMap::new(),
            next_id: 1,
            max_id: max_id.max(1),
            queue: None,
        }
    }

    /// Next free id after the counter, wrapping to 1 and skipping live ids.
    fn allocate_id(&mut self) -> Result<TimerId, TimerError> {
        if self.pending.len() >= self.max_id as usize {
            return Err(TimerError::IdsExhausted {
                live: self.pending.len(),
            });
        }
        loop {
            let candidate = TimerId(self.next_id);
            self.next_id = if self.next_id >= self.max_id {
                1
            } else {
                self.next_id + 1
            };
            if !self.pending.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
    }

    fn take_expired(&mut self, now: Instant) -> Vec<(TimerId, E)> {
        let due: Vec<TimerId> = self
            .pending
            .iter()
            .filter(|(_, element)| element.expires_at <= now)
            .map(|(id, _)| *id)
            .collect();

        due.into_iter()
            .filter_map(|id| self.pending.remove(&id).map(|element| (id, element.event)))
            .collect()
    }

    fn next_expiry(&self) -> Option<Instant> {
        self.pending.values().map(|element| element.expires_at).min()
    }
}

struct TimerShared<E> {
    table: Mutex<TimerTable<E>>,
    wakeup: Condvar,
    interval: Duration,
}

/// Background loop of the timer service.
pub struct TimerLoop<E> {
    shared: Arc<TimerShared<E>>,
}

impl<E: Send + 'static> Worker for TimerLoop<E> {
    fn name(&self) -> &str {
        "timer-service"
    }

    fn thread_function(&self, control: &WorkerControl) {
        let mut table = self.shared.table.lock();

        while control.is_running() {
            let now = Instant::now();

            if !table.pending.is_empty() {
                let expired = table.take_expired(now);
                if !expired.is_empty() {
                    match table.queue.clone() {
                        Some(queue) => {
                            for (id, event) in expired {
                                trace!("{} expired", id);
                                if !queue.push_event(event) {
                                    debug!("{} expired after its queue closed", id);
                                }
                            }
                        }
                        None => warn!("Dropping {} expired timers: no queue", expired.len()),
                    }
                }
            }

            let default_wake = now + self.shared.interval;
            let wake_at = table
                .next_expiry()
                .map_or(default_wake, |expiry| expiry.min(default_wake));

            if control.is_running() {
                self.shared.wakeup.wait_until(&mut table, wake_at);
            }
        }
    }

    fn on_stop(&self) {
        let _table = self.shared.table.lock();
        self.shared.wakeup.notify_all();
    }
}

/// Handle to the process timer service. Clones share one thread and one table.
pub struct TimerService<E: Send + 'static> {
    shared: Arc<TimerShared<E>>,
    handle: Arc<WorkerHandle<TimerLoop<E>>>,
}

impl<E: Send + 'static> TimerService<E> {
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_TIMER_INTERVAL)
    }

    /// `interval` caps a single sleep of the timer thread.
    pub fn with_interval(interval: Duration) -> Self {
        Self::build(interval, MAX_TIMER_ID)
    }

    fn build(interval: Duration, max_id: u32) -> Self {
        let shared = Arc::new(TimerShared {
            table: Mutex::new(TimerTable::new(max_id)),
            wakeup: Condvar::new(),
            interval: interval.max(Duration::from_millis(1)),
        });
        let handle = Arc::new(WorkerHandle::new(TimerLoop {
            shared: Arc::clone(&shared),
        }));
        Self { shared, handle }
    }

    /// Set the queue expired timer events are delivered to.
    pub fn attach_queue(&self, queue: EventQueue<E>) {
        self.shared.table.lock().queue = Some(queue);
    }

    /// Schedule `event` for delivery after `duration`.
    pub fn start_timer(&self, duration: Duration, event: E) -> Result<TimerId, TimerError> {
        let mut table = self.shared.table.lock();
        if table.queue.is_none() {
            return Err(TimerError::NoQueue);
        }

        let id = table.allocate_id()?;
        table.pending.insert(
            id,
            TimerElement {
                expires_at: Instant::now() + duration,
                event,
            },
        );
        drop(table);

        self.shared.wakeup.notify_all();
        debug!("Started {} for {:?}", id, duration);
        Ok(id)
    }

    /// Cancel a pending timer.
    ///
    /// True only if the timer was still pending. False means unknown or
    /// already fired: its event may already sit in the queue.
    pub fn stop_timer(&self, id: TimerId) -> bool {
        let removed = self.shared.table.lock().pending.remove(&id).is_some();
        if removed {
            self.shared.wakeup.notify_all();
            debug!("Stopped {}", id);
        } else {
            debug!("{} not pending (fired or unknown)", id);
        }
        removed
    }

    pub fn pending_count(&self) -> usize {
        self.shared.table.lock().pending.len()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.shared.table.lock().pending.contains_key(&id)
    }

    pub fn run(&self) -> Result<(), WorkerError> {
        self.handle.run()
    }

    pub fn stop(&self) {
        self.handle.stop()
    }

    pub fn join(&self) {
        self.handle.join()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    /// Lifecycle handle of the background thread
    pub fn worker(&self) -> Arc<WorkerHandle<TimerLoop<E>>> {
        Arc::clone(&self.handle)
    }
}

impl<E: Send + 'static> Default for TimerService<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Send + 'static> Clone for TimerService<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            handle: Arc::clone(&self.handle),
        }
    }
}
