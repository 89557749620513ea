/// Signal receiver
///
/// Background poller for one match rule. Each wakeup drains every pending
/// signal, filters by interface and member, decodes the shape from the
/// argument signature and calls exactly one handler method per signal.
///
/// ```text
///   bus.poll(subscription, ≤ poll_interval)
///        │
///        ▼  for each signal
///   accepts(interface, member)? ── no ──► ignored
///        │ yes
///        ▼
///   SignalMessage::decode(args) ── Err ──► warn, dropped
///        │
///        ├─ Command(c)            ──► handler.handle_message(c)
///        └─ Notification{c, s, i} ──► handler.handle_message_noti(c, s, i)
/// ```
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::bus::{BusConnection, SignalMatch, Subscription};
use super::codec::{RawSignal, SignalMessage};
use super::commands::CommandCode;
use super::info::NotificationInfo;
use crate::error::BusError;
use crate::queue::EventQueue;
use crate::worker::{Worker, WorkerControl};

/// Upper bound of one bus poll, keeps `stop()` observable without traffic.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Per-process reaction to decoded signals
pub trait SignalHandler: Send + Sync + 'static {
    type Command: CommandCode;

    fn handle_message(&self, command: Self::Command);

    fn handle_message_noti(&self, command: Self::Command, success: bool, info: NotificationInfo);
}

pub struct SignalReceiver<H: SignalHandler> {
    name: String,
    bus: Arc<dyn BusConnection>,
    subscription: Subscription,
    handler: H,
    poll_interval: Duration,
}

impl<H: SignalHandler> SignalReceiver<H> {
    /// Register the match rule now, so a bad rule fails at startup.
    pub fn subscribe(
        name: impl Into<String>,
        bus: Arc<dyn BusConnection>,
        rule: SignalMatch,
        handler: H,
    ) -> Result<Self, BusError> {
        let subscription = bus.subscribe(&rule)?;
        Ok(Self {
            name: name.into(),
            bus,
            subscription,
            handler,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn rule(&self) -> &SignalMatch {
        self.subscription.rule()
    }

    /// Decode one signal and hand it to the handler. Returns whether a
    /// handler method ran.
    pub fn dispatch(&self, signal: &RawSignal) -> bool {
        if !self.subscription.rule().accepts(signal) {
            trace!(
                "{}: ignoring {}.{}",
                self.name,
                signal.interface,
                signal.member
            );
            return false;
        }

        match SignalMessage::<H::Command>::decode(&signal.args) {
            Ok(SignalMessage::Command(command)) => {
                debug!("{}: received {:?}", self.name, command);
                self.handler.handle_message(command);
                true
            }
            Ok(SignalMessage::Notification {
                command,
                success,
                info,
            }) => {
                debug!(
                    "{}: received {:?} notification (success={})",
                    self.name, command, success
                );
                self.handler.handle_message_noti(command, success, info);
                true
            }
            Err(err) => {
                warn!(
                    "{}: dropping {}.{} from {}: {} ({})",
                    self.name,
                    signal.interface,
                    signal.member,
                    signal.sender.as_deref().unwrap_or("unknown"),
                    err,
                    err.as_label()
                );
                false
            }
        }
    }
}

impl<H: SignalHandler> Worker for SignalReceiver<H> {
    fn name(&self) -> &str {
        &self.name
    }

    fn thread_function(&self, control: &WorkerControl) {
        while control.is_running() {
            match self.bus.poll(&self.subscription, self.poll_interval) {
                Ok(batch) => {
                    for signal in &batch {
                        self.dispatch(signal);
                    }
                }
                Err(err) => {
                    warn!("{}: bus poll failed: {}", self.name, err);
                    thread::sleep(self.poll_interval);
                }
            }
        }
    }
}

/// Handler that turns every decoded signal into an event on a queue.
pub struct QueueForwarder<C, E> {
    queue: EventQueue<E>,
    wrap: fn(SignalMessage<C>) -> E,
    _command: PhantomData<fn(C)>,
}

impl<C, E> QueueForwarder<C, E> {
    pub fn new(queue: EventQueue<E>, wrap: fn(SignalMessage<C>) -> E) -> Self {
        Self {
            queue,
            wrap,
            _command: PhantomData,
        }
    }

    fn forward(&self, message: SignalMessage<C>) {
        if !self.queue.push_event((self.wrap)(message)) {
            debug!("Queue closed, signal not forwarded");
        }
    }
}

impl<C: CommandCode, E: Send + 'static> SignalHandler for QueueForwarder<C, E> {
    type Command = C;

    fn handle_message(&self, command: C) {
        self.forward(SignalMessage::Command(command));
    }

    fn handle_message_noti(&self, command: C, success: bool, info: NotificationInfo) {
        self.forward(SignalMessage::notification(command, success, info));
    }
}
