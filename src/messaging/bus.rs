/// Bus connections
///
/// [`BusConnection`] is the seam between the signal transport and an actual
/// message bus. Receivers subscribe with one [`SignalMatch`] each and poll
/// their [`Subscription`] with a bounded wait; senders emit [`RawSignal`]s.
///
/// [`LoopbackBus`] is an in-process bus: every connection made from it sees
/// the signals of every other connection, filtered by match rules. It backs
/// the tests and lets several process roles share one address space.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::RwLock;
use tracing::{debug, trace};

use super::codec::RawSignal;
use crate::error::BusError;

/// Destination of an outbound signal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalEndpoint {
    pub path: String,
    pub interface: String,
    pub member: String,
}

impl SignalEndpoint {
    pub fn new(
        path: impl Into<String>,
        interface: impl Into<String>,
        member: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            interface: interface.into(),
            member: member.into(),
        }
    }
}

/// (sender, interface, member) triple a receiver listens to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalMatch {
    pub sender: Option<String>,
    pub interface: String,
    pub member: String,
}

impl SignalMatch {
    pub fn new(interface: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            sender: None,
            interface: interface.into(),
            member: member.into(),
        }
    }

    pub fn for_endpoint(endpoint: &SignalEndpoint) -> Self {
        Self::new(endpoint.interface.clone(), endpoint.member.clone())
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Full match including the sender, as a bus daemon applies it
    pub fn matches(&self, signal: &RawSignal) -> bool {
        if !self.accepts(signal) {
            return false;
        }
        match &self.sender {
            Some(sender) => signal.sender.as_deref() == Some(sender.as_str()),
            None => true,
        }
    }

    /// Interface and member check done by receivers. The sender part is left
    /// to the bus, which knows both unique and well-known names.
    pub fn accepts(&self, signal: &RawSignal) -> bool {
        signal.interface == self.interface && signal.member == self.member
    }

    /// Match rule in bus daemon syntax
    pub fn rule_string(&self) -> String {
        let mut rule = String::from("type='signal'");
        if let Some(sender) = &self.sender {
            rule.push_str(&format!(",sender='{}'", sender));
        }
        rule.push_str(&format!(
            ",interface='{}',member='{}'",
            self.interface, self.member
        ));
        rule
    }
}

/// Inbox of one match rule
pub struct Subscription {
    rule: SignalMatch,
    inbox: Receiver<RawSignal>,
}

impl Subscription {
    pub fn new(rule: SignalMatch, inbox: Receiver<RawSignal>) -> Self {
        Self { rule, inbox }
    }

    pub fn rule(&self) -> &SignalMatch {
        &self.rule
    }

    /// Everything already in the inbox
    pub fn drain(&self) -> Vec<RawSignal> {
        self.inbox.try_iter().collect()
    }

    /// Wait up to `timeout` for the first signal, then drain the rest.
    pub fn wait(&self, timeout: Duration) -> Result<Vec<RawSignal>, BusError> {
        match self.inbox.recv_timeout(timeout) {
            Ok(first) => {
                let mut batch = vec![first];
                batch.extend(self.inbox.try_iter());
                Ok(batch)
            }
            Err(RecvTimeoutError::Timeout) => Ok(Vec::new()),
            Err(RecvTimeoutError::Disconnected) => Err(BusError::Disconnected(
                format!("inbox for {}.{} closed", self.rule.interface, self.rule.member).into(),
            )),
        }
    }
}

/// A connection to a signal bus.
pub trait BusConnection: Send + Sync {
    /// Bus name this connection emits under
    fn name(&self) -> &str;

    fn subscribe(&self, rule: &SignalMatch) -> Result<Subscription, BusError>;

    fn emit(&self, signal: &RawSignal) -> Result<(), BusError>;

    /// Block up to `timeout` for traffic and return every signal pending for
    /// `subscription`.
    fn poll(&self, subscription: &Subscription, timeout: Duration)
        -> Result<Vec<RawSignal>, BusError>;
}

struct Route {
    rule: SignalMatch,
    inbox: Sender<RawSignal>,
}

/// In-process signal bus
#[derive(Clone, Default)]
pub struct LoopbackBus {
    routes: Arc<RwLock<Vec<Route>>>,
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection emitting under `name`
    pub fn connect(&self, name: impl Into<String>) -> LoopbackConnection {
        LoopbackConnection {
            bus: self.clone(),
            name: name.into(),
            offline: AtomicBool::new(false),
        }
    }

    /// Deliver a signal to every matching subscription, returns the number of deliveries.
    ///
    /// Subscriptions whose inbox was dropped are removed.
    pub fn inject(&self, signal: RawSignal) -> usize {
        let mut delivered = 0;
        self.routes.write().retain(|route| {
            if !route.rule.matches(&signal) {
                return true;
            }
            match route.inbox.send(signal.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        trace!(
            "{}.{} delivered to {} subscriptions",
            signal.interface,
            signal.member,
            delivered
        );
        delivered
    }

    /// Get number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.routes.read().len()
    }
}

/// One participant on a [`LoopbackBus`]
pub struct LoopbackConnection {
    bus: LoopbackBus,
    name: String,
    offline: AtomicBool,
}

impl LoopbackConnection {
    /// Simulate a broken connection: emits fail until set back online.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl BusConnection for LoopbackConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(&self, rule: &SignalMatch) -> Result<Subscription, BusError> {
        let (tx, rx) = unbounded();
        self.bus.routes.write().push(Route {
            rule: rule.clone(),
            inbox: tx,
        });
        debug!("{} subscribed to {}", self.name, rule.rule_string());
        Ok(Subscription::new(rule.clone(), rx))
    }

    fn emit(&self, signal: &RawSignal) -> Result<(), BusError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BusError::SendFailed {
                interface: signal.interface.clone(),
                member: signal.member.clone(),
            });
        }
        self.bus
            .inject(signal.clone().with_sender(self.name.clone()));
        Ok(())
    }

    fn poll(
        &self,
        subscription: &Subscription,
        timeout: Duration,
    ) -> Result<Vec<RawSignal>, BusError> {
        subscription.wait(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::codec::WireArg;
    use std::time::Instant;

    fn endpoint() -> SignalEndpoint {
        SignalEndpoint::new("/org/devbus/record", "org.devbus.Record", "Command")
    }

    #[test]
    fn test_match_rule_string() {
        let rule = SignalMatch::new("org.devbus.Core", "Request").with_sender("org.devbus.Ui");
        assert_eq!(
            rule.rule_string(),
            "type='signal',sender='org.devbus.Ui',interface='org.devbus.Core',member='Request'"
        );
    }

    #[test]
    fn test_match_filters_interface_member_sender() {
        let signal = RawSignal::new(&endpoint(), vec![WireArg::Int32(1)]).with_sender("core");

        assert!(SignalMatch::for_endpoint(&endpoint()).matches(&signal));
        assert!(SignalMatch::for_endpoint(&endpoint())
            .with_sender("core")
            .matches(&signal));
        assert!(!SignalMatch::for_endpoint(&endpoint())
            .with_sender("other")
            .matches(&signal));
        assert!(!SignalMatch::new("org.devbus.Record", "Status").matches(&signal));
        assert!(!SignalMatch::new("org.devbus.Core", "Command").matches(&signal));
    }

    #[test]
    fn test_loopback_delivers_to_matching_subscriptions() {
        let bus = LoopbackBus::new();
        let core = bus.connect("core");
        let record = bus.connect("record");

        let commands = record.subscribe(&SignalMatch::for_endpoint(&endpoint())).unwrap();
        let unrelated = record
            .subscribe(&SignalMatch::new("org.devbus.Core", "Status"))
            .unwrap();
        assert_eq!(bus.subscriber_count(), 2);

        core.emit(&RawSignal::new(&endpoint(), vec![WireArg::Int32(1)]))
            .unwrap();

        let batch = record.poll(&commands, Duration::from_millis(100)).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].sender.as_deref(), Some("core"));
        assert!(unrelated.drain().is_empty());
    }

    #[test]
    fn test_poll_times_out_without_traffic() {
        let bus = LoopbackBus::new();
        let conn = bus.connect("idle");
        let sub = conn.subscribe(&SignalMatch::for_endpoint(&endpoint())).unwrap();

        let started = Instant::now();
        assert!(conn.poll(&sub, Duration::from_millis(40)).unwrap().is_empty());
        assert!(started.elapsed() >= Duration::from_millis(35));
    }

    #[test]
    fn test_poll_drains_everything_pending() {
        let bus = LoopbackBus::new();
        let conn = bus.connect("record");
        let sub = conn.subscribe(&SignalMatch::for_endpoint(&endpoint())).unwrap();

        for code in 1..=3 {
            bus.inject(RawSignal::new(&endpoint(), vec![WireArg::Int32(code)]));
        }
        let batch = conn.poll(&sub, Duration::from_millis(10)).unwrap();
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let bus = LoopbackBus::new();
        let conn = bus.connect("record");
        let sub = conn.subscribe(&SignalMatch::for_endpoint(&endpoint())).unwrap();
        drop(sub);

        assert_eq!(bus.inject(RawSignal::new(&endpoint(), vec![])), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_offline_connection_fails_emit() {
        let bus = LoopbackBus::new();
        let conn = bus.connect("core");
        conn.set_offline(true);

        let err = conn
            .emit(&RawSignal::new(&endpoint(), vec![WireArg::Int32(1)]))
            .unwrap_err();
        assert_eq!(err.as_label(), "bus_send_failed");

        conn.set_offline(false);
        assert!(conn.emit(&RawSignal::new(&endpoint(), vec![])).is_ok());
    }
}
