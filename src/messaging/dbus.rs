/// D-Bus backend
///
/// [`BusConnection`] over libdbus. One `SyncConnection` is shared by every
/// receiver thread of the process; each subscription owns a local receive
/// filter feeding its own inbox, so whichever thread reads a message from
/// the socket, it lands in the right subscription.
use std::time::Duration;

use crossbeam_channel::unbounded;
use dbus::arg::{ArgType, Iter};
use dbus::blocking::stdintf::org_freedesktop_dbus::RequestNameReply;
use dbus::blocking::SyncConnection;
use dbus::channel::MatchingReceiver;
use dbus::message::MatchRule;
use dbus::strings::{BusName, Interface, Member, Path};
use dbus::Message;
use tracing::{debug, info};

use super::bus::{BusConnection, SignalMatch, Subscription};
use super::codec::{RawSignal, WireArg};
use crate::config::BusKind;
use crate::error::BusError;

pub struct DbusConnection {
    conn: SyncConnection,
    name: String,
}

impl DbusConnection {
    /// Connect to `bus` and take ownership of the well-known `name`.
    ///
    /// Both steps are fatal for a process: the caller is expected to exit.
    pub fn connect(bus: BusKind, name: &str) -> Result<Self, BusError> {
        let conn = match bus {
            BusKind::System => SyncConnection::new_system(),
            BusKind::Session => SyncConnection::new_session(),
        }
        .map_err(|e| BusError::ConnectFailed {
            bus: bus.to_string(),
            source: Box::new(e),
        })?;

        let bus_name = BusName::new(name).map_err(|e| BusError::NameRequestFailed {
            name: name.to_string(),
            source: e.into(),
        })?;
        let reply = conn
            .request_name(bus_name, false, true, true)
            .map_err(|e| BusError::NameRequestFailed {
                name: name.to_string(),
                source: Box::new(e),
            })?;

        match reply {
            RequestNameReply::PrimaryOwner | RequestNameReply::AlreadyOwner => {}
            other => {
                return Err(BusError::NameRequestFailed {
                    name: name.to_string(),
                    source: format!("name not granted: {:?}", other).into(),
                });
            }
        }

        info!(
            "Connected to the {} bus as {} ({})",
            bus,
            name,
            conn.unique_name()
        );
        Ok(Self {
            conn,
            name: name.to_string(),
        })
    }

    fn build(signal: &RawSignal) -> Result<Message, BusError> {
        let build_failed = |reason: String| BusError::BuildFailed {
            interface: signal.interface.clone(),
            member: signal.member.clone(),
            reason,
        };

        let path = Path::new(signal.path.as_str()).map_err(build_failed)?;
        let interface = Interface::new(signal.interface.as_str()).map_err(build_failed)?;
        let member = Member::new(signal.member.as_str()).map_err(build_failed)?;
        let mut message = Message::new_signal(path, interface, member).map_err(build_failed)?;

        for arg in &signal.args {
            message = match arg {
                WireArg::Int32(value) => message.append1(*value),
                WireArg::Bool(value) => message.append1(*value),
                WireArg::Str(value) => message.append1(value.as_str()),
                WireArg::Other(signature) => {
                    return Err(build_failed(format!(
                        "cannot emit argument of type '{}'",
                        signature
                    )));
                }
            };
        }
        Ok(message)
    }
}

/// Convert an inbound message into its transport-neutral form
fn to_raw(message: &Message) -> RawSignal {
    let mut args = Vec::new();
    let mut iter: Iter = message.iter_init();
    loop {
        let arg = match iter.arg_type() {
            ArgType::Invalid => break,
            ArgType::Int32 => iter.get::<i32>().map(WireArg::Int32),
            ArgType::Boolean => iter.get::<bool>().map(WireArg::Bool),
            ArgType::String => iter.get::<String>().map(WireArg::Str),
            _ => None,
        };
        args.push(arg.unwrap_or_else(|| WireArg::Other(iter.signature().to_string())));
        if !iter.next() {
            break;
        }
    }

    RawSignal {
        sender: message.sender().map(|s| s.to_string()),
        path: message.path().map(|p| p.to_string()).unwrap_or_default(),
        interface: message.interface().map(|i| i.to_string()).unwrap_or_default(),
        member: message.member().map(|m| m.to_string()).unwrap_or_default(),
        args,
    }
}

impl BusConnection for DbusConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(&self, rule: &SignalMatch) -> Result<Subscription, BusError> {
        let match_failed = |source: Box<dyn std::error::Error + Send + Sync>| {
            BusError::MatchFailed {
                interface: rule.interface.clone(),
                member: rule.member.clone(),
                source,
            }
        };

        // The daemon resolves well-known sender names; the local filter
        // only sees unique names, so it matches on interface and member.
        self.conn
            .add_match_no_cb(&rule.rule_string())
            .map_err(|e| match_failed(Box::new(e)))?;

        let interface = Interface::new(rule.interface.clone()).map_err(|e| match_failed(e.into()))?;
        let member = Member::new(rule.member.clone()).map_err(|e| match_failed(e.into()))?;
        let local = MatchRule::new_signal(interface, member);
        let (tx, rx) = unbounded();
        self.conn.start_receive(
            local,
            Box::new(move |message: Message, _: &SyncConnection| {
                tx.send(to_raw(&message)).is_ok()
            }),
        );

        debug!("{} added match {}", self.name, rule.rule_string());
        Ok(Subscription::new(rule.clone(), rx))
    }

    fn emit(&self, signal: &RawSignal) -> Result<(), BusError> {
        let message = Self::build(signal)?;
        self.conn
            .channel()
            .send(message)
            .map_err(|()| BusError::SendFailed {
                interface: signal.interface.clone(),
                member: signal.member.clone(),
            })?;
        self.conn.channel().flush();
        Ok(())
    }

    fn poll(
        &self,
        subscription: &Subscription,
        timeout: Duration,
    ) -> Result<Vec<RawSignal>, BusError> {
        let pending = subscription.drain();
        if !pending.is_empty() {
            return Ok(pending);
        }

        let disconnected = |e: dbus::Error| BusError::Disconnected(Box::new(e));
        if self.conn.process(timeout).map_err(disconnected)? {
            while self.conn.process(Duration::ZERO).map_err(disconnected)? {}
        }
        Ok(subscription.drain())
    }
}
