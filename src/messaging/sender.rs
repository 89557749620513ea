/// Signal sender
///
/// Maps a command code to its destination through a [`RouteTable`],
/// serializes the arguments and emits the signal. Nothing is transmitted
/// unless the whole message could be built.
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::bus::{BusConnection, SignalEndpoint};
use super::codec::{RawSignal, SignalMessage};
use super::commands::CommandCode;
use super::info::NotificationInfo;

/// Per-process mapping from command code to destination
pub trait RouteTable<C>: Send + Sync {
    fn endpoint(&self, command: C) -> Option<SignalEndpoint>;
}

impl<C, F> RouteTable<C> for F
where
    F: Fn(C) -> Option<SignalEndpoint> + Send + Sync,
{
    fn endpoint(&self, command: C) -> Option<SignalEndpoint> {
        self(command)
    }
}

/// Every command goes to the same endpoint
#[derive(Debug, Clone)]
pub struct FixedRoute(pub SignalEndpoint);

impl<C> RouteTable<C> for FixedRoute {
    fn endpoint(&self, _command: C) -> Option<SignalEndpoint> {
        Some(self.0.clone())
    }
}

pub struct SignalSender<C> {
    bus: Arc<dyn BusConnection>,
    routes: Arc<dyn RouteTable<C>>,
}

impl<C: CommandCode> SignalSender<C> {
    pub fn new(bus: Arc<dyn BusConnection>, routes: impl RouteTable<C> + 'static) -> Self {
        Self {
            bus,
            routes: Arc::new(routes),
        }
    }

    /// Plain command, signature `i`
    pub fn send_command(&self, command: C) -> bool {
        self.send(&SignalMessage::Command(command))
    }

    /// Command with success flag and info block, signature `ibs`
    pub fn send_notification(&self, command: C, success: bool, info: NotificationInfo) -> bool {
        self.send(&SignalMessage::notification(command, success, info))
    }

    /// Command carrying parameters in its info block
    pub fn send_with_info(&self, command: C, info: NotificationInfo) -> bool {
        self.send_notification(command, true, info)
    }

    /// Returns whether the signal left this process.
    pub fn send(&self, message: &SignalMessage<C>) -> bool {
        let command = message.command();
        let Some(endpoint) = self.routes.endpoint(command) else {
            warn!("No route for {:?}, not sending", command);
            return false;
        };

        let args = match message.encode() {
            Ok(args) => args,
            Err(err) => {
                error!("Failed to serialize {:?}: {}", command, err);
                return false;
            }
        };

        let signal = RawSignal::new(&endpoint, args);
        match self.bus.emit(&signal) {
            Ok(()) => {
                debug!(
                    "Sent {} to {}.{}",
                    message.description(),
                    endpoint.interface,
                    endpoint.member
                );
                true
            }
            Err(err) => {
                warn!("{} ({}): {}", err, err.as_label(), message.description());
                false
            }
        }
    }
}

impl<C> Clone for SignalSender<C> {
    fn clone(&self) -> Self {
        Self {
            bus: Arc::clone(&self.bus),
            routes: Arc::clone(&self.routes),
        }
    }
}
