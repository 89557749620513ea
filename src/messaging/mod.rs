/// Messaging module: bus signal transport and in-process dispatch
///
/// Signals cross process boundaries; events stay inside one process.
///
/// ## Architecture
///
/// ```text
/// ┌──────────────┐  signal   ┌────────────────┐  event   ┌────────────┐
/// │ other process│ ────────> │ SignalReceiver │ ───────> │ EventQueue │
/// └──────────────┘           └────────────────┘          └────────────┘
///        ▲                                                     │ pop
///        │ signal                                              ▼
/// ┌──────────────┐  command  ┌──────────────┐  handle   ┌────────────┐
/// │ SignalSender │ <──────── │ state machine│ <──────── │ Dispatcher │
/// └──────────────┘           └──────────────┘           └────────────┘
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let bus = LoopbackBus::new();
/// let queue = EventQueue::new();
///
/// // Decoded record notifications become core events
/// let receiver = SignalReceiver::subscribe(
///     "record-notify",
///     Arc::new(bus.connect(CORE_SERVICE)),
///     SignalMatch::for_endpoint(&topology::record_notifications()),
///     QueueForwarder::new(queue.clone(), CoreEvent::Record),
/// )?;
///
/// // Commands to the record manager
/// let sender = SignalSender::new(Arc::new(bus.connect(CORE_SERVICE)), topology::core_record_route);
/// sender.send_command(RecordCommand::StartRecord);
/// ```

pub mod bus;
pub mod codec;
pub mod commands;
#[cfg(feature = "dbus")]
pub mod dbus;
pub mod dispatcher;
pub mod events;
pub mod info;
pub mod receiver;
pub mod sender;
pub mod topology;

// Re-export commonly used types
pub use bus::{BusConnection, LoopbackBus, LoopbackConnection, SignalEndpoint, SignalMatch, Subscription};
pub use codec::{RawSignal, SignalMessage, WireArg};
pub use commands::{CommandCode, CoreRequest, HardwareCommand, RecordCommand, StatusCategory};
#[cfg(feature = "dbus")]
pub use dbus::DbusConnection;
pub use dispatcher::{Dispatcher, EventHandler};
pub use events::{CaptureReport, CoreEvent, DomainEvent, RecordEvent};
pub use info::NotificationInfo;
pub use receiver::{QueueForwarder, SignalHandler, SignalReceiver};
pub use sender::{FixedRoute, RouteTable, SignalSender};
