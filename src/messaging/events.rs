/// Domain events
///
/// Each process owns one closed event enum. Producers (signal receivers,
/// the timer service, capture callbacks) build events; the dispatcher
/// consumes each exactly once. Events are never mutated after construction.
use super::codec::SignalMessage;
use super::commands::{CommandCode, CoreRequest, HardwareCommand, RecordCommand};

/// Anything a process queue carries
pub trait DomainEvent: Send + 'static {
    /// Get a human-readable description of the event
    fn description(&self) -> String;
}

/// Events of the core process
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// Request forwarded by the UI gateway
    User(SignalMessage<CoreRequest>),

    /// Reply or unsolicited notification from the record manager
    Record(SignalMessage<RecordCommand>),

    /// Reply or unsolicited notification from the hardware manager
    Hardware(SignalMessage<HardwareCommand>),

    /// A pairing confirmation went unanswered
    ConfirmationExpired { address: String, request: u64 },
}

impl DomainEvent for CoreEvent {
    fn description(&self) -> String {
        match self {
            CoreEvent::User(message) => format!("user: {}", message.description()),
            CoreEvent::Record(message) => format!("record: {}", message.description()),
            CoreEvent::Hardware(message) => format!("hardware: {}", message.description()),
            CoreEvent::ConfirmationExpired { address, request } => {
                format!("confirmation #{} for {} expired", request, address)
            }
        }
    }
}

/// Outcome reported by the capture backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureReport {
    Started { file: String },
    Stopped,
    Failed { reason: String },
}

/// Events of the record process
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEvent {
    /// Command from the core
    Core(SignalMessage<RecordCommand>),

    /// Report from the capture backend
    Capture(CaptureReport),

    /// Maximum recording length reached for `session`
    DurationLimit { session: u64 },
}

impl DomainEvent for RecordEvent {
    fn description(&self) -> String {
        match self {
            RecordEvent::Core(message) => format!("core: {}", message.description()),
            RecordEvent::Capture(CaptureReport::Started { file }) => {
                format!("capture started ({})", file)
            }
            RecordEvent::Capture(CaptureReport::Stopped) => "capture stopped".to_string(),
            RecordEvent::Capture(CaptureReport::Failed { reason }) => {
                format!("capture failed: {}", reason)
            }
            RecordEvent::DurationLimit { session } => {
                format!("session {} reached its duration limit", session)
            }
        }
    }
}

impl<C: CommandCode> DomainEvent for SignalMessage<C> {
    fn description(&self) -> String {
        SignalMessage::description(self)
    }
}
