/// Bus topology
///
/// Object paths, interfaces and members every process agrees on, plus the
/// route tables mapping each vocabulary to its destination.
use super::bus::{SignalEndpoint, SignalMatch};
use super::commands::{HardwareCommand, RecordCommand};

pub const CORE_SERVICE: &str = "org.devbus.Core";
pub const RECORD_SERVICE: &str = "org.devbus.Record";
pub const HARDWARE_SERVICE: &str = "org.devbus.Hardware";

pub const CORE_PATH: &str = "/org/devbus/core";
pub const CORE_INTERFACE: &str = "org.devbus.Core";
pub const RECORD_PATH: &str = "/org/devbus/record";
pub const RECORD_INTERFACE: &str = "org.devbus.Record";
pub const HARDWARE_PATH: &str = "/org/devbus/hardware";
pub const HARDWARE_INTERFACE: &str = "org.devbus.Hardware";

pub const REQUEST_MEMBER: &str = "Request";
pub const STATUS_MEMBER: &str = "Status";
pub const COMMAND_MEMBER: &str = "Command";
pub const RECORD_NOTIFY_MEMBER: &str = "RecordNotify";
pub const HARDWARE_NOTIFY_MEMBER: &str = "HardwareNotify";

/// UI gateway → core
pub fn core_requests() -> SignalEndpoint {
    SignalEndpoint::new(CORE_PATH, CORE_INTERFACE, REQUEST_MEMBER)
}

/// Core → UI gateway
pub fn core_status() -> SignalEndpoint {
    SignalEndpoint::new(CORE_PATH, CORE_INTERFACE, STATUS_MEMBER)
}

/// Core → record manager
pub fn record_commands() -> SignalEndpoint {
    SignalEndpoint::new(RECORD_PATH, RECORD_INTERFACE, COMMAND_MEMBER)
}

/// Record manager → core
pub fn record_notifications() -> SignalEndpoint {
    SignalEndpoint::new(CORE_PATH, CORE_INTERFACE, RECORD_NOTIFY_MEMBER)
}

/// Core → hardware manager
pub fn hardware_commands() -> SignalEndpoint {
    SignalEndpoint::new(HARDWARE_PATH, HARDWARE_INTERFACE, COMMAND_MEMBER)
}

/// Hardware manager → core
pub fn hardware_notifications() -> SignalEndpoint {
    SignalEndpoint::new(CORE_PATH, CORE_INTERFACE, HARDWARE_NOTIFY_MEMBER)
}

/// Route table of the core: every record command goes to the record manager.
pub fn core_record_route(_command: RecordCommand) -> Option<SignalEndpoint> {
    Some(record_commands())
}

/// Route table of the core for hardware commands. Codes the hardware
/// manager only ever sends have no route from the core.
pub fn core_hardware_route(command: HardwareCommand) -> Option<SignalEndpoint> {
    use HardwareCommand::*;
    match command {
        PowerOn | PowerOff | StartScan | StopScan | AcceptPairing | RejectPairing | Dial
        | Answer | HangUp => Some(hardware_commands()),
        ScanFinished | PairingRequested | IncomingCall | CallConnected | CallEnded
        | Temperature => None,
    }
}

/// Route table of the record manager: replies go back to the core.
pub fn record_reply_route(_command: RecordCommand) -> Option<SignalEndpoint> {
    Some(record_notifications())
}

/// Match rules the core subscribes to
pub fn core_subscriptions() -> [SignalMatch; 3] {
    [
        SignalMatch::for_endpoint(&core_requests()),
        SignalMatch::for_endpoint(&record_notifications()).with_sender(RECORD_SERVICE),
        SignalMatch::for_endpoint(&hardware_notifications()).with_sender(HARDWARE_SERVICE),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_distinct() {
        let endpoints = [
            core_requests(),
            core_status(),
            record_commands(),
            record_notifications(),
            hardware_commands(),
            hardware_notifications(),
        ];
        for (i, a) in endpoints.iter().enumerate() {
            for b in &endpoints[i + 1..] {
                assert_ne!((&a.interface, &a.member), (&b.interface, &b.member));
            }
        }
    }

    #[test]
    fn test_hardware_route_only_outbound_codes() {
        assert_eq!(
            core_hardware_route(HardwareCommand::StartScan),
            Some(hardware_commands())
        );
        assert_eq!(
            core_hardware_route(HardwareCommand::RejectPairing),
            Some(hardware_commands())
        );
        assert_eq!(core_hardware_route(HardwareCommand::Temperature), None);
        assert_eq!(core_hardware_route(HardwareCommand::PairingRequested), None);
    }

    #[test]
    fn test_core_subscriptions() {
        let [requests, record, hardware] = core_subscriptions();
        assert_eq!(requests.member, REQUEST_MEMBER);
        assert_eq!(requests.sender, None);
        assert_eq!(record.sender.as_deref(), Some(RECORD_SERVICE));
        assert_eq!(hardware.member, HARDWARE_NOTIFY_MEMBER);
    }
}
