/// Command code vocabularies
///
/// Every process speaks a closed set of `i32` command codes on the bus.
/// Unknown codes never become values of these enums: decoding rejects them.
use std::fmt::Debug;

/// A closed, process-specific enumeration carried as an `i32` on the wire.
pub trait CommandCode: Copy + Debug + PartialEq + Send + Sync + 'static {
    fn code(self) -> i32;

    fn from_code(code: i32) -> Option<Self>;

    /// Get a human-readable description of the command
    fn description(self) -> &'static str;
}

macro_rules! command_codes {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal => $label:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $code, )+
        }

        impl CommandCode for $name {
            fn code(self) -> i32 {
                self as i32
            }

            fn from_code(code: i32) -> Option<Self> {
                match code {
                    $( $code => Some($name::$variant), )+
                    _ => None,
                }
            }

            fn description(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }
        }
    };
}

command_codes! {
    /// Requests forwarded by the UI gateway to the core process
    pub enum CoreRequest {
        StartRecord = 1 => "Start recording",
        StopRecord = 2 => "Stop recording",
        PowerOn = 3 => "Power on bluetooth",
        PowerOff = 4 => "Power off bluetooth",
        StartScan = 5 => "Start device scan",
        StopScan = 6 => "Stop device scan",
        /// info.number carries the number to dial
        Dial = 7 => "Dial number",
        Answer = 8 => "Answer call",
        HangUp = 9 => "Hang up call",
        /// info.address carries the device address
        AcceptPairing = 10 => "Accept pairing",
        /// info.address carries the device address
        RejectPairing = 11 => "Reject pairing",
    }
}

command_codes! {
    /// Commands and notifications between the core and the record manager
    pub enum RecordCommand {
        StartRecord = 1 => "Start recording",
        StopRecord = 2 => "Stop recording",
        /// Unsolicited: capture died while recording
        CaptureFailed = 3 => "Capture failed",
    }
}

command_codes! {
    /// Commands and notifications between the core and the hardware manager
    pub enum HardwareCommand {
        PowerOn = 1 => "Power on bluetooth",
        PowerOff = 2 => "Power off bluetooth",
        StartScan = 3 => "Start device scan",
        StopScan = 4 => "Stop device scan",
        /// Unsolicited: the adapter ended discovery on its own
        ScanFinished = 5 => "Scan finished",
        /// Unsolicited: a device asks for pairing confirmation (info.address)
        PairingRequested = 6 => "Pairing confirmation requested",
        AcceptPairing = 7 => "Accept pairing",
        RejectPairing = 8 => "Reject pairing",
        Dial = 9 => "Dial number",
        Answer = 10 => "Answer call",
        HangUp = 11 => "Hang up call",
        /// Unsolicited: info.number carries the caller
        IncomingCall = 12 => "Incoming call",
        /// Unsolicited: the remote side answered
        CallConnected = 13 => "Call connected",
        /// Unsolicited: the call ended
        CallEnded = 14 => "Call ended",
        /// Unsolicited: info.temperature carries the reading
        Temperature = 15 => "Temperature reading",
    }
}

command_codes! {
    /// Category tag of a status broadcast to the UI gateway
    pub enum StatusCategory {
        Record = 1 => "record",
        Power = 2 => "power",
        Scan = 3 => "scan",
        Call = 4 => "call",
        Pairing = 5 => "pairing",
        Temperature = 6 => "temperature",
        Error = 7 => "error",
    }
}
