/// State management module
///
/// Per-resource state machines. Written only by the dispatcher thread,
/// readable elsewhere through [`StateView`]s.

pub mod call;
pub mod pairing;
pub mod resource;
pub mod transition;

// Re-export commonly used types
pub use call::{CallMachine, CallState};
pub use pairing::{normalize_address, PairingConfirmations, DEFAULT_CONFIRMATION_TIMEOUT};
pub use resource::{
    BluetoothPowerState, PowerMachine, RecordMachine, RecordState, ScanMachine, ScanningState,
};
pub use transition::{BinaryState, StateCell, StateView, ToggleMachine, TransitionError};
