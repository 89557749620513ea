/// Two-phase resource states
///
/// Recording session, bluetooth radio power and device scan all share the
/// inactive / processing / active shape driven by [`ToggleMachine`].
use serde::Serialize;

use super::transition::{BinaryState, ToggleMachine};

/// State of the recording session
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    #[default]
    Stopped,

    /// Waiting for the record manager (transitional state)
    Processing,

    Recording,
}

impl BinaryState for RecordState {
    const RESOURCE: &'static str = "recording";
    const INACTIVE: Self = RecordState::Stopped;
    const ACTIVE: Self = RecordState::Recording;
    const PROCESSING: Self = RecordState::Processing;

    fn description(self) -> &'static str {
        match self {
            RecordState::Stopped => "Stopped",
            RecordState::Processing => "Processing...",
            RecordState::Recording => "Recording",
        }
    }
}

/// Power state of the bluetooth radio
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BluetoothPowerState {
    #[default]
    Off,

    /// Waiting for the hardware manager (transitional state)
    Processing,

    On,
}

impl BinaryState for BluetoothPowerState {
    const RESOURCE: &'static str = "bluetooth power";
    const INACTIVE: Self = BluetoothPowerState::Off;
    const ACTIVE: Self = BluetoothPowerState::On;
    const PROCESSING: Self = BluetoothPowerState::Processing;

    fn description(self) -> &'static str {
        match self {
            BluetoothPowerState::Off => "Off",
            BluetoothPowerState::Processing => "Processing...",
            BluetoothPowerState::On => "On",
        }
    }
}

/// Device discovery state
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanningState {
    #[default]
    Idle,

    Processing,

    Scanning,
}

impl BinaryState for ScanningState {
    const RESOURCE: &'static str = "scan";
    const INACTIVE: Self = ScanningState::Idle;
    const ACTIVE: Self = ScanningState::Scanning;
    const PROCESSING: Self = ScanningState::Processing;

    fn description(self) -> &'static str {
        match self {
            ScanningState::Idle => "Idle",
            ScanningState::Processing => "Processing...",
            ScanningState::Scanning => "Scanning",
        }
    }
}

pub type RecordMachine = ToggleMachine<RecordState>;
pub type PowerMachine = ToggleMachine<BluetoothPowerState>;
pub type ScanMachine = ToggleMachine<ScanningState>;
