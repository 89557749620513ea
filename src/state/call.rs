/// Call state machine
///
/// User requests (dial, answer, hang up) go through `Processing` and wait for
/// the hardware manager's reply. Unsolicited call notifications (incoming,
/// connected, ended) are applied in any state.
use serde::Serialize;

use super::transition::{StateCell, StateView, TransitionError};

const RESOURCE: &str = "call";

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    #[default]
    Idle,

    /// Remote side is ringing us
    Incoming,

    /// We dialed, remote side not answered yet
    Outgoing,

    /// Call in progress
    Calling,

    /// Waiting for the hardware manager (transitional state)
    Processing,
}

impl CallState {
    pub fn is_idle(&self) -> bool {
        matches!(self, CallState::Idle)
    }

    pub fn description(&self) -> &'static str {
        match self {
            CallState::Idle => "Idle",
            CallState::Incoming => "Incoming call",
            CallState::Outgoing => "Dialing",
            CallState::Calling => "In call",
            CallState::Processing => "Processing...",
        }
    }
}

pub struct CallMachine {
    cell: StateCell<CallState>,
    /// State to return to if the in-flight request fails
    before_request: Option<CallState>,
    number: Option<String>,
}

impl CallMachine {
    pub fn new() -> Self {
        Self {
            cell: StateCell::new(CallState::Idle),
            before_request: None,
            number: None,
        }
    }

    pub fn state(&self) -> CallState {
        self.cell.get()
    }

    pub fn view(&self) -> StateView<CallState> {
        self.cell.view()
    }

    /// Number of the current or last call
    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    fn begin(&mut self, current: CallState) -> CallState {
        self.before_request = Some(current);
        self.cell.set(CallState::Processing);
        current
    }

    pub fn dial(&mut self, number: &str) -> Result<CallState, TransitionError> {
        match self.state() {
            CallState::Idle => {
                self.number = Some(number.to_string());
                Ok(self.begin(CallState::Idle))
            }
            CallState::Processing => Err(TransitionError::InTransition(RESOURCE)),
            _ => Err(TransitionError::AlreadyActive(RESOURCE)),
        }
    }

    pub fn answer(&mut self) -> Result<CallState, TransitionError> {
        match self.state() {
            CallState::Incoming => Ok(self.begin(CallState::Incoming)),
            CallState::Idle => Err(TransitionError::AlreadyIdle(RESOURCE)),
            CallState::Processing => Err(TransitionError::InTransition(RESOURCE)),
            CallState::Outgoing | CallState::Calling => Err(TransitionError::AlreadyActive(RESOURCE)),
        }
    }

    pub fn hang_up(&mut self) -> Result<CallState, TransitionError> {
        match self.state() {
            current @ (CallState::Incoming | CallState::Outgoing | CallState::Calling) => {
                Ok(self.begin(current))
            }
            CallState::Idle => Err(TransitionError::AlreadyIdle(RESOURCE)),
            CallState::Processing => Err(TransitionError::InTransition(RESOURCE)),
        }
    }

    fn settle(&mut self, success: bool, on_success: CallState) -> CallState {
        let previous = self.before_request.take().unwrap_or(CallState::Idle);
        let next = if success { on_success } else { previous };
        self.cell.set(next);
        next
    }

    pub fn apply_dial(&mut self, success: bool) -> CallState {
        self.settle(success, CallState::Outgoing)
    }

    pub fn apply_answer(&mut self, success: bool) -> CallState {
        self.settle(success, CallState::Calling)
    }

    pub fn apply_hang_up(&mut self, success: bool) -> CallState {
        self.settle(success, CallState::Idle)
    }

    /// Undo a request whose command could not be sent
    pub fn restore(&mut self, previous: CallState) {
        self.before_request = None;
        self.cell.set(previous);
    }

    pub fn incoming(&mut self, number: &str) {
        self.before_request = None;
        self.number = Some(number.to_string());
        self.cell.set(CallState::Incoming);
    }

    pub fn connected(&mut self) {
        self.before_request = None;
        self.cell.set(CallState::Calling);
    }

    pub fn ended(&mut self) {
        self.before_request = None;
        self.cell.set(CallState::Idle);
    }
}

impl Default for CallMachine {
    fn default() -> Self {
        Self::new()
    }
}
