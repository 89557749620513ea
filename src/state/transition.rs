/// Two-phase resource transitions
///
/// A resource moves inactive → processing on a start request and active →
/// processing on a stop request. Terminal states are applied only when the
/// matching notification arrives, from its own success flag.
use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;

/// Illegal request for the current state. Nothing was changed or sent.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("{0} is already active")]
    AlreadyActive(&'static str),

    #[error("{0} is already idle")]
    AlreadyIdle(&'static str),

    #[error("{0} is waiting for a previous request")]
    InTransition(&'static str),

    #[error("{resource} requires {requirement}")]
    Precondition {
        resource: &'static str,
        requirement: &'static str,
    },
}

impl TransitionError {
    pub fn as_label(&self) -> &'static str {
        match self {
            TransitionError::AlreadyActive(_) => "already_active",
            TransitionError::AlreadyIdle(_) => "already_idle",
            TransitionError::InTransition(_) => "in_transition",
            TransitionError::Precondition { .. } => "precondition",
        }
    }
}

/// State value written by the dispatcher, readable from any thread.
pub struct StateCell<S> {
    inner: Arc<RwLock<S>>,
}

impl<S: Copy> StateCell<S> {
    pub fn new(initial: S) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn get(&self) -> S {
        *self.inner.read()
    }

    pub(crate) fn set(&self, state: S) {
        *self.inner.write() = state;
    }

    pub fn view(&self) -> StateView<S> {
        StateView {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Read-only handle to a [`StateCell`]. May observe transient processing states.
#[derive(Clone)]
pub struct StateView<S> {
    inner: Arc<RwLock<S>>,
}

impl<S: Copy> StateView<S> {
    pub fn get(&self) -> S {
        *self.inner.read()
    }
}

/// Resource with one inactive, one active and one processing state.
pub trait BinaryState: Copy + Debug + PartialEq + Serialize + Send + Sync + 'static {
    /// Resource name used in errors and logs
    const RESOURCE: &'static str;
    const INACTIVE: Self;
    const ACTIVE: Self;
    const PROCESSING: Self;

    fn description(self) -> &'static str;
}

/// State machine of a [`BinaryState`] resource
pub struct ToggleMachine<S> {
    cell: StateCell<S>,
}

impl<S: BinaryState> ToggleMachine<S> {
    pub fn new() -> Self {
        Self {
            cell: StateCell::new(S::INACTIVE),
        }
    }

    pub fn state(&self) -> S {
        self.cell.get()
    }

    pub fn view(&self) -> StateView<S> {
        self.cell.view()
    }

    pub fn is_active(&self) -> bool {
        self.state() == S::ACTIVE
    }

    /// Inactive → processing. Returns the state to restore if the request
    /// never leaves the process.
    pub fn request_start(&mut self) -> Result<S, TransitionError> {
        let current = self.state();
        if current == S::INACTIVE {
            self.cell.set(S::PROCESSING);
            Ok(current)
        } else if current == S::ACTIVE {
            Err(TransitionError::AlreadyActive(S::RESOURCE))
        } else {
            Err(TransitionError::InTransition(S::RESOURCE))
        }
    }

    /// Active → processing
    pub fn request_stop(&mut self) -> Result<S, TransitionError> {
        let current = self.state();
        if current == S::ACTIVE {
            self.cell.set(S::PROCESSING);
            Ok(current)
        } else if current == S::INACTIVE {
            Err(TransitionError::AlreadyIdle(S::RESOURCE))
        } else {
            Err(TransitionError::InTransition(S::RESOURCE))
        }
    }

    /// Outcome of a start: active on success, back to inactive otherwise.
    pub fn apply_start(&mut self, success: bool) -> S {
        let next = if success { S::ACTIVE } else { S::INACTIVE };
        self.cell.set(next);
        next
    }

    /// Outcome of a stop: inactive on success, back to active otherwise.
    pub fn apply_stop(&mut self, success: bool) -> S {
        let next = if success { S::INACTIVE } else { S::ACTIVE };
        self.cell.set(next);
        next
    }

    /// Undo a request whose command could not be sent
    pub fn restore(&mut self, previous: S) {
        self.cell.set(previous);
    }

    pub fn reset(&mut self) {
        self.cell.set(S::INACTIVE);
    }
}

impl<S: BinaryState> Default for ToggleMachine<S> {
    fn default() -> Self {
        Self::new()
    }
}
