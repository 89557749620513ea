//! devbus: event-driven coordination runtime for cooperating device
//! processes on one signal bus.
//!
//! Each process owns one [`queue::EventQueue`], one [`timer::TimerService`]
//! and a set of workers (signal receivers and a single dispatcher), wired
//! together by [`runtime::ProcessRuntime`]. The core process runs the
//! [`orchestrator::CoreOrchestrator`]; the record process runs the
//! [`recorder::RecordManager`].

pub mod config;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod orchestrator;
pub mod queue;
pub mod recorder;
pub mod runtime;
pub mod state;
pub mod timer;
pub mod worker;

pub use config::{BusKind, RuntimeConfig};
pub use error::{
    AppResult, BusError, CaptureError, ConfigError, DecodeError, PairingError, TimerError,
    WorkerError,
};
pub use orchestrator::{CoreOrchestrator, StatusSink, StatusUpdate};
pub use queue::EventQueue;
pub use recorder::{CaptureBackend, CaptureReporter, RecordManager};
pub use runtime::ProcessRuntime;
pub use timer::{TimerId, TimerService};
pub use worker::{Lifecycle, Worker, WorkerControl, WorkerHandle};
