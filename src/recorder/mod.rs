/// Record manager
///
/// Event handler of the record process. Turns start/stop commands from the
/// core into capture sessions and replies with notifications once the
/// capture backend reports back.
///
/// ```text
///   StartRecord ──► Processing ──► backend.begin(session)
///                                      │
///   Capture(Started{file}) ◄───────────┘ ──► Recording, reply ok(file),
///                                            duration timer (optional)
///   StopRecord / DurationLimit ──► Processing ──► backend.end(session)
///   Capture(Stopped) ──► Stopped, reply ok
///   Capture(Failed)  ──► Stopped, CaptureFailed
/// ```
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::CaptureError;
use crate::messaging::{
    CaptureReport, EventHandler, NotificationInfo, RecordCommand, RecordEvent, SignalMessage,
    SignalSender,
};
use crate::queue::EventQueue;
use crate::state::{RecordMachine, RecordState, StateView};
use crate::timer::{TimerId, TimerService};

/// Audio capture collaborator. Both calls return once the request is
/// accepted; the outcome arrives later through a [`CaptureReporter`].
pub trait CaptureBackend: Send + Sync + 'static {
    fn begin(&self, session: u64) -> Result<(), CaptureError>;

    fn end(&self, session: u64) -> Result<(), CaptureError>;
}

/// Feeds capture outcomes into the record process queue
#[derive(Clone)]
pub struct CaptureReporter {
    queue: EventQueue<RecordEvent>,
}

impl CaptureReporter {
    pub fn new(queue: EventQueue<RecordEvent>) -> Self {
        Self { queue }
    }

    pub fn started(&self, file: impl Into<String>) -> bool {
        self.report(CaptureReport::Started { file: file.into() })
    }

    pub fn stopped(&self) -> bool {
        self.report(CaptureReport::Stopped)
    }

    pub fn failed(&self, reason: impl Into<String>) -> bool {
        self.report(CaptureReport::Failed {
            reason: reason.into(),
        })
    }

    fn report(&self, report: CaptureReport) -> bool {
        self.queue.push_event(RecordEvent::Capture(report))
    }
}

struct Session {
    machine: RecordMachine,
    id: u64,
    file: Option<String>,
    limit_timer: Option<TimerId>,
}

pub struct RecordManager {
    session: Mutex<Session>,
    view: StateView<RecordState>,
    backend: Box<dyn CaptureBackend>,
    replies: SignalSender<RecordCommand>,
    timers: TimerService<RecordEvent>,
    max_duration: Option<Duration>,
}

impl RecordManager {
    pub fn new(
        backend: impl CaptureBackend,
        replies: SignalSender<RecordCommand>,
        timers: TimerService<RecordEvent>,
        max_duration: Option<Duration>,
    ) -> Self {
        let machine = RecordMachine::new();
        let view = machine.view();
        Self {
            session: Mutex::new(Session {
                machine,
                id: 0,
                file: None,
                limit_timer: None,
            }),
            view,
            backend: Box::new(backend),
            replies,
            timers,
            max_duration,
        }
    }

    pub fn state(&self) -> StateView<RecordState> {
        self.view.clone()
    }

    /// File of the current or last recording
    pub fn current_file(&self) -> Option<String> {
        self.session.lock().file.clone()
    }

    fn reply(&self, command: RecordCommand, success: bool, message: &str) -> bool {
        self.replies.send_notification(
            command,
            success,
            NotificationInfo::new().with_message(message),
        )
    }

    fn cancel_limit(&self, session: &mut Session) {
        if let Some(timer) = session.limit_timer.take() {
            self.timers.stop_timer(timer);
        }
    }

    fn start(&self, session: &mut Session) {
        match session.machine.request_start() {
            Ok(_) => {
                session.id += 1;
                session.file = None;
                info!("Starting recording session {}", session.id);
                if let Err(err) = self.backend.begin(session.id) {
                    warn!("Capture did not start: {}", err);
                    session.machine.apply_start(false);
                    self.reply(RecordCommand::StartRecord, false, &err.to_string());
                }
            }
            Err(err) => warn!("Ignoring start request: {}", err),
        }
    }

    fn stop(&self, session: &mut Session) {
        match session.machine.request_stop() {
            Ok(_) => {
                self.cancel_limit(session);
                info!("Stopping recording session {}", session.id);
                if let Err(err) = self.backend.end(session.id) {
                    warn!("Capture did not stop: {}", err);
                    session.machine.apply_stop(false);
                    self.reply(RecordCommand::StopRecord, false, &err.to_string());
                }
            }
            Err(err) => warn!("Ignoring stop request: {}", err),
        }
    }

    fn on_command(&self, message: SignalMessage<RecordCommand>) {
        let mut session = self.session.lock();
        match message.command() {
            RecordCommand::StartRecord => self.start(&mut session),
            RecordCommand::StopRecord => self.stop(&mut session),
            RecordCommand::CaptureFailed => {
                warn!("Capture failure is reported by this process, not requested");
            }
        }
    }

    fn on_capture(&self, report: CaptureReport) {
        let mut session = self.session.lock();
        match report {
            CaptureReport::Started { file } => {
                session.machine.apply_start(true);
                session.file = Some(file.clone());
                info!("Recording session {} into {}", session.id, file);

                if let Some(limit) = self.max_duration {
                    let event = RecordEvent::DurationLimit {
                        session: session.id,
                    };
                    match self.timers.start_timer(limit, event) {
                        Ok(timer) => session.limit_timer = Some(timer),
                        Err(err) => warn!("Recording length is not limited: {}", err),
                    }
                }
                self.reply(RecordCommand::StartRecord, true, &file);
            }
            CaptureReport::Stopped => {
                self.cancel_limit(&mut session);
                session.machine.apply_stop(true);
                info!("Recording session {} finished", session.id);
                self.reply(RecordCommand::StopRecord, true, "");
            }
            CaptureReport::Failed { reason } => {
                self.cancel_limit(&mut session);
                session.machine.reset();
                warn!("Recording session {} failed: {}", session.id, reason);
                self.reply(RecordCommand::CaptureFailed, false, &reason);
            }
        }
    }

    fn on_duration_limit(&self, id: u64) {
        let mut session = self.session.lock();
        if session.id != id || !session.machine.is_active() {
            debug!("Duration limit of session {} is stale", id);
            return;
        }
        // The timer has fired, nothing left to cancel
        session.limit_timer = None;
        info!("Session {} reached its duration limit", id);
        self.stop(&mut session);
    }
}

impl EventHandler<RecordEvent> for RecordManager {
    fn handle_event(&self, event: RecordEvent) {
        match event {
            RecordEvent::Core(message) => self.on_command(message),
            RecordEvent::Capture(report) => self.on_capture(report),
            RecordEvent::DurationLimit { session } => self.on_duration_limit(session),
        }
    }
}
