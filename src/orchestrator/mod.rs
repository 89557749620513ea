/// Core orchestrator
///
/// Event handler of the core process. Drives the recording, radio power,
/// scan and call machines from user requests and manager notifications,
/// and answers pairing confirmations.
///
/// ```text
///   CoreEvent::User(request) ──► machine.request_*() ──► one command out
///                                      │ illegal: warn, nothing else
///                                      │ send failed: restore + Error status
///   CoreEvent::Record/Hardware(noti) ──► machine.apply_*(success) ──► status
///   CoreEvent::ConfirmationExpired    ──► pairing.expire() ──► auto-reject
/// ```
pub mod status;

use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::messaging::{
    CommandCode, CoreEvent, CoreRequest, EventHandler, HardwareCommand, NotificationInfo, RecordCommand,
    SignalMessage, SignalSender, StatusCategory,
};
use crate::state::{
    BinaryState, BluetoothPowerState, CallMachine, CallState, PairingConfirmations, PowerMachine,
    RecordMachine, RecordState, ScanMachine, ScanningState, StateView, ToggleMachine,
    TransitionError,
};
use crate::timer::TimerService;

pub use status::{BusStatusSink, LogStatusSink, Status, StatusSink, StatusUpdate};

/// Machines owned by the dispatcher thread
struct Machines {
    record: RecordMachine,
    power: PowerMachine,
    scan: ScanMachine,
    call: CallMachine,
}

/// Read-only views of the core's resource states
#[derive(Clone)]
pub struct CoreStateView {
    pub record: StateView<RecordState>,
    pub power: StateView<BluetoothPowerState>,
    pub scan: StateView<ScanningState>,
    pub call: StateView<CallState>,
}

pub struct CoreOrchestrator {
    machines: Mutex<Machines>,
    views: CoreStateView,
    record: SignalSender<RecordCommand>,
    hardware: SignalSender<HardwareCommand>,
    pairing: PairingConfirmations,
    status: Box<dyn StatusSink>,
    temperature: RwLock<Option<String>>,
}

impl CoreOrchestrator {
    pub fn new(
        record: SignalSender<RecordCommand>,
        hardware: SignalSender<HardwareCommand>,
        timers: TimerService<CoreEvent>,
        confirmation_timeout: Duration,
        status: impl StatusSink,
    ) -> Self {
        let machines = Machines {
            record: RecordMachine::new(),
            power: PowerMachine::new(),
            scan: ScanMachine::new(),
            call: CallMachine::new(),
        };
        let views = CoreStateView {
            record: machines.record.view(),
            power: machines.power.view(),
            scan: machines.scan.view(),
            call: machines.call.view(),
        };

        Self {
            machines: Mutex::new(machines),
            views,
            pairing: PairingConfirmations::new(timers, hardware.clone(), confirmation_timeout),
            record,
            hardware,
            status: Box::new(status),
            temperature: RwLock::new(None),
        }
    }

    pub fn views(&self) -> &CoreStateView {
        &self.views
    }

    pub fn pairing(&self) -> &PairingConfirmations {
        &self.pairing
    }

    /// Last temperature reported by the hardware manager
    pub fn last_temperature(&self) -> Option<String> {
        self.temperature.read().clone()
    }

    fn publish(&self, update: StatusUpdate) {
        self.status.publish(update);
    }

    fn refuse(&self, what: &str, err: TransitionError) {
        warn!("Ignoring {}: {} ({})", what, err, err.as_label());
    }

    fn unsent(&self, category: StatusCategory, what: &str) {
        self.publish(StatusUpdate::failed(
            StatusCategory::Error,
            json!({
                "category": category.description(),
                "message": format!("{} could not be sent", what),
            }),
        ));
    }

    /// Request a start or stop of a two-phase resource and send its command.
    fn toggle<S, C>(
        &self,
        machine: &mut ToggleMachine<S>,
        start: bool,
        category: StatusCategory,
        sender: &SignalSender<C>,
        message: SignalMessage<C>,
    ) where
        S: BinaryState,
        C: CommandCode,
    {
        let what = message.description();
        let requested = if start {
            machine.request_start()
        } else {
            machine.request_stop()
        };
        let previous = match requested {
            Ok(previous) => previous,
            Err(err) => return self.refuse(&what, err),
        };

        if sender.send(&message) {
            self.publish(StatusUpdate::ok(category, state_payload(machine.state())));
        } else {
            machine.restore(previous);
            self.unsent(category, &what);
        }
    }

    fn on_user(&self, request: SignalMessage<CoreRequest>) {
        let info = request.info().cloned().unwrap_or_default();
        let mut guard = self.machines.lock();
        let m = &mut *guard;

        match request.command() {
            CoreRequest::StartRecord => self.toggle(
                &mut m.record,
                true,
                StatusCategory::Record,
                &self.record,
                SignalMessage::Command(RecordCommand::StartRecord),
            ),
            CoreRequest::StopRecord => self.toggle(
                &mut m.record,
                false,
                StatusCategory::Record,
                &self.record,
                SignalMessage::Command(RecordCommand::StopRecord),
            ),
            CoreRequest::PowerOn => self.toggle(
                &mut m.power,
                true,
                StatusCategory::Power,
                &self.hardware,
                SignalMessage::Command(HardwareCommand::PowerOn),
            ),
            CoreRequest::PowerOff => self.toggle(
                &mut m.power,
                false,
                StatusCategory::Power,
                &self.hardware,
                SignalMessage::Command(HardwareCommand::PowerOff),
            ),
            CoreRequest::StartScan => {
                if !m.power.is_active() {
                    return self.refuse(
                        "scan request",
                        TransitionError::Precondition {
                            resource: ScanningState::RESOURCE,
                            requirement: "bluetooth power on",
                        },
                    );
                }
                self.toggle(
                    &mut m.scan,
                    true,
                    StatusCategory::Scan,
                    &self.hardware,
                    SignalMessage::Command(HardwareCommand::StartScan),
                )
            }
            CoreRequest::StopScan => self.toggle(
                &mut m.scan,
                false,
                StatusCategory::Scan,
                &self.hardware,
                SignalMessage::Command(HardwareCommand::StopScan),
            ),
            CoreRequest::Dial => {
                let number = info.number.trim();
                if number.is_empty() {
                    warn!("Ignoring dial request without a number");
                    return;
                }
                let previous = match m.call.dial(number) {
                    Ok(previous) => previous,
                    Err(err) => return self.refuse("dial request", err),
                };
                let sent = self.hardware.send_with_info(
                    HardwareCommand::Dial,
                    NotificationInfo::new().with_number(number),
                );
                self.after_call_request(&mut m.call, previous, sent, "Dial number");
            }
            CoreRequest::Answer => {
                let previous = match m.call.answer() {
                    Ok(previous) => previous,
                    Err(err) => return self.refuse("answer request", err),
                };
                let sent = self.hardware.send_command(HardwareCommand::Answer);
                self.after_call_request(&mut m.call, previous, sent, "Answer call");
            }
            CoreRequest::HangUp => {
                let previous = match m.call.hang_up() {
                    Ok(previous) => previous,
                    Err(err) => return self.refuse("hang up request", err),
                };
                let sent = self.hardware.send_command(HardwareCommand::HangUp);
                self.after_call_request(&mut m.call, previous, sent, "Hang up call");
            }
            CoreRequest::AcceptPairing => self.answer_pairing(&info.address, true),
            CoreRequest::RejectPairing => self.answer_pairing(&info.address, false),
        }
    }

    fn after_call_request(&self, call: &mut CallMachine, previous: CallState, sent: bool, what: &str) {
        if sent {
            self.publish(StatusUpdate::ok(StatusCategory::Call, call_payload(call)));
        } else {
            call.restore(previous);
            self.unsent(StatusCategory::Call, what);
        }
    }

    fn answer_pairing(&self, address: &str, accept: bool) {
        let answered = if accept {
            self.pairing.accept(address)
        } else {
            self.pairing.reject(address)
        };
        if answered {
            let state = if accept { "accepted" } else { "rejected" };
            self.publish(StatusUpdate::ok(
                StatusCategory::Pairing,
                json!({ "address": address.trim().to_ascii_uppercase(), "state": state }),
            ));
        }
    }

    fn on_record(&self, message: SignalMessage<RecordCommand>) {
        let (command, success, info) = match message {
            SignalMessage::Notification {
                command,
                success,
                info,
            } => (command, success, info),
            SignalMessage::Command(command) => {
                warn!(
                    "Unexpected plain command from the record manager: {:?}",
                    command
                );
                return;
            }
        };

        let mut m = self.machines.lock();
        let state = match command {
            RecordCommand::StartRecord => m.record.apply_start(success),
            RecordCommand::StopRecord => m.record.apply_stop(success),
            RecordCommand::CaptureFailed => {
                m.record.reset();
                self.publish(StatusUpdate::failed(
                    StatusCategory::Record,
                    outcome_payload(m.record.state(), &info),
                ));
                return;
            }
        };
        self.publish(outcome(StatusCategory::Record, success, outcome_payload(state, &info)));
    }

    fn on_hardware(&self, message: SignalMessage<HardwareCommand>) {
        let (command, success, info) = match message {
            SignalMessage::Notification {
                command,
                success,
                info,
            } => (command, success, info),
            SignalMessage::Command(command) => {
                warn!(
                    "Unexpected plain command from the hardware manager: {:?}",
                    command
                );
                return;
            }
        };

        let mut guard = self.machines.lock();
        let m = &mut *guard;
        match command {
            HardwareCommand::PowerOn => {
                let state = m.power.apply_start(success);
                self.publish(outcome(StatusCategory::Power, success, outcome_payload(state, &info)));
            }
            HardwareCommand::PowerOff => {
                let state = m.power.apply_stop(success);
                self.publish(outcome(StatusCategory::Power, success, outcome_payload(state, &info)));
                if success {
                    self.pairing.clear();
                    if m.scan.state() != ScanningState::Idle {
                        m.scan.reset();
                        self.publish(StatusUpdate::ok(
                            StatusCategory::Scan,
                            state_payload(m.scan.state()),
                        ));
                    }
                }
            }
            HardwareCommand::StartScan => {
                let state = m.scan.apply_start(success);
                self.publish(outcome(StatusCategory::Scan, success, outcome_payload(state, &info)));
            }
            HardwareCommand::StopScan => {
                let state = m.scan.apply_stop(success);
                self.publish(outcome(StatusCategory::Scan, success, outcome_payload(state, &info)));
            }
            HardwareCommand::ScanFinished => {
                m.scan.reset();
                self.publish(StatusUpdate::ok(StatusCategory::Scan, state_payload(m.scan.state())));
            }
            HardwareCommand::PairingRequested => match self.pairing.request(&info.address) {
                Ok(timer) => {
                    debug!("Pairing confirmation for {} on {}", info.address, timer);
                    self.publish(StatusUpdate::ok(
                        StatusCategory::Pairing,
                        json!({
                            "address": info.address.trim().to_ascii_uppercase(),
                            "name": info.name,
                            "state": "pending",
                        }),
                    ));
                }
                Err(err) => {
                    warn!("Cannot track pairing confirmation: {}", err);
                    self.publish(StatusUpdate::failed(
                        StatusCategory::Error,
                        json!({ "category": "pairing", "message": err.to_string() }),
                    ));
                }
            },
            HardwareCommand::AcceptPairing | HardwareCommand::RejectPairing => {
                let state = match command {
                    HardwareCommand::AcceptPairing => "paired",
                    _ => "rejected",
                };
                self.publish(outcome(
                    StatusCategory::Pairing,
                    success,
                    json!({ "address": info.address, "state": state, "message": info.message }),
                ));
            }
            HardwareCommand::Dial => {
                m.call.apply_dial(success);
                self.publish(outcome(StatusCategory::Call, success, call_outcome(&m.call, &info)));
            }
            HardwareCommand::Answer => {
                m.call.apply_answer(success);
                self.publish(outcome(StatusCategory::Call, success, call_outcome(&m.call, &info)));
            }
            HardwareCommand::HangUp => {
                m.call.apply_hang_up(success);
                self.publish(outcome(StatusCategory::Call, success, call_outcome(&m.call, &info)));
            }
            HardwareCommand::IncomingCall => {
                m.call.incoming(info.number.trim());
                self.publish(StatusUpdate::ok(StatusCategory::Call, call_payload(&m.call)));
            }
            HardwareCommand::CallConnected => {
                m.call.connected();
                self.publish(StatusUpdate::ok(StatusCategory::Call, call_payload(&m.call)));
            }
            HardwareCommand::CallEnded => {
                m.call.ended();
                self.publish(StatusUpdate::ok(StatusCategory::Call, call_payload(&m.call)));
            }
            HardwareCommand::Temperature => {
                *self.temperature.write() = Some(info.temperature.clone());
                self.publish(outcome(
                    StatusCategory::Temperature,
                    success,
                    json!({ "temperature": info.temperature }),
                ));
            }
        }
    }

    fn on_confirmation_expired(&self, address: &str, request: u64) {
        if self.pairing.expire(address, request) {
            self.publish(StatusUpdate::ok(
                StatusCategory::Pairing,
                json!({ "address": address, "state": "expired" }),
            ));
        }
    }
}

impl EventHandler<CoreEvent> for CoreOrchestrator {
    fn handle_event(&self, event: CoreEvent) {
        match event {
            CoreEvent::User(request) => self.on_user(request),
            CoreEvent::Record(message) => self.on_record(message),
            CoreEvent::Hardware(message) => self.on_hardware(message),
            CoreEvent::ConfirmationExpired { address, request } => {
                self.on_confirmation_expired(&address, request)
            }
        }
    }
}

fn outcome(category: StatusCategory, success: bool, payload: Value) -> StatusUpdate {
    if success {
        StatusUpdate::ok(category, payload)
    } else {
        StatusUpdate::failed(category, payload)
    }
}

fn state_payload<S: BinaryState>(state: S) -> Value {
    json!({ "state": state })
}

fn outcome_payload<S: BinaryState>(state: S, info: &NotificationInfo) -> Value {
    json!({ "state": state, "message": info.message })
}

fn call_payload(call: &CallMachine) -> Value {
    json!({ "state": call.state(), "number": call.number().unwrap_or_default() })
}

fn call_outcome(call: &CallMachine, info: &NotificationInfo) -> Value {
    json!({
        "state": call.state(),
        "number": call.number().unwrap_or_default(),
        "message": info.message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::{
        topology, BusConnection, LoopbackBus, LoopbackConnection, SignalMatch, Subscription,
    };
    use crate::queue::EventQueue;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct MemorySink(Arc<Mutex<Vec<StatusUpdate>>>);

    impl StatusSink for MemorySink {
        fn publish(&self, update: StatusUpdate) {
            self.0.lock().push(update);
        }
    }

    struct Fixture {
        core: CoreOrchestrator,
        core_conn: Arc<LoopbackConnection>,
        record_inbox: Subscription,
        hardware_inbox: Subscription,
        statuses: MemorySink,
        timers: TimerService<CoreEvent>,
        _bus: LoopbackBus,
    }

    fn fixture() -> Fixture {
        let bus = LoopbackBus::new();
        let record_inbox = bus
            .connect(topology::RECORD_SERVICE)
            .subscribe(&SignalMatch::for_endpoint(&topology::record_commands()))
            .unwrap();
        let hardware_inbox = bus
            .connect(topology::HARDWARE_SERVICE)
            .subscribe(&SignalMatch::for_endpoint(&topology::hardware_commands()))
            .unwrap();

        let core_conn = Arc::new(bus.connect(topology::CORE_SERVICE));
        let timers = TimerService::new();
        timers.attach_queue(EventQueue::new());
        let statuses = MemorySink::default();

        let core = CoreOrchestrator::new(
            SignalSender::new(core_conn.clone(), topology::core_record_route),
            SignalSender::new(core_conn.clone(), topology::core_hardware_route),
            timers.clone(),
            crate::state::DEFAULT_CONFIRMATION_TIMEOUT,
            statuses.clone(),
        );
        Fixture {
            core,
            core_conn,
            record_inbox,
            hardware_inbox,
            statuses,
            timers,
            _bus: bus,
        }
    }

    fn user(request: CoreRequest) -> CoreEvent {
        CoreEvent::User(SignalMessage::Command(request))
    }

    fn hardware(command: HardwareCommand, success: bool, info: NotificationInfo) -> CoreEvent {
        CoreEvent::Hardware(SignalMessage::notification(command, success, info))
    }

    fn commands<C: CommandCode>(inbox: &Subscription) -> Vec<C> {
        inbox
            .drain()
            .iter()
            .map(|signal| SignalMessage::<C>::decode(&signal.args).unwrap().command())
            .collect()
    }

    fn power_on(f: &Fixture) {
        f.core.handle_event(user(CoreRequest::PowerOn));
        f.core
            .handle_event(hardware(HardwareCommand::PowerOn, true, NotificationInfo::new()));
        f.hardware_inbox.drain();
    }

    #[test]
    fn test_recording_scenario() {
        let f = fixture();
        let record = f.core.views().record.clone();

        f.core.handle_event(user(CoreRequest::StartRecord));
        assert_eq!(record.get(), RecordState::Processing);
        assert_eq!(
            commands::<RecordCommand>(&f.record_inbox),
            vec![RecordCommand::StartRecord]
        );

        f.core.handle_event(CoreEvent::Record(SignalMessage::notification(
            RecordCommand::StartRecord,
            true,
            NotificationInfo::new().with_message("/data/rec-1.wav"),
        )));
        assert_eq!(record.get(), RecordState::Recording);

        f.core.handle_event(user(CoreRequest::StopRecord));
        assert_eq!(record.get(), RecordState::Processing);
        assert_eq!(
            commands::<RecordCommand>(&f.record_inbox),
            vec![RecordCommand::StopRecord]
        );

        f.core.handle_event(CoreEvent::Record(SignalMessage::notification(
            RecordCommand::StopRecord,
            true,
            NotificationInfo::new(),
        )));
        assert_eq!(record.get(), RecordState::Stopped);

        let statuses = f.statuses.0.lock();
        assert_eq!(statuses.len(), 4);
        assert!(statuses.iter().all(|s| s.category == StatusCategory::Record && s.is_ok()));
        assert_eq!(statuses[1].payload["message"], "/data/rec-1.wav");
    }

    #[test]
    fn test_repeated_start_changes_nothing() {
        let f = fixture();
        f.core.handle_event(user(CoreRequest::StartRecord));
        f.record_inbox.drain();
        let published = f.statuses.0.lock().len();

        // Processing
        f.core.handle_event(user(CoreRequest::StartRecord));
        assert!(f.record_inbox.drain().is_empty());
        assert_eq!(f.statuses.0.lock().len(), published);

        // Recording
        f.core.handle_event(CoreEvent::Record(SignalMessage::notification(
            RecordCommand::StartRecord,
            true,
            NotificationInfo::new(),
        )));
        f.core.handle_event(user(CoreRequest::StartRecord));
        assert!(f.record_inbox.drain().is_empty());
        assert_eq!(f.core.views().record.get(), RecordState::Recording);
    }

    #[test]
    fn test_failed_notification_rolls_back() {
        let f = fixture();
        f.core.handle_event(user(CoreRequest::StartRecord));
        f.core.handle_event(CoreEvent::Record(SignalMessage::notification(
            RecordCommand::StartRecord,
            false,
            NotificationInfo::new().with_message("no capture device"),
        )));

        assert_eq!(f.core.views().record.get(), RecordState::Stopped);
        let statuses = f.statuses.0.lock();
        let last = statuses.last().unwrap();
        assert!(!last.is_ok());
        assert_eq!(last.payload["message"], "no capture device");
    }

    #[test]
    fn test_send_failure_restores_state() {
        let f = fixture();
        f.core_conn.set_offline(true);

        f.core.handle_event(user(CoreRequest::StartRecord));
        assert_eq!(f.core.views().record.get(), RecordState::Stopped);

        let statuses = f.statuses.0.lock();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].category, StatusCategory::Error);
        assert_eq!(statuses[0].payload["category"], "record");
    }

    #[test]
    fn test_scan_requires_power() {
        let f = fixture();
        f.core.handle_event(user(CoreRequest::StartScan));
        assert!(f.hardware_inbox.drain().is_empty());
        assert_eq!(f.core.views().scan.get(), ScanningState::Idle);

        power_on(&f);
        assert_eq!(f.core.views().power.get(), BluetoothPowerState::On);
        f.core.handle_event(user(CoreRequest::StartScan));
        assert_eq!(
            commands::<HardwareCommand>(&f.hardware_inbox),
            vec![HardwareCommand::StartScan]
        );
        f.core
            .handle_event(hardware(HardwareCommand::StartScan, true, NotificationInfo::new()));
        assert_eq!(f.core.views().scan.get(), ScanningState::Scanning);
    }

    #[test]
    fn test_power_off_resets_scan() {
        let f = fixture();
        power_on(&f);
        f.core.handle_event(user(CoreRequest::StartScan));
        f.core
            .handle_event(hardware(HardwareCommand::StartScan, true, NotificationInfo::new()));

        f.core.handle_event(user(CoreRequest::PowerOff));
        f.core
            .handle_event(hardware(HardwareCommand::PowerOff, true, NotificationInfo::new()));
        assert_eq!(f.core.views().power.get(), BluetoothPowerState::Off);
        assert_eq!(f.core.views().scan.get(), ScanningState::Idle);
    }

    #[test]
    fn test_failed_power_on_rolls_back() {
        let f = fixture();
        f.core.handle_event(user(CoreRequest::PowerOn));
        f.core
            .handle_event(hardware(HardwareCommand::PowerOn, false, NotificationInfo::new()));
        assert_eq!(f.core.views().power.get(), BluetoothPowerState::Off);
    }

    #[test]
    fn test_pairing_request_and_accept() {
        let f = fixture();
        f.core.handle_event(hardware(
            HardwareCommand::PairingRequested,
            true,
            NotificationInfo::new().with_address("AA:BB").with_name("Headset"),
        ));
        let timer = f.core.pairing().timer_for("AA:BB").unwrap();
        assert!(f.timers.is_pending(timer));

        f.core.handle_event(CoreEvent::User(SignalMessage::notification(
            CoreRequest::AcceptPairing,
            true,
            NotificationInfo::new().with_address("AA:BB"),
        )));
        assert!(!f.timers.is_pending(timer));
        assert_eq!(
            commands::<HardwareCommand>(&f.hardware_inbox),
            vec![HardwareCommand::AcceptPairing]
        );
    }

    #[test]
    fn test_confirmation_expiry_rejects() {
        let f = fixture();
        f.core.handle_event(hardware(
            HardwareCommand::PairingRequested,
            true,
            NotificationInfo::new().with_address("AA:BB"),
        ));

        f.core.handle_event(CoreEvent::ConfirmationExpired {
            address: "AA:BB".into(),
            request: 1,
        });
        assert!(f.core.pairing().pending().is_empty());
        assert_eq!(
            commands::<HardwareCommand>(&f.hardware_inbox),
            vec![HardwareCommand::RejectPairing]
        );
        let statuses = f.statuses.0.lock();
        assert_eq!(statuses.last().unwrap().payload["state"], "expired");
    }

    #[test]
    fn test_call_flow() {
        let f = fixture();
        f.core.handle_event(hardware(
            HardwareCommand::IncomingCall,
            true,
            NotificationInfo::new().with_number("5550100"),
        ));
        assert_eq!(f.core.views().call.get(), CallState::Incoming);

        f.core.handle_event(user(CoreRequest::Answer));
        assert_eq!(
            commands::<HardwareCommand>(&f.hardware_inbox),
            vec![HardwareCommand::Answer]
        );
        f.core
            .handle_event(hardware(HardwareCommand::Answer, true, NotificationInfo::new()));
        assert_eq!(f.core.views().call.get(), CallState::Calling);

        f.core
            .handle_event(hardware(HardwareCommand::CallEnded, true, NotificationInfo::new()));
        assert_eq!(f.core.views().call.get(), CallState::Idle);
    }

    #[test]
    fn test_dial_requires_number() {
        let f = fixture();
        f.core.handle_event(user(CoreRequest::Dial));
        assert!(f.hardware_inbox.drain().is_empty());

        f.core.handle_event(CoreEvent::User(SignalMessage::notification(
            CoreRequest::Dial,
            true,
            NotificationInfo::new().with_number("5550199"),
        )));
        let batch = f.hardware_inbox.drain();
        assert_eq!(batch.len(), 1);
        let message = SignalMessage::<HardwareCommand>::decode(&batch[0].args).unwrap();
        assert_eq!(message.info().unwrap().number, "5550199");
        assert_eq!(f.core.views().call.get(), CallState::Processing);
    }

    #[test]
    fn test_temperature_is_stored() {
        let f = fixture();
        f.core.handle_event(hardware(
            HardwareCommand::Temperature,
            true,
            NotificationInfo::new().with_temperature("41.5"),
        ));
        assert_eq!(f.core.last_temperature().as_deref(), Some("41.5"));
        let statuses = f.statuses.0.lock();
        assert_eq!(statuses[0].category, StatusCategory::Temperature);
    }
}
