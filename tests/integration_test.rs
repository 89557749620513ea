// Integration tests for devbus
// Full processes wired over the loopback bus: real receivers, dispatchers,
// timers and runtimes.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use devbus::config::RuntimeConfig;
use devbus::messaging::{
    topology, BusConnection, CommandCode, CoreEvent, CoreRequest, Dispatcher, EventHandler,
    HardwareCommand, LoopbackBus, LoopbackConnection, NotificationInfo, QueueForwarder, RawSignal,
    RecordCommand, RecordEvent, SignalEndpoint, SignalMatch, SignalMessage, SignalReceiver,
    SignalSender, StatusCategory, Subscription, WireArg,
};
use devbus::orchestrator::{BusStatusSink, CoreOrchestrator, LogStatusSink};
use devbus::queue::EventQueue;
use devbus::recorder::{CaptureBackend, CaptureReporter, RecordManager};
use devbus::runtime::ProcessRuntime;
use devbus::state::{BluetoothPowerState, RecordState};
use devbus::timer::TimerService;
use devbus::CaptureError;

fn fast_config() -> RuntimeConfig {
    RuntimeConfig {
        receiver_poll_ms: 20,
        timer_interval_ms: 20,
        dispatcher_wait_ms: 20,
        ..RuntimeConfig::default()
    }
}

/// Poll `condition` for up to five seconds
fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < Duration::from_secs(5) {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

fn emit<C: CommandCode>(
    conn: &LoopbackConnection,
    endpoint: &SignalEndpoint,
    message: SignalMessage<C>,
) {
    let signal = RawSignal::new(endpoint, message.encode().unwrap());
    conn.emit(&signal).unwrap();
}

fn decode_all<C: CommandCode>(inbox: &Subscription) -> Vec<SignalMessage<C>> {
    inbox
        .drain()
        .iter()
        .map(|signal| SignalMessage::<C>::decode(&signal.args).unwrap())
        .collect()
}

struct CoreProcess {
    runtime: ProcessRuntime<CoreEvent>,
    orchestrator: Arc<CoreOrchestrator>,
}

fn start_core(bus: &LoopbackBus, config: &RuntimeConfig) -> CoreProcess {
    let conn: Arc<dyn BusConnection> = Arc::new(bus.connect(topology::CORE_SERVICE));
    let runtime = ProcessRuntime::<CoreEvent>::new("core", config);
    runtime.start().unwrap();

    let orchestrator = Arc::new(CoreOrchestrator::new(
        SignalSender::new(conn.clone(), topology::core_record_route),
        SignalSender::new(conn.clone(), topology::core_hardware_route),
        runtime.timers().clone(),
        config.confirmation_timeout(),
        LogStatusSink,
    ));
    runtime
        .spawn_dispatcher(
            Dispatcher::new("core-dispatcher", runtime.queue().clone(), orchestrator.clone())
                .with_wait(config.dispatcher_wait()),
        )
        .unwrap();

    let [requests, record, hardware] = topology::core_subscriptions();
    let queue = runtime.queue().clone();
    runtime
        .spawn(
            SignalReceiver::subscribe(
                "requests",
                conn.clone(),
                requests,
                QueueForwarder::new(queue.clone(), CoreEvent::User),
            )
            .unwrap()
            .with_poll_interval(config.receiver_poll()),
        )
        .unwrap();
    runtime
        .spawn(
            SignalReceiver::subscribe(
                "record",
                conn.clone(),
                record,
                QueueForwarder::new(queue.clone(), CoreEvent::Record),
            )
            .unwrap()
            .with_poll_interval(config.receiver_poll()),
        )
        .unwrap();
    runtime
        .spawn(
            SignalReceiver::subscribe(
                "hardware",
                conn,
                hardware,
                QueueForwarder::new(queue, CoreEvent::Hardware),
            )
            .unwrap()
            .with_poll_interval(config.receiver_poll()),
        )
        .unwrap();

    CoreProcess {
        runtime,
        orchestrator,
    }
}

/// Capture that starts and stops as soon as it is asked to
struct InstantCapture {
    reporter: CaptureReporter,
}

impl CaptureBackend for InstantCapture {
    fn begin(&self, session: u64) -> Result<(), CaptureError> {
        self.reporter.started(format!("/data/rec-{}.wav", session));
        Ok(())
    }

    fn end(&self, _session: u64) -> Result<(), CaptureError> {
        self.reporter.stopped();
        Ok(())
    }
}

fn start_record(bus: &LoopbackBus, config: &RuntimeConfig) -> ProcessRuntime<RecordEvent> {
    let conn: Arc<dyn BusConnection> = Arc::new(bus.connect(topology::RECORD_SERVICE));
    let runtime = ProcessRuntime::<RecordEvent>::new("record", config);
    runtime.start().unwrap();

    let manager = Arc::new(RecordManager::new(
        InstantCapture {
            reporter: CaptureReporter::new(runtime.queue().clone()),
        },
        SignalSender::new(conn.clone(), topology::record_reply_route),
        runtime.timers().clone(),
        config.max_record(),
    ));
    runtime
        .spawn_dispatcher(
            Dispatcher::new("record-dispatcher", runtime.queue().clone(), manager)
                .with_wait(config.dispatcher_wait()),
        )
        .unwrap();
    runtime
        .spawn(
            SignalReceiver::subscribe(
                "commands",
                conn,
                SignalMatch::for_endpoint(&topology::record_commands())
                    .with_sender(topology::CORE_SERVICE),
                QueueForwarder::new(runtime.queue().clone(), RecordEvent::Core),
            )
            .unwrap()
            .with_poll_interval(config.receiver_poll()),
        )
        .unwrap();
    runtime
}

#[test]
fn test_recording_round_trip_between_processes() {
    let bus = LoopbackBus::new();
    let config = fast_config();
    let core = start_core(&bus, &config);
    let record = start_record(&bus, &config);
    let record_state = core.orchestrator.views().record.clone();

    let gateway = bus.connect("org.devbus.Ui");
    emit(
        &gateway,
        &topology::core_requests(),
        SignalMessage::Command(CoreRequest::StartRecord),
    );
    assert!(wait_until(|| record_state.get() == RecordState::Recording));

    emit(
        &gateway,
        &topology::core_requests(),
        SignalMessage::Command(CoreRequest::StopRecord),
    );
    assert!(wait_until(|| record_state.get() == RecordState::Stopped));

    record.shutdown();
    core.runtime.shutdown();
}

#[test]
fn test_recording_duration_limit() {
    let bus = LoopbackBus::new();
    let config = RuntimeConfig {
        max_record_ms: 300,
        ..fast_config()
    };
    let core = start_core(&bus, &config);
    let record = start_record(&bus, &config);
    let record_state = core.orchestrator.views().record.clone();

    let gateway = bus.connect("org.devbus.Ui");
    emit(
        &gateway,
        &topology::core_requests(),
        SignalMessage::Command(CoreRequest::StartRecord),
    );
    assert!(wait_until(|| record_state.get() == RecordState::Recording));
    // The record process stops on its own and tells the core
    assert!(wait_until(|| record_state.get() == RecordState::Stopped));

    record.shutdown();
    core.runtime.shutdown();
}

#[test]
fn test_unanswered_pairing_is_rejected() {
    let bus = LoopbackBus::new();
    let config = RuntimeConfig {
        confirmation_timeout_ms: 100,
        ..fast_config()
    };
    let core = start_core(&bus, &config);

    let hardware = bus.connect(topology::HARDWARE_SERVICE);
    let commands = hardware
        .subscribe(&SignalMatch::for_endpoint(&topology::hardware_commands()))
        .unwrap();
    emit(
        &hardware,
        &topology::hardware_notifications(),
        SignalMessage::notification(
            HardwareCommand::PairingRequested,
            true,
            NotificationInfo::new().with_address("aa:bb:cc:dd:ee:ff"),
        ),
    );
    assert!(wait_until(|| !core.orchestrator.pairing().pending().is_empty()));

    let mut answers = Vec::new();
    assert!(wait_until(|| {
        answers.extend(decode_all::<HardwareCommand>(&commands));
        !answers.is_empty()
    }));
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].command(), HardwareCommand::RejectPairing);
    assert_eq!(answers[0].info().unwrap().address, "AA:BB:CC:DD:EE:FF");
    assert!(core.orchestrator.pairing().pending().is_empty());

    core.runtime.shutdown();
}

#[test]
fn test_default_confirmation_timeout() {
    let config = RuntimeConfig::default();
    assert_eq!(config.confirmation_timeout(), Duration::from_secs(30));

    let bus = LoopbackBus::new();
    let core = start_core(&bus, &fast_config());
    core.runtime
        .queue()
        .push_event(CoreEvent::Hardware(SignalMessage::notification(
            HardwareCommand::PairingRequested,
            true,
            NotificationInfo::new().with_address("00:11:22:33:44:55"),
        )));
    assert!(wait_until(|| core.orchestrator.pairing().pending().len() == 1));
    assert_eq!(core.runtime.timers().pending_count(), 1);

    core.runtime.shutdown();
}

#[test]
fn test_malformed_signal_is_not_enqueued() {
    let bus = LoopbackBus::new();
    let config = fast_config();
    let runtime = ProcessRuntime::<CoreEvent>::new("core", &config);
    let conn: Arc<dyn BusConnection> = Arc::new(bus.connect(topology::CORE_SERVICE));
    runtime
        .spawn(
            SignalReceiver::subscribe(
                "requests",
                conn,
                SignalMatch::for_endpoint(&topology::core_requests()),
                QueueForwarder::new(runtime.queue().clone(), CoreEvent::User),
            )
            .unwrap()
            .with_poll_interval(config.receiver_poll()),
        )
        .unwrap();

    let gateway = bus.connect("org.devbus.Ui");
    for args in [
        vec![WireArg::Str("3".into())],
        vec![WireArg::Int32(3), WireArg::Str(String::new())],
        vec![WireArg::Int32(3), WireArg::Bool(true), WireArg::Str("{".into())],
        vec![WireArg::Int32(99)],
    ] {
        gateway
            .emit(&RawSignal::new(&topology::core_requests(), args))
            .unwrap();
    }
    emit(
        &gateway,
        &topology::core_requests(),
        SignalMessage::Command(CoreRequest::PowerOn),
    );

    assert!(wait_until(|| runtime.queue().has_event()));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(runtime.queue().size(), 1);
    assert_eq!(
        runtime.queue().pop_event(),
        Some(CoreEvent::User(SignalMessage::Command(CoreRequest::PowerOn)))
    );

    runtime.shutdown();
}

#[test]
fn test_unknown_code_changes_nothing() {
    let bus = LoopbackBus::new();
    let core = start_core(&bus, &fast_config());
    let hardware = bus.connect(topology::HARDWARE_SERVICE);
    let commands = hardware
        .subscribe(&SignalMatch::for_endpoint(&topology::hardware_commands()))
        .unwrap();

    let gateway = bus.connect("org.devbus.Ui");
    gateway
        .emit(&RawSignal::new(
            &topology::core_requests(),
            vec![WireArg::Int32(42)],
        ))
        .unwrap();
    emit(
        &gateway,
        &topology::core_requests(),
        SignalMessage::Command(CoreRequest::PowerOn),
    );

    let views = core.orchestrator.views().clone();
    assert!(wait_until(|| views.power.get() == BluetoothPowerState::Processing));
    assert_eq!(views.record.get(), RecordState::Stopped);
    let sent: Vec<_> = decode_all::<HardwareCommand>(&commands)
        .iter()
        .map(SignalMessage::command)
        .collect();
    assert_eq!(sent, vec![HardwareCommand::PowerOn]);

    core.runtime.shutdown();
}

#[test]
fn test_status_broadcast_reaches_gateway() {
    let bus = LoopbackBus::new();
    let config = fast_config();
    let conn: Arc<dyn BusConnection> = Arc::new(bus.connect(topology::CORE_SERVICE));
    let orchestrator = CoreOrchestrator::new(
        SignalSender::new(conn.clone(), topology::core_record_route),
        SignalSender::new(conn.clone(), topology::core_hardware_route),
        TimerService::new(),
        config.confirmation_timeout(),
        BusStatusSink::new(conn),
    );

    let gateway = bus.connect("org.devbus.Ui");
    let statuses = gateway
        .subscribe(&SignalMatch::for_endpoint(&topology::core_status()))
        .unwrap();

    orchestrator.handle_event(CoreEvent::Hardware(SignalMessage::notification(
        HardwareCommand::Temperature,
        true,
        NotificationInfo::new().with_temperature("41.5"),
    )));

    let received = decode_all::<StatusCategory>(&statuses);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].command(), StatusCategory::Temperature);
    assert!(received[0].info().unwrap().message.contains("41.5"));
}

#[test]
fn test_queue_keeps_per_producer_order() {
    let queue: EventQueue<(usize, usize)> = EventQueue::new();
    let producers: Vec<_> = (0..4)
        .map(|producer| {
            let queue = queue.clone();
            thread::spawn(move || {
                for n in 0..250 {
                    assert!(queue.push_event((producer, n)));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let mut next = [0usize; 4];
    let mut total = 0;
    while let Some((producer, n)) = queue.pop_event() {
        assert_eq!(n, next[producer]);
        next[producer] += 1;
        total += 1;
    }
    assert_eq!(total, 1000);
    assert_eq!(next, [250; 4]);
}

#[test]
fn test_record_commands_ignore_other_senders() {
    let bus = LoopbackBus::new();
    let config = fast_config();
    let record = start_record(&bus, &config);
    let core = bus.connect(topology::CORE_SERVICE);
    let replies = core
        .subscribe(&SignalMatch::for_endpoint(&topology::record_notifications()))
        .unwrap();

    let intruder = bus.connect("org.devbus.Other");
    emit(
        &intruder,
        &topology::record_commands(),
        SignalMessage::Command(RecordCommand::StartRecord),
    );
    thread::sleep(Duration::from_millis(150));
    assert!(replies.drain().is_empty());

    emit(
        &core,
        &topology::record_commands(),
        SignalMessage::Command(RecordCommand::StartRecord),
    );
    let mut seen = Vec::new();
    assert!(wait_until(|| {
        seen.extend(decode_all::<RecordCommand>(&replies));
        !seen.is_empty()
    }));
    assert_eq!(seen[0].command(), RecordCommand::StartRecord);
    assert_eq!(seen[0].info().unwrap().message, "/data/rec-1.wav");

    record.shutdown();
}
